// HTTP routes
pub mod agent;
pub mod bundles;
pub mod health;

pub use agent::*;
pub use bundles::*;
pub use health::*;
