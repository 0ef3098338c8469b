//! Secret handling for vendor credentials and model keys.

mod credentials;

pub use credentials::{ModelCredentials, SecretString};
