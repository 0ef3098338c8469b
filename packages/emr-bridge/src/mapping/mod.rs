//! Mapping templating engine.
//!
//! Body templates are plain JSON in which an object value of the exact form
//! `{{path}}` is a placeholder for a value extracted from the FHIR bundle.
//! The executor only substitutes when a spec carries a non-empty
//! `fhir_mapping`; otherwise the template is sent as written.

mod path;
mod template;

pub use path::get_path;
pub use template::{apply, placeholder_path};
