pub mod url_validator;

pub use url_validator::{UrlValidationError, normalize_target};
