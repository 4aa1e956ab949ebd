pub mod error;

pub use error::{form_error_handler, handle_domain_error, handle_validation_error};
