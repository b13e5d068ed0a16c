//! Shared utilities, configuration, and error handling for Banter
//!
//! - Configuration management following 12-factor principles
//! - Common error type and the uniform JSON error envelope
//! - Validating JSON extractor

pub mod config;
pub mod error;
pub mod extractors;

pub use error::{
    attach_request_path, error_body, error_response, method_not_allowed_fallback,
    not_found_fallback, panic_response, Error, ErrorInfo, INTERNAL_ERROR_MESSAGE,
};
pub use extractors::ValidatedJson;
