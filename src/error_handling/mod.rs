//! Error handling.
//!
//! This module provides:
//! - Fatal job errors (malformed URL, invalid match pattern, unreadable job)
//! - Transport errors and their categorization from `reqwest::Error`
//! - Failure categories attached to a classification
//!
//! Placeholder resolution never produces an error; everything that goes wrong
//! with the HTTP exchange itself ends up as a failed classification, not as
//! an `Err`.

mod categorization;
mod types;

// Re-export public API
pub use categorization::{categorize_reqwest_error, describe_error_chain};
pub use types::{
    FailureKind, InitializationError, JobError, TransportError, TransportErrorKind,
};
