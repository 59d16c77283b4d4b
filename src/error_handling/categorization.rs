//! Error categorization.
//!
//! Turns `reqwest::Error` values into the transport errors reported to the
//! classifier.

use std::error::Error as StdError;

use super::types::{TransportError, TransportErrorKind};

/// Categorizes a `reqwest::Error` into a `TransportErrorKind`.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_builder() {
        TransportErrorKind::Builder
    } else if error.is_redirect() {
        TransportErrorKind::Redirect
    } else if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_request() {
        TransportErrorKind::Request
    } else if error.is_body() {
        TransportErrorKind::Body
    } else if error.is_decode() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Other
    }
}

/// Joins an error and all of its sources into one line.
///
/// reqwest keeps the interesting part (refused connection, certificate
/// problem) in the source chain, so the top-level message alone is not enough
/// for the report. Control characters are dropped.
pub fn describe_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts
        .join(": ")
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect()
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let kind = categorize_reqwest_error(&error);
        TransportError::new(kind, describe_error_chain(&error))
    }
}
