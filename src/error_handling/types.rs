//! Error type definitions.
//!
//! This module defines the fatal job errors, the transport error surfaced by a
//! request attempt, and the failure categories a classification can report.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Errors that end a job invocation before a response can be classified.
#[derive(Error, Debug)]
pub enum JobError {
    /// The raw `url` parameter is missing or is not an http(s) URL.
    ///
    /// Reported as a code 1 result; no request is attempted.
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    /// A user-supplied `success_match` / `error_match` failed to compile.
    #[error("Invalid {field} pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Parameter the pattern came from
        field: &'static str,
        /// Raw pattern source
        pattern: String,
        /// Compilation error
        #[source]
        source: Box<fancy_regex::Error>,
    },

    /// The job description was not a JSON object.
    #[error("Invalid job description: {0}")]
    InvalidJob(String),

    /// The job log file could not be opened or written.
    #[error("Job log error: {0}")]
    JobLog(#[from] std::io::Error),
}

/// Categories of transport-level failures.
///
/// Mirrors the predicates `reqwest::Error` exposes, plus header values the
/// transport refused before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum TransportErrorKind {
    Builder,
    InvalidHeader,
    Redirect,
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Builder => "HTTP request builder error",
            TransportErrorKind::InvalidHeader => "Invalid request header",
            TransportErrorKind::Redirect => "HTTP redirect error",
            TransportErrorKind::Timeout => "HTTP request timeout",
            TransportErrorKind::Connect => "HTTP connect error",
            TransportErrorKind::Request => "HTTP request error",
            TransportErrorKind::Body => "HTTP body error",
            TransportErrorKind::Decode => "HTTP decode error",
            TransportErrorKind::Other => "HTTP transport error",
        }
    }
}

/// A request that never produced a response (connection, TLS, timeout, ...).
///
/// The message becomes the report description, so it carries the full cause chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Why a classified response counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureKind {
    /// No response was received
    Transport,
    /// Status code outside `[200, 400)`
    Status,
    /// Body matched `error_match`
    ErrorMatch,
    /// Body did not match `success_match`
    SuccessMiss,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FailureKind::Transport => "transport error",
            FailureKind::Status => "status error",
            FailureKind::ErrorMatch => "error match",
            FailureKind::SuccessMiss => "missing success match",
        })
    }
}
