//! Configuration constants.
//!
//! This module defines the limits and fixed values used while building the
//! request and composing the report.

use std::time::Duration;

/// Pattern a raw `url` parameter must match before any placeholder is resolved.
///
/// The check runs on the template, so `http://{host}/path` is accepted.
pub const URL_PATTERN: &str = r"(?i)^https?://\S+$";

/// Maximum number of redirect hops followed when `follow` is set.
pub const MAX_REDIRECT_HOPS: usize = 32;

/// Only request bodies for this method are attached (exact, case-sensitive match).
pub const BODY_METHOD: &str = "POST";

/// Method used when the job does not name one.
pub const DEFAULT_METHOD: &str = "GET";

// Response capture limits
/// Bodies at or above this size (bytes) are logged but never attached as a preview (32 KiB)
pub const MAX_PREVIEW_BODY_SIZE: usize = 32 * 1024;
/// Bodies at or above this size (bytes) are never parsed into chain data (1 MiB)
pub const MAX_CHAIN_JSON_SIZE: usize = 1024 * 1024;

/// Content types whose bodies are shown as a text preview (case-insensitive substring).
pub const PREVIEW_CONTENT_TYPE_PATTERN: &str = r"(?i)(text|javascript|json|css|html)";
/// Content types whose bodies are parsed as JSON for chained jobs.
pub const JSON_CONTENT_TYPE_PATTERN: &str = r"(?i)(application|text)/json";

/// Default User-Agent string for outgoing requests.
pub const DEFAULT_USER_AGENT: &str = concat!("http_job_step/", env!("CARGO_PKG_VERSION"));

/// Conversion factor from the `timeout` parameter (seconds) to the transport's unit.
pub const TIMEOUT_UNIT: Duration = Duration::from_secs(1);

/// Timing values in performance metrics are reported in milliseconds.
pub const PERF_SCALE: u32 = 1000;
