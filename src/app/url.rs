//! URL template validation.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use crate::config::URL_PATTERN;
use crate::error_handling::JobError;

static URL_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(URL_PATTERN).expect("valid URL pattern"));

/// Validates the raw (unresolved) `url` parameter.
///
/// The template must be an http(s) URL without whitespace; placeholders are
/// allowed since they are resolved afterwards.
///
/// # Errors
///
/// Returns `JobError::MalformedUrl` naming the URL (or `(n/a)` when absent).
pub fn validate_url_template(url: Option<&str>) -> Result<&str, JobError> {
    match url {
        Some(url) if URL_TEMPLATE.is_match(url) => Ok(url),
        Some(url) => {
            warn!("Rejecting malformed URL: {}", url);
            Err(JobError::MalformedUrl(url.to_string()))
        }
        None => {
            warn!("Rejecting job without a URL");
            Err(JobError::MalformedUrl("(n/a)".to_string()))
        }
    }
}
