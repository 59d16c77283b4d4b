//! Request building.
//!
//! Turns the step parameters into a transport-agnostic [`RequestSpec`] with
//! every placeholder resolved.

use std::sync::LazyLock;
use std::time::Duration;

use log::debug;
use regex::Regex;

use crate::app::validate_url_template;
use crate::config::BODY_METHOD;
use crate::error_handling::JobError;
use crate::job::{JobDescriptor, StepParams};
use crate::placeholder::substitute;

static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):\s*(.+)$").expect("valid header line pattern"));

/// Fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub url: String,
    pub method: String,
    /// Declaration order, duplicates allowed
    pub headers: Vec<(String, String)>,
    /// Present only for methods that carry a payload
    pub body: Option<Vec<u8>>,
    /// `None` means no explicit timeout
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub tls_verify: bool,
}

impl RequestSpec {
    /// Length of the request body in bytes (zero when there is none).
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }
}

/// Builds the request for a job.
///
/// The raw `url` is validated before anything is resolved; a malformed URL
/// fails the job without touching the network.
///
/// # Errors
///
/// Returns `JobError::MalformedUrl` if the `url` template is missing or not
/// an http(s) URL.
pub fn build_request(params: &StepParams, context: &JobDescriptor) -> Result<RequestSpec, JobError> {
    let url_template = validate_url_template(params.url.as_deref())?;
    let url = substitute(url_template, context);

    let headers = params
        .headers
        .as_deref()
        .map(|raw| parse_header_block(raw, context))
        .unwrap_or_default();

    let body = (params.method == BODY_METHOD).then(|| {
        params
            .data
            .as_deref()
            .map(|data| substitute(data, context))
            .unwrap_or_default()
            .into_bytes()
    });

    let timeout = (!params.timeout.is_zero()).then_some(params.timeout);

    debug!(
        "Built {} request for {} ({} headers, body: {} bytes, timeout: {:?})",
        params.method,
        url,
        headers.len(),
        body.as_ref().map_or(0, Vec::len),
        timeout
    );

    Ok(RequestSpec {
        url,
        method: params.method.clone(),
        headers,
        body,
        timeout,
        follow_redirects: params.follow,
        tls_verify: !params.ssl_cert_bypass,
    })
}

/// Resolves a newline-delimited `name: value` block into header pairs.
///
/// The whole block is resolved first, then each line's name and value are
/// resolved again on their own. Lines without a colon (or without a value)
/// are skipped.
pub fn parse_header_block(raw: &str, context: &JobDescriptor) -> Vec<(String, String)> {
    let resolved = substitute(raw, context).replace("\r\n", "\n");

    resolved
        .trim()
        .split('\n')
        .filter_map(|line| {
            let caps = HEADER_LINE.captures(line)?;
            let name = substitute(caps[1].trim(), context);
            let value = substitute(&caps[2], context);
            if name.is_empty() {
                None
            } else {
                Some((name, value))
            }
        })
        .collect()
}
