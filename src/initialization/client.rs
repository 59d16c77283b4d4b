//! HTTP client initialization.
//!
//! A client is built per request because the redirect policy, timeout and
//! certificate checks are all per-job settings.

use reqwest::{redirect, ClientBuilder};

use crate::config::MAX_REDIRECT_HOPS;
use crate::fetch::RequestSpec;

/// Initializes the HTTP client for one request.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header (a job header of the same name still overrides it)
/// - Timeout, when the job sets one
/// - Redirect following (up to 32 hops) only when `follow` is set
/// - Certificate verification unless `ssl_cert_bypass` is set
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(request: &RequestSpec, user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    let policy = if request.follow_redirects {
        redirect::Policy::limited(MAX_REDIRECT_HOPS)
    } else {
        redirect::Policy::none()
    };

    let mut builder = ClientBuilder::new()
        .user_agent(user_agent)
        .redirect(policy)
        .danger_accept_invalid_certs(!request.tls_verify);

    if let Some(timeout) = request.timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}
