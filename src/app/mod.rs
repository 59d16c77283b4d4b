//! Application helpers.
//!
//! This module provides the job log writer and URL template validation used
//! by the job runner.

pub mod logging;
pub mod url;

// Re-export public API
pub use logging::JobLog;
pub use url::validate_url_template;
