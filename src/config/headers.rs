//! Header and report label constants.
//!
//! Labels that appear in the structured report and in the job log live here so
//! that the composer, the log writer and the tests agree on them.

/// Content-Type header name (lowercase, as stored in response header maps)
pub const HEADER_CONTENT_TYPE: &str = "content-type";

/// Title of the response header table in the report
pub const TABLE_TITLE_RESPONSE_HEADERS: &str = "HTTP Response Headers";
/// Column headers of the response header table
pub const TABLE_COLUMNS_RESPONSE_HEADERS: [&str; 2] = ["Header Name", "Header Value"];

/// Title of the raw response preview block
pub const PREVIEW_TITLE_RAW_RESPONSE: &str = "Raw Response Content";

// Job log block labels
pub const LOG_LABEL_REQUEST_HEADERS: &str = "Request Headers:";
pub const LOG_LABEL_POST_DATA: &str = "POST Data:";
pub const LOG_LABEL_RESPONSE_HEADERS: &str = "Response Headers:";
pub const LOG_LABEL_RAW_RESPONSE: &str = "Raw Response Content:";
pub const LOG_LABEL_PERFORMANCE: &str = "Performance Metrics:";
