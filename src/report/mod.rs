//! Result report composition.
//!
//! The report is the single JSON object written back to the host. Besides the
//! outcome it can carry a response header table, a raw body preview, data for
//! the next chained job, and timing metrics. Each attachment is independent of
//! the others.

mod collate;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::app::JobLog;
use crate::classify::Classification;
use crate::config::{
    HEADER_CONTENT_TYPE, JSON_CONTENT_TYPE_PATTERN, LOG_LABEL_PERFORMANCE, LOG_LABEL_RAW_RESPONSE,
    LOG_LABEL_RESPONSE_HEADERS, MAX_CHAIN_JSON_SIZE, MAX_PREVIEW_BODY_SIZE,
    PREVIEW_CONTENT_TYPE_PATTERN, PREVIEW_TITLE_RAW_RESPONSE, TABLE_COLUMNS_RESPONSE_HEADERS,
    TABLE_TITLE_RESPONSE_HEADERS,
};
use crate::error_handling::JobError;
use crate::fetch::{Exchange, ResponseSpec};
use crate::utils::PerfMetrics;

pub use collate::locale_compare;

static PREVIEW_CONTENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(PREVIEW_CONTENT_TYPE_PATTERN).expect("valid preview content type pattern")
});

static JSON_CONTENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(JSON_CONTENT_TYPE_PATTERN).expect("valid JSON content type pattern")
});

/// The report written to the host, one per invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultReport {
    /// Always `true` once emitted
    pub complete: bool,
    pub code: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<Preview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_data: Option<ChainData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perf: Option<PerfMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<[String; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub title: String,
    pub content: String,
}

/// Data handed to the next job in a chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainData {
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
}

impl ResultReport {
    /// A bare report with only the outcome fields.
    pub fn outcome(code: i64, description: impl Into<String>) -> Self {
        Self {
            complete: true,
            code,
            description: description.into(),
            table: None,
            html: None,
            chain_data: None,
            perf: None,
        }
    }

    /// Code 1 report for an invocation that ended with a fatal error.
    pub fn fatal(error: &JobError) -> Self {
        Self::outcome(1, error.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Builds the report and writes the matching job log blocks.
///
/// # Errors
///
/// Returns `JobError::JobLog` if the job log cannot be written.
pub fn compose(
    classification: &Classification,
    exchange: Option<&Exchange>,
    chained: bool,
    log: &mut JobLog,
) -> Result<ResultReport, JobError> {
    let mut report = ResultReport::outcome(classification.code, classification.description.clone());
    log.line(&report.description)?;

    let Some(exchange) = exchange else {
        return Ok(report);
    };
    let response = &exchange.response;

    log.block(
        LOG_LABEL_RESPONSE_HEADERS,
        &response
            .headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n"),
    )?;
    report.table = Some(header_table(response));

    if chained {
        report.chain_data = Some(ChainData {
            headers: response.header_map(),
            json: None,
        });
    }

    let content_type = response.header(HEADER_CONTENT_TYPE).unwrap_or_default();
    let text = response.body_text();

    if !text.is_empty() && PREVIEW_CONTENT_TYPE.is_match(content_type) {
        log.block(LOG_LABEL_RAW_RESPONSE, text.trim())?;

        if response.body.len() < MAX_PREVIEW_BODY_SIZE {
            report.html = Some(preview(&text));
        } else {
            debug!(
                "Response body of {} bytes is too large for a preview",
                response.body.len()
            );
        }

        if let Some(chain_data) = report.chain_data.as_mut() {
            if response.body.len() < MAX_CHAIN_JSON_SIZE && JSON_CONTENT_TYPE.is_match(content_type) {
                match serde_json::from_str::<Value>(&text) {
                    Ok(json) if json_is_truthy(&json) => chain_data.json = Some(json),
                    Ok(json) => debug!("Chained JSON {} is falsy, not attached", json),
                    Err(e) => {
                        warn!("Chained response is not valid JSON: {}", e);
                        log.line(&format!(
                            "WARNING: Failed to parse JSON response: {} (could not include JSON in chain_data)",
                            e
                        ))?;
                    }
                }
            }
        }
    }

    if let Some(perf) = &exchange.perf {
        log.line(&format!("{} {}", LOG_LABEL_PERFORMANCE, perf.summarize()))?;
        report.perf = Some(perf.clone());
    }

    Ok(report)
}

/// Scripting truthiness: `null`, `false`, zero and `""` are falsy.
fn json_is_truthy(json: &Value) -> bool {
    match json {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One row per header occurrence, ordered by name.
fn header_table(response: &ResponseSpec) -> Table {
    let mut rows: Vec<[String; 2]> = response
        .headers
        .iter()
        .map(|(name, value)| [name.clone(), value.clone()])
        .collect();
    // Stable, so repeated names keep wire order
    rows.sort_by(|a, b| locale_compare(&a[0], &b[0]));

    Table {
        title: TABLE_TITLE_RESPONSE_HEADERS.to_string(),
        header: TABLE_COLUMNS_RESPONSE_HEADERS
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    }
}

fn preview(text: &str) -> Preview {
    Preview {
        title: PREVIEW_TITLE_RAW_RESPONSE.to_string(),
        content: format!("<pre>{}</pre>", text.replace('<', "&lt;").trim()),
    }
}
