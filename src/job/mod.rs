//! Job description and step parameters.
//!
//! A job arrives as one JSON object: top-level job metadata plus a `params`
//! object with the step parameters. Lookups go through an explicit two-layer
//! context where `params` wins over the job layer.

mod value;

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::config::{DEFAULT_METHOD, TIMEOUT_UNIT};
use crate::error_handling::JobError;

pub use value::{as_non_empty_string, as_number, format_number, is_truthy, value_to_string};

/// One job invocation's input, immutable once parsed.
#[derive(Debug, Clone, Default)]
pub struct JobDescriptor {
    job: Map<String, Value>,
    params: Map<String, Value>,
}

impl JobDescriptor {
    /// Builds the descriptor from the two layers directly.
    pub fn new(job: Map<String, Value>, params: Map<String, Value>) -> Self {
        Self { job, params }
    }

    /// Builds the descriptor from a job JSON object.
    ///
    /// # Errors
    ///
    /// Returns `JobError::InvalidJob` if the value is not an object or if
    /// `params` is present but not an object.
    pub fn from_value(value: Value) -> Result<Self, JobError> {
        let Value::Object(mut job) = value else {
            return Err(JobError::InvalidJob(
                "expected a JSON object".to_string(),
            ));
        };
        let params = match job.remove("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params,
            Some(_) => {
                return Err(JobError::InvalidJob(
                    "`params` must be a JSON object".to_string(),
                ))
            }
        };
        Ok(Self { job, params })
    }

    /// Parses a job JSON document.
    pub fn from_json(text: &str) -> Result<Self, JobError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| JobError::InvalidJob(e.to_string()))?;
        Self::from_value(value)
    }

    /// Looks up a key, step parameters first, then job metadata.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.params.get(key).or_else(|| self.job.get(key))
    }

    /// Job log path, when the host provided one.
    pub fn log_file(&self) -> Option<PathBuf> {
        as_non_empty_string(self.lookup("log_file")).map(PathBuf::from)
    }

    /// Whether the result feeds a downstream job step.
    pub fn is_chained(&self) -> bool {
        is_truthy(self.lookup("chain"))
    }
}

/// Typed view of the step parameters (still unresolved templates).
#[derive(Debug, Clone, PartialEq)]
pub struct StepParams {
    pub url: Option<String>,
    pub method: String,
    pub headers: Option<String>,
    pub data: Option<String>,
    /// Zero means no explicit timeout
    pub timeout: Duration,
    pub follow: bool,
    pub ssl_cert_bypass: bool,
    pub success_match: Option<String>,
    pub error_match: Option<String>,
}

impl StepParams {
    pub fn from_job(job: &JobDescriptor) -> Self {
        let timeout = as_number(job.lookup("timeout"))
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| TIMEOUT_UNIT.mul_f64(secs))
            .unwrap_or(Duration::ZERO);

        Self {
            url: as_non_empty_string(job.lookup("url")),
            method: as_non_empty_string(job.lookup("method"))
                .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            headers: as_non_empty_string(job.lookup("headers")),
            data: as_non_empty_string(job.lookup("data")),
            timeout,
            follow: is_truthy(job.lookup("follow")),
            ssl_cert_bypass: is_truthy(job.lookup("ssl_cert_bypass")),
            success_match: as_non_empty_string(job.lookup("success_match")),
            error_match: as_non_empty_string(job.lookup("error_match")),
        }
    }
}
