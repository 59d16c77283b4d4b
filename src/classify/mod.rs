//! Response classification.
//!
//! Decides whether an exchange succeeded, in a fixed order that stops at the
//! first failure:
//!
//! 1. transport error (no response at all)
//! 2. status code outside `[200, 400)`
//! 3. body matches `error_match`
//! 4. body does not match `success_match`

use fancy_regex::Regex;
use log::{debug, warn};

use crate::error_handling::{FailureKind, JobError, TransportError};
use crate::fetch::ResponseSpec;

/// Compiled `success_match` / `error_match` rules.
///
/// `None` stands for the defaults: success matches everything, error matches
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct MatchRules {
    success: Option<Regex>,
    error: Option<Regex>,
}

impl MatchRules {
    /// Compiles the user-supplied patterns once, at invocation start.
    ///
    /// # Errors
    ///
    /// Returns `JobError::InvalidPattern` naming the offending parameter.
    pub fn compile(success: Option<&str>, error: Option<&str>) -> Result<Self, JobError> {
        Ok(Self {
            success: success.map(|p| compile_pattern("success_match", p)).transpose()?,
            error: error.map(|p| compile_pattern("error_match", p)).transpose()?,
        })
    }

    pub fn success_source(&self) -> Option<&str> {
        self.success.as_ref().map(Regex::as_str)
    }

    pub fn error_source(&self) -> Option<&str> {
        self.error.as_ref().map(Regex::as_str)
    }

    fn error_hit(&self, text: &str) -> bool {
        self.error.as_ref().is_some_and(|re| matches(re, text))
    }

    fn success_hit(&self, text: &str) -> bool {
        self.success.as_ref().map_or(true, |re| matches(re, text))
    }
}

/// Backtracking patterns can exceed the match limit; that counts as no match.
fn matches(re: &Regex, text: &str) -> bool {
    re.is_match(text).unwrap_or_else(|e| {
        warn!("Pattern '{}' could not be evaluated: {}", re.as_str(), e);
        false
    })
}

fn compile_pattern(field: &'static str, pattern: &str) -> Result<Regex, JobError> {
    Regex::new(pattern).map_err(|source| JobError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source: Box::new(source),
    })
}

/// Outcome of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub success: bool,
    /// 0 on success, the status code for status failures, otherwise 1
    pub code: i64,
    pub description: String,
    pub failure: Option<FailureKind>,
}

impl Classification {
    fn failed(kind: FailureKind, code: i64, description: String) -> Self {
        Self {
            success: false,
            code,
            description,
            failure: Some(kind),
        }
    }
}

/// Classifies a response (or the transport error that replaced it).
pub fn classify(
    outcome: Result<&ResponseSpec, &TransportError>,
    rules: &MatchRules,
) -> Classification {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            debug!("Transport failure ({}): {}", e.kind, e.message);
            return Classification::failed(FailureKind::Transport, 1, e.message.clone());
        }
    };

    let status_line = format!("HTTP {} {}", response.status, response.status_message)
        .trim_end()
        .to_string();

    if !(200..400).contains(&response.status) {
        return Classification::failed(FailureKind::Status, i64::from(response.status), status_line);
    }

    let text = response.body_text();

    if rules.error_hit(&text) {
        return Classification::failed(
            FailureKind::ErrorMatch,
            1,
            format!(
                "Response contains error match: {}",
                rules.error_source().unwrap_or_default()
            ),
        );
    }

    if !rules.success_hit(&text) {
        return Classification::failed(
            FailureKind::SuccessMiss,
            1,
            format!(
                "Response missing success match: {}",
                rules.success_source().unwrap_or_default()
            ),
        );
    }

    Classification {
        success: true,
        code: 0,
        description: format!("Success ({})", status_line),
        failure: None,
    }
}
