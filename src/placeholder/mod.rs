//! Placeholder substitution for job templates.
//!
//! Three placeholder kinds are expanded, always in this order, each in a
//! single left-to-right pass:
//!
//! 1. `{name}`: value of `name` from the job context (empty when absent or null)
//! 2. `[now]` / `[now:format]`: Unix seconds, or local time in `format`
//! 3. `{= expression}`: result of a restricted expression (empty on any error)
//!
//! Replacement text is never re-scanned by the same pass. Substitution never
//! fails: anything that cannot be resolved becomes an empty string.

pub mod expression;
mod temporal;

use std::sync::LazyLock;

use chrono::{DateTime, Local};
use log::debug;
use regex::{Captures, Regex};

use crate::job::{value_to_string, JobDescriptor};
use expression::{evaluate, JsValue};

pub use temporal::format_local;
use temporal::unix_seconds;

static NAMED_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("valid named placeholder pattern"));

static NOW_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[now(?::([^\]]+))?\]").expect("valid now placeholder pattern"));

static EXPRESSION_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{=\s*([^}]+)\}").expect("valid expression placeholder pattern")
});

/// Resolves all placeholders in `template` against the job context.
///
/// # Examples
///
/// ```
/// use http_job_step::{substitute, JobDescriptor};
///
/// let job = JobDescriptor::from_json(r#"{"params":{"val":"abc"}}"#).unwrap();
/// assert_eq!(substitute("X-Test: {val}", &job), "X-Test: abc");
/// assert_eq!(substitute("{=1+1}", &job), "2");
/// assert_eq!(substitute("{missing}", &job), "");
/// ```
pub fn substitute(template: &str, context: &JobDescriptor) -> String {
    substitute_at(template, context, &Local::now())
}

/// Same as [`substitute`] with a fixed clock, so every `[now]` in one template agrees.
pub fn substitute_at(template: &str, context: &JobDescriptor, now: &DateTime<Local>) -> String {
    if template.is_empty() {
        return String::new();
    }

    let named = NAMED_PLACEHOLDER.replace_all(template, |caps: &Captures| {
        context
            .lookup(&caps[1])
            .map(value_to_string)
            .unwrap_or_default()
    });

    let timed = NOW_PLACEHOLDER.replace_all(&named, |caps: &Captures| match caps.get(1) {
        None => unix_seconds(now),
        Some(format) => format_local(now, format.as_str()),
    });

    let evaluated = EXPRESSION_PLACEHOLDER.replace_all(&timed, |caps: &Captures| {
        match evaluate(&caps[1]) {
            Ok(JsValue::Undefined) => String::new(),
            Ok(value) => value.to_js_string(),
            Err(e) => {
                debug!("Expression placeholder '{}' resolved to empty: {}", &caps[1], e);
                String::new()
            }
        }
    });

    evaluated.into_owned()
}
