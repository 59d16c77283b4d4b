//! http_job_step library: one HTTP request as a scheduler job step
//!
//! A job step resolves placeholders in its URL, headers and body against the
//! job's parameters, sends one HTTP request, classifies the response using
//! status codes and optional success/error patterns, and composes a report
//! (with header table, body preview, chain data and timing metrics) for the
//! host scheduler.
//!
//! # Example
//!
//! ```no_run
//! use http_job_step::{run_job, JobDescriptor, JobLog, ReqwestTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let job = JobDescriptor::from_json(r#"{
//!     "chain": true,
//!     "params": {
//!         "url": "https://api.example.com/items/{item}?ts=[now]",
//!         "method": "GET",
//!         "headers": "Accept: application/json",
//!         "item": 42,
//!         "error_match": "\"status\":\\s*\"error\""
//!     }
//! }"#)?;
//!
//! let report = run_job(&job, &ReqwestTransport::default(), &mut JobLog::discard()).await?;
//! println!("{}", serde_json::to_string(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime for [`run_job`]; placeholder
//! resolution and classification are synchronous.

mod app;
mod classify;
pub mod config;
mod error_handling;
mod fetch;
pub mod initialization;
mod job;
mod placeholder;
mod report;
mod run;
mod utils;

// Re-export public API
pub use app::{validate_url_template, JobLog};
pub use classify::{classify, Classification, MatchRules};
pub use config::{Config, LogFormat, LogLevel, Opt};
pub use error_handling::{
    categorize_reqwest_error, describe_error_chain, FailureKind, InitializationError, JobError,
    TransportError, TransportErrorKind,
};
pub use fetch::{
    build_request, parse_header_block, Exchange, RequestSpec, ReqwestTransport, ResponseSpec,
    Transport,
};
pub use job::{JobDescriptor, StepParams};
pub use placeholder::expression::{evaluate, EvalError, JsValue};
pub use placeholder::{format_local, substitute, substitute_at};
pub use report::{compose, locale_compare, ChainData, Preview, ResultReport, Table};
pub use run::{run_input, run_job};
pub use utils::PerfMetrics;
