//! One job invocation, end to end.

use log::{debug, info, warn};

use crate::app::JobLog;
use crate::classify::{classify, MatchRules};
use crate::config::{LOG_LABEL_POST_DATA, LOG_LABEL_REQUEST_HEADERS};
use crate::error_handling::JobError;
use crate::fetch::{build_request, Transport};
use crate::job::{JobDescriptor, StepParams};
use crate::report::{compose, ResultReport};

/// Runs one job: build the request, send it, classify and compose the report.
///
/// A malformed URL is not an `Err`: it yields a code 1 report and the
/// transport is never called.
///
/// # Errors
///
/// Returns `JobError::InvalidPattern` if `success_match` or `error_match`
/// does not compile, and `JobError::JobLog` if the job log cannot be written.
///
/// # Example
///
/// ```no_run
/// use http_job_step::{run_job, JobDescriptor, JobLog, ReqwestTransport};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = JobDescriptor::from_json(
///     r#"{"params":{"url":"https://example.com/health","method":"GET","success_match":"ok"}}"#,
/// )?;
/// let report = run_job(&job, &ReqwestTransport::default(), &mut JobLog::discard()).await?;
/// println!("{}: {}", report.code, report.description);
/// # Ok(())
/// # }
/// ```
pub async fn run_job(
    job: &JobDescriptor,
    transport: &dyn Transport,
    log: &mut JobLog,
) -> Result<ResultReport, JobError> {
    let params = StepParams::from_job(job);

    let request = match build_request(&params, job) {
        Ok(request) => request,
        Err(e @ JobError::MalformedUrl(_)) => return Ok(ResultReport::fatal(&e)),
        Err(e) => return Err(e),
    };

    let rules = MatchRules::compile(params.success_match.as_deref(), params.error_match.as_deref())?;

    log.request(&request.method, &request.url)?;
    if params.headers.is_some() {
        let lines: Vec<String> = request
            .headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect();
        log.block(LOG_LABEL_REQUEST_HEADERS, &lines.join("\n"))?;
    }
    if let Some(body) = &request.body {
        log.block(LOG_LABEL_POST_DATA, String::from_utf8_lossy(body).trim())?;
    }

    info!("Sending HTTP {} to {}", request.method, request.url);
    let outcome = transport.send(&request).await;
    if let Err(e) = &outcome {
        warn!("Request to {} failed: {}", request.url, e);
    }

    let classification = classify(outcome.as_ref().map(|exchange| &exchange.response), &rules);
    debug!(
        "Classified as code {} ({:?}): {}",
        classification.code, classification.failure, classification.description
    );

    let report = compose(&classification, outcome.as_ref().ok(), job.is_chained(), log)?;
    info!("Job finished with code {}: {}", report.code, report.description);
    Ok(report)
}

/// Parses a job document, opens its job log, and runs it.
///
/// An unparsable job yields a code 1 report rather than an `Err`, so the
/// host always receives a report for it.
///
/// # Errors
///
/// Same as [`run_job`], plus `JobError::JobLog` if the job's `log_file`
/// cannot be opened.
pub async fn run_input(input: &str, transport: &dyn Transport) -> Result<ResultReport, JobError> {
    let job = match JobDescriptor::from_json(input) {
        Ok(job) => job,
        Err(e) => {
            warn!("{}", e);
            return Ok(ResultReport::fatal(&e));
        }
    };
    let mut log = JobLog::for_job(&job)?;
    run_job(&job, transport, &mut log).await
}
