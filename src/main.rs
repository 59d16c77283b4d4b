//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `http_job_step` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Reading the job and writing the report
//!
//! stdout carries exactly one JSON report line; diagnostics go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use tokio::io::AsyncReadExt;

use http_job_step::initialization::init_logger_with;
use http_job_step::{run_input, Config, Opt, ReqwestTransport, ResultReport};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists), e.g. RUST_LOG
    let _ = dotenvy::dotenv();

    let config = Config::from(Opt::parse());

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let input = read_input(&config).await?;
    let transport = ReqwestTransport::new(config.user_agent.clone());

    match run_input(&input, &transport).await {
        Ok(report) => {
            emit(&report)?;
            Ok(())
        }
        Err(e) => {
            log::error!("{}", e);
            emit(&ResultReport::fatal(&e))?;
            process::exit(1);
        }
    }
}

async fn read_input(config: &Config) -> Result<String> {
    if config.input.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read job description from stdin")?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(&config.input)
            .await
            .with_context(|| format!("Failed to read job description from {}", config.input.display()))
    }
}

fn emit(report: &ResultReport) -> Result<()> {
    let line = serde_json::to_string(report).context("Failed to serialize report")?;
    println!("{}", line);
    Ok(())
}
