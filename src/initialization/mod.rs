//! Application initialization and resource setup.
//!
//! This module provides:
//! - Logger setup (stderr, plain or JSON)
//! - Per-request HTTP client construction

mod client;
mod logger;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
