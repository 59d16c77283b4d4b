//! Utility functions.
//!
//! This module provides timing metrics for performance analysis.

mod timing;

pub use timing::PerfMetrics;
