//! Timing metrics for the outbound request.
//!
//! The transport measures how long it waited for response headers and how long
//! the body took to arrive; these are reported verbatim in the result and
//! summarised in the job log.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::config::PERF_SCALE;

/// Helper function to convert a Duration to microseconds.
pub fn duration_to_micros(duration: Duration) -> u64 {
    duration.as_micros() as u64
}

/// Converts a Duration to milliseconds with microsecond precision.
pub fn duration_to_ms(duration: Duration) -> f64 {
    duration_to_micros(duration) as f64 / 1000.0
}

/// Performance metrics for one request, attached to the report as `perf`.
///
/// `perf` values are in units of 1/`scale` seconds (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfMetrics {
    pub scale: u32,
    pub perf: BTreeMap<String, f64>,
    pub counters: BTreeMap<String, u64>,
}

impl PerfMetrics {
    /// Builds metrics from the two measured phases.
    ///
    /// * `wait` - time from sending until response headers arrived
    /// * `receive` - time spent reading the body
    pub fn from_timings(
        wait: Duration,
        receive: Duration,
        bytes_sent: u64,
        bytes_received: u64,
    ) -> Self {
        let mut perf = BTreeMap::new();
        perf.insert("wait".to_string(), duration_to_ms(wait));
        perf.insert("receive".to_string(), duration_to_ms(receive));
        perf.insert("total".to_string(), duration_to_ms(wait + receive));

        let mut counters = BTreeMap::new();
        counters.insert("bytes_sent".to_string(), bytes_sent);
        counters.insert("bytes_received".to_string(), bytes_received);

        Self {
            scale: PERF_SCALE,
            perf,
            counters,
        }
    }

    /// One-line human summary, total first.
    pub fn summarize(&self) -> String {
        let mut parts = Vec::with_capacity(self.perf.len() + self.counters.len());
        if let Some(total) = self.perf.get("total") {
            parts.push(format!("total={:.3}ms", total));
        }
        for (name, value) in self.perf.iter().filter(|(name, _)| *name != "total") {
            parts.push(format!("{}={:.3}ms", name, value));
        }
        for (name, value) in &self.counters {
            parts.push(format!("{}={}", name, value));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_to_micros() {
        assert_eq!(duration_to_micros(Duration::from_micros(1234)), 1234);
        assert_eq!(duration_to_micros(Duration::from_millis(5)), 5000);
        assert_eq!(duration_to_micros(Duration::from_nanos(500)), 0);
    }

    #[test]
    fn test_duration_to_ms() {
        assert_eq!(duration_to_ms(Duration::from_micros(1500)), 1.5);
        assert_eq!(duration_to_ms(Duration::from_secs(1)), 1000.0);
    }

    #[test]
    fn test_perf_metrics_from_timings() {
        let metrics = PerfMetrics::from_timings(
            Duration::from_millis(20),
            Duration::from_millis(5),
            10,
            2048,
        );
        assert_eq!(metrics.scale, 1000);
        assert_eq!(metrics.perf["wait"], 20.0);
        assert_eq!(metrics.perf["receive"], 5.0);
        assert_eq!(metrics.perf["total"], 25.0);
        assert_eq!(metrics.counters["bytes_sent"], 10);
        assert_eq!(metrics.counters["bytes_received"], 2048);
    }

    #[test]
    fn test_perf_metrics_summary() {
        let metrics = PerfMetrics::from_timings(
            Duration::from_millis(20),
            Duration::from_millis(5),
            0,
            2,
        );
        assert_eq!(
            metrics.summarize(),
            "total=25.000ms, receive=5.000ms, wait=20.000ms, bytes_received=2, bytes_sent=0"
        );
    }

    #[test]
    fn test_perf_metrics_serialize() {
        let metrics = PerfMetrics::from_timings(Duration::ZERO, Duration::ZERO, 0, 0);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["scale"], 1000);
        assert!(json["perf"].get("total").is_some());
        assert!(json["counters"].get("bytes_sent").is_some());
    }
}
