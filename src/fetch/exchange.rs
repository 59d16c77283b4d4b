//! Response data structures.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::utils::PerfMetrics;

/// Response as received from the server, headers in wire order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSpec {
    pub status: u16,
    pub status_message: String,
    /// Lowercase names; one entry per occurrence
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseSpec {
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Last value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Header map for chained jobs; for repeated names the last value wins.
    pub fn header_map(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect()
    }
}

/// A completed request/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub response: ResponseSpec,
    pub perf: Option<PerfMetrics>,
}
