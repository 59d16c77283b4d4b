// Shared test helpers: a scripted transport and a readable job log.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use http_job_step::{
    Exchange, JobLog, RequestSpec, ResponseSpec, Transport, TransportError, TransportErrorKind,
};

/// Transport that returns a canned outcome and records what it was asked to send.
#[allow(dead_code)] // Not every test file uses every helper
pub struct MockTransport {
    outcome: Result<Exchange, TransportError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<RequestSpec>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn responding(status: u16, message: &str, headers: &[(&str, &str)], body: &str) -> Self {
        Self::with_outcome(Ok(Exchange {
            response: ResponseSpec {
                status,
                status_message: message.to_string(),
                headers: headers
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_string()))
                    .collect(),
                body: body.as_bytes().to_vec(),
            },
            perf: None,
        }))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_outcome(Err(TransportError::new(
            TransportErrorKind::Connect,
            message,
        )))
    }

    pub fn with_outcome(outcome: Result<Exchange, TransportError>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RequestSpec> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestSpec) -> Result<Exchange, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.outcome.clone()
    }
}

/// In-memory job log sink that can be read back.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct CapturedLog(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl CapturedLog {
    pub fn job_log(&self) -> JobLog {
        JobLog::from_writer(self.clone())
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
