//! The seam between the job runner and the network.

use std::time::Instant;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use crate::error_handling::{TransportError, TransportErrorKind};
use crate::fetch::{Exchange, RequestSpec, ResponseSpec};
use crate::initialization::init_client;
use crate::utils::PerfMetrics;

/// Sends one request and returns the full response.
///
/// Implementations must not retry; a failed attempt is reported as-is.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestSpec) -> Result<Exchange, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestSpec) -> Result<Exchange, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Builder,
                format!("Invalid HTTP method '{}': {}", request.method, e),
            )
        })?;

        // Placeholders can still produce an unusable URL after validation
        let url = Url::parse(&request.url).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Builder,
                format!("Invalid URL '{}': {}", request.url, e),
            )
        })?;

        let client = init_client(request, &self.user_agent)?;
        let mut builder = client.request(method, url);

        // Checked here so a bad header fails with its name instead of a generic builder error
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::new(
                    TransportErrorKind::InvalidHeader,
                    format!("Invalid header name '{}': {}", name, e),
                )
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::new(
                    TransportErrorKind::InvalidHeader,
                    format!("Invalid value for header '{}': {}", name, e),
                )
            })?;
            builder = builder.header(header_name, header_value);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let wait = start.elapsed();

        let status = response.status();
        debug!("Received HTTP {} from {}", status.as_u16(), response.url());

        // HeaderMap yields lowercase names with repeated values grouped per name
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response.bytes().await?.to_vec();
        let receive = start.elapsed().saturating_sub(wait);

        let perf = PerfMetrics::from_timings(
            wait,
            receive,
            request.body_len() as u64,
            body.len() as u64,
        );

        Ok(Exchange {
            response: ResponseSpec {
                status: status.as_u16(),
                status_message: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            },
            perf: Some(perf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(url: String) -> RequestSpec {
        RequestSpec {
            url,
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
            timeout: None,
            follow_redirects: false,
            tls_verify: true,
        }
    }

    #[tokio::test]
    async fn test_send_collects_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-one", "1")
                    .set_body_string("hi"),
            )
            .mount(&server)
            .await;

        let exchange = ReqwestTransport::default()
            .send(&request(format!("{}/hello", server.uri())))
            .await
            .unwrap();

        assert_eq!(exchange.response.status, 200);
        assert_eq!(exchange.response.status_message, "OK");
        assert_eq!(exchange.response.header("x-one"), Some("1"));
        assert_eq!(exchange.response.body, b"hi");

        let perf = exchange.perf.unwrap();
        assert_eq!(perf.counters["bytes_received"], 2);
        assert!(perf.perf["total"] >= perf.perf["wait"]);
    }

    #[tokio::test]
    async fn test_repeated_headers_are_kept_lowercased() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("Set-Cookie", "a=1")
                    .append_header("X-Trace-Id", "t1")
                    .append_header("Set-Cookie", "b=2"),
            )
            .mount(&server)
            .await;

        let exchange = ReqwestTransport::default()
            .send(&request(server.uri()))
            .await
            .unwrap();
        let headers = &exchange.response.headers;

        let cookies: Vec<&str> = headers
            .iter()
            .filter(|(name, _)| name == "set-cookie")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert!(headers.iter().any(|(name, value)| name == "x-trace-id" && value == "t1"));
        assert!(headers.iter().all(|(name, _)| *name == name.to_lowercase()));
    }

    #[tokio::test]
    async fn test_send_posts_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-token", "abc"))
            .and(body_string("payload"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let spec = RequestSpec {
            method: "POST".to_string(),
            headers: vec![("X-Token".to_string(), "abc".to_string())],
            body: Some(b"payload".to_vec()),
            ..request(server.uri())
        };
        let exchange = ReqwestTransport::default().send(&spec).await.unwrap();
        assert_eq!(exchange.response.status, 201);
        assert_eq!(exchange.perf.unwrap().counters["bytes_sent"], 7);
    }

    #[tokio::test]
    async fn test_redirects_not_followed_by_default() {
        let server = MockServer::start().await;
        Mock::given(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::default();
        let spec = request(format!("{}/old", server.uri()));

        let exchange = transport.send(&spec).await.unwrap();
        assert_eq!(exchange.response.status, 302);

        let followed = RequestSpec {
            follow_redirects: true,
            ..spec
        };
        let exchange = transport.send(&followed).await.unwrap();
        assert_eq!(exchange.response.status, 200);
    }

    #[tokio::test]
    async fn test_invalid_header_name_is_reported() {
        let spec = RequestSpec {
            headers: vec![("Bad Header".to_string(), "x".to_string())],
            ..request("http://127.0.0.1:9/".to_string())
        };
        let err = ReqwestTransport::default().send(&spec).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::InvalidHeader);
        assert!(err.message.contains("Bad Header"));
    }

    #[tokio::test]
    async fn test_unparsable_resolved_url() {
        let err = ReqwestTransport::default()
            .send(&request("http://".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Builder);
        assert!(err.message.starts_with("Invalid URL 'http://'"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_transport_error() {
        // Port 9 (discard) is closed on test machines
        let err = ReqwestTransport::default()
            .send(&request("http://127.0.0.1:9/".to_string()))
            .await
            .unwrap_err();
        assert!(!err.message.is_empty());
    }
}
