//! Tests for reading job descriptions and resolving their parameters.

mod helpers;

use helpers::{CapturedLog, MockTransport};
use serde_json::json;
use tempfile::TempDir;

use http_job_step::{run_input, run_job, JobDescriptor};

#[tokio::test]
async fn test_unparsable_job_yields_code_one_report() {
    let transport = MockTransport::responding(200, "OK", &[], "");
    for input in ["", "not json", "[1,2,3]", r#"{"params": "x"}"#] {
        let report = run_input(input, &transport).await.unwrap();
        assert_eq!(report.code, 1, "input {input:?}");
        assert!(
            report.description.starts_with("Invalid job description: "),
            "input {input:?}: {}",
            report.description
        );
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_step_params_override_job_metadata() {
    let transport = MockTransport::responding(200, "OK", &[], "");
    let job = JobDescriptor::from_value(json!({
        "id": "jabc123",
        "region": "eu",
        "params": {
            "url": "https://{region}.example.com/jobs/{id}",
            "region": "us"
        }
    }))
    .unwrap();

    run_job(&job, &transport, &mut CapturedLog::default().job_log())
        .await
        .unwrap();

    let request = transport.last_request().expect("request sent");
    assert_eq!(request.url, "https://us.example.com/jobs/jabc123");
}

#[tokio::test]
async fn test_request_fields_from_params() {
    let transport = MockTransport::responding(200, "OK", &[], "");
    let job = JobDescriptor::from_value(json!({
        "params": {
            "url": "https://example.com/hook",
            "method": "POST",
            "headers": "Accept: */*\nX-Dup: 1\nX-Dup: 2\nbroken line\n",
            "data": "ts=[now:YYYY]",
            "timeout": "30",
            "follow": "yes",
            "ssl_cert_bypass": 0
        }
    }))
    .unwrap();

    let log = CapturedLog::default();
    run_job(&job, &transport, &mut log.job_log()).await.unwrap();

    let request = transport.last_request().expect("request sent");
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.headers,
        vec![
            ("Accept".to_string(), "*/*".to_string()),
            ("X-Dup".to_string(), "1".to_string()),
            ("X-Dup".to_string(), "2".to_string()),
        ]
    );
    let body = String::from_utf8(request.body.expect("POST body")).unwrap();
    assert_eq!(body, format!("ts={}", chrono::Local::now().format("%Y")));
    assert_eq!(request.timeout, Some(std::time::Duration::from_secs(30)));
    assert!(request.follow_redirects);
    assert!(request.tls_verify);

    let text = log.text();
    assert!(text.contains("\nRequest Headers:\nAccept: */*\nX-Dup: 1\nX-Dup: 2\n"));
    assert!(text.contains("\nPOST Data:\nts="));
}

#[tokio::test]
async fn test_chain_flag_on_job_layer() {
    let transport = MockTransport::responding(
        200,
        "OK",
        &[("content-type", "text/json"), ("etag", "\"v1\"")],
        "[1, 2]",
    );
    let job = JobDescriptor::from_value(json!({
        "chain": true,
        "params": { "url": "http://example.com" }
    }))
    .unwrap();

    let report = run_job(&job, &transport, &mut CapturedLog::default().job_log())
        .await
        .unwrap();
    let chain = report.chain_data.expect("chained");
    assert_eq!(chain.headers["etag"], "\"v1\"");
    assert_eq!(chain.json, Some(json!([1, 2])));
}

#[tokio::test]
async fn test_unchained_job_has_no_chain_data() {
    let transport = MockTransport::responding(200, "OK", &[("content-type", "application/json")], "{}");
    let job = JobDescriptor::from_value(json!({
        "chain": "",
        "params": { "url": "http://example.com" }
    }))
    .unwrap();

    let report = run_job(&job, &transport, &mut CapturedLog::default().job_log())
        .await
        .unwrap();
    assert!(report.chain_data.is_none());
}

#[tokio::test]
async fn test_log_file_is_appended_not_truncated() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let log_path = dir.path().join("job.log");
    std::fs::write(&log_path, "earlier output\n").unwrap();

    let transport = MockTransport::responding(200, "OK", &[], "");
    let input = json!({
        "log_file": log_path,
        "params": { "url": "http://example.com" }
    })
    .to_string();
    let report = run_input(&input, &transport).await.unwrap();
    assert_eq!(report.code, 0);

    let text = std::fs::read_to_string(&log_path).unwrap();
    assert!(text.starts_with("earlier output\nSending HTTP GET to URL:\nhttp://example.com\n"));
}
