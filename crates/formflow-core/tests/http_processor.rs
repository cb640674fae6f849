//! HTTP step processor against a one-shot local server.
//!
//! Each test binds a listener on an ephemeral port, answers exactly one
//! request with a canned response and hands back the raw request text.

use serde_json::{json, Map};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use formflow_core::processor::{ExecuteRequest, ProcessorResponse, SubmitRequest};
use formflow_core::{FlowError, HttpStepProcessor, ProcessorConfig, StepProcessor};

async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{}/api/execute-button", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn processor(endpoint: String, api_key: Option<&str>) -> HttpStepProcessor {
    HttpStepProcessor::new(ProcessorConfig {
        endpoint,
        timeout_secs: 10,
        api_key: api_key.map(str::to_string),
    })
}

fn submit() -> ExecuteRequest {
    let mut params = Map::new();
    params.insert("email".to_string(), json!("ada@example.com"));
    ExecuteRequest::Submit(SubmitRequest {
        button_id: "btn-7".to_string(),
        execute_parameters: params,
        user_id: "user-1".to_string(),
        current_group_node_id: Some("node-a".to_string()),
        existing_context_data: None,
    })
}

#[tokio::test]
async fn test_success_body_is_parsed_and_token_sent() {
    let (endpoint, server) = serve_once("200 OK", r#"{"nextGroupNode": {"groupId": "B"}, "contextData": {"x": 1}}"#).await;

    let response = processor(endpoint, Some("secret-token"))
        .process(&submit())
        .await
        .unwrap();
    match response {
        ProcessorResponse::Advance { next, context_data } => {
            assert_eq!(next.group_id.as_deref(), Some("B"));
            assert_eq!(context_data, Some(json!({"x": 1})));
        }
        other => panic!("unexpected {:?}", other),
    }

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/execute-button"));
    let lowered = request.to_ascii_lowercase();
    assert!(lowered.contains("authorization: bearer secret-token"));
    assert!(lowered.contains("content-type: application/json"));
    assert!(request.contains(r#""buttonId":"btn-7""#));
    assert!(request.contains(r#""currentGroupNodeId":"node-a""#));
    assert!(!request.contains("existingContextData"));
}

#[tokio::test]
async fn test_no_token_without_api_key() {
    let (endpoint, server) = serve_once("200 OK", r#"{"success": true}"#).await;

    let response = processor(endpoint, None).process(&submit()).await.unwrap();
    assert_eq!(response.kind(), "terminal");

    let request = server.await.unwrap();
    assert!(!request.to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn test_error_status_surfaces_json_error_field() {
    let (endpoint, server) = serve_once("500 Internal Server Error", r#"{"error": "boom"}"#).await;

    let err = processor(endpoint, None).process(&submit()).await.unwrap_err();
    match err {
        FlowError::Processor(message) => {
            assert!(message.contains("500"));
            assert!(message.ends_with(": boom"));
            assert!(!message.contains(r#"{"error""#));
        }
        other => panic!("unexpected {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_status_falls_back_to_raw_body() {
    let (endpoint, server) = serve_once("502 Bad Gateway", "upstream down").await;

    let err = processor(endpoint, None).process(&submit()).await.unwrap_err();
    match err {
        FlowError::Processor(message) => {
            assert!(message.contains("502"));
            assert!(message.contains("upstream down"));
        }
        other => panic!("unexpected {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_unparseable_success_body_is_a_serialization_error() {
    let (endpoint, server) = serve_once("200 OK", "<html>not json</html>").await;

    let err = processor(endpoint, None).process(&submit()).await.unwrap_err();
    assert!(matches!(err, FlowError::Serialization(_)));
    server.await.unwrap();
}
