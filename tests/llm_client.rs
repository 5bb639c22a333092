//! The chat client against a local mock of an OpenAI-compatible server.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sales_agent::llm::{ChatMessage, ChatModel, ChatRequest, LlmError, OpenAiChatClient};

#[derive(Clone, Copy)]
enum Behavior {
    Reply,
    RateLimited,
    Slow,
    Garbage,
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn chat_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().unwrap().push((auth, body));

    match state.behavior {
        Behavior::Reply => (
            StatusCode::OK,
            json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Widget had the highest revenue." },
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        ),
        Behavior::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            "rate limit exceeded".to_string(),
        ),
        Behavior::Slow => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, "{}".to_string())
        }
        Behavior::Garbage => (StatusCode::OK, "not json".to_string()),
    }
}

async fn start_mock(behavior: Behavior) -> (SocketAddr, MockState) {
    let state = MockState {
        behavior,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn client(addr: SocketAddr, timeout_secs: u64) -> OpenAiChatClient {
    OpenAiChatClient::new(
        &format!("http://{}/v1/", addr),
        "test-key".to_string(),
        "llama-test".to_string(),
        timeout_secs,
    )
    .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest {
        messages: vec![ChatMessage::user("Which product sold best?")],
        temperature: 0.0,
        max_tokens: 256,
    }
}

#[tokio::test]
async fn sends_auth_and_parameters_and_returns_content() {
    let (addr, state) = start_mock(Behavior::Reply).await;

    let text = client(addr, 5).complete(&request()).await.unwrap();
    assert_eq!(text, "Widget had the highest revenue.");

    let seen = state.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "llama-test");
    assert_eq!(body["temperature"], 0.0);
    assert_eq!(body["max_tokens"], 256);
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "Which product sold best?");
}

#[tokio::test]
async fn error_status_maps_to_api_error_without_retry() {
    let (addr, state) = start_mock(Behavior::RateLimited).await;

    let err = client(addr, 5).complete(&request()).await.unwrap_err();
    match err {
        LlmError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limit exceeded");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    assert_eq!(state.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn slow_server_maps_to_timeout() {
    let (addr, _state) = start_mock(Behavior::Slow).await;

    let err = client(addr, 1).complete(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::Timeout(1)), "got {:?}", err);
}

#[tokio::test]
async fn non_json_body_maps_to_invalid_response() {
    let (addr, _state) = start_mock(Behavior::Garbage).await;

    let err = client(addr, 5).complete(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn unreachable_server_maps_to_transport() {
    // Bind and drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, 5).complete(&request()).await.unwrap_err();
    assert!(matches!(err, LlmError::Transport(_)), "got {:?}", err);
}
