//! Integration tests for the account and chat endpoints: register/login flows
//! against a real server, and chat turns against a stub upstream model.

use lib::api::{ApiClient, ApiError};
use lib::config::Config;
use lib::conversation::{Conversation, FALLBACK_NOTICE};
use lib::server;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn temp_config_dir() -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("goalplan-flow-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let config_path = dir.join("config.json");
    std::fs::File::create(&config_path)
        .and_then(|mut f| f.write_all(b"{}"))
        .expect("write config.json");
    (dir, config_path)
}

/// Spawn the planning server and wait until the health endpoint answers.
async fn start_server(config: Config, config_path: PathBuf) -> ApiClient {
    let port = config.server.port;
    tokio::spawn(async move {
        let _ = server::run_server(config, config_path).await;
    });
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/", port);
    for _ in 0..100 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return ApiClient::new(format!("http://127.0.0.1:{}", port));
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("planning server did not become healthy on port {}", port);
}

/// Stub OpenAI-compatible upstream: answers every chat completion with a
/// fixed plan and records the request bodies it saw.
async fn start_stub_model(seen: Arc<Mutex<Vec<serde_json::Value>>>) -> u16 {
    let app = axum::Router::new().route(
        "/v1/chat/completions",
        axum::routing::post(move |axum::Json(body): axum::Json<serde_json::Value>| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(body);
                axum::Json(serde_json::json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "- step one\n- step two" } }
                    ]
                }))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub upstream");
    let port = listener.local_addr().expect("local_addr").port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    port
}

fn roles_of(request: &serde_json::Value) -> Vec<String> {
    request
        .get("messages")
        .and_then(|m| m.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m.get("role").and_then(|r| r.as_str()).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn register_login_round_trip_and_failures() {
    let (_temp_dir, config_path) = temp_config_dir();
    let mut config = Config::default();
    config.server.port = free_port();
    let api = start_server(config, config_path).await;

    api.register("alice", "s3cret").await.expect("register");

    let err = api.register("alice", "other").await.unwrap_err();
    match err {
        ApiError::Api { status, detail } => {
            assert_eq!(status, 400);
            assert_eq!(detail, "Username already registered");
        }
        other => panic!("expected Api error, got {:?}", other),
    }

    let token = api.login("alice", "s3cret").await.expect("login");
    assert!(!token.is_empty());

    let err = api.login("alice", "wrong").await.unwrap_err();
    match err {
        ApiError::Api { status, detail } => {
            assert_eq!(status, 401);
            assert_eq!(detail, "Account not found or invalid credentials");
        }
        other => panic!("expected Api error, got {:?}", other),
    }

    // Blank fields are rejected before touching the store.
    let err = api.register("  ", "pw").await.unwrap_err();
    match err {
        ApiError::Api { status, .. } => assert_eq!(status, 400),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn chat_turns_accumulate_history_behind_one_system_prompt() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let stub_port = start_stub_model(seen.clone()).await;

    let (_temp_dir, config_path) = temp_config_dir();
    let mut config = Config::default();
    config.server.port = free_port();
    config.planner.base_url = Some(format!("http://127.0.0.1:{}/v1", stub_port));
    let api = start_server(config, config_path).await;

    let reply = api.chat("Plan a trip", "conv-test").await.expect("chat");
    assert_eq!(reply, "- step one\n- step two");
    api.chat("Make it cheaper", "conv-test").await.expect("chat");

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(roles_of(&requests[0]), ["system", "user"]);
    assert_eq!(
        roles_of(&requests[1]),
        ["system", "user", "assistant", "user"]
    );
    assert_eq!(
        requests[0].get("model").and_then(|m| m.as_str()),
        Some("llama3.2:latest")
    );
}

#[tokio::test]
async fn unreachable_upstream_becomes_detail_then_fallback_notice() {
    let (_temp_dir, config_path) = temp_config_dir();
    let mut config = Config::default();
    config.server.port = free_port();
    // Nothing listens on this port, so every turn fails upstream.
    config.planner.base_url = Some(format!("http://127.0.0.1:{}/v1", free_port()));
    let api = start_server(config, config_path).await;

    let err = api.chat("Plan a trip", "conv-err").await.unwrap_err();
    match &err {
        ApiError::Api { status, detail } => {
            assert_eq!(*status, 502);
            assert_eq!(detail, "AI response failed");
        }
        other => panic!("expected Api error, got {:?}", other),
    }

    // The conversation controller renders that failure as the fixed notice.
    let mut conversation = Conversation::new();
    conversation.submit("Plan a trip").expect("accepted");
    conversation.resolve(Err(err));
    assert_eq!(
        conversation.messages().last().map(|m| m.content.as_str()),
        Some(FALLBACK_NOTICE)
    );
    assert!(!conversation.pending());

    // Blank chat input is rejected by the server before the upstream call.
    let err = api.chat("   ", "conv-err").await.unwrap_err();
    match err {
        ApiError::Api { status, .. } => assert_eq!(status, 400),
        other => panic!("expected Api error, got {:?}", other),
    }
}
