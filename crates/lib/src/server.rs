//! Planning server: HTTP endpoints for accounts, login, and chat turns.
//!
//! POST /register and /login manage accounts and hand out opaque bearer
//! tokens; POST /chat runs one planning turn against the upstream model.
//! GET / returns health JSON for probes. Loopback binds only.

use crate::config::{self, Config};
use crate::history::{HistoryStore, SYSTEM_PROMPT};
use crate::model::{ModelClient, DEFAULT_MODEL};
use crate::planner;
use crate::protocol::{
    AuthRequest, ChatTurnRequest, ChatTurnResponse, LoginResponse, RegisterResponse,
};
use crate::users::{RegisterError, UserStore};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state for the server (config, accounts, histories, model client).
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub users: Arc<UserStore>,
    pub history: Arc<HistoryStore>,
    pub model_client: ModelClient,
    /// Model id passed to the upstream as-is.
    pub model: String,
}

/// Resolve the model id from config. No prefix stripping — the id is passed
/// to the upstream unchanged.
fn resolve_model(config: &Config) -> String {
    config
        .planner
        .model
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_MODEL)
        .to_string()
}

fn error_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

/// Opaque login token: 32 random bytes, base64.
fn issue_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| anyhow::anyhow!("getrandom: {}", e))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Build the router for the given state. Split out so tests can serve it on
/// an ephemeral listener.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/chat", post(chat))
        .with_state(state)
}

/// Run the planning server until SIGINT/SIGTERM.
pub async fn run_server(config: Config, config_path: PathBuf) -> Result<()> {
    let bind = config.server.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) {
        anyhow::bail!(
            "refusing to bind the planning server to {} (loopback only)",
            bind
        );
    }

    let users = UserStore::load(config::users_path(&config_path))?;
    let system_prompt = config
        .planner
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(SYSTEM_PROMPT)
        .to_string();
    let model_base_url = config::resolve_model_base_url(&config);
    let state = ServerState {
        model_client: ModelClient::new(model_base_url),
        model: resolve_model(&config),
        users: Arc::new(users),
        history: Arc::new(HistoryStore::new(system_prompt)),
        config: Arc::new(config.clone()),
    };

    let app = router(state);
    let bind_addr = format!("{}:{}", bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("planning server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("planning server exited")?;
    log::info!("planning server stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// POST /register — create an account. 400 when a field is blank or the
/// username is taken.
async fn register(State(state): State<ServerState>, Json(req): Json<AuthRequest>) -> Response {
    let username = req.username.trim();
    let password = req.password.trim();
    if username.is_empty() || password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "username and password are required");
    }
    match state.users.register(username, password).await {
        Ok(()) => {
            log::info!("registered user {}", username);
            Json(RegisterResponse {
                message: "User registered successfully".to_string(),
            })
            .into_response()
        }
        Err(RegisterError::AlreadyRegistered) => {
            error_response(StatusCode::BAD_REQUEST, "Username already registered")
        }
        Err(RegisterError::Store(e)) => {
            log::error!("persisting account: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "could not store the account",
            )
        }
    }
}

/// POST /login — verify credentials and hand out an opaque bearer token.
async fn login(State(state): State<ServerState>, Json(req): Json<AuthRequest>) -> Response {
    let username = req.username.trim();
    let password = req.password.trim();
    if username.is_empty() || password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "username and password are required");
    }
    if !state.users.verify(username, password).await {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Account not found or invalid credentials",
        );
    }
    match issue_token() {
        Ok(token) => {
            log::info!("issued token for {}", username);
            Json(LoginResponse {
                access_token: token,
                token_type: "bearer".to_string(),
            })
            .into_response()
        }
        Err(e) => {
            log::error!("issuing token: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "could not issue a token")
        }
    }
}

/// POST /chat — run one planning turn. The endpoint is unauthenticated; the
/// login token only gates the client's chat screen.
async fn chat(State(state): State<ServerState>, Json(req): Json<ChatTurnRequest>) -> Response {
    let message = req.message.trim();
    let conversation_id = req.conversation_id.trim();
    if message.is_empty() || conversation_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "message and conversation_id are required",
        );
    }
    match planner::run_turn(
        &state.history,
        conversation_id,
        &state.model_client,
        &state.model,
        message,
    )
    .await
    {
        Ok(reply) => Json(ChatTurnResponse { response: reply }).into_response(),
        Err(e) => {
            log::warn!("planning turn failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, "AI response failed")
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.server.port,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_defaults_when_unset_or_blank() {
        let mut config = Config::default();
        assert_eq!(resolve_model(&config), DEFAULT_MODEL);
        config.planner.model = Some("  ".to_string());
        assert_eq!(resolve_model(&config), DEFAULT_MODEL);
        config.planner.model = Some("qwen3:8b".to_string());
        assert_eq!(resolve_model(&config), "qwen3:8b");
    }

    #[test]
    fn issued_tokens_are_distinct_and_non_empty() {
        let a = issue_token().expect("token");
        let b = issue_token().expect("token");
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
