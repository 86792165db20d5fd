//! Wire types shared by the planning server and its clients.
//!
//! Field names are the HTTP contract: login returns `access_token` and
//! `token_type`, chat returns `response`, and every error body carries a
//! human-readable `detail`.

use serde::{Deserialize, Serialize};

/// Body for POST /register and POST /login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

/// 200 body for POST /register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// 200 body for POST /login. The token is an opaque bearer credential;
/// clients store it as-is and never inspect it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Body for POST /chat. `conversation_id` is chosen by the client and kept
/// stable for the lifetime of one chat screen so the server can correlate turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
    pub conversation_id: String,
}

/// 200 body for POST /chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub response: String,
}

/// Error body for any non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}
