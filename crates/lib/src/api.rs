//! HTTP client for the planning server (register, login, chat).
//!
//! Errors are typed: transport failures, endpoint errors carrying the
//! server's detail string, and responses missing an expected field. Callers
//! match on the variant instead of inspecting raw status codes.

use crate::protocol::{
    AuthRequest, ChatTurnRequest, ChatTurnResponse, ErrorDetail, LoginResponse,
};

/// Client for the planning server HTTP API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Non-2xx response; `detail` is the server's detail string when the body
    /// had one, otherwise the raw body or a generic status message.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    #[error("response missing field: {0}")]
    MissingField(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turn a non-2xx response into ApiError::Api, preferring the body's detail field.
async fn error_from_response(res: reqwest::Response) -> ApiError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorDetail>(&body)
        .map(|d| d.detail)
        .unwrap_or_else(|_| {
            let t = body.trim();
            if t.is_empty() {
                format!("server returned status {}", status)
            } else {
                t.to_string()
            }
        });
    ApiError::Api { status, detail }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /register — create an account. 2xx means registered.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let url = format!("{}/register", self.base_url);
        let body = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await);
        }
        Ok(())
    }

    /// POST /login — verify credentials; returns the opaque access token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let url = format!("{}/login", self.base_url);
        let body = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await);
        }
        let data: LoginResponse = res.json().await?;
        if data.access_token.trim().is_empty() {
            return Err(ApiError::MissingField("access_token"));
        }
        Ok(data.access_token)
    }

    /// POST /chat — run one planning turn; returns the reply text.
    pub async fn chat(&self, message: &str, conversation_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/chat", self.base_url);
        let body = ChatTurnRequest {
            message: message.to_string(),
            conversation_id: conversation_id.to_string(),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await);
        }
        let data: ChatTurnResponse = res.json().await?;
        Ok(data.response)
    }
}
