//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.goalplan/config.json`) and environment.
//! Covers the planning server bind/port, the client's server URL, and the upstream model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Planning server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Client settings (desktop and CLI).
    #[serde(default)]
    pub client: ClientConfig,

    /// Upstream model settings (OpenAI-compatible chat completions).
    #[serde(default)]
    pub planner: PlannerConfig,
}

/// Planning server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// HTTP port (default 8000).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"). Non-loopback binds are refused.
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    8000
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// Client-side settings shared by the desktop app and the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the planning server. When unset, derived from the server bind and port.
    pub server_url: Option<String>,
}

/// Upstream model settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    /// OpenAI-compatible base URL including the /v1 segment (default http://127.0.0.1:11434/v1,
    /// Ollama's OpenAI-compatible surface). Overridden by GOALPLAN_MODEL_BASE_URL env.
    pub base_url: Option<String>,

    /// Model id passed to the upstream as-is (e.g. "llama3.2:latest").
    pub model: Option<String>,

    /// Override for the planner system prompt seeded into every conversation.
    pub system_prompt: Option<String>,
}

/// Resolve the planning server URL for clients: GOALPLAN_SERVER_URL overrides
/// config.client.serverUrl; otherwise derived from the server bind and port.
pub fn resolve_server_url(config: &Config) -> String {
    std::env::var("GOALPLAN_SERVER_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .client
                .server_url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| {
            format!(
                "http://{}:{}",
                config.server.bind.trim(),
                config.server.port
            )
        })
}

/// Resolve the upstream model base URL: GOALPLAN_MODEL_BASE_URL overrides config.
/// None means the model client's built-in default.
pub fn resolve_model_base_url(config: &Config) -> Option<String> {
    std::env::var("GOALPLAN_MODEL_BASE_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .planner
                .base_url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("GOALPLAN_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".goalplan").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Path for the server's user store: `users.json` next to the config file.
pub fn users_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("users.json")
}

/// Load config from the default path (or GOALPLAN_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_port_and_bind() {
        let s = ServerConfig::default();
        assert_eq!(s.port, 8000);
        assert_eq!(s.bind, "127.0.0.1");
    }

    #[test]
    fn server_url_derived_from_server_config() {
        let config = Config::default();
        assert_eq!(resolve_server_url(&config), "http://127.0.0.1:8000");
    }

    #[test]
    fn server_url_prefers_client_override() {
        let mut config = Config::default();
        config.client.server_url = Some("http://10.0.0.5:9000".to_string());
        assert_eq!(resolve_server_url(&config), "http://10.0.0.5:9000");
    }

    #[test]
    fn blank_client_override_falls_back() {
        let mut config = Config::default();
        config.client.server_url = Some("   ".to_string());
        assert_eq!(resolve_server_url(&config), "http://127.0.0.1:8000");
    }

    #[test]
    fn users_path_next_to_config() {
        let path = Path::new("/home/user/.goalplan/config.json");
        assert_eq!(
            users_path(path),
            PathBuf::from("/home/user/.goalplan/users.json")
        );
    }

    #[test]
    fn loopback_binds() {
        assert!(is_loopback_bind("127.0.0.1"));
        assert!(is_loopback_bind(" localhost "));
        assert!(!is_loopback_bind("0.0.0.0"));
    }
}
