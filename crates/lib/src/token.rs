//! Client-side session token slot.
//!
//! One opaque token string in a small file under the config directory:
//! written by login, read by the chat screen's session guard, removed by
//! logout. Components receive a TokenStore explicitly instead of reading
//! ambient global state.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Default path for the stored session token.
pub fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".goalplan").join("token"))
        .unwrap_or_else(|| PathBuf::from("token"))
}

/// Narrow read/write interface over the token slot.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (~/.goalplan/token).
    pub fn default_location() -> Self {
        Self::new(default_token_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token if present. An empty or whitespace-only file
    /// counts as absent.
    pub fn load(&self) -> Option<String> {
        let s = std::fs::read_to_string(&self.path).ok()?;
        let t = s.trim().to_string();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    }

    /// True iff a non-empty token is present. The chat screen requires this.
    pub fn is_authorized(&self) -> bool {
        self.load().is_some()
    }

    /// Persist the token (e.g. after login). Creates parent dirs if needed.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    /// Remove the stored token (logout). A missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> TokenStore {
        let dir = std::env::temp_dir().join(format!("goalplan-token-test-{}", uuid::Uuid::new_v4()));
        TokenStore::new(dir.join("token"))
    }

    #[test]
    fn absent_token_means_unauthorized() {
        let store = temp_store();
        assert_eq!(store.load(), None);
        assert!(!store.is_authorized());
    }

    #[test]
    fn save_load_clear_round_trip() {
        let store = temp_store();
        store.save("tok-123").expect("save");
        assert_eq!(store.load().as_deref(), Some("tok-123"));
        assert!(store.is_authorized());
        store.clear().expect("clear");
        assert!(!store.is_authorized());
        // Clearing again is fine.
        store.clear().expect("clear twice");
    }

    #[test]
    fn whitespace_only_file_counts_as_absent() {
        let store = temp_store();
        store.save("   \n").expect("save");
        assert_eq!(store.load(), None);
        assert!(!store.is_authorized());
    }
}
