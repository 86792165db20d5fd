//! User accounts for the planning server.
//!
//! Usernames map to salted SHA-256 password hashes. The whole store is
//! persisted as pretty JSON next to the config file (e.g.
//! `~/.goalplan/users.json`) and loaded once at startup.

use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One stored account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub salt: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Username already registered")]
    AlreadyRegistered,
    #[error("storing account: {0}")]
    Store(#[from] anyhow::Error),
}

fn hash_password(password: &str, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

fn generate_salt() -> Result<Vec<u8>> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|e| anyhow::anyhow!("getrandom: {}", e))?;
    Ok(bytes.to_vec())
}

/// File-backed account store (register, verify).
pub struct UserStore {
    path: PathBuf,
    inner: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl UserStore {
    /// Load from a JSON file; a missing file means an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users = if path.exists() {
            let s = std::fs::read_to_string(&path)
                .with_context(|| format!("reading users from {}", path.display()))?;
            serde_json::from_str(&s)
                .with_context(|| format!("parsing users from {}", path.display()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(users)),
        })
    }

    /// Create an account; rejects duplicate usernames. The store file is
    /// rewritten after every successful registration.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), RegisterError> {
        let mut g = self.inner.write().await;
        if g.contains_key(username) {
            return Err(RegisterError::AlreadyRegistered);
        }
        let salt = generate_salt().map_err(RegisterError::Store)?;
        let record = UserRecord {
            username: username.to_string(),
            password_hash: hash_password(password, &salt),
            salt: base64::engine::general_purpose::STANDARD.encode(&salt),
        };
        g.insert(username.to_string(), record);
        self.persist(&g).map_err(RegisterError::Store)?;
        Ok(())
    }

    /// True iff the account exists and the password matches.
    pub async fn verify(&self, username: &str, password: &str) -> bool {
        let g = self.inner.read().await;
        let Some(record) = g.get(username) else {
            return false;
        };
        let Ok(salt) = base64::engine::general_purpose::STANDARD.decode(&record.salt) else {
            return false;
        };
        hash_password(password, &salt) == record.password_hash
    }

    fn persist(&self, users: &HashMap<String, UserRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let s = serde_json::to_string_pretty(users).context("serializing users")?;
        std::fs::write(&self.path, s)
            .with_context(|| format!("writing users to {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_users_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("goalplan-users-test-{}", uuid::Uuid::new_v4()))
            .join("users.json")
    }

    #[tokio::test]
    async fn register_and_verify() {
        let store = UserStore::load(temp_users_path()).expect("load");
        store.register("alice", "s3cret").await.expect("register");
        assert!(store.verify("alice", "s3cret").await);
        assert!(!store.verify("alice", "wrong").await);
        assert!(!store.verify("bob", "s3cret").await);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = UserStore::load(temp_users_path()).expect("load");
        store.register("alice", "one").await.expect("register");
        let err = store.register("alice", "two").await.unwrap_err();
        assert!(matches!(err, RegisterError::AlreadyRegistered));
        // The original password still verifies.
        assert!(store.verify("alice", "one").await);
    }

    #[tokio::test]
    async fn accounts_survive_a_reload() {
        let path = temp_users_path();
        {
            let store = UserStore::load(path.clone()).expect("load");
            store.register("alice", "s3cret").await.expect("register");
        }
        let store = UserStore::load(path).expect("reload");
        assert!(store.verify("alice", "s3cret").await);
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        let a = hash_password("pw", b"salt-a");
        let b = hash_password("pw", b"salt-b");
        assert_ne!(a, b);
    }
}
