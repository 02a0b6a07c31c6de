//! Persistence of issued token identifiers.
//!
//! A token is only valid while its identifier is present in a [`TokenStore`];
//! revoking deletes the entry and makes the JWT useless despite its signature.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use warden_secrets::{SecretBackend, SecretData};

use crate::error::AuthError;

/// A persisted token record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// The signed JWT, kept only for tokens that must be handed out again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StoredToken {
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            value: None,
            expires_at: None,
            created_at,
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the stored JWT can be handed out again as-is.
    #[must_use]
    pub fn is_reusable(&self) -> bool {
        self.expires_at.is_none() && self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn store(&self, subject: &str, token: StoredToken) -> Result<(), AuthError>;

    async fn lookup(&self, subject: &str, id: &str) -> Result<Option<StoredToken>, AuthError>;

    async fn exists(&self, subject: &str, id: &str) -> Result<bool, AuthError> {
        Ok(self.lookup(subject, id).await?.is_some())
    }

    /// Remove a token. Revoking an unknown token is not an error.
    async fn revoke(&self, subject: &str, id: &str) -> Result<(), AuthError>;

    /// All tokens of `subject`, oldest first.
    async fn list(&self, subject: &str) -> Result<Vec<StoredToken>, AuthError>;

    /// Drop every token expired at `now`, returning how many were removed.
    async fn gc(&self, now: DateTime<Utc>) -> Result<usize, AuthError>;
}

fn sort_tokens(tokens: &mut [StoredToken]) {
    tokens.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// --- In-memory store ---

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, HashMap<String, StoredToken>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn store(&self, subject: &str, token: StoredToken) -> Result<(), AuthError> {
        self.tokens
            .write()
            .await
            .entry(subject.to_string())
            .or_default()
            .insert(token.id.clone(), token);
        Ok(())
    }

    async fn lookup(&self, subject: &str, id: &str) -> Result<Option<StoredToken>, AuthError> {
        Ok(self
            .tokens
            .read()
            .await
            .get(subject)
            .and_then(|tokens| tokens.get(id))
            .cloned())
    }

    async fn revoke(&self, subject: &str, id: &str) -> Result<(), AuthError> {
        let mut tokens = self.tokens.write().await;
        if let Some(subject_tokens) = tokens.get_mut(subject) {
            subject_tokens.remove(id);
            if subject_tokens.is_empty() {
                tokens.remove(subject);
            }
        }
        Ok(())
    }

    async fn list(&self, subject: &str) -> Result<Vec<StoredToken>, AuthError> {
        let mut tokens: Vec<StoredToken> = self
            .tokens
            .read()
            .await
            .get(subject)
            .map(|tokens| tokens.values().cloned().collect())
            .unwrap_or_default();
        sort_tokens(&mut tokens);
        Ok(tokens)
    }

    async fn gc(&self, now: DateTime<Utc>) -> Result<usize, AuthError> {
        let mut tokens = self.tokens.write().await;
        let mut removed = 0;
        for subject_tokens in tokens.values_mut() {
            let before = subject_tokens.len();
            subject_tokens.retain(|_, token| !token.is_expired_at(now));
            removed += before - subject_tokens.len();
        }
        tokens.retain(|_, subject_tokens| !subject_tokens.is_empty());
        Ok(removed)
    }
}

// --- Secret backend store ---

/// Token store keeping one secret per token at `{prefix}/{subject}/{id}`.
pub struct BackendTokenStore {
    backend: Arc<dyn SecretBackend>,
    prefix: String,
}

impl BackendTokenStore {
    #[must_use]
    pub fn new(backend: Arc<dyn SecretBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    fn subject_path(&self, subject: &str) -> String {
        format!("{}/{}", self.prefix, subject.trim_matches('/'))
    }

    fn token_path(&self, subject: &str, id: &str) -> String {
        format!("{}/{id}", self.subject_path(subject))
    }

    async fn read_token(&self, path: &str) -> Result<Option<StoredToken>, AuthError> {
        let Some(data) = self.backend.read(path).await? else {
            return Ok(None);
        };
        serde_json::from_value(serde_json::Value::Object(data))
            .map(Some)
            .map_err(|source| AuthError::MalformedStoredToken {
                path: path.to_string(),
                source,
            })
    }

    /// Collect every token path below `path`, descending into sub-trees.
    async fn walk(&self, path: String) -> Result<Vec<String>, AuthError> {
        let mut pending = vec![path];
        let mut leaves = Vec::new();
        while let Some(dir) = pending.pop() {
            for key in self.backend.list(&dir).await? {
                match key.strip_suffix('/') {
                    Some(child) => pending.push(format!("{dir}/{child}")),
                    None => leaves.push(format!("{dir}/{key}")),
                }
            }
        }
        Ok(leaves)
    }
}

#[async_trait]
impl TokenStore for BackendTokenStore {
    async fn store(&self, subject: &str, token: StoredToken) -> Result<(), AuthError> {
        let path = self.token_path(subject, &token.id);
        let data = match serde_json::to_value(&token) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => SecretData::new(),
            Err(source) => return Err(AuthError::MalformedStoredToken { path, source }),
        };
        self.backend.write(&path, data).await?;
        Ok(())
    }

    async fn lookup(&self, subject: &str, id: &str) -> Result<Option<StoredToken>, AuthError> {
        self.read_token(&self.token_path(subject, id)).await
    }

    async fn revoke(&self, subject: &str, id: &str) -> Result<(), AuthError> {
        self.backend.delete(&self.token_path(subject, id)).await?;
        Ok(())
    }

    async fn list(&self, subject: &str) -> Result<Vec<StoredToken>, AuthError> {
        let dir = self.subject_path(subject);
        let mut tokens = Vec::new();
        for key in self.backend.list(&dir).await? {
            // Sub-trees belong to longer subjects sharing this prefix.
            if key.ends_with('/') {
                continue;
            }
            let path = format!("{dir}/{key}");
            if let Some(token) = self.read_token(&path).await? {
                tokens.push(token);
            }
        }
        sort_tokens(&mut tokens);
        Ok(tokens)
    }

    async fn gc(&self, now: DateTime<Utc>) -> Result<usize, AuthError> {
        let mut removed = 0;
        for path in self.walk(self.prefix.clone()).await? {
            match self.read_token(&path).await {
                Ok(Some(token)) if token.is_expired_at(now) => {
                    self.backend.delete(&path).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(%error, path = %path, "skipping unreadable token"),
            }
        }
        Ok(removed)
    }
}
