//! Issue, verify and revoke API tokens.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::claims::ScopedClaims;
use crate::cluster::ClusterTokenGenerator;
use crate::error::AuthError;
use crate::generator::TokenGenerator;
use crate::store::{StoredToken, TokenStore};

/// Token type of tokens issued to users.
pub const USER_TOKEN_TYPE: &str = "user";

/// Parameters of a new token.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    pub subject: String,
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub text: String,
    /// Persist the signed JWT so it can be handed out again.
    pub keep_value: bool,
}

impl TokenRequest {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub const fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub const fn keep_value(mut self) -> Self {
        self.keep_value = true;
        self
    }
}

/// A freshly issued token. `token` is the only copy unless the request kept it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub id: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Service object tying token signing to the token store.
#[derive(Clone)]
pub struct TokenManager {
    generator: Arc<TokenGenerator>,
    store: Arc<dyn TokenStore>,
}

impl TokenManager {
    #[must_use]
    pub fn new(generator: TokenGenerator, store: Arc<dyn TokenStore>) -> Self {
        Self {
            generator: Arc::new(generator),
            store,
        }
    }

    #[must_use]
    pub fn generator(&self) -> &TokenGenerator {
        &self.generator
    }

    /// Generator for per-cluster tokens sharing this manager's key and store.
    #[must_use]
    pub fn cluster_tokens(&self) -> ClusterTokenGenerator {
        ClusterTokenGenerator::new(Arc::clone(&self.generator), Arc::clone(&self.store))
    }

    /// Sign a token and record it in the store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if signing fails or the store rejects the write.
    pub async fn issue(&self, request: TokenRequest) -> Result<IssuedToken, AuthError> {
        let (id, token) = self.generator.generate_token(
            &request.subject,
            request.expires_at,
            USER_TOKEN_TYPE,
            &request.text,
        )?;

        let mut stored = StoredToken::new(&id, self.generator.now());
        stored.name = request.name;
        stored.expires_at = request.expires_at;
        if request.keep_value {
            stored.value = Some(token.clone());
        }
        self.store.store(&request.subject, stored).await?;

        tracing::debug!(subject = %request.subject, id = %id, "issued token");
        Ok(IssuedToken {
            id,
            token,
            expires_at: request.expires_at,
        })
    }

    /// Check signature and claims, then require the token to still be stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenRevoked` if the signature is valid but the
    /// token is no longer in the store, or the decoding error otherwise.
    pub async fn verify(&self, token: &str) -> Result<ScopedClaims, AuthError> {
        let claims = self.generator.decode(token)?;
        if !self.store.exists(&claims.sub, &claims.jti).await? {
            return Err(AuthError::TokenRevoked {
                subject: claims.sub,
                id: claims.jti,
            });
        }
        Ok(claims)
    }

    /// # Errors
    ///
    /// Returns `AuthError` if the store cannot delete the token.
    pub async fn revoke(&self, subject: &str, id: &str) -> Result<(), AuthError> {
        self.store.revoke(subject, id).await?;
        tracing::debug!(subject, id, "revoked token");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthError` if the store cannot be listed.
    pub async fn list(&self, subject: &str) -> Result<Vec<StoredToken>, AuthError> {
        self.store.list(subject).await
    }

    /// Remove expired tokens from the store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the store cannot be scanned.
    pub async fn gc(&self) -> Result<usize, AuthError> {
        self.store.gc(self.generator.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryTokenStore;
    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn manager() -> TokenManager {
        let generator = TokenGenerator::new("issuer", "audience", "signingKey")
            .with_clock(FixedClock(now()));
        TokenManager::new(generator, Arc::new(MemoryTokenStore::new()))
    }

    #[tokio::test]
    async fn issued_token_verifies_until_revoked() {
        let manager = manager();
        let issued = manager
            .issue(TokenRequest::new("alice").named("ci"))
            .await
            .unwrap();

        let claims = manager.verify(&issued.token).await.unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.jti, issued.id);
        assert_eq!(claims.token_type, USER_TOKEN_TYPE);

        manager.revoke("alice", &issued.id).await.unwrap();
        assert!(matches!(
            manager.verify(&issued.token).await,
            Err(AuthError::TokenRevoked { .. })
        ));
    }

    #[tokio::test]
    async fn value_is_kept_only_on_request() {
        let manager = manager();
        manager.issue(TokenRequest::new("bob")).await.unwrap();
        manager
            .issue(TokenRequest::new("bob").keep_value())
            .await
            .unwrap();

        let tokens = manager.list("bob").await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.iter().filter(|t| t.value.is_some()).count(), 1);
    }

    #[tokio::test]
    async fn tampered_token_is_invalid() {
        let manager = manager();
        let issued = manager.issue(TokenRequest::new("carol")).await.unwrap();
        let tampered = format!("{}x", issued.token);
        assert!(matches!(
            manager.verify(&tampered).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn gc_removes_expired_tokens() {
        let manager = manager();
        manager
            .issue(TokenRequest::new("dave").expiring_at(now() - TimeDelta::seconds(1)))
            .await
            .unwrap();
        manager
            .issue(TokenRequest::new("dave").expiring_at(now() + TimeDelta::hours(1)))
            .await
            .unwrap();

        assert_eq!(manager.gc().await.unwrap(), 1);
        assert_eq!(manager.list("dave").await.unwrap().len(), 1);
    }
}
