//! Non-expiring tokens for virtual cluster identities.

use std::sync::Arc;

use warden_core::Principal;

use crate::error::AuthError;
use crate::generator::{NO_EXPIRATION, TokenGenerator};
use crate::store::{StoredToken, TokenStore};

/// Token type of tokens issued to clusters.
pub const CLUSTER_TOKEN_TYPE: &str = "cluster";

/// Issues at most one live token per cluster.
#[derive(Clone)]
pub struct ClusterTokenGenerator {
    generator: Arc<TokenGenerator>,
    store: Arc<dyn TokenStore>,
}

impl ClusterTokenGenerator {
    #[must_use]
    pub fn new(generator: Arc<TokenGenerator>, store: Arc<dyn TokenStore>) -> Self {
        Self { generator, store }
    }

    /// Return the cluster's existing token, or issue and store a new one.
    ///
    /// A stored token is reused when it still carries its value and has no
    /// expiry. New tokens never expire and are stored with their value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the store cannot be read or written, or signing fails.
    pub async fn generate_cluster_token(
        &self,
        organization_id: u64,
        cluster_id: &str,
    ) -> Result<(String, String), AuthError> {
        let subject = Principal::cluster(organization_id, cluster_id).subject();

        let existing = self.store.list(&subject).await?;
        if let Some(token) = existing.into_iter().find(StoredToken::is_reusable)
            && let Some(value) = token.value
        {
            tracing::debug!(subject = %subject, id = %token.id, "reusing cluster token");
            return Ok((token.id, value));
        }

        let (id, value) =
            self.generator
                .generate_token(&subject, NO_EXPIRATION, CLUSTER_TOKEN_TYPE, "")?;
        let mut stored = StoredToken::new(&id, self.generator.now());
        stored.name = subject.clone();
        stored.value = Some(value.clone());
        self.store.store(&subject, stored).await?;

        tracing::debug!(subject = %subject, id = %id, "issued cluster token");
        Ok((id, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn cluster_tokens(store: Arc<MemoryTokenStore>) -> ClusterTokenGenerator {
        let generator = TokenGenerator::new("issuer", "audience", "signingKey");
        ClusterTokenGenerator::new(Arc::new(generator), store)
    }

    #[tokio::test]
    async fn second_call_reuses_token() {
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = cluster_tokens(store.clone());

        let first = tokens.generate_cluster_token(1, "c1").await.unwrap();
        let second = tokens.generate_cluster_token(1, "c1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list("clusters/1/c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clusters_get_distinct_tokens() {
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = cluster_tokens(store);

        let a = tokens.generate_cluster_token(1, "a").await.unwrap();
        let b = tokens.generate_cluster_token(1, "b").await.unwrap();
        assert_ne!(a.0, b.0);
    }

    #[tokio::test]
    async fn token_without_value_is_not_reused() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .store("clusters/2/c", StoredToken::new("stale", Utc::now()))
            .await
            .unwrap();
        let tokens = cluster_tokens(store.clone());

        let (id, _) = tokens.generate_cluster_token(2, "c").await.unwrap();
        assert_ne!(id, "stale");
        assert_eq!(store.list("clusters/2/c").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn issued_token_is_non_expiring_cluster_token() {
        let store = Arc::new(MemoryTokenStore::new());
        let generator = Arc::new(TokenGenerator::new("issuer", "audience", "signingKey"));
        let tokens = ClusterTokenGenerator::new(Arc::clone(&generator), store);

        let (id, jwt) = tokens.generate_cluster_token(7, "prod").await.unwrap();
        let claims = generator.decode(&jwt).unwrap();
        assert_eq!(claims.sub, "clusters/7/prod");
        assert_eq!(claims.jti, id);
        assert_eq!(claims.exp, 0);
        assert_eq!(claims.token_type, CLUSTER_TOKEN_TYPE);
    }
}
