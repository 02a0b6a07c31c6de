//! HS256 token signing and verification.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use warden_config::{AuthConfig, MIN_SIGNING_KEY_LEN};

use crate::claims::{API_INVOKE_SCOPE, ScopedClaims};
use crate::clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::error::AuthError;

/// Expiry value for tokens that never expire.
pub const NO_EXPIRATION: Option<DateTime<Utc>> = None;

/// Builds and signs scoped JWTs.
pub struct TokenGenerator {
    issuer: String,
    audience: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl fmt::Debug for TokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGenerator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenGenerator {
    /// Create a generator using wall-clock time and random token IDs.
    ///
    /// The key length is not checked here; use [`TokenGenerator::from_config`]
    /// for keys coming from configuration.
    #[must_use]
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>, signing_key: &str) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
        }
    }

    /// Create a generator from the `auth` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSigningKey` if the key is missing or shorter
    /// than [`MIN_SIGNING_KEY_LEN`] characters.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let length = config.signing_key.chars().count();
        if length < MIN_SIGNING_KEY_LEN {
            return Err(AuthError::InvalidSigningKey(format!(
                "must be at least {MIN_SIGNING_KEY_LEN} characters, got {length}"
            )));
        }
        Ok(Self::new(
            &config.issuer,
            &config.audience,
            &config.signing_key,
        ))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[must_use]
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Current time of the generator's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sign a new token for `subject` and return its ID together with the JWT.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the claims cannot be encoded.
    pub fn generate_token(
        &self,
        subject: &str,
        expires_at: Option<DateTime<Utc>>,
        token_type: &str,
        text: &str,
    ) -> Result<(String, String), AuthError> {
        let id = self.ids.generate();
        let claims = ScopedClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: self.clock.now().timestamp(),
            exp: expires_at.map_or(0, |at| at.timestamp()),
            sub: subject.to_string(),
            jti: id.clone(),
            scope: API_INVOKE_SCOPE.to_string(),
            token_type: token_type.to_string(),
            text: text.to_string(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(AuthError::Signing)?;
        Ok((id, token))
    }

    /// Verify signature, issuer and audience of `token` and return its claims.
    ///
    /// `exp == 0` is accepted as non-expiring; any other expiry is checked
    /// against the generator's clock.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad signature or mismatched
    /// issuer/audience, `AuthError::TokenExpired` when past expiry.
    pub fn decode(&self, token: &str) -> Result<ScopedClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        let data = jsonwebtoken::decode::<ScopedClaims>(token, &self.decoding_key, &validation)
            .map_err(AuthError::InvalidToken)?;
        if data.claims.is_expired_at(self.clock.now()) {
            return Err(AuthError::TokenExpired);
        }
        Ok(data.claims)
    }
}
