use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Scope granted to every issued token.
pub const API_INVOKE_SCOPE: &str = "api:invoke";

/// JWT claims of a Warden API token.
///
/// Field order is the serialized claim order and is part of the token
/// format: changing it changes every signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedClaims {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    /// Expiry as a Unix timestamp; `0` for tokens that never expire.
    pub exp: i64,
    pub sub: String,
    pub jti: String,
    pub scope: String,
    #[serde(rename = "type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl ScopedClaims {
    /// When the token expires, or `None` for a non-expiring token.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.exp == 0 {
            return None;
        }
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Whether the token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp != 0 && self.exp <= now.timestamp()
    }
}
