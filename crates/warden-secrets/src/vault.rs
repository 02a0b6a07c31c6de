//! HashiCorp Vault backend.
//!
//! Talks to the Vault HTTP API directly via `reqwest`. KV and PKI endpoints
//! live under `/v1/{path}`, engine mounts under `/v1/sys/mounts/{path}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use warden_config::VaultConfig;

use crate::{MountConfig, SecretBackend, SecretData, SecretError};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

pub struct VaultBackend {
    client: reqwest::Client,
    address: String,
    token: String,
    namespace: Option<String>,
}

impl VaultBackend {
    /// Build a client for the Vault server at `address`.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Configuration` if the HTTP client cannot be built.
    pub fn new(
        address: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SecretError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SecretError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            address: address.into().trim_end_matches('/').to_string(),
            token: token.into(),
            namespace: None,
        })
    }

    /// Build a client from the `secrets.vault` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Configuration` if the section is incomplete.
    pub fn from_config(config: &VaultConfig) -> Result<Self, SecretError> {
        if !config.is_configured() {
            return Err(SecretError::Configuration(
                "secrets.vault requires an address and a token".into(),
            ));
        }
        let mut backend = Self::new(
            &config.address,
            &config.token,
            Duration::from_secs(config.timeout_secs),
        )?;
        if !config.namespace.is_empty() {
            backend.namespace = Some(config.namespace.clone());
        }
        Ok(backend)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.address, path.trim_start_matches('/'));
        let mut builder = self
            .client
            .request(method, url)
            .header(TOKEN_HEADER, &self.token);
        if let Some(namespace) = &self.namespace {
            builder = builder.header(NAMESPACE_HEADER, namespace);
        }
        builder
    }

    fn list_request(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path).query(&[("list", "true")])
    }

    /// Send a request and return the `data` object of the response, if any.
    ///
    /// A 404 maps to `Ok(None)`; empty (204) responses also yield `None`.
    async fn send(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Option<SecretData>, SecretError> {
        let resp = builder.send().await.map_err(|source| {
            if source.is_timeout() {
                SecretError::Timeout {
                    path: path.to_string(),
                }
            } else {
                SecretError::Request {
                    path: path.to_string(),
                    source,
                }
            }
        })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SecretError::Http {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = resp
            .text()
            .await
            .map_err(|source| SecretError::Request {
                path: path.to_string(),
                source,
            })?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| SecretError::InvalidResponse {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        match value.get("data") {
            Some(serde_json::Value::Object(data)) => Ok(Some(data.clone())),
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(other) => Err(SecretError::InvalidResponse {
                path: path.to_string(),
                reason: format!("expected 'data' object, got {other}"),
            }),
        }
    }
}

#[async_trait]
impl SecretBackend for VaultBackend {
    async fn write(&self, path: &str, data: SecretData) -> Result<Option<SecretData>, SecretError> {
        let builder = self.request(Method::POST, path).json(&data);
        self.send(path, builder).await
    }

    async fn read(&self, path: &str) -> Result<Option<SecretData>, SecretError> {
        let builder = self.request(Method::GET, path);
        self.send(path, builder).await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, SecretError> {
        let builder = self.list_request(path);
        let Some(data) = self.send(path, builder).await? else {
            return Ok(Vec::new());
        };
        let keys = data
            .get("keys")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| SecretError::InvalidResponse {
                path: path.to_string(),
                reason: "list response has no 'keys' array".into(),
            })?;
        Ok(keys
            .iter()
            .filter_map(serde_json::Value::as_str)
            .map(str::to_string)
            .collect())
    }

    async fn delete(&self, path: &str) -> Result<(), SecretError> {
        let builder = self.request(Method::DELETE, path);
        self.send(path, builder).await.map(|_| ())
    }

    async fn mount(&self, path: &str, config: &MountConfig) -> Result<(), SecretError> {
        let mount_path = format!("sys/mounts/{path}");
        let body = serde_json::json!({
            "type": config.kind,
            "config": {
                "max_lease_ttl": config.max_lease_ttl,
                "default_lease_ttl": config.default_lease_ttl,
            },
        });
        let builder = self.request(Method::POST, &mount_path).json(&body);
        match self.send(&mount_path, builder).await {
            Ok(_) => Ok(()),
            Err(SecretError::Http { status: 400, body, .. }) if body.contains("existing mount") => {
                Err(SecretError::MountConflict {
                    path: path.to_string(),
                })
            }
            Err(error) => Err(error),
        }
    }

    async fn unmount(&self, path: &str) -> Result<(), SecretError> {
        let mount_path = format!("sys/mounts/{path}");
        let builder = self.request(Method::DELETE, &mount_path);
        self.send(&mount_path, builder).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_token() {
        let config = VaultConfig::default();
        assert!(matches!(
            VaultBackend::from_config(&config),
            Err(SecretError::Configuration(_))
        ));
    }

    #[test]
    fn address_trailing_slash_is_trimmed() {
        let backend =
            VaultBackend::new("http://vault:8200/", "root", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.address, "http://vault:8200");
    }

    #[test]
    fn list_request_carries_query_and_headers() {
        let config = VaultConfig {
            address: "http://vault:8200".into(),
            token: "root".into(),
            namespace: "team-a".into(),
            ..VaultConfig::default()
        };
        let backend = VaultBackend::from_config(&config).unwrap();
        let request = backend.list_request("/tokens/alice").build().unwrap();

        assert_eq!(*request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "http://vault:8200/v1/tokens/alice?list=true"
        );
        assert_eq!(request.headers()[TOKEN_HEADER], "root");
        assert_eq!(request.headers()[NAMESPACE_HEADER], "team-a");
    }

    #[tokio::test]
    async fn unreachable_server_is_transient() {
        let backend =
            VaultBackend::new("http://127.0.0.1:1", "root", Duration::from_secs(2)).unwrap();
        let err = backend.read("secret/anything").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}
