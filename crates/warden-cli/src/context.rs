use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use warden_config::{SecretsBackendKind, WardenConfig};
use warden_secrets::{MemoryBackend, SecretBackend, VaultBackend};

/// Load configuration from the default locations, or with `path` layered on top.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<WardenConfig> {
    let config = match path {
        Some(path) => {
            let _ = dotenvy::dotenv();
            WardenConfig::load_from(path)?
        }
        None => WardenConfig::load_with_dotenv()?,
    };
    Ok(config)
}

/// Connect the secret backend selected by `secrets.backend`.
pub fn secret_backend(config: &WardenConfig) -> anyhow::Result<Arc<dyn SecretBackend>> {
    config
        .secrets
        .validate()
        .context("invalid [secrets] configuration")?;
    Ok(match config.secrets.backend {
        SecretsBackendKind::Vault => Arc::new(
            VaultBackend::from_config(&config.secrets.vault)
                .context("failed to create Vault client")?,
        ),
        SecretsBackendKind::Memory => {
            tracing::warn!("using the in-memory secret backend; nothing will be persisted");
            Arc::new(MemoryBackend::new())
        }
    })
}
