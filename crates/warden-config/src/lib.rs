//! # warden-config
//!
//! Layered configuration loading for Warden using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`WARDEN_*` prefix, `__` as separator)
//! 2. Project-level `warden.toml`
//! 3. User-level `~/.config/warden/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `WARDEN_AUTH__SIGNING_KEY` -> `auth.signing_key`,
//! `WARDEN_SECRETS__VAULT__TOKEN` -> `secrets.vault.token`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use warden_config::WardenConfig;
//!
//! let config = WardenConfig::load_with_dotenv().expect("config");
//! config.validate().expect("invalid configuration");
//! println!("issuer: {}", config.auth.issuer);
//! ```

mod auth;
mod error;
mod pki;
mod rbac;
mod secrets;

pub use auth::{AuthConfig, MIN_SIGNING_KEY_LEN, TokenStoreKind};
pub use error::ConfigError;
pub use pki::PkiConfig;
pub use rbac::{PolicyKind, PolicyRuleConfig, RbacConfig};
pub use secrets::{SecretsBackendKind, SecretsConfig, VaultConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_FILE: &str = "warden.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rbac: RbacConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub pki: PkiConfig,
}

impl WardenConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load configuration with an explicit TOML file layered above the
    /// default file locations and below the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::InvalidValue {
                field: "config".into(),
                reason: format!("{} does not exist", path.display()),
            });
        }
        Self::file_layers()
            .merge(Toml::file(path))
            .merge(Self::env_layer())
            .extract()
            .map_err(ConfigError::from)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    pub fn figment() -> Figment {
        Self::file_layers().merge(Self::env_layer())
    }

    /// Run every section's fail-fast checks.
    ///
    /// Meant to be called once at boot so misconfiguration never surfaces
    /// as a runtime error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;
        self.rbac.validate()?;
        self.secrets.validate()?;
        self.pki.validate()
    }

    fn file_layers() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment
    }

    fn env_layer() -> Env {
        Env::prefixed("WARDEN_").split("__")
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("warden").join("config.toml"))
    }
}
