//! Application configuration: optional `config.yaml` plus `FAKE_SSO__*` overrides.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
    #[error("Failed to generate signing secret: {0}")]
    Entropy(String),
}

/// Minimum length of a configured signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Value of the `iss` claim in minted tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// HS256 secret. When unset a random one is generated at startup, so tokens
    /// do not survive a restart.
    #[serde(default)]
    pub signing_secret: Option<String>,
    #[serde(default = "default_ttl_secs")]
    pub auth_code_ttl_secs: u64,
    #[serde(default = "default_ttl_secs")]
    pub access_token_ttl_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_issuer() -> String {
    "fake-sso".to_string()
}

fn default_ttl_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            issuer: default_issuer(),
            signing_secret: None,
            auth_code_ttl_secs: default_ttl_secs(),
            access_token_ttl_secs: default_ttl_secs(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("listen_addr", &self.listen_addr)
            .field("issuer", &self.issuer)
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("auth_code_ttl_secs", &self.auth_code_ttl_secs)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .finish()
    }
}

impl AppConfig {
    pub fn auth_code_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_code_ttl_secs)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    /// Returns the configured signing secret, or 32 fresh random bytes.
    pub fn signing_key(&self) -> Result<Vec<u8>, ConfigError> {
        if let Some(secret) = &self.signing_secret {
            return Ok(secret.as_bytes().to_vec());
        }
        let mut bytes = vec![0u8; 32];
        getrandom::fill(&mut bytes).map_err(|e| ConfigError::Entropy(e.to_string()))?;
        Ok(bytes)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.signing_secret
            && secret.len() < MIN_SECRET_LEN
        {
            return Err(ConfigError::Validation(format!(
                "signing_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.auth_code_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "auth_code_ttl_secs must be > 0".into(),
            ));
        }
        if self.access_token_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "access_token_ttl_secs must be > 0".into(),
            ));
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Validation("issuer must not be empty".into()));
        }
        Ok(())
    }
}

/// Load application configuration from an optional `config.yaml` + environment overrides.
///
/// Environment variables use the `FAKE_SSO` prefix and `__` as separator, e.g.
/// `FAKE_SSO__SIGNING_SECRET` or `FAKE_SSO__LISTEN_ADDR`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::with_prefix("FAKE_SSO").separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
