//! OAuth2 state management.
//!
//! Bundles the stores the flow endpoints operate on.

use crate::config::{AppConfig, ConfigError};
use crate::oauth2::{AuthCodeStore, IdentityStore, TokenService};

/// OAuth2 state containing all components needed for the authorization flow.
#[derive(Clone)]
pub struct OAuth2State {
    pub identities: IdentityStore,
    pub codes: AuthCodeStore,
    pub tokens: TokenService,
}

impl OAuth2State {
    pub fn new(identities: IdentityStore, codes: AuthCodeStore, tokens: TokenService) -> Self {
        Self {
            identities,
            codes,
            tokens,
        }
    }

    /// Builds empty stores and a token service from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let secret = config.signing_key()?;
        if config.signing_secret.is_none() {
            tracing::warn!("No signing_secret configured, generated an ephemeral one");
        }
        Ok(Self::new(
            IdentityStore::new(),
            AuthCodeStore::new(config.auth_code_ttl()),
            TokenService::new(&secret, config.issuer.clone(), config.access_token_ttl()),
        ))
    }
}
