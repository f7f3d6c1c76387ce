//! A mock OAuth2 identity provider.
//!
//! Emulates the Authorization Code grant for clients under test: any email
//! address can log in, identities are fabricated on first use and everything
//! lives in memory for the lifetime of the process.

use std::sync::Arc;

use crate::config::AppConfig;

pub mod api;
pub mod config;
pub mod error;
pub mod oauth2;

#[derive(Clone, Debug)]
pub struct AppResources {
    pub config: Arc<AppConfig>,
}
