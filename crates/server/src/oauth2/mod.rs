//! OAuth2 Authorization Code flow.
//!
//! ## Endpoints
//!
//! - `GET /auth-code/authorize` - Validates the request and shows the login form
//! - `POST /auth-code/submit` - Accepts any email and redirects back with a code
//! - `POST /auth-code/token` - Exchanges a code for a bearer token
//! - `GET /auth-code/me` - Returns the identity behind a bearer token

pub mod code;
pub mod endpoints;
pub mod identity;
mod state;
pub mod token;

pub use code::AuthCodeStore;
pub use endpoints::router;
pub use identity::{Identity, IdentityStore};
pub use state::OAuth2State;
pub use token::TokenService;

/// OpenAPI tag for OAuth2 endpoints
pub const OAUTH2_TAG: &str = "OAuth2";

/// Path prefix the flow endpoints are nested under.
pub const FLOW_PREFIX: &str = "/auth-code";
