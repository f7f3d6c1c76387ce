//! Signed, self-contained bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the identity id. Nothing is stored server
//! side: a token is valid as long as its signature checks out and `exp` has
//! not passed.

use crate::error::TokenError;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Debug, Serialize, Deserialize)]
struct IdentityClaims {
    identity_id: String,
    iss: String,
    exp: u64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    issuer: String,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], issuer: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            issuer: issuer.into(),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Mints a token for `identity_id` that expires after the configured lifetime.
    pub fn mint(&self, identity_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
        self.sign(&IdentityClaims {
            identity_id: identity_id.to_string(),
            iss: self.issuer.clone(),
            exp: now + self.lifetime.as_secs(),
        })
    }

    fn sign(&self, claims: &IdentityClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// Checks signature, then expiry, and returns the embedded identity id.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let data = decode::<IdentityClaims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;
        Ok(data.claims.identity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-please-ignore";

    fn service() -> TokenService {
        TokenService::new(SECRET, "fake-sso", Duration::from_secs(300))
    }

    #[test]
    fn minted_token_verifies() {
        let tokens = service();
        let token = tokens.mint("identity-1").unwrap();
        assert_eq!(tokens.verify(&token), Ok("identity-1".to_string()));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let past = OffsetDateTime::now_utc().unix_timestamp() as u64 - 1;
        let token = tokens
            .sign(&IdentityClaims {
                identity_id: "identity-1".into(),
                iss: "fake-sso".into(),
                exp: past,
            })
            .unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_with_altered_payload_is_rejected() {
        let tokens = service();
        let token = tokens.mint("identity-1").unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = &mut parts[1];
        let last = payload.pop().unwrap();
        payload.push(if last == 'A' { 'B' } else { 'A' });
        let tampered = parts.join(".");

        assert_eq!(tokens.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenService::new(b"another-secret-entirely", "fake-sso", Duration::from_secs(300));
        let token = other.mint("identity-1").unwrap();
        assert_eq!(service().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(service().verify("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(service().verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn foreign_issuer_is_malformed() {
        let other = TokenService::new(SECRET, "someone-else", Duration::from_secs(300));
        let token = other.mint("identity-1").unwrap();
        assert_eq!(service().verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn claims_carry_issuer_and_expiry() {
        let tokens = service();
        let before = OffsetDateTime::now_utc().unix_timestamp() as u64;
        let token = tokens.mint("identity-1").unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        let claims = decode::<IdentityClaims>(&token, &DecodingKey::from_secret(&[]), &validation)
            .unwrap()
            .claims;

        assert_eq!(claims.iss, "fake-sso");
        assert!(claims.exp >= before + 300);
        assert!(claims.exp <= before + 301);
    }
}
