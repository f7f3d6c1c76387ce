//! Single-use authorization codes.
//!
//! A code maps to an identity id and can be consumed exactly once within its
//! TTL. Expired codes are removed by a sweep task scheduled at issuance and,
//! should the sweep not have run yet, rejected lazily by [`AuthCodeStore::consume`].

use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct AuthCode {
    identity_id: String,
    issued_at: Instant,
}

type Codes = Arc<Mutex<HashMap<String, AuthCode>>>;

fn lock(codes: &Codes) -> MutexGuard<'_, HashMap<String, AuthCode>> {
    codes.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct AuthCodeStore {
    codes: Codes,
    ttl: Duration,
}

impl AuthCodeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            codes: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a fresh code for `identity_id`.
    pub fn issue(&self, identity_id: &str) -> String {
        let code = Uuid::new_v4().simple().to_string();
        lock(&self.codes).insert(
            code.clone(),
            AuthCode {
                identity_id: identity_id.to_string(),
                issued_at: Instant::now(),
            },
        );
        tracing::debug!(identity_id, "Issued authorization code");
        self.schedule_expiry(code.clone());
        code
    }

    fn schedule_expiry(&self, code: String) {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("No Tokio runtime available, relying on lazy code expiry");
            return;
        };
        let codes = Arc::clone(&self.codes);
        let ttl = self.ttl;
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            if lock(&codes).remove(&code).is_some() {
                tracing::debug!("Swept expired authorization code");
            }
        });
    }

    /// Removes `code` and returns the identity id it was issued for.
    ///
    /// Lookup and removal are one locked step, so of two concurrent exchanges
    /// of the same code at most one succeeds.
    pub fn consume(&self, code: &str) -> Result<String, StoreError> {
        let entry = lock(&self.codes)
            .remove(code)
            .ok_or(StoreError::CodeNotFound)?;

        if entry.issued_at.elapsed() >= self.ttl {
            tracing::debug!("Rejected expired authorization code");
            return Err(StoreError::CodeNotFound);
        }
        Ok(entry.identity_id)
    }

    pub fn len(&self) -> usize {
        lock(&self.codes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuthCodeStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
