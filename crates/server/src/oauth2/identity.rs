//! Fabricated user identities.
//!
//! Any email submitted on the login page is accepted. The first submission
//! of an email creates an identity with a random id and a made-up display
//! name; later submissions of the exact same string return that identity.
//! Identities live for the lifetime of the process.

use crate::error::StoreError;
use fake::{Fake, faker::name::en::Name};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl Identity {
    fn fabricate(email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: Name().fake(),
        }
    }
}

#[derive(Default)]
struct Identities {
    by_id: HashMap<String, Identity>,
    /// email -> id
    by_email: HashMap<String, String>,
}

/// In-memory identity store. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct IdentityStore {
    inner: Arc<Mutex<Identities>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Identities> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the identity registered for `email`, creating it if needed.
    ///
    /// Lookup and insert happen under a single lock acquisition, so two
    /// concurrent calls for the same email always agree on one identity.
    pub fn get_or_create(&self, email: &str) -> Identity {
        let mut identities = self.lock();

        if let Some(identity) = identities
            .by_email
            .get(email)
            .and_then(|id| identities.by_id.get(id))
        {
            return identity.clone();
        }

        let identity = Identity::fabricate(email);
        identities
            .by_email
            .insert(identity.email.clone(), identity.id.clone());
        identities
            .by_id
            .insert(identity.id.clone(), identity.clone());
        tracing::info!(identity_id = %identity.id, name = %identity.name, "Created identity");
        identity
    }

    pub fn get_by_id(&self, id: &str) -> Result<Identity, StoreError> {
        self.lock()
            .by_id
            .get(id)
            .cloned()
            .ok_or(StoreError::IdentityNotFound)
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let store = IdentityStore::new();
        let first = store.get_or_create("a@b.com");
        let second = store.get_or_create("a@b.com");
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(first.email, "a@b.com");
        assert!(!first.name.is_empty());
    }

    #[test]
    fn new_identities_get_a_generated_name() {
        let store = IdentityStore::new();
        let identity = store.get_or_create("named@example.com");
        assert!(identity.name.split_whitespace().count() >= 2);
        assert_ne!(identity.name, identity.email);
        assert_eq!(store.get_or_create("named@example.com").name, identity.name);
    }

    #[test]
    fn email_lookup_is_case_sensitive() {
        let store = IdentityStore::new();
        let lower = store.get_or_create("a@b.com");
        let upper = store.get_or_create("A@B.com");
        assert_ne!(lower.id, upper.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn email_is_stored_verbatim() {
        let store = IdentityStore::new();
        let identity = store.get_or_create(" padded@example.com ");
        assert_eq!(identity.email, " padded@example.com ");
        assert_ne!(store.get_or_create("padded@example.com").id, identity.id);
    }

    #[test]
    fn get_by_id_resolves_created_identities() {
        let store = IdentityStore::new();
        let identity = store.get_or_create("someone@example.com");
        assert_eq!(store.get_by_id(&identity.id), Ok(identity));
        assert_eq!(
            store.get_by_id("does-not-exist"),
            Err(StoreError::IdentityNotFound)
        );
    }

    #[test]
    fn clones_share_state() {
        let store = IdentityStore::new();
        let clone = store.clone();
        let identity = store.get_or_create("shared@example.com");
        assert_eq!(clone.get_by_id(&identity.id), Ok(identity));
    }

    #[test]
    fn concurrent_get_or_create_yields_one_identity() {
        let store = IdentityStore::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.get_or_create("race@example.com").id)
            })
            .collect();

        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.len(), 1);
    }
}
