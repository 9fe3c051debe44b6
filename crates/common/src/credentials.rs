//! Credential boundary for external provider keys
//!
//! The application stores exactly one opaque bearer token per provider
//! service, keyed by a short service name (`"openai"`). The backing store is
//! a plain scalar key/value surface; [`ObfuscatedCredentials`] wraps any such
//! store so the value at rest is obfuscated (see [`crate::crypto`]).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::crypto;

/// Scalar preference store holding provider credentials.
pub trait CredentialStore: Send + Sync {
    /// Look up the credential for a service, if one is stored.
    fn get(&self, service: &str) -> Option<String>;

    /// Store (or replace) the credential for a service.
    fn set(&self, service: &str, value: &str);

    /// Remove the credential for a service.
    fn remove(&self, service: &str);
}

/// In-memory credential store for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, service: &str) -> Option<String> {
        self.values
            .read()
            .ok()
            .and_then(|map| map.get(service).cloned())
    }

    fn set(&self, service: &str, value: &str) {
        if let Ok(mut map) = self.values.write() {
            map.insert(service.to_string(), value.to_string());
        }
    }

    fn remove(&self, service: &str) {
        if let Ok(mut map) = self.values.write() {
            map.remove(service);
        }
    }
}

/// Wraps a raw store so credentials rest obfuscated rather than in plaintext.
///
/// The salt is explicit and scoped to the process: a value written by one
/// process run is not expected to survive into the next.
pub struct ObfuscatedCredentials<S: CredentialStore> {
    inner: S,
    salt: u8,
}

impl<S: CredentialStore> ObfuscatedCredentials<S> {
    pub fn new(inner: S, salt: u8) -> Self {
        Self { inner, salt }
    }
}

impl<S: CredentialStore> CredentialStore for ObfuscatedCredentials<S> {
    fn get(&self, service: &str) -> Option<String> {
        let stored = self.inner.get(service)?;
        crypto::reveal(&stored, self.salt)
    }

    fn set(&self, service: &str, value: &str) {
        self.inner.set(service, &crypto::obfuscate(value, self.salt));
    }

    fn remove(&self, service: &str) {
        self.inner.remove(service);
    }
}
