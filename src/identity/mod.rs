//! Resumable per-device chat identity
//!
//! The server assigns an identity on the first init request. It is stored
//! under a key derived from endpoint, credential and display name, and sent
//! back on every later init so the device keeps talking to the same chat.

mod store;

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

pub use store::{FileStore, KeyValueStore, MemoryStore};

const KEY_PREFIX: &str = "chat-session.identity.";
const FIELD_SEPARATOR: u8 = 0x1f;

/// Derive the storage key for an (endpoint, credential, display name) triple.
///
/// The endpoint is hashed as given; no URL normalization happens here.
pub fn storage_key(endpoint: &str, credential: &str, display_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(credential.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(display_name.as_bytes());
    format!("{}{}", KEY_PREFIX, URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

/// Best-effort identity persistence on top of a [`KeyValueStore`].
///
/// Storage failures never surface: a failed read resolves to "no identity"
/// and a failed write is logged. The worst outcome is a fresh server chat.
#[derive(Clone)]
pub struct IdentityStore {
    backend: Arc<dyn KeyValueStore>,
}

impl IdentityStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn resolve(&self, endpoint: &str, credential: &str, display_name: &str) -> Option<String> {
        let key = storage_key(endpoint, credential, display_name);
        match self.backend.get(&key) {
            Ok(Some(identity)) if !identity.is_empty() => {
                tracing::debug!("Resolved stored chat identity");
                Some(identity)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to read stored identity: {:#}", e);
                None
            }
        }
    }

    pub fn persist(&self, endpoint: &str, credential: &str, display_name: &str, identity: &str) {
        let key = storage_key(endpoint, credential, display_name);
        if let Err(e) = self.backend.set(&key, identity) {
            tracing::warn!("Failed to persist chat identity: {:#}", e);
        }
    }

    /// Forget the identity so the next init creates a new chat.
    pub fn clear(&self, endpoint: &str, credential: &str, display_name: &str) {
        let key = storage_key(endpoint, credential, display_name);
        if let Err(e) = self.backend.remove(&key) {
            tracing::warn!("Failed to clear chat identity: {:#}", e);
        }
    }
}
