#![forbid(unsafe_code)]

//! Key manager with named key store.

use tracing::debug;

use crate::key::Key;

/// Manages a collection of keys for lookup during signing and verification.
#[derive(Debug, Default)]
pub struct KeysManager {
    keys: Vec<Key>,
}

impl KeysManager {
    /// Create an empty keys manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to the manager.
    pub fn add_key(&mut self, key: Key) {
        debug!(name = ?key.name, kind = ?key.data, "key added");
        self.keys.push(key);
    }

    /// Find a key by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.name.as_deref() == Some(name))
    }

    /// The first key added, if any.
    pub fn first_key(&self) -> Option<&Key> {
        self.keys.first()
    }

    /// First key usable with the given signature method URI.  When
    /// `need_private` is set, public-only keys are skipped.
    pub fn find_for_algorithm(&self, signature_method: &str, need_private: bool) -> Option<&Key> {
        self.keys.iter().find(|k| {
            k.is_compatible_with(signature_method) && (!need_private || k.data.has_private())
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
