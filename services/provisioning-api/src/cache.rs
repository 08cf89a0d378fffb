//! Process-lifetime cache for the provisioning application type id.
//!
//! The id is a stable lookup against the sources registry, so it is
//! resolved at most once per process and never invalidated. The cache
//! is an explicit instance owned by the composition root and injected
//! into the sources client.

use std::sync::OnceLock;

/// Write-once cache holding the provisioning application type id.
#[derive(Debug, Default)]
pub struct AppTypeCache {
    id: OnceLock<String>,
}

impl AppTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached id, if one has been stored.
    pub fn get(&self) -> Option<&str> {
        self.id.get().map(String::as_str)
    }

    /// Store the id. The first writer wins; later writers are no-ops.
    ///
    /// Concurrent resolutions race to store the same upstream value,
    /// so losing the race is harmless.
    pub fn set(&self, value: String) {
        let _ = self.id.set(value);
    }
}
