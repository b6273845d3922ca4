use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::ImporterConfig;
use crate::database::Catalog;
use crate::error::{ImportError, Result};
use crate::sources;
use crate::traits::CardSource;

/// Lookup of sources by key, fixed at construction
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn CardSource>>,
}

impl AdapterRegistry {
    /// Build the registry; a later adapter with the same key replaces an
    /// earlier one.
    pub fn new(adapters: Vec<Arc<dyn CardSource>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.key().to_lowercase(), adapter))
            .collect();
        Self { adapters }
    }

    /// Registry holding every built-in source.
    pub fn with_default_sources(catalog: &Catalog, config: &ImporterConfig) -> Result<Self> {
        let registry = Self::new(sources::default_sources(catalog, config)?);
        info!("Registered {} import sources", registry.adapters.len());
        Ok(registry)
    }

    /// Case-insensitive lookup.
    pub fn try_get(&self, key: &str) -> Option<Arc<dyn CardSource>> {
        self.adapters.get(&key.trim().to_lowercase()).cloned()
    }

    /// Like [`try_get`](Self::try_get), but an unknown key is an error.
    pub fn get(&self, key: &str) -> Result<Arc<dyn CardSource>> {
        self.try_get(key)
            .ok_or_else(|| ImportError::UnknownSource(key.to_string()))
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
