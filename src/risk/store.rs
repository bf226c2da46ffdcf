//! Storage and caching for trained model checkpoints.
//!
//! A `ModelStore` resolves a checkpoint handle to a loaded progression
//! model. The `ModelCache` sits in front of a store and keeps loaded models
//! shared behind `Arc`, so repeated risk queries against the same checkpoint
//! pay the load cost once.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::risk::model::{ProgressionModel, TabulatedModel};

/// Source of trained progression models, keyed by checkpoint handle.
pub trait ModelStore: Send + Sync {
    /// Load the model a handle refers to.
    ///
    /// Returns `Error::ModelUnavailable` when the handle is unknown or the
    /// checkpoint cannot be read.
    fn load_model(&self, handle: &str) -> Result<Arc<dyn ProgressionModel>>;

    /// Handles this store can resolve, sorted by name.
    fn handles(&self) -> Vec<String>;
}

/// A store holding fully constructed models in memory.
///
/// Mostly useful for tests and for demos that build their models
/// programmatically instead of reading checkpoints from disk.
#[derive(Default)]
pub struct InMemoryModelStore {
    models: FxHashMap<String, Arc<dyn ProgressionModel>>,
}

impl InMemoryModelStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { models: FxHashMap::default() }
    }

    /// Register a model under a handle, replacing any previous entry.
    pub fn insert(&mut self, handle: impl Into<String>, model: Arc<dyn ProgressionModel>) {
        self.models.insert(handle.into(), model);
    }
}

impl ModelStore for InMemoryModelStore {
    fn load_model(&self, handle: &str) -> Result<Arc<dyn ProgressionModel>> {
        self.models.get(handle).cloned().ok_or_else(|| {
            Error::ModelUnavailable(handle.to_string(), "no such handle in store".to_string())
        })
    }

    fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.models.keys().cloned().collect();
        handles.sort();
        handles
    }
}

/// A store reading tabulated checkpoints from JSON files on disk.
pub struct FileModelStore {
    checkpoints: HashMap<String, PathBuf>,
}

impl FileModelStore {
    /// Create a store over an explicit handle-to-path mapping.
    #[must_use]
    pub fn new(checkpoints: HashMap<String, PathBuf>) -> Self {
        Self { checkpoints }
    }
}

impl ModelStore for FileModelStore {
    fn load_model(&self, handle: &str) -> Result<Arc<dyn ProgressionModel>> {
        let path = self.checkpoints.get(handle).ok_or_else(|| {
            Error::ModelUnavailable(handle.to_string(), "no checkpoint registered".to_string())
        })?;
        let model = TabulatedModel::from_json_file(path).map_err(|err| {
            Error::ModelUnavailable(handle.to_string(), err.to_string())
        })?;
        Ok(Arc::new(model))
    }

    fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.checkpoints.keys().cloned().collect();
        handles.sort();
        handles
    }
}

/// Cache of loaded models in front of a `ModelStore`.
pub struct ModelCache {
    store: Arc<dyn ModelStore>,
    loaded: RwLock<FxHashMap<String, Arc<dyn ProgressionModel>>>,
}

impl ModelCache {
    /// Create an empty cache over a store.
    #[must_use]
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store, loaded: RwLock::new(FxHashMap::default()) }
    }

    /// Get a model, loading it from the store on first use.
    pub fn get(&self, handle: &str) -> Result<Arc<dyn ProgressionModel>> {
        // First check if the model is already loaded.
        {
            let loaded = self.loaded.read().map_err(|_| {
                Error::InvalidOperation("Failed to acquire read lock on model cache".to_string())
            })?;

            if let Some(model) = loaded.get(handle) {
                return Ok(Arc::clone(model));
            }
        }

        // Load outside the lock so concurrent readers are not held up.
        let model = self.store.load_model(handle)?;

        let mut loaded = self.loaded.write().map_err(|_| {
            Error::InvalidOperation("Failed to acquire write lock on model cache".to_string())
        })?;
        // Another thread may have loaded the same handle in the meantime;
        // keep the entry that got there first so all callers share one copy.
        let entry = loaded.entry(handle.to_string()).or_insert(model);
        Ok(Arc::clone(entry))
    }

    /// Handles the underlying store can resolve.
    #[must_use]
    pub fn handles(&self) -> Vec<String> {
        self.store.handles()
    }

    /// Number of models currently loaded.
    pub fn loaded_count(&self) -> Result<usize> {
        let loaded = self.loaded.read().map_err(|_| {
            Error::InvalidOperation("Failed to acquire read lock on model cache".to_string())
        })?;
        Ok(loaded.len())
    }
}
