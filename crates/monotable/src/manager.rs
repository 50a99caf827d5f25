//! Name-keyed registry of heterogeneous store instances.

use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;

use monotable_core::storage::{Result, StoreError};

/// Registers store instances under string keys and hands them back by type.
///
/// Stores for different entity types do not share a common concrete type, so
/// the manager holds them type-erased; retrieval downcasts to the concrete
/// store type, which is `Clone` by design (e.g. `DynamoStore<T>`).
#[derive(Default)]
pub struct StoreManager {
    stores: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
}

impl StoreManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a store under the given key. Fails with
    /// `DuplicateRegistration` if the key is taken.
    pub fn register<S: Any + Send + Sync>(&self, key: &str, store: S) -> Result<()> {
        let mut stores = self.stores.write().expect("store manager lock poisoned");
        if stores.contains_key(key) {
            return Err(StoreError::DuplicateRegistration(format!(
                "store with key {key:?}"
            )));
        }
        stores.insert(key.to_string(), Box::new(store));
        Ok(())
    }

    /// Retrieves a clone of the store registered under `key`. Fails when the
    /// key is unknown or holds a store of a different type.
    pub fn get<S: Any + Send + Sync + Clone>(&self, key: &str) -> Result<S> {
        let stores = self.stores.read().expect("store manager lock poisoned");
        stores
            .get(key)
            .and_then(|store| store.downcast_ref::<S>())
            .cloned()
            .ok_or_else(|| StoreError::UnregisteredType(key.to_string()))
    }

    /// Removes the store registered under `key`.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut stores = self.stores.write().expect("store manager lock poisoned");
        stores
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::UnregisteredType(key.to_string()))
    }

    /// All registered keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let stores = self.stores.read().expect("store manager lock poisoned");
        stores.keys().cloned().collect()
    }
}
