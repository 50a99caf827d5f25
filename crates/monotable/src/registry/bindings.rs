//! Type-identity registry: Rust type to entity-type name and key patterns.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use monotable_core::storage::{KeyPatterns, Result, StoreError};
use once_cell::sync::Lazy;

/// What registration associates with an entity type: the discriminator name
/// written to items and the key-pattern table that drives key expansion.
#[derive(Debug, Clone)]
pub struct EntityBinding {
    pub entity_type: String,
    pub patterns: KeyPatterns,
}

static BINDINGS: Lazy<RwLock<HashMap<TypeId, Arc<EntityBinding>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Associates type `T` with its entity-type name and key patterns.
///
/// Expected only during process initialisation; a second registration for
/// the same type fails with `DuplicateRegistration`.
pub fn register_binding<T: 'static>(entity_type: &str, patterns: KeyPatterns) -> Result<()> {
    let mut bindings = BINDINGS.write().expect("binding registry lock poisoned");
    match bindings.entry(TypeId::of::<T>()) {
        std::collections::hash_map::Entry::Occupied(_) => Err(StoreError::DuplicateRegistration(
            format!("key patterns for type {}", type_name::<T>()),
        )),
        std::collections::hash_map::Entry::Vacant(entry) => {
            entry.insert(Arc::new(EntityBinding {
                entity_type: entity_type.to_string(),
                patterns,
            }));
            Ok(())
        }
    }
}

/// Looks up the binding for type `T`. Safe under concurrent reads; the lock
/// is released before this function returns.
pub fn binding_for<T: 'static>() -> Result<Arc<EntityBinding>> {
    let bindings = BINDINGS.read().expect("binding registry lock poisoned");
    bindings
        .get(&TypeId::of::<T>())
        .cloned()
        .ok_or_else(|| StoreError::UnregisteredIndexMap(type_name::<T>().to_string()))
}
