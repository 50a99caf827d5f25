//! Discriminator registry: entity-type name to deserializer.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use monotable_core::storage::{Item, Result, StoreError};
use once_cell::sync::Lazy;

/// Deserializes a raw item (with `EntityType` already stripped) into its
/// concrete entity, boxed for heterogeneous result sets.
pub type DeserializerFn =
    Arc<dyn Fn(&Item) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

static DESERIALIZERS: Lazy<RwLock<HashMap<String, DeserializerFn>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a deserializer under the given entity-type name. Exactly one
/// deserializer may exist per name; a second registration fails with
/// `DuplicateRegistration`.
pub fn register_deserializer(entity_type: &str, deserialize: DeserializerFn) -> Result<()> {
    let mut registry = DESERIALIZERS
        .write()
        .expect("deserializer registry lock poisoned");
    if registry.contains_key(entity_type) {
        return Err(StoreError::DuplicateRegistration(format!(
            "deserializer for entity type {entity_type:?}"
        )));
    }
    registry.insert(entity_type.to_string(), deserialize);
    Ok(())
}

/// Looks up the deserializer registered under `entity_type`.
pub fn deserializer_for(entity_type: &str) -> Result<DeserializerFn> {
    let registry = DESERIALIZERS
        .read()
        .expect("deserializer registry lock poisoned");
    registry
        .get(entity_type)
        .cloned()
        .ok_or_else(|| StoreError::UnregisteredType(entity_type.to_string()))
}
