//! Process-wide registries binding entity types to the single-table layout.
//!
//! Two registries cooperate: [`bindings`] maps a Rust type to its entity-type
//! name and key-pattern table, and [`deserializers`] maps an entity-type name
//! (as carried by the `EntityType` item attribute) back to a deserializer.
//! Both follow an initialise-then-read lifecycle: registration happens at
//! module init, reads happen concurrently for the life of the process, and
//! deregistration is not supported.
//!
//! [`register_entity`] installs both halves in one call and is the intended
//! entry point.

mod bindings;
mod deserializers;

pub use bindings::{binding_for, register_binding, EntityBinding};
pub use deserializers::{deserializer_for, register_deserializer, DeserializerFn};

use std::sync::Arc;

use monotable_core::storage::{KeyPatterns, Result, StoreError};
use serde::de::DeserializeOwned;

/// Registers an entity type in both registries: its key patterns under the
/// type's identity, and a `serde`-backed deserializer under `entity_type`.
///
/// `entity_type` is the discriminator written to every item under the
/// reserved `EntityType` attribute. Registering the same type or name twice
/// fails with `DuplicateRegistration`.
pub fn register_entity<T>(entity_type: &str, patterns: KeyPatterns) -> Result<()>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    register_binding::<T>(entity_type, patterns)?;
    register_deserializer(
        entity_type,
        Arc::new(|item| {
            let value: T = serde_dynamo::from_item(item.clone())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            Ok(Box::new(value))
        }),
    )
}
