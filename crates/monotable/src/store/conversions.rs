//! Item decoding and update-expression construction.
//!
//! Decoding is discriminator-first: the `EntityType` attribute written at
//! persist time selects the registered deserializer, and direct `serde`
//! deserialization is the fallback. The discriminator is stripped before the
//! entity ever sees its attribute map.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use monotable_core::storage::{Item, QueryValue, Result, StoreError};
use serde::de::DeserializeOwned;

use super::ENTITY_TYPE_ATTRIBUTE;
use crate::registry;

/// Splits the `EntityType` discriminator off a raw item, returning the name
/// (when present and string-typed) and the stripped attribute map.
pub(crate) fn split_entity_type(item: &Item) -> (Option<String>, Item) {
    let mut stripped = item.clone();
    let entity_type = match stripped.remove(ENTITY_TYPE_ATTRIBUTE) {
        Some(AttributeValue::S(name)) => Some(name),
        _ => None,
    };
    (entity_type, stripped)
}

/// Decodes a raw item into `T`: registered deserializer first (selected by
/// the `EntityType` discriminator), direct deserialization as fallback.
pub(crate) fn decode_typed<T>(item: &Item) -> Result<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let (entity_type, stripped) = split_entity_type(item);
    if let Some(name) = entity_type.as_deref() {
        if let Ok(deserialize) = registry::deserializer_for(name) {
            let value = deserialize(&stripped)?;
            if let Ok(typed) = value.downcast::<T>() {
                return Ok(*typed);
            }
            // The discriminator named a different registered kind; fall
            // through to a direct decode.
        }
    }
    serde_dynamo::from_item(stripped).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decodes a raw item into a heterogeneous query value. Items with no (or no
/// registered) discriminator come back raw rather than failing.
pub(crate) fn decode_value(item: Item) -> Result<QueryValue> {
    let (entity_type, stripped) = split_entity_type(&item);
    match entity_type {
        Some(name) => match registry::deserializer_for(&name) {
            Ok(deserialize) => Ok(QueryValue::Known {
                value: deserialize(&stripped)?,
                entity_type: name,
            }),
            Err(_) => Ok(QueryValue::Raw(item)),
        },
        None => Ok(QueryValue::Raw(item)),
    }
}

/// Renders an attribute update map as a `SET` expression with generated
/// `#fN`/`:vN` placeholders. Fields are processed in sorted order so the
/// expression is deterministic.
pub(crate) fn build_update_expression(
    updates: &HashMap<String, AttributeValue>,
) -> Result<(String, HashMap<String, String>, Item)> {
    if updates.is_empty() {
        return Err(StoreError::Validation {
            field: "updates".to_string(),
            message: "no updates provided".to_string(),
        });
    }

    let mut fields: Vec<&String> = updates.keys().collect();
    fields.sort();

    let mut clauses = Vec::with_capacity(fields.len());
    let mut names = HashMap::new();
    let mut values = Item::new();
    for (i, field) in fields.iter().enumerate() {
        let name_placeholder = format!("#f{i}");
        let value_placeholder = format!(":v{i}");
        clauses.push(format!("{name_placeholder} = {value_placeholder}"));
        names.insert(name_placeholder, (*field).clone());
        values.insert(value_placeholder, updates[*field].clone());
    }

    Ok((format!("SET {}", clauses.join(", ")), names, values))
}
