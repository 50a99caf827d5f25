use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use aws_sdk_dynamodb::types::AttributeValue;

/// An item as stored by the provider: attribute name to tagged value.
pub type Item = HashMap<String, AttributeValue>;

/// Key pattern table for an entity type: logical key name (`PK`, `SK`,
/// `GSI1PK`, ...) to a template string such as `"USER#{ID}"`.
pub type KeyPatterns = HashMap<String, String>;

/// Parameters for a provider query.
///
/// Built once per call, either directly or through the fluent builders, and
/// consumed by a single request or paginated across many by the streaming
/// engine.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    /// Ignored at execution time: the store always substitutes its own
    /// configured table name.
    pub table_name: String,
    /// The primary key condition for the query.
    pub key_condition_expression: String,
    /// Optional filter expression applied after the key condition.
    pub filter_expression: Option<String>,
    /// Values for `:name` placeholders in the expressions.
    pub expression_attribute_values: Item,
    /// Secondary index to query; `None` targets the base table.
    pub index_name: Option<String>,
    /// Per-page item limit.
    pub limit: Option<i32>,
    /// `Some(false)` traverses the index in descending order. Defaults to
    /// ascending.
    pub scan_index_forward: Option<bool>,
    /// Continuation cursor echoed back from a previous page.
    pub exclusive_start_key: Option<Item>,
}

/// Key material for operations that accept either a plain identifier or a
/// whole entity.
pub enum KeyInput<'a, T> {
    /// A scalar identifier, substituted for every macro in the key patterns.
    Id(&'a str),
    /// An entity whose attributes drive the key expansion.
    Entity(&'a T),
}

/// One element of a heterogeneous query result.
///
/// Single-table queries can return items of different entity kinds; the
/// `EntityType` discriminator written at persist time selects the
/// deserializer. Items with no (or no registered) discriminator are handed
/// back raw.
pub enum QueryValue {
    /// An item deserialized through the type registry.
    Known {
        entity_type: String,
        value: Box<dyn Any + Send + Sync>,
    },
    /// The raw attribute map, when no registered deserializer applies.
    Raw(Item),
}

impl QueryValue {
    /// The registered entity-type name, if this value went through the
    /// registry.
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            QueryValue::Known { entity_type, .. } => Some(entity_type),
            QueryValue::Raw(_) => None,
        }
    }

    /// Recover the concrete entity, consuming the value. Returns `None` for
    /// raw items and for type mismatches.
    pub fn downcast<T: Send + Sync + 'static>(self) -> Option<T> {
        match self {
            QueryValue::Known { value, .. } => value.downcast::<T>().ok().map(|boxed| *boxed),
            QueryValue::Raw(_) => None,
        }
    }

    /// Borrow the concrete entity without consuming the value.
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        match self {
            QueryValue::Known { value, .. } => value.downcast_ref::<T>(),
            QueryValue::Raw(_) => None,
        }
    }

    /// The raw attribute map, for items that bypassed the registry.
    pub fn raw(&self) -> Option<&Item> {
        match self {
            QueryValue::Raw(item) => Some(item),
            QueryValue::Known { .. } => None,
        }
    }
}

impl fmt::Debug for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Known { entity_type, .. } => f
                .debug_struct("Known")
                .field("entity_type", entity_type)
                .finish_non_exhaustive(),
            QueryValue::Raw(item) => f.debug_tuple("Raw").field(&item.keys()).finish(),
        }
    }
}
