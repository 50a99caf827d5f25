use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use super::stream::{EntityStream, StreamOptions};
use super::types::{KeyInput, QueryParams, QueryValue};
use super::Result;

/// Type-safe storage operations for entities of type `T`.
///
/// Implementations bind `T` to a physical table through registered key
/// patterns; entities carry their own identity and the store never
/// synthesizes it.
#[async_trait]
pub trait DataStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Retrieves a single entity by its identifier, expanding the registered
    /// key patterns against the scalar.
    async fn get_one(&self, key: &str) -> Result<T>;

    /// Retrieves an entity by exact partition and sort key values, for
    /// composite keys that a single identifier cannot reconstruct.
    async fn get_by_key(&self, pk: &str, sk: &str) -> Result<T>;

    /// Upserts the entity, deriving primary and index keys from its
    /// attributes.
    async fn put(&self, entity: &T) -> Result<()>;

    /// Applies an attribute update map under a condition expression.
    /// Compare-and-set semantics: a false condition fails with
    /// `ConditionFailed`.
    async fn update_with_condition(
        &self,
        key: KeyInput<'_, T>,
        updates: HashMap<String, AttributeValue>,
        condition: &str,
    ) -> Result<()>;

    /// Deletes the entity with the given identifier. Deleting an absent
    /// entity fails with `NotFound`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Executes one query page, returning heterogeneous results decoded
    /// through the `EntityType` discriminator.
    async fn query(&self, params: &QueryParams) -> Result<Vec<QueryValue>>;

    /// Executes a query as a paginated, cancellable stream of records.
    async fn stream(&self, params: QueryParams, options: StreamOptions) -> EntityStream<T>;
}
