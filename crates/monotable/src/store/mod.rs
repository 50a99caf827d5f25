//! Typed store over one DynamoDB table.

mod conversions;
mod query;
mod stream;

use conversions::{build_update_expression, decode_typed};

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use monotable_core::storage::{
    DataStore, EntityStream, Item, KeyInput, QueryParams, QueryValue, Result, StoreError,
    StreamOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{AwsTableClient, QueryRequest, TableClient};
use crate::config::StoreConfig;
use crate::registry::{self, EntityBinding};
use crate::{indexes, keys};

/// Reserved item attribute carrying the registered type-name discriminator.
pub const ENTITY_TYPE_ATTRIBUTE: &str = "EntityType";

/// Type-safe storage for entities of type `T` in a single DynamoDB table.
///
/// The store holds an immutable client handle and the configured table name;
/// it is a value, cheap to clone, and safe for concurrent use from any number
/// of tasks. Key derivation and deserialization go through the process-wide
/// registries, so `T` must be registered (see [`registry::register_entity`])
/// before the store is used.
pub struct DynamoStore<T> {
    client: Arc<dyn TableClient>,
    table_name: String,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DynamoStore<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            table_name: self.table_name.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> DynamoStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a store over the given client and table.
    pub fn new(client: Arc<dyn TableClient>, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            marker: PhantomData,
        }
    }

    /// Creates a store from environment configuration: table name, region,
    /// and optional local endpoint (see [`StoreConfig::from_env`]), with the
    /// default AWS credential chain.
    pub async fn from_env() -> Result<Self> {
        let config = StoreConfig::from_env();
        let client = AwsTableClient::from_config(&config).await;
        Ok(Self::new(Arc::new(client), config.table_name))
    }

    /// Creates a store with static AWS credentials.
    pub async fn with_static_credentials(
        access_key: &str,
        secret_key: &str,
        region: &str,
        table_name: impl Into<String>,
    ) -> Result<Self> {
        let client = AwsTableClient::with_static_credentials(access_key, secret_key, region).await;
        Ok(Self::new(Arc::new(client), table_name))
    }

    /// The configured table name. Every request this store issues targets
    /// this table, regardless of what query parameters carry.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub(crate) fn client(&self) -> &Arc<dyn TableClient> {
        &self.client
    }

    pub(crate) fn binding() -> Result<Arc<EntityBinding>> {
        registry::binding_for::<T>()
    }

    /// Retrieves a single entity by its identifier.
    ///
    /// The identifier is substituted for every macro in the registered key
    /// patterns. When the expansion yields both primary key halves a point
    /// `GetItem` is issued; otherwise the lookup falls back to a `Limit=1`
    /// query on the expanded partition key.
    pub async fn get_one(&self, key: &str) -> Result<T> {
        let binding = Self::binding()?;
        let expanded = keys::expand_scalar(&binding.patterns, key);

        let pk = expanded.get("PK").filter(|v| !v.is_empty());
        let sk = expanded.get("SK").filter(|v| !v.is_empty());

        let found = match (pk, sk) {
            (Some(_), Some(_)) => {
                let key_item = keys::primary_key(&expanded)?;
                self.client.get_item(&self.table_name, key_item).await?
            }
            (Some(pk), None) => self.query_one(pk, None).await?,
            _ => {
                return Err(StoreError::KeyExpansion(
                    "key patterns expanded to an empty PK".to_string(),
                ))
            }
        };

        let item = found.ok_or_else(|| StoreError::NotFound {
            entity_type: binding.entity_type.clone(),
            key: key.to_string(),
        })?;
        decode_typed(&item)
    }

    /// Retrieves an entity by exact partition and sort key values. Useful for
    /// composite keys that `get_one` cannot reconstruct from one identifier.
    pub async fn get_by_key(&self, pk: &str, sk: &str) -> Result<T> {
        let binding = Self::binding()?;

        let mut key_item = Item::new();
        key_item.insert("PK".to_string(), AttributeValue::S(pk.to_string()));
        key_item.insert("SK".to_string(), AttributeValue::S(sk.to_string()));

        let found = self.client.get_item(&self.table_name, key_item).await?;
        let item = found.ok_or_else(|| StoreError::NotFound {
            entity_type: binding.entity_type.clone(),
            key: format!("{pk}/{sk}"),
        })?;
        decode_typed(&item)
    }

    /// Upserts the entity.
    ///
    /// Keys are expanded from the entity's own attributes and stored under
    /// the physical attribute names; the `EntityType` discriminator is
    /// attached alongside the entity's attributes.
    pub async fn put(&self, entity: &T) -> Result<()> {
        let item = self.marshal_for_write(entity)?;
        tracing::debug!(table = %self.table_name, "putting item");
        self.client.put_item(&self.table_name, item, None).await
    }

    /// Creates the entity only if no item exists under its primary key.
    /// Fails with `AlreadyExists` otherwise; `put` remains the upsert path.
    pub async fn put_if_absent(&self, entity: &T) -> Result<()> {
        let binding = Self::binding()?;
        let item = self.marshal_for_write(entity)?;
        let pk = match item.get("PK") {
            Some(AttributeValue::S(pk)) => pk.clone(),
            _ => String::new(),
        };

        match self
            .client
            .put_item(&self.table_name, item, Some("attribute_not_exists(PK)"))
            .await
        {
            Err(StoreError::ConditionFailed { .. }) => Err(StoreError::AlreadyExists {
                entity_type: binding.entity_type.clone(),
                key: pk,
            }),
            other => other,
        }
    }

    /// Applies an attribute update map under a condition expression.
    ///
    /// The update renders as a `SET` expression with generated name/value
    /// placeholders; a false condition fails with `ConditionFailed` and is
    /// never retried.
    pub async fn update_with_condition(
        &self,
        key: KeyInput<'_, T>,
        updates: HashMap<String, AttributeValue>,
        condition: &str,
    ) -> Result<()> {
        let binding = Self::binding()?;
        let expanded = match key {
            KeyInput::Id(id) => keys::expand_scalar(&binding.patterns, id),
            KeyInput::Entity(entity) => {
                let item: Item = serde_dynamo::to_item(entity)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                keys::expand(&binding.patterns, &item)
            }
        };
        let key_item = keys::primary_key(&expanded)?;

        let (update_expression, names, values) = build_update_expression(&updates)?;
        let request = crate::client::UpdateRequest {
            key: key_item,
            update_expression,
            expression_attribute_names: names,
            expression_attribute_values: values,
            condition_expression: Some(condition.to_string()),
        };
        tracing::debug!(table = %self.table_name, condition, "updating item");
        self.client.update_item(&self.table_name, request).await
    }

    /// Deletes the entity with the given identifier. Deleting an absent
    /// entity fails with `NotFound`.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let binding = Self::binding()?;
        let expanded = keys::expand_scalar(&binding.patterns, key);
        let key_item = keys::primary_key(&expanded)?;

        tracing::debug!(table = %self.table_name, key, "deleting item");
        match self
            .client
            .delete_item(&self.table_name, key_item, Some("attribute_exists(PK)"))
            .await
        {
            Err(StoreError::ConditionFailed { .. }) => Err(StoreError::NotFound {
                entity_type: binding.entity_type.clone(),
                key: key.to_string(),
            }),
            other => other,
        }
    }

    /// Marshals the entity and merges in its expanded keys (under physical
    /// attribute names) and the `EntityType` discriminator.
    fn marshal_for_write(&self, entity: &T) -> Result<Item> {
        let binding = Self::binding()?;
        let mut item: Item =
            serde_dynamo::to_item(entity).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let expanded = keys::expand(&binding.patterns, &item);
        for required in ["PK", "SK"] {
            if expanded.get(required).map_or(true, |v| v.is_empty()) {
                return Err(StoreError::Validation {
                    field: required.to_string(),
                    message: "key pattern expanded to an empty string".to_string(),
                });
            }
        }

        for (logical, value) in &expanded {
            // Index attributes with empty expansions are left off the item so
            // it stays out of that index (sparse-index behaviour).
            if value.is_empty() {
                continue;
            }
            let physical = indexes::physical_attribute(logical).ok_or_else(|| {
                StoreError::Validation {
                    field: logical.clone(),
                    message: "key pattern references no configured index".to_string(),
                }
            })?;
            item.insert(physical.to_string(), AttributeValue::S(value.clone()));
        }

        item.insert(
            ENTITY_TYPE_ATTRIBUTE.to_string(),
            AttributeValue::S(binding.entity_type.clone()),
        );
        Ok(item)
    }

    /// Point query fallback for key patterns without a usable sort key.
    async fn query_one(&self, pk: &str, sk: Option<&str>) -> Result<Option<Item>> {
        let mut key_condition = "PK = :pk".to_string();
        let mut values = Item::new();
        values.insert(":pk".to_string(), AttributeValue::S(pk.to_string()));
        if let Some(sk) = sk {
            key_condition.push_str(" AND SK = :sk");
            values.insert(":sk".to_string(), AttributeValue::S(sk.to_string()));
        }

        let request = QueryRequest {
            key_condition_expression: key_condition,
            expression_attribute_values: values,
            limit: Some(1),
            ..Default::default()
        };
        let page = self.client.query(&self.table_name, request).await?;
        Ok(page.items.into_iter().next())
    }
}

#[async_trait]
impl<T> DataStore<T> for DynamoStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get_one(&self, key: &str) -> Result<T> {
        DynamoStore::get_one(self, key).await
    }

    async fn get_by_key(&self, pk: &str, sk: &str) -> Result<T> {
        DynamoStore::get_by_key(self, pk, sk).await
    }

    async fn put(&self, entity: &T) -> Result<()> {
        DynamoStore::put(self, entity).await
    }

    async fn update_with_condition(
        &self,
        key: KeyInput<'_, T>,
        updates: HashMap<String, AttributeValue>,
        condition: &str,
    ) -> Result<()> {
        DynamoStore::update_with_condition(self, key, updates, condition).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        DynamoStore::delete(self, key).await
    }

    async fn query(&self, params: &QueryParams) -> Result<Vec<QueryValue>> {
        DynamoStore::query(self, params).await
    }

    async fn stream(&self, params: QueryParams, options: StreamOptions) -> EntityStream<T> {
        DynamoStore::stream(self, params, options)
    }
}
