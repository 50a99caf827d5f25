//! Fluent builder for queries against named secondary indexes.

use aws_sdk_dynamodb::types::AttributeValue;
use monotable_core::storage::{
    EntityStream, Item, QueryParams, Result, StoreError, StreamOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::indexes;
use crate::registry;
use crate::store::DynamoStore;

#[derive(Debug, Clone)]
enum SortCondition {
    Equals(String),
    Prefix(String),
    GreaterThan(String),
    LessThan(String),
    GreaterOrEqual(String),
    LessOrEqual(String),
    Between(String, String),
}

/// Accumulates an index query and produces neutral query parameters.
///
/// The builder works in logical terms (an index tag like `GSI1` plus the
/// entity's key patterns); `build` resolves everything to the physical
/// attribute names the provider sees. Sort-key operators are mutually
/// exclusive: the last one set wins.
pub struct IndexQueryBuilder<'a, T> {
    store: &'a DynamoStore<T>,
    index_tag: String,
    partition_value: Option<String>,
    sort_condition: Option<SortCondition>,
    filters: Vec<String>,
    filter_values: Item,
    limit: Option<i32>,
    scan_forward: Option<bool>,
}

impl<T> DynamoStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Starts an index query against `GSI1`.
    pub fn query_index(&self) -> IndexQueryBuilder<'_, T> {
        IndexQueryBuilder {
            store: self,
            index_tag: "GSI1".to_string(),
            partition_value: None,
            sort_condition: None,
            filters: Vec::new(),
            filter_values: Item::new(),
            limit: None,
            scan_forward: None,
        }
    }

    /// Queries an index by partition value alone.
    pub async fn query_by_index_partition(&self, value: &str) -> Result<Vec<T>> {
        self.query_index()
            .with_partition_key(value)
            .execute()
            .await
    }

    /// Queries an index by partition value and sort-key prefix.
    pub async fn query_by_index_prefix(&self, value: &str, prefix: &str) -> Result<Vec<T>> {
        self.query_index()
            .with_partition_key(value)
            .with_sort_key_prefix(prefix)
            .execute()
            .await
    }

    /// Queries an index by partition value with an additional filter.
    pub async fn query_by_index_filter(
        &self,
        value: &str,
        filter: &str,
        filter_values: Item,
    ) -> Result<Vec<T>> {
        self.query_index()
            .with_partition_key(value)
            .with_filter(filter, filter_values)
            .execute()
            .await
    }
}

impl<'a, T> IndexQueryBuilder<'a, T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Targets a different index tag (default `GSI1`).
    pub fn on_index(mut self, tag: &str) -> Self {
        self.index_tag = tag.to_string();
        self
    }

    /// Sets the partition value. Required.
    ///
    /// The literal prefix of the index's partition pattern (the text before
    /// the first macro) is prepended unless the value already contains the
    /// `#` separator, in which case it is used verbatim.
    pub fn with_partition_key(mut self, value: &str) -> Self {
        self.partition_value = Some(value.to_string());
        self
    }

    /// Sort key equality.
    pub fn with_sort_key(mut self, value: &str) -> Self {
        self.sort_condition = Some(SortCondition::Equals(value.to_string()));
        self
    }

    /// Sort key `begins_with`.
    pub fn with_sort_key_prefix(mut self, prefix: &str) -> Self {
        self.sort_condition = Some(SortCondition::Prefix(prefix.to_string()));
        self
    }

    pub fn with_sort_key_greater_than(mut self, value: &str) -> Self {
        self.sort_condition = Some(SortCondition::GreaterThan(value.to_string()));
        self
    }

    pub fn with_sort_key_less_than(mut self, value: &str) -> Self {
        self.sort_condition = Some(SortCondition::LessThan(value.to_string()));
        self
    }

    pub fn with_sort_key_greater_or_equal(mut self, value: &str) -> Self {
        self.sort_condition = Some(SortCondition::GreaterOrEqual(value.to_string()));
        self
    }

    pub fn with_sort_key_less_or_equal(mut self, value: &str) -> Self {
        self.sort_condition = Some(SortCondition::LessOrEqual(value.to_string()));
        self
    }

    /// Sort key `BETWEEN start AND end` (inclusive on both ends).
    pub fn with_sort_key_between(mut self, start: &str, end: &str) -> Self {
        self.sort_condition =
            Some(SortCondition::Between(start.to_string(), end.to_string()));
        self
    }

    /// Adds a filter expression fragment. Multiple filters concatenate with
    /// `AND`; their placeholder values merge into one map.
    pub fn with_filter(mut self, expression: &str, values: Item) -> Self {
        self.filters.push(expression.to_string());
        self.filter_values.extend(values);
        self
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the traversal direction; `false` is descending.
    pub fn with_scan_forward(mut self, forward: bool) -> Self {
        self.scan_forward = Some(forward);
        self
    }

    /// Produces the neutral query parameters.
    ///
    /// Key conditions reference the physical attribute names of the chosen
    /// index, never the logical `GSI1PK`-style names that key patterns use.
    pub fn build(&self) -> Result<QueryParams> {
        let partition = self.partition_value.as_deref().ok_or_else(|| {
            StoreError::BuilderValidation("index partition key value is required".to_string())
        })?;

        let binding = registry::binding_for::<T>()?;
        let config = indexes::index_config(&self.index_tag).ok_or_else(|| {
            StoreError::BuilderValidation(format!("unknown index {:?}", self.index_tag))
        })?;

        let pk_logical = format!("{}PK", self.index_tag);
        let pk_pattern = binding.patterns.get(&pk_logical).ok_or_else(|| {
            StoreError::BuilderValidation(format!(
                "{pk_logical} is not declared in the key patterns for this type"
            ))
        })?;

        let mut conditions = vec![format!("{} = :pk", config.partition_key)];
        let mut values = Item::new();
        values.insert(
            ":pk".to_string(),
            AttributeValue::S(apply_pattern_prefix(pk_pattern, partition)),
        );

        if let Some(sort) = &self.sort_condition {
            let sk_logical = format!("{}SK", self.index_tag);
            let sk_pattern = binding.patterns.get(&sk_logical).ok_or_else(|| {
                StoreError::BuilderValidation(format!(
                    "sort condition set but {sk_logical} is not declared in the key patterns"
                ))
            })?;
            let sk = config.sort_key;
            let prefixed = |value: &str| apply_pattern_prefix(sk_pattern, value);

            match sort {
                SortCondition::Equals(value) => {
                    conditions.push(format!("{sk} = :sk"));
                    values.insert(":sk".to_string(), AttributeValue::S(prefixed(value)));
                }
                SortCondition::Prefix(value) => {
                    conditions.push(format!("begins_with({sk}, :sk)"));
                    values.insert(":sk".to_string(), AttributeValue::S(prefixed(value)));
                }
                SortCondition::GreaterThan(value) => {
                    conditions.push(format!("{sk} > :sk"));
                    values.insert(":sk".to_string(), AttributeValue::S(prefixed(value)));
                }
                SortCondition::LessThan(value) => {
                    conditions.push(format!("{sk} < :sk"));
                    values.insert(":sk".to_string(), AttributeValue::S(prefixed(value)));
                }
                SortCondition::GreaterOrEqual(value) => {
                    conditions.push(format!("{sk} >= :sk"));
                    values.insert(":sk".to_string(), AttributeValue::S(prefixed(value)));
                }
                SortCondition::LessOrEqual(value) => {
                    conditions.push(format!("{sk} <= :sk"));
                    values.insert(":sk".to_string(), AttributeValue::S(prefixed(value)));
                }
                SortCondition::Between(start, end) => {
                    conditions.push(format!("{sk} BETWEEN :sk AND :sk2"));
                    values.insert(":sk".to_string(), AttributeValue::S(prefixed(start)));
                    values.insert(":sk2".to_string(), AttributeValue::S(prefixed(end)));
                }
            }
        }

        let mut params = QueryParams {
            table_name: self.store.table_name().to_string(),
            key_condition_expression: conditions.join(" AND "),
            expression_attribute_values: values,
            index_name: Some(config.index_name.to_string()),
            limit: self.limit,
            scan_index_forward: self.scan_forward,
            ..Default::default()
        };

        if !self.filters.is_empty() {
            params.filter_expression = Some(self.filters.join(" AND "));
            params
                .expression_attribute_values
                .extend(self.filter_values.clone());
        }

        Ok(params)
    }

    /// Builds and executes the query, keeping results of type `T`.
    pub async fn execute(&self) -> Result<Vec<T>> {
        let params = self.build()?;
        self.store.query_typed(&params).await
    }

    /// Builds the query and executes it as a stream.
    pub fn stream(&self, options: StreamOptions) -> Result<EntityStream<T>> {
        let params = self.build()?;
        Ok(self.store.stream(params, options))
    }
}

/// Prepends the template's literal prefix (everything before the first
/// macro) to a user-supplied value. A value that already contains the `#`
/// separator is treated as pre-expanded and used verbatim.
fn apply_pattern_prefix(pattern: &str, value: &str) -> String {
    if value.contains('#') {
        return value.to_string();
    }
    match pattern.find('{') {
        Some(idx) if idx > 0 => format!("{}{}", &pattern[..idx], value),
        _ => value.to_string(),
    }
}
