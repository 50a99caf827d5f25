//! Provider client seam.
//!
//! [`TableClient`] is the narrow contract the store needs from the provider:
//! point item operations and a single-page query. [`AwsTableClient`]
//! implements it over `aws-sdk-dynamodb`; tests implement it with scripted
//! doubles. Error classification happens at this seam so nothing above it
//! ever sees SDK error types.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::Client;
use monotable_core::storage::{Item, QueryParams, Result};

use crate::config::StoreConfig;
use crate::error::{
    map_delete_item_error, map_get_item_error, map_put_item_error, map_query_error,
    map_update_item_error,
};

/// A conditional attribute update against one item.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub key: Item,
    /// `SET #f0 = :v0, ...`
    pub update_expression: String,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: Item,
    pub condition_expression: Option<String>,
}

/// One page of a query, independent of the table it targets.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub expression_attribute_values: Item,
    pub index_name: Option<String>,
    pub limit: Option<i32>,
    pub scan_index_forward: Option<bool>,
    pub exclusive_start_key: Option<Item>,
}

impl From<&QueryParams> for QueryRequest {
    /// Carries everything except the table name: the store substitutes its
    /// own configured table regardless of what the params say.
    fn from(params: &QueryParams) -> Self {
        Self {
            key_condition_expression: params.key_condition_expression.clone(),
            filter_expression: params.filter_expression.clone(),
            expression_attribute_values: params.expression_attribute_values.clone(),
            index_name: params.index_name.clone(),
            limit: params.limit,
            scan_index_forward: params.scan_index_forward,
            exclusive_start_key: params.exclusive_start_key.clone(),
        }
    }
}

/// A query response page.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Continuation cursor; `None` or empty means the result set is drained.
    pub last_evaluated_key: Option<Item>,
}

/// The operations the persistence layer requires from the provider.
#[async_trait]
pub trait TableClient: Send + Sync {
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>>;

    async fn put_item(&self, table: &str, item: Item, condition: Option<&str>) -> Result<()>;

    async fn update_item(&self, table: &str, request: UpdateRequest) -> Result<()>;

    async fn delete_item(&self, table: &str, key: Item, condition: Option<&str>) -> Result<()>;

    async fn query(&self, table: &str, request: QueryRequest) -> Result<QueryPage>;
}

/// `TableClient` over the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsTableClient {
    client: Client,
}

impl AwsTableClient {
    /// Wraps an existing SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default AWS credential chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }

    /// Builds a client honouring the store configuration's region and
    /// optional endpoint override (for local DynamoDB).
    pub async fn from_config(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }

    /// Builds a client with static credentials.
    pub async fn with_static_credentials(
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "monotable");
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl TableClient for AwsTableClient {
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let out = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(map_get_item_error)?;
        Ok(out.item)
    }

    async fn put_item(&self, table: &str, item: Item, condition: Option<&str>) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .set_condition_expression(condition.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, condition))?;
        Ok(())
    }

    async fn update_item(&self, table: &str, request: UpdateRequest) -> Result<()> {
        let condition = request.condition_expression.clone().unwrap_or_default();
        self.client
            .update_item()
            .table_name(table)
            .set_key(Some(request.key))
            .update_expression(request.update_expression)
            .set_expression_attribute_names(Some(request.expression_attribute_names))
            .set_expression_attribute_values(Some(request.expression_attribute_values))
            .set_condition_expression(request.condition_expression)
            .send()
            .await
            .map_err(|e| map_update_item_error(e, &condition))?;
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: Item, condition: Option<&str>) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .set_condition_expression(condition.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, condition))?;
        Ok(())
    }

    async fn query(&self, table: &str, request: QueryRequest) -> Result<QueryPage> {
        let out = self
            .client
            .query()
            .table_name(table)
            .key_condition_expression(request.key_condition_expression)
            .set_filter_expression(request.filter_expression)
            .set_expression_attribute_values(Some(request.expression_attribute_values))
            .set_index_name(request.index_name)
            .set_limit(request.limit)
            .set_scan_index_forward(request.scan_index_forward)
            .set_exclusive_start_key(request.exclusive_start_key)
            .send()
            .await
            .map_err(map_query_error)?;

        Ok(QueryPage {
            items: out.items.unwrap_or_default(),
            last_evaluated_key: out.last_evaluated_key,
        })
    }
}
