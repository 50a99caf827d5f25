//! One-page query execution.

use monotable_core::storage::{QueryParams, QueryValue, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::conversions::{decode_value, split_entity_type};
use super::DynamoStore;
use crate::client::QueryRequest;

impl<T> DynamoStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Executes one query page against the store's table.
    ///
    /// The table name in `params` is ignored: the request always targets the
    /// store's configured table. Each returned item decodes through its
    /// `EntityType` discriminator, so a single-table query may yield a
    /// heterogeneous result set.
    pub async fn query(&self, params: &QueryParams) -> Result<Vec<QueryValue>> {
        tracing::debug!(
            table = %self.table_name(),
            index = params.index_name.as_deref().unwrap_or("<base>"),
            "executing query"
        );
        let page = self
            .client()
            .query(self.table_name(), QueryRequest::from(params))
            .await?;
        page.items.into_iter().map(decode_value).collect()
    }

    /// Executes one query page and keeps only the results that decode to
    /// `T`: registry-decoded values of the right type, plus raw items that
    /// deserialize directly. Other entity kinds are silently dropped.
    pub async fn query_typed(&self, params: &QueryParams) -> Result<Vec<T>> {
        let values = self.query(params).await?;
        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                known @ QueryValue::Known { .. } => known.downcast::<T>(),
                QueryValue::Raw(item) => {
                    let (_, stripped) = split_entity_type(&item);
                    serde_dynamo::from_item(stripped).ok()
                }
            })
            .collect())
    }
}
