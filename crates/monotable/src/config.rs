//! Store configuration loaded from environment variables.

use std::env;

/// Connection settings for a DynamoDB-backed store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Physical table name (default: "monotable").
    pub table_name: String,
    /// AWS region (default: "us-east-1").
    pub region: String,
    /// Custom endpoint URL, for local DynamoDB.
    pub endpoint_url: Option<String>,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DYNAMODB_TABLE_NAME` - Table name (default: "monotable")
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `AWS_ENDPOINT_URL` - Endpoint override for local DynamoDB
    pub fn from_env() -> Self {
        Self {
            table_name: env::var("DYNAMODB_TABLE_NAME")
                .unwrap_or_else(|_| "monotable".to_string()),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
        }
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({url})"),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
