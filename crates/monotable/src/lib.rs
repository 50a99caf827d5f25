//! Typed object persistence over DynamoDB single-table designs.
//!
//! Multiple entity kinds share one physical table: composite keys are derived
//! from entity attributes through registered key-pattern templates, and every
//! written item carries an `EntityType` discriminator that selects the
//! deserializer on the way back out.
//!
//! # Overview
//!
//! - [`registry`] binds entity types to key patterns and deserializers at
//!   process startup.
//! - [`DynamoStore`] provides point CRUD, conditional updates, one-page
//!   queries, and paginated streaming for a single entity type.
//! - [`IndexQueryBuilder`] and [`TimeRangeQueryBuilder`] assemble key
//!   conditions against named secondary indexes, resolving logical index
//!   names to the physical attribute names the provider sees.
//! - [`StoreManager`] registers heterogeneous stores under string keys.
//!
//! # Example
//!
//! ```rust,ignore
//! use monotable::{registry, DynamoStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Order {
//!     #[serde(rename = "UserID")]
//!     user_id: String,
//!     #[serde(rename = "OrderID")]
//!     order_id: String,
//! }
//!
//! registry::register_entity::<Order>(
//!     "Order",
//!     [
//!         ("PK".to_string(), "USER#{UserID}".to_string()),
//!         ("SK".to_string(), "ORDER#{OrderID}".to_string()),
//!     ]
//!     .into(),
//! )?;
//!
//! let store: DynamoStore<Order> = DynamoStore::from_env().await?;
//! store.put(&order).await?;
//! # Ok::<(), monotable::StoreError>(())
//! ```

pub mod client;
pub mod config;
mod error;
pub mod indexes;
pub mod keys;
pub mod manager;
pub mod query;
pub mod registry;
pub mod store;

pub use monotable_core::storage::{
    DataStore, EntityStream, ErrorHandler, Item, KeyInput, KeyPatterns, ProgressHandler,
    QueryParams, QueryValue, Result, StoreError, StreamMeta, StreamOptions, StreamProgress,
    StreamResult,
};

pub use client::{AwsTableClient, QueryPage, QueryRequest, TableClient, UpdateRequest};
pub use config::StoreConfig;
pub use manager::StoreManager;
pub use query::{format_timestamp, IndexQueryBuilder, TimeRangeQueryBuilder, TimeWindowIterator};
pub use store::{DynamoStore, ENTITY_TYPE_ATTRIBUTE};
