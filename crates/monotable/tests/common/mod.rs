//! Shared test fixtures: a scripted in-memory provider double and the
//! entity types the scenarios use.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use monotable::registry::register_entity;
use monotable::{
    DynamoStore, Item, KeyPatterns, QueryPage, QueryRequest, Result, StoreError, TableClient,
    UpdateRequest,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// ============================================================================
// Test entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSystem {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "Amount")]
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "EventID")]
    pub event_id: String,
    #[serde(rename = "StreamID")]
    pub stream_id: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: String,
}

fn patterns(pairs: &[(&str, &str)]) -> KeyPatterns {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Registers every test entity exactly once per test binary.
pub fn register_all() {
    static REGISTER: Lazy<()> = Lazy::new(|| {
        register_entity::<RatingSystem>(
            "RatingSystem",
            patterns(&[("PK", "{ID}"), ("SK", "{ID}")]),
        )
        .unwrap();
        register_entity::<Order>(
            "Order",
            patterns(&[("PK", "USER#{UserID}"), ("SK", "ORDER#{OrderID}")]),
        )
        .unwrap();
        register_entity::<Contact>(
            "Contact",
            patterns(&[
                ("PK", "ENTITY#{ID}"),
                ("SK", "ENTITY#{ID}"),
                ("GSI1PK", "EMAIL#{Email}"),
                ("GSI1SK", "STATUS#{Status}"),
            ]),
        )
        .unwrap();
        register_entity::<EventRecord>(
            "EventRecord",
            patterns(&[
                ("PK", "EVENT#{EventID}"),
                ("SK", "EVENT#{EventID}"),
                ("GSI1PK", "STREAM#{StreamID}"),
                ("GSI1SK", "{CreatedAt}"),
            ]),
        )
        .unwrap();
    });
    Lazy::force(&REGISTER);
}

pub const TABLE: &str = "test-table";

pub fn store_over<T>(client: &Arc<MockTableClient>) -> DynamoStore<T>
where
    T: Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    register_all();
    DynamoStore::new(client.clone(), TABLE)
}

/// Handcrafts a stored Order item, the way `put` would have written it.
pub fn order_item(user_id: &str, order_id: &str, amount: i64) -> Item {
    let mut item = Item::new();
    item.insert(
        "PK".to_string(),
        AttributeValue::S(format!("USER#{user_id}")),
    );
    item.insert(
        "SK".to_string(),
        AttributeValue::S(format!("ORDER#{order_id}")),
    );
    item.insert(
        "EntityType".to_string(),
        AttributeValue::S("Order".to_string()),
    );
    item.insert("UserID".to_string(), AttributeValue::S(user_id.to_string()));
    item.insert(
        "OrderID".to_string(),
        AttributeValue::S(order_id.to_string()),
    );
    item.insert("Amount".to_string(), AttributeValue::N(amount.to_string()));
    item
}

// ============================================================================
// Mock provider
// ============================================================================

/// Everything the mock saw, for asserting on issued requests.
#[derive(Debug, Clone)]
pub enum RecordedCall {
    GetItem { table: String, key: Item },
    PutItem { table: String, item: Item },
    UpdateItem { table: String, condition: Option<String> },
    DeleteItem { table: String, key: Item },
    Query { table: String, request: QueryRequest },
}

/// In-memory `TableClient` double.
///
/// Point operations run against a real key-value map with DynamoDB's
/// conditional semantics. Queries consume a script when one is present
/// (for failure injection), synthesize endless pages when configured (for
/// cancellation tests), and otherwise evaluate the key condition against the
/// stored items with sorting, limits, and cursor pagination.
#[derive(Default)]
pub struct MockTableClient {
    items: Mutex<HashMap<(String, String), Item>>,
    query_script: Mutex<VecDeque<Result<QueryPage>>>,
    endless_page: Mutex<Option<(usize, Item)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTableClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a scripted query response; scripted responses are consumed
    /// before any evaluation happens.
    pub fn script_query(&self, result: Result<QueryPage>) {
        self.query_script.lock().unwrap().push_back(result);
    }

    /// Makes every unscripted query return `per_page` clones of `prototype`
    /// with a continuation cursor, forever.
    pub fn endless_pages(&self, per_page: usize, prototype: Item) {
        *self.endless_page.lock().unwrap() = Some((per_page, prototype));
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn query_call_count(&self) -> usize {
        self.recorded()
            .iter()
            .filter(|call| matches!(call, RecordedCall::Query { .. }))
            .count()
    }

    pub fn stored(&self, pk: &str, sk: &str) -> Option<Item> {
        self.items
            .lock()
            .unwrap()
            .get(&(pk.to_string(), sk.to_string()))
            .cloned()
    }

    /// Seeds an item directly, bypassing the store's write path.
    pub fn seed(&self, item: Item) {
        let key = Self::key_of(&item);
        self.items.lock().unwrap().insert(key, item);
    }

    fn key_of(item: &Item) -> (String, String) {
        let pk = match item.get("PK") {
            Some(AttributeValue::S(s)) => s.clone(),
            other => panic!("item has no string PK: {other:?}"),
        };
        let sk = match item.get("SK") {
            Some(AttributeValue::S(s)) => s.clone(),
            other => panic!("item has no string SK: {other:?}"),
        };
        (pk, sk)
    }

    fn string_attr(item: &Item, name: &str) -> String {
        match item.get(name) {
            Some(AttributeValue::S(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn placeholder_value(request: &QueryRequest, placeholder: &str) -> String {
        match request.expression_attribute_values.get(placeholder) {
            Some(AttributeValue::S(s)) => s.clone(),
            other => panic!("expected string value for {placeholder}, got {other:?}"),
        }
    }

    /// Evaluates the key condition against the stored items, honouring sort
    /// direction, limit, and cursor pagination.
    fn evaluate(&self, request: &QueryRequest) -> QueryPage {
        let expression = request.key_condition_expression.as_str();
        let (pk_clause, sort_clause) = match expression.split_once(" AND ") {
            Some((first, rest)) => (first, Some(rest)),
            None => (expression, None),
        };

        let pk_tokens: Vec<&str> = pk_clause.split_whitespace().collect();
        assert_eq!(pk_tokens.len(), 3, "unsupported key condition: {pk_clause}");
        let pk_attr = pk_tokens[0].to_string();
        let pk_value = Self::placeholder_value(request, pk_tokens[2]);
        // Physical naming pairs the sort attribute with the partition
        // attribute: PK -> SK, PK1 -> SK1.
        let sort_attr = format!("SK{}", &pk_attr[2..]);

        let items = self.items.lock().unwrap();
        let mut matched: Vec<Item> = items
            .values()
            .filter(|item| Self::string_attr(item, &pk_attr) == pk_value)
            .filter(|item| match sort_clause {
                None => true,
                Some(clause) => Self::matches_sort(request, item, clause),
            })
            .cloned()
            .collect();
        drop(items);

        matched.sort_by_key(|item| Self::string_attr(item, &sort_attr));
        if request.scan_index_forward == Some(false) {
            matched.reverse();
        }

        if let Some(cursor) = &request.exclusive_start_key {
            if let Some(AttributeValue::S(marker)) = cursor.get(&sort_attr) {
                if let Some(pos) = matched
                    .iter()
                    .position(|item| Self::string_attr(item, &sort_attr) == *marker)
                {
                    matched.drain(..=pos);
                }
            }
        }

        let limit = request.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let has_more = matched.len() > limit;
        let page: Vec<Item> = matched.into_iter().take(limit).collect();
        let last_evaluated_key = if has_more {
            page.last().map(|item| {
                let mut cursor = Item::new();
                cursor.insert(
                    sort_attr.clone(),
                    AttributeValue::S(Self::string_attr(item, &sort_attr)),
                );
                cursor
            })
        } else {
            None
        };

        QueryPage {
            items: page,
            last_evaluated_key,
        }
    }

    fn matches_sort(request: &QueryRequest, item: &Item, clause: &str) -> bool {
        if let Some(inner) = clause
            .strip_prefix("begins_with(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let (attr, placeholder) = inner.split_once(", ").expect("begins_with arguments");
            let prefix = Self::placeholder_value(request, placeholder);
            return Self::string_attr(item, attr).starts_with(&prefix);
        }

        let tokens: Vec<&str> = clause.split_whitespace().collect();
        match tokens.as_slice() {
            [attr, "BETWEEN", low, "AND", high] => {
                let value = Self::string_attr(item, attr);
                value >= Self::placeholder_value(request, low)
                    && value <= Self::placeholder_value(request, high)
            }
            [attr, op, placeholder] => {
                let value = Self::string_attr(item, attr);
                let bound = Self::placeholder_value(request, placeholder);
                match *op {
                    "=" => value == bound,
                    "<" => value < bound,
                    ">" => value > bound,
                    "<=" => value <= bound,
                    ">=" => value >= bound,
                    _ => panic!("unsupported sort operator: {op}"),
                }
            }
            _ => panic!("unsupported sort clause: {clause}"),
        }
    }

    /// Supports the existence conditions the store issues; anything else is
    /// assumed to hold.
    fn condition_holds(condition: Option<&str>, exists: bool) -> bool {
        match condition {
            Some(expr) if expr.starts_with("attribute_exists(") => exists,
            Some(expr) if expr.starts_with("attribute_not_exists(") => !exists,
            _ => true,
        }
    }
}

#[async_trait]
impl TableClient for MockTableClient {
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        self.calls.lock().unwrap().push(RecordedCall::GetItem {
            table: table.to_string(),
            key: key.clone(),
        });
        let lookup = Self::key_of(&key);
        Ok(self.items.lock().unwrap().get(&lookup).cloned())
    }

    async fn put_item(&self, table: &str, item: Item, condition: Option<&str>) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall::PutItem {
            table: table.to_string(),
            item: item.clone(),
        });
        let key = Self::key_of(&item);
        let mut items = self.items.lock().unwrap();
        if !Self::condition_holds(condition, items.contains_key(&key)) {
            return Err(StoreError::ConditionFailed {
                operation: "put".to_string(),
                condition: condition.unwrap_or_default().to_string(),
            });
        }
        items.insert(key, item);
        Ok(())
    }

    async fn update_item(&self, table: &str, request: UpdateRequest) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall::UpdateItem {
            table: table.to_string(),
            condition: request.condition_expression.clone(),
        });
        let key = Self::key_of(&request.key);
        let mut items = self.items.lock().unwrap();
        let exists = items.contains_key(&key);
        if !Self::condition_holds(request.condition_expression.as_deref(), exists) {
            return Err(StoreError::ConditionFailed {
                operation: "update".to_string(),
                condition: request.condition_expression.unwrap_or_default(),
            });
        }

        let entry = items.entry(key).or_insert_with(|| request.key.clone());
        let clauses = request
            .update_expression
            .strip_prefix("SET ")
            .expect("SET expression");
        for clause in clauses.split(", ") {
            let (name_placeholder, value_placeholder) =
                clause.split_once(" = ").expect("assignment clause");
            let attr = request.expression_attribute_names[name_placeholder].clone();
            let value = request.expression_attribute_values[value_placeholder].clone();
            entry.insert(attr, value);
        }
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: Item, condition: Option<&str>) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall::DeleteItem {
            table: table.to_string(),
            key: key.clone(),
        });
        let lookup = Self::key_of(&key);
        let mut items = self.items.lock().unwrap();
        if !Self::condition_holds(condition, items.contains_key(&lookup)) {
            return Err(StoreError::ConditionFailed {
                operation: "delete".to_string(),
                condition: condition.unwrap_or_default().to_string(),
            });
        }
        items.remove(&lookup);
        Ok(())
    }

    async fn query(&self, table: &str, request: QueryRequest) -> Result<QueryPage> {
        self.calls.lock().unwrap().push(RecordedCall::Query {
            table: table.to_string(),
            request: request.clone(),
        });

        if let Some(scripted) = self.query_script.lock().unwrap().pop_front() {
            return scripted;
        }

        if let Some((per_page, prototype)) = self.endless_page.lock().unwrap().clone() {
            let mut cursor = Item::new();
            cursor.insert(
                "PK".to_string(),
                AttributeValue::S("endless".to_string()),
            );
            return Ok(QueryPage {
                items: vec![prototype; per_page],
                last_evaluated_key: Some(cursor),
            });
        }

        Ok(self.evaluate(&request))
    }
}
