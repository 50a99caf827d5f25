//! Time-range builder and window-iterator scenarios.

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{store_over, MockTableClient, EventRecord};
use monotable::{format_timestamp, DynamoStore};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, hour, minute, 0).unwrap()
}

async fn seed_events(store: &DynamoStore<EventRecord>, times: &[(u32, u32)]) {
    for (i, (hour, minute)) in times.iter().enumerate() {
        store
            .put(&EventRecord {
                event_id: format!("e{i}"),
                stream_id: "s1".to_string(),
                created_at: format_timestamp(at(*hour, *minute)),
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_after_builds_physical_time_condition() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);

    let params = store
        .query_time_range("s1")
        .after(at(10, 30))
        .latest()
        .build()
        .unwrap();

    assert_eq!(params.key_condition_expression, "PK1 = :pk AND SK1 > :sk");
    assert_eq!(params.scan_index_forward, Some(false));
    assert_eq!(
        params.expression_attribute_values[":pk"],
        aws_sdk_dynamodb::types::AttributeValue::S("STREAM#s1".to_string())
    );
    assert_eq!(
        params.expression_attribute_values[":sk"],
        aws_sdk_dynamodb::types::AttributeValue::S("2024-03-10T10:30:00Z".to_string())
    );
}

#[tokio::test]
async fn test_between_is_inclusive_and_ordered() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);
    seed_events(&store, &[(9, 0), (10, 0), (10, 30), (11, 0), (12, 0)]).await;

    let events = store
        .query_in_range("s1", at(10, 0), at(11, 0))
        .await
        .unwrap();
    let times: Vec<&str> = events.iter().map(|e| e.created_at.as_str()).collect();
    assert_eq!(
        times,
        vec![
            "2024-03-10T10:00:00Z",
            "2024-03-10T10:30:00Z",
            "2024-03-10T11:00:00Z",
        ]
    );
}

#[tokio::test]
async fn test_query_latest_returns_newest_first() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);
    seed_events(&store, &[(9, 0), (10, 0), (11, 0), (12, 0)]).await;

    let latest = store.query_latest("s1", 2).await.unwrap();
    let times: Vec<&str> = latest.iter().map(|e| e.created_at.as_str()).collect();
    assert_eq!(
        times,
        vec!["2024-03-10T12:00:00Z", "2024-03-10T11:00:00Z"]
    );
}

#[tokio::test]
async fn test_query_since() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);
    seed_events(&store, &[(9, 0), (10, 0), (11, 0)]).await;

    let since = store.query_since("s1", at(9, 30)).await.unwrap();
    assert_eq!(since.len(), 2);
    // Strictly after: an event exactly at the boundary is excluded.
    let at_boundary = store.query_since("s1", at(9, 0)).await.unwrap();
    assert_eq!(at_boundary.len(), 2);
}

#[tokio::test]
async fn test_window_iterator_walks_half_open_slices() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);
    seed_events(&store, &[(10, 0), (10, 30), (11, 0), (11, 45)]).await;

    let mut windows = store.query_time_windows("s1", at(10, 0), at(12, 0), Duration::hours(1));

    // [10:00, 11:00): the 11:00 event belongs to the next slice.
    let (items, has_more) = windows.next().await.unwrap().unwrap();
    let times: Vec<&str> = items.iter().map(|e| e.created_at.as_str()).collect();
    assert_eq!(
        times,
        vec!["2024-03-10T10:00:00Z", "2024-03-10T10:30:00Z"]
    );
    assert!(has_more);

    // [11:00, 12:00)
    let (items, has_more) = windows.next().await.unwrap().unwrap();
    let times: Vec<&str> = items.iter().map(|e| e.created_at.as_str()).collect();
    assert_eq!(
        times,
        vec!["2024-03-10T11:00:00Z", "2024-03-10T11:45:00Z"]
    );
    assert!(!has_more);

    assert!(windows.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_window_iterator_clamps_final_slice() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);
    seed_events(&store, &[(10, 0), (11, 0), (11, 15), (11, 30)]).await;

    let mut windows = store.query_time_windows("s1", at(10, 0), at(11, 30), Duration::hours(1));

    let (items, has_more) = windows.next().await.unwrap().unwrap();
    assert_eq!(items.len(), 1);
    assert!(has_more);

    // Final slice [11:00, 11:30) is clamped; the 11:30 event is outside.
    let (items, has_more) = windows.next().await.unwrap().unwrap();
    let times: Vec<&str> = items.iter().map(|e| e.created_at.as_str()).collect();
    assert_eq!(
        times,
        vec!["2024-03-10T11:00:00Z", "2024-03-10T11:15:00Z"]
    );
    assert!(!has_more);

    assert!(windows.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_window_iterator_empty_interval() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);

    let mut windows = store.query_time_windows("s1", at(12, 0), at(12, 0), Duration::hours(1));
    assert!(windows.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_latest_orders_descending() {
    let client = MockTableClient::new();
    let store: DynamoStore<EventRecord> = store_over(&client);
    seed_events(&store, &[(9, 0), (10, 0), (11, 0)]).await;

    let records = store
        .stream_latest("s1", monotable::StreamOptions::default())
        .unwrap()
        .collect()
        .await;

    let times: Vec<String> = records
        .iter()
        .map(|r| r.item.as_ref().unwrap().created_at.clone())
        .collect();
    assert_eq!(
        times,
        vec![
            "2024-03-10T11:00:00Z",
            "2024-03-10T10:00:00Z",
            "2024-03-10T09:00:00Z",
        ]
    );
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.meta.index, i as u64);
    }
}
