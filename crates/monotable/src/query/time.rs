//! Time-range queries over sort keys that encode timestamps.
//!
//! The convention: the index sort key carries an RFC-3339 UTC timestamp
//! rendered at second precision, so lexicographic order on the sort key is
//! chronological order.

use chrono::{DateTime, Datelike, Duration, NaiveTime, SecondsFormat, Utc};
use monotable_core::storage::{
    EntityStream, Item, QueryParams, Result, StoreError, StreamOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::gsi::IndexQueryBuilder;
use crate::store::DynamoStore;

/// Renders a timestamp the way time-encoded sort keys store it: RFC-3339
/// UTC at second precision with the `Z` suffix.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Index-query builder specialised for timestamp sort keys.
pub struct TimeRangeQueryBuilder<'a, T> {
    inner: IndexQueryBuilder<'a, T>,
}

impl<T> DynamoStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Starts a time-range query against `GSI1` for the given partition.
    pub fn query_time_range(&self, partition_key: &str) -> TimeRangeQueryBuilder<'_, T> {
        TimeRangeQueryBuilder {
            inner: self.query_index().with_partition_key(partition_key),
        }
    }

    /// Creates an iterator that walks `[start, end)` in fixed-size windows,
    /// issuing one query per window.
    pub fn query_time_windows(
        &self,
        partition_key: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: Duration,
    ) -> TimeWindowIterator<'_, T> {
        TimeWindowIterator {
            store: self,
            partition_key: partition_key.to_string(),
            window,
            end,
            current: start,
        }
    }

    /// The `limit` most recent items for the partition.
    pub async fn query_latest(&self, partition_key: &str, limit: i32) -> Result<Vec<T>> {
        self.query_time_range(partition_key)
            .latest()
            .with_limit(limit)
            .execute()
            .await
    }

    /// All items since the given instant, newest first.
    pub async fn query_since(
        &self,
        partition_key: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<T>> {
        self.query_time_range(partition_key)
            .after(since)
            .latest()
            .execute()
            .await
    }

    /// All items within the given range, in chronological order.
    pub async fn query_in_range(
        &self,
        partition_key: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<T>> {
        self.query_time_range(partition_key)
            .between(start, end)
            .oldest()
            .execute()
            .await
    }

    /// Streams the partition's items in reverse chronological order.
    pub fn stream_latest(
        &self,
        partition_key: &str,
        options: StreamOptions,
    ) -> Result<EntityStream<T>> {
        self.query_time_range(partition_key).latest().stream(options)
    }
}

impl<'a, T> TimeRangeQueryBuilder<'a, T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Items strictly after the given instant.
    pub fn after(self, timestamp: DateTime<Utc>) -> Self {
        Self {
            inner: self
                .inner
                .with_sort_key_greater_than(&format_timestamp(timestamp)),
        }
    }

    /// Items strictly before the given instant.
    pub fn before(self, timestamp: DateTime<Utc>) -> Self {
        Self {
            inner: self
                .inner
                .with_sort_key_less_than(&format_timestamp(timestamp)),
        }
    }

    /// Items between the two instants (inclusive on both ends, per the
    /// provider's `BETWEEN`).
    pub fn between(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            inner: self
                .inner
                .with_sort_key_between(&format_timestamp(start), &format_timestamp(end)),
        }
    }

    /// Items from the last `hours` hours.
    pub fn in_last_hours(self, hours: i64) -> Self {
        self.after(Utc::now() - Duration::hours(hours))
    }

    /// Items from the last `days` days.
    pub fn in_last_days(self, days: i64) -> Self {
        self.after(Utc::now() - Duration::days(days))
    }

    /// Items from the current UTC day.
    pub fn today(self) -> Self {
        let start = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        self.between(start, start + Duration::hours(24))
    }

    /// Items from the current week (starting Monday, UTC).
    pub fn this_week(self) -> Self {
        let today = Utc::now().date_naive();
        let days_from_monday = today.weekday().num_days_from_monday() as i64;
        let monday = (today - Duration::days(days_from_monday))
            .and_time(NaiveTime::MIN)
            .and_utc();
        self.after(monday)
    }

    /// Items from the current month (UTC).
    pub fn this_month(self) -> Self {
        let first = Utc::now()
            .date_naive()
            .with_day(1)
            .expect("the first of the month is a valid date")
            .and_time(NaiveTime::MIN)
            .and_utc();
        self.after(first)
    }

    /// Newest first.
    pub fn latest(self) -> Self {
        Self {
            inner: self.inner.with_scan_forward(false),
        }
    }

    /// Oldest first.
    pub fn oldest(self) -> Self {
        Self {
            inner: self.inner.with_scan_forward(true),
        }
    }

    /// Targets a different index tag (default `GSI1`).
    pub fn on_index(self, tag: &str) -> Self {
        Self {
            inner: self.inner.on_index(tag),
        }
    }

    pub fn with_limit(self, limit: i32) -> Self {
        Self {
            inner: self.inner.with_limit(limit),
        }
    }

    pub fn with_filter(self, expression: &str, values: Item) -> Self {
        Self {
            inner: self.inner.with_filter(expression, values),
        }
    }

    /// Produces the neutral query parameters.
    pub fn build(&self) -> Result<QueryParams> {
        self.inner.build()
    }

    /// Builds and executes the query.
    pub async fn execute(&self) -> Result<Vec<T>> {
        self.inner.execute().await
    }

    /// Builds the query and executes it as a stream.
    pub fn stream(&self, options: StreamOptions) -> Result<EntityStream<T>> {
        self.inner.stream(options)
    }
}

/// Walks a half-open interval `[start, end)` in fixed-size windows, one
/// query per window.
///
/// Sort keys carry second precision, so the upper bound of each window is
/// made exclusive by closing the `BETWEEN` one second before the window end;
/// the final window clamps to `end`.
pub struct TimeWindowIterator<'a, T> {
    store: &'a DynamoStore<T>,
    partition_key: String,
    window: Duration,
    end: DateTime<Utc>,
    current: DateTime<Utc>,
}

impl<T> TimeWindowIterator<'_, T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Fetches the next window. Returns `None` once the interval is
    /// exhausted; otherwise the window's items plus whether more windows
    /// remain.
    pub async fn next(&mut self) -> Result<Option<(Vec<T>, bool)>> {
        if self.current >= self.end {
            return Ok(None);
        }
        if self.window <= Duration::zero() {
            return Err(StoreError::BuilderValidation(
                "time window size must be positive".to_string(),
            ));
        }

        let mut window_end = self.current + self.window;
        if window_end > self.end {
            window_end = self.end;
        }
        let upper = window_end - Duration::seconds(1);

        let items = if upper < self.current {
            Vec::new()
        } else {
            self.store
                .query_time_range(&self.partition_key)
                .between(self.current, upper)
                .oldest()
                .execute()
                .await?
        };

        self.current = window_end;
        let has_more = self.current < self.end;
        Ok(Some((items, has_more)))
    }
}
