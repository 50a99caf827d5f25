//! Streaming query engine.
//!
//! One producer task per stream paginates the query and pushes records
//! through a bounded channel; the consumer drives backpressure by draining
//! at its own pace. Transient provider errors are retried with linear
//! backoff; cancellation is observed before every blocking operation.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use monotable_core::storage::{
    EntityStream, Item, QueryParams, Result, StoreError, StreamMeta, StreamOptions,
    StreamProgress, StreamResult,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use super::conversions::decode_typed;
use super::DynamoStore;
use crate::client::{QueryPage, QueryRequest, TableClient};

impl<T> DynamoStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Executes the query as a paginated stream of records.
    ///
    /// Records arrive in provider order with a strictly monotonic
    /// `meta.index`. Per-item decode failures are embedded in their record
    /// and the stream continues; a page fetch that exhausts its retry budget
    /// either consults the error handler or emits one error record and
    /// closes. Requires a tokio runtime.
    pub fn stream(&self, params: QueryParams, options: StreamOptions) -> EntityStream<T> {
        let (tx, rx) = mpsc::channel(options.buffer_size.max(1));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let worker = StreamWorker {
            client: Arc::clone(self.client()),
            table_name: self.table_name().to_string(),
            params,
            options,
            tx,
            cancel: cancel_rx,
            marker: PhantomData,
        };
        tokio::spawn(worker.run());

        EntityStream::new(rx, cancel_tx)
    }
}

struct StreamWorker<T> {
    client: Arc<dyn TableClient>,
    table_name: String,
    params: QueryParams,
    options: StreamOptions,
    tx: mpsc::Sender<StreamResult<T>>,
    cancel: watch::Receiver<bool>,
    marker: PhantomData<fn() -> T>,
}

impl<T> StreamWorker<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn run(mut self) {
        let started = Instant::now();
        let start_time = Utc::now();
        let mut item_index: u64 = 0;
        let mut page_number: u32 = 0;
        let mut errors: Vec<StoreError> = Vec::new();
        let mut cursor = self.params.exclusive_start_key.clone();

        loop {
            if self.cancelled() {
                return;
            }

            let mut request = QueryRequest::from(&self.params);
            request.limit = Some(self.options.page_size);
            request.exclusive_start_key = cursor.clone();

            let page = match self.query_with_retry(request).await {
                Ok(page) => page,
                Err(StoreError::Cancelled) => return,
                Err(err) => {
                    tracing::error!(error = %err, table = %self.table_name, "stream page fetch failed");
                    let keep_going = match &self.options.error_handler {
                        Some(handler) => handler(&err),
                        None => false,
                    };
                    if !keep_going {
                        let record = StreamResult {
                            item: None,
                            raw: Item::new(),
                            error: Some(err),
                            meta: self.meta(item_index, page_number),
                        };
                        let _ = self.tx.send(record).await;
                        return;
                    }
                    errors.push(err);
                    self.report_progress(
                        item_index,
                        page_number,
                        cursor.clone(),
                        &errors,
                        start_time,
                        started,
                    );
                    continue;
                }
            };

            page_number += 1;

            for item in page.items {
                if self.cancelled() {
                    return;
                }

                let record = self.process_item(item, item_index, page_number);
                item_index += 1;
                if let Some(err) = &record.error {
                    errors.push(err.clone());
                }

                tokio::select! {
                    changed = self.cancel.changed() => {
                        // An error means the stream handle was dropped, which
                        // terminates the producer just like cancellation.
                        if changed.is_err() || *self.cancel.borrow() {
                            return;
                        }
                    }
                    sent = self.tx.send(record) => {
                        if sent.is_err() {
                            // Consumer dropped the stream.
                            return;
                        }
                    }
                }
            }

            self.report_progress(
                item_index,
                page_number,
                page.last_evaluated_key.clone(),
                &errors,
                start_time,
                started,
            );

            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => cursor = Some(key),
                _ => break,
            }
        }

        self.report_progress(item_index, page_number, None, &errors, start_time, started);
    }

    /// Fetches one page, retrying transient errors up to the configured
    /// budget with linear backoff. The sleep honours cancellation.
    async fn query_with_retry(&mut self, request: QueryRequest) -> Result<QueryPage> {
        let attempts = self.options.max_retries.max(1);
        let mut last_err = None;

        for attempt in 0..attempts {
            if self.cancelled() {
                return Err(StoreError::Cancelled);
            }

            match self.client.query(&self.table_name, request.clone()).await {
                Ok(page) => return Ok(page),
                Err(err) => {
                    if !err.is_transient() {
                        return Err(err);
                    }
                    tracing::warn!(
                        error = %err,
                        attempt,
                        "transient query failure, backing off"
                    );
                    last_err = Some(err);
                    if attempt + 1 < attempts {
                        let backoff = self.options.retry_backoff * (attempt + 1);
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            changed = self.cancel.changed() => {
                                if changed.is_err() || *self.cancel.borrow() {
                                    return Err(StoreError::Cancelled);
                                }
                            }
                        }
                    }
                }
            }
        }

        let cause = last_err
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(StoreError::FatalProvider(format!(
            "query failed after {attempts} attempts: {cause}"
        )))
    }

    fn process_item(&self, item: Item, index: u64, page_number: u32) -> StreamResult<T> {
        let meta = self.meta(index, page_number);
        match decode_typed::<T>(&item) {
            Ok(value) => StreamResult {
                item: Some(value),
                raw: item,
                error: None,
                meta,
            },
            Err(err) => StreamResult {
                item: None,
                raw: item,
                error: Some(err),
                meta,
            },
        }
    }

    fn meta(&self, index: u64, page_number: u32) -> StreamMeta {
        StreamMeta {
            index,
            page_number,
            timestamp: Utc::now(),
        }
    }

    fn report_progress(
        &self,
        items_processed: u64,
        pages_processed: u32,
        last_key: Option<Item>,
        errors: &[StoreError],
        start_time: DateTime<Utc>,
        started: Instant,
    ) {
        let Some(handler) = &self.options.progress_handler else {
            return;
        };

        let elapsed = started.elapsed().as_secs_f64();
        let current_rate = if elapsed > 0.0 {
            items_processed as f64 / elapsed
        } else {
            0.0
        };

        handler(&StreamProgress {
            items_processed,
            pages_processed,
            last_key,
            errors: errors.to_vec(),
            start_time,
            current_rate,
        });
    }

    fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}
