use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use super::error::StoreError;
use super::types::Item;

/// Metadata attached to every streamed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMeta {
    /// 0-based position in the stream; strictly monotonic within a stream.
    pub index: u64,
    /// 1-based provider page the record came from; weakly monotonic.
    pub page_number: u32,
    /// When the record was produced.
    pub timestamp: DateTime<Utc>,
}

/// A single element of a streamed result set.
///
/// Per-item deserialization failures are carried in `error` with `item`
/// empty; the raw attribute map is always present so callers can recover.
#[derive(Debug, Clone)]
pub struct StreamResult<T> {
    pub item: Option<T>,
    pub raw: Item,
    pub error: Option<StoreError>,
    pub meta: StreamMeta,
}

/// Progress snapshot emitted at page boundaries.
#[derive(Debug, Clone)]
pub struct StreamProgress {
    pub items_processed: u64,
    pub pages_processed: u32,
    /// Continuation cursor after the page, `None` once the stream drains.
    pub last_key: Option<Item>,
    /// Non-fatal errors accumulated so far.
    pub errors: Vec<StoreError>,
    pub start_time: DateTime<Utc>,
    /// Items per second since the stream started.
    pub current_rate: f64,
}

/// Callback invoked with a progress snapshot at each page boundary.
pub type ProgressHandler = Arc<dyn Fn(&StreamProgress) + Send + Sync>;

/// Callback invoked after a page fetch exhausts its retry budget. Return
/// `true` to keep streaming, `false` to stop.
pub type ErrorHandler = Arc<dyn Fn(&StoreError) -> bool + Send + Sync>;

/// Configuration for a streaming query.
#[derive(Clone)]
pub struct StreamOptions {
    /// Capacity of the outgoing bounded channel.
    pub buffer_size: usize,
    /// Per-page item limit sent to the provider.
    pub page_size: i32,
    /// Attempts per page fetch against transient errors.
    pub max_retries: u32,
    /// Linear backoff base: the sleep before attempt `n + 1` is
    /// `(n + 1) * retry_backoff`.
    pub retry_backoff: Duration,
    /// Reserved for parallel page processing; the engine runs sequentially.
    pub max_concurrency: usize,
    pub progress_handler: Option<ProgressHandler>,
    pub error_handler: Option<ErrorHandler>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            page_size: 100,
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            max_concurrency: 1,
            progress_handler: None,
            error_handler: None,
        }
    }
}

impl StreamOptions {
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_page_size(mut self, size: i32) -> Self {
        self.page_size = size;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_progress_handler(mut self, handler: ProgressHandler) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }
}

impl fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOptions")
            .field("buffer_size", &self.buffer_size)
            .field("page_size", &self.page_size)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("max_concurrency", &self.max_concurrency)
            .field("progress_handler", &self.progress_handler.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// Consumer handle for a streaming query.
///
/// Records arrive in provider order through a bounded channel; the producer
/// blocks when the buffer is full, so an unhurried consumer applies
/// backpressure naturally. `cancel` stops the producer promptly; dropping the
/// stream has the same effect.
pub struct EntityStream<T> {
    rx: mpsc::Receiver<StreamResult<T>>,
    cancel: watch::Sender<bool>,
}

impl<T> EntityStream<T> {
    /// Assembles a stream from its channel halves. Used by storage backends;
    /// consumers obtain streams from `DataStore::stream`.
    pub fn new(rx: mpsc::Receiver<StreamResult<T>>, cancel: watch::Sender<bool>) -> Self {
        Self { rx, cancel }
    }

    /// Receives the next record, or `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<StreamResult<T>> {
        self.rx.recv().await
    }

    /// Signals the producer to stop. No further records are emitted after
    /// the producer observes the signal; already-buffered records remain
    /// readable.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Drains the stream to completion, collecting every record.
    pub async fn collect(mut self) -> Vec<StreamResult<T>> {
        let mut records = Vec::new();
        while let Some(record) = self.rx.recv().await {
            records.push(record);
        }
        records
    }
}
