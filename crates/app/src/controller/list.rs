//! Result list controller.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rebrowse_client::{FetchCache, FetchHandle, QueryError, RepositoryQueryClient, RequestTicket};
use rebrowse_core::{Error, Published, ResultRecord};
use tokio::sync::watch;

/// Receives navigation requests raised by the list.
pub trait ListDelegate: Send + Sync {
    fn show_detail(&self, record: ResultRecord);
}

/// Display slot of a list row. Slots are recycled as the list scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

/// Published list state.
///
/// `input_error` and `query_error` are never set together with fresh
/// records from the same search.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub records: Vec<ResultRecord>,
    /// The last query was empty or blank.
    pub input_error: Option<Error>,
    /// The last search failed.
    pub query_error: Option<QueryError>,
    pub loading: bool,
}

pub struct ListController {
    client: Arc<dyn RepositoryQueryClient>,
    images: FetchCache,
    state: Published<ListState>,
    search_text: Mutex<Option<String>>,
    generation: AtomicU64,
    rows: Mutex<HashMap<SlotId, RequestTicket>>,
    delegate: Weak<dyn ListDelegate>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ListController {
    pub fn new(client: Arc<dyn RepositoryQueryClient>, images: FetchCache, delegate: Weak<dyn ListDelegate>) -> Self {
        Self {
            client,
            images,
            state: Published::default(),
            search_text: Mutex::new(None),
            generation: AtomicU64::new(0),
            rows: Mutex::new(HashMap::new()),
            delegate,
        }
    }

    pub fn state(&self) -> ListState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    pub fn records(&self) -> Vec<ResultRecord> {
        self.state.read(|s| s.records.clone())
    }

    /// Run a search and publish its outcome.
    ///
    /// A blank query only raises `input_error`; the current records stay.
    /// When searches overlap, only the most recent one publishes, and a blank
    /// query counts as the most recent search.
    pub async fn search(&self, query: &str) {
        *lock(&self.search_text) = Some(query.to_string());

        let query = query.trim();
        if query.is_empty() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.state.update(|s| {
                s.input_error = Some(Error::InvalidInput("search query is blank".into()));
                s.loading = false;
            });
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.update(|s| {
            s.input_error = None;
            s.query_error = None;
            s.loading = true;
        });

        let outcome = self.client.search(query).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("dropping results of superseded search: query={}", query);
            return;
        }

        self.recycle_all_rows();

        match outcome {
            Ok(records) => {
                tracing::debug!("search returned {} records: query={}", records.len(), query);
                self.state.publish(ListState { records, ..Default::default() });
            }
            Err(e) => {
                tracing::warn!(error = %e, "search failed: query={}", query);
                self.state.publish(ListState { query_error: Some(e), ..Default::default() });
            }
        }
    }

    /// Re-run the last query, if any.
    pub async fn refresh(&self) {
        let query = lock(&self.search_text).clone();
        if let Some(query) = query {
            self.search(&query).await;
        }
    }

    /// Forget the query and empty the list.
    pub fn clear(&self) {
        *lock(&self.search_text) = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.recycle_all_rows();
        self.state.publish(ListState::default());
    }

    pub fn last_query(&self) -> Option<String> {
        lock(&self.search_text).clone()
    }

    /// Ask the delegate to show the record at `index`.
    ///
    /// Returns `false` when the index is out of range or nobody is listening.
    pub fn select(&self, index: usize) -> bool {
        let Some(record) = self.state.read(|s| s.records.get(index).cloned()) else {
            tracing::debug!(index, "select ignored; no such row");
            return false;
        };

        match self.delegate.upgrade() {
            Some(delegate) => {
                delegate.show_detail(record);
                true
            }
            None => {
                tracing::debug!(index, "select ignored; list delegate is gone");
                false
            }
        }
    }

    /// Warm the image cache for the rows in `rows`. Returns how many
    /// requests were issued.
    pub fn prefetch(&self, rows: Range<usize>) -> usize {
        let records = self.state.read(|s| {
            let end = rows.end.min(s.records.len());
            let start = rows.start.min(end);
            s.records[start..end].to_vec()
        });

        let mut issued = 0;
        for record in &records {
            match record.image_locator() {
                Ok(locator) => {
                    // Dropping the handle withdraws interest; the fetch still
                    // completes into the cache.
                    drop(self.images.request(locator));
                    issued += 1;
                }
                Err(e) => tracing::debug!(error = %e, "skipping prefetch for {}", record.full_name),
            }
        }
        issued
    }

    /// Request the image for the row at `index`, shown in display `slot`.
    ///
    /// Rebinding a slot cancels whatever it was still waiting for. A handle
    /// whose image already arrived is left to resolve.
    pub fn bind_row(&self, slot: SlotId, index: usize) -> Option<FetchHandle> {
        let record = self.state.read(|s| s.records.get(index).cloned())?;
        let locator = match record.image_locator() {
            Ok(locator) => locator,
            Err(e) => {
                tracing::debug!(error = %e, "row {} has no usable image", index);
                self.recycle_row(slot);
                return None;
            }
        };

        let handle = self.images.request(locator);
        let previous = {
            let mut rows = lock(&self.rows);
            rows.retain(|_, ticket| self.images.is_waiting(ticket));
            rows.insert(slot, handle.ticket().clone())
        };
        if let Some(previous) = previous {
            self.images.cancel_pending(&previous);
        }
        Some(handle)
    }

    /// The slot went off screen; stop waiting for its image.
    pub fn recycle_row(&self, slot: SlotId) {
        let ticket = lock(&self.rows).remove(&slot);
        if let Some(ticket) = ticket {
            self.images.cancel_pending(&ticket);
        }
    }

    /// Slots still waiting for their image.
    pub fn bound_rows(&self) -> usize {
        let mut rows = lock(&self.rows);
        rows.retain(|_, ticket| self.images.is_waiting(ticket));
        rows.len()
    }

    fn recycle_all_rows(&self) {
        let tickets: Vec<_> = lock(&self.rows).drain().map(|(_, ticket)| ticket).collect();
        for ticket in &tickets {
            self.images.cancel_pending(ticket);
        }
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        self.recycle_all_rows();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use bytes::Bytes;
    use rebrowse_client::{CacheConfig, EntryStatus, StaticQueryClient, Transport};
    use rebrowse_core::ResourceLocator;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct GatedTransport {
        calls: AtomicUsize,
        gate: Semaphore,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn fetch_bytes(&self, locator: &ResourceLocator) -> Result<Bytes, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            Ok(Bytes::from(locator.to_string()))
        }
    }

    struct SlowClient {
        records: Vec<ResultRecord>,
        gate: Semaphore,
    }

    #[async_trait]
    impl RepositoryQueryClient for SlowClient {
        async fn search(&self, _query: &str) -> Result<Vec<ResultRecord>, QueryError> {
            self.gate.acquire().await.unwrap().forget();
            Ok(self.records.clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        shown: Mutex<Vec<String>>,
    }

    impl ListDelegate for Recorder {
        fn show_detail(&self, record: ResultRecord) {
            self.shown.lock().unwrap().push(record.name);
        }
    }

    fn record(name: &str) -> ResultRecord {
        ResultRecord {
            name: name.into(),
            full_name: format!("owner/{name}"),
            owner_avatar_url: format!("https://img.test/{name}"),
            description: String::new(),
            language: "Rust".into(),
            stars: 1,
            watchers: 1,
            forks: 0,
            open_issues: 0,
            html_url: None,
            updated_at: None,
        }
    }

    fn setup(client: StaticQueryClient) -> (ListController, Arc<GatedTransport>, Arc<Recorder>, FetchCache) {
        let transport = Arc::new(GatedTransport { calls: AtomicUsize::new(0), gate: Semaphore::new(0) });
        let images = FetchCache::new(transport.clone(), CacheConfig::default());
        let recorder = Arc::new(Recorder::default());
        let delegate: Weak<dyn ListDelegate> = Arc::downgrade(&recorder) as Weak<dyn ListDelegate>;
        let controller = ListController::new(Arc::new(client), images.clone(), delegate);
        (controller, transport, recorder, images)
    }

    #[tokio::test]
    async fn test_blank_query_sets_input_error() {
        let (controller, ..) = setup(StaticQueryClient::new(vec![record("a")]));
        controller.search("a").await;
        controller.search("   ").await;

        let state = controller.state();
        assert!(matches!(state.input_error, Some(Error::InvalidInput(_))));
        assert!(state.query_error.is_none());
        assert_eq!(state.records.len(), 1);
    }

    #[tokio::test]
    async fn test_search_publishes_records() {
        let (controller, ..) = setup(StaticQueryClient::new(vec![record("a"), record("b")]));
        let mut rx = controller.subscribe();

        controller.search("rust").await;

        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.records, vec![record("a"), record("b")]);
        assert!(!state.loading);
        assert!(state.input_error.is_none());
    }

    #[tokio::test]
    async fn test_query_error_kept_apart_from_records() {
        let (controller, ..) = setup(StaticQueryClient::failing(QueryError::Http { status: 502 }));
        controller.search("rust").await;

        let state = controller.state();
        assert!(state.records.is_empty());
        assert!(matches!(state.query_error, Some(QueryError::Http { status: 502 })));
        assert!(state.input_error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_and_clear() {
        let (controller, ..) = setup(StaticQueryClient::new(vec![record("a")]));
        controller.refresh().await;
        assert!(controller.records().is_empty());

        controller.search("rust").await;
        controller.clear();
        assert!(controller.records().is_empty());
        assert!(controller.last_query().is_none());

        controller.search("rust").await;
        controller.refresh().await;
        assert_eq!(controller.records().len(), 1);
        assert_eq!(controller.last_query().as_deref(), Some("rust"));
    }

    #[tokio::test]
    async fn test_select_reports_to_delegate() {
        let (controller, _, recorder, _) = setup(StaticQueryClient::new(vec![record("a"), record("b")]));
        controller.search("rust").await;

        assert!(controller.select(1));
        assert!(!controller.select(5));
        assert_eq!(*recorder.shown.lock().unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_prefetch_clamps_range() {
        let (controller, transport, ..) = setup(StaticQueryClient::new(vec![record("a"), record("b")]));
        controller.search("rust").await;

        assert_eq!(controller.prefetch(0..10), 2);
        assert_eq!(controller.prefetch(5..10), 0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recycled_slot_does_not_resolve() {
        let (controller, transport, _, _) = setup(StaticQueryClient::new(vec![record("a"), record("b")]));
        controller.search("rust").await;

        let stale = controller.bind_row(SlotId(0), 0).unwrap();
        let fresh = controller.bind_row(SlotId(0), 1).unwrap();
        assert_eq!(controller.bound_rows(), 1);

        transport.gate.add_permits(2);
        assert_eq!(fresh.await.unwrap(), Bytes::from("https://img.test/b"));
        assert!(tokio::time::timeout(Duration::from_millis(50), stale).await.is_err());
    }

    #[tokio::test]
    async fn test_recycle_row_cancels_only_that_slot() {
        let (controller, transport, _, _) = setup(StaticQueryClient::new(vec![record("a")]));
        controller.search("rust").await;

        let gone = controller.bind_row(SlotId(0), 0).unwrap();
        let kept = controller.bind_row(SlotId(1), 0).unwrap();
        controller.recycle_row(SlotId(0));
        assert_eq!(controller.bound_rows(), 1);

        transport.gate.add_permits(1);
        assert!(kept.await.is_ok());
        assert!(tokio::time::timeout(Duration::from_millis(50), gone).await.is_err());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_query_supersedes_running_search() {
        let client = Arc::new(SlowClient { records: vec![record("a")], gate: Semaphore::new(0) });
        let transport = Arc::new(GatedTransport { calls: AtomicUsize::new(0), gate: Semaphore::new(0) });
        let images = FetchCache::new(transport, CacheConfig::default());
        let controller = Arc::new(ListController::new(client.clone(), images, Weak::<Recorder>::new()));

        let running = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.search("rust").await }
        });
        controller.subscribe().wait_for(|s| s.loading).await.unwrap();

        controller.search("   ").await;
        client.gate.add_permits(1);
        running.await.unwrap();

        let state = controller.state();
        assert!(state.input_error.is_some());
        assert!(state.records.is_empty());
        assert!(!state.loading);
        assert_eq!(controller.last_query().as_deref(), Some("   "));
    }

    #[tokio::test]
    async fn test_finished_rows_are_released() {
        let (controller, transport, _, images) = setup(StaticQueryClient::new(vec![record("a")]));
        controller.search("rust").await;

        let handle = controller.bind_row(SlotId(0), 0).unwrap();
        assert_eq!(controller.bound_rows(), 1);

        transport.gate.add_permits(1);
        let image = ResourceLocator::parse("https://img.test/a").unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while images.status(&image) != Some(EntryStatus::Ready) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(controller.bound_rows(), 0);
        controller.recycle_row(SlotId(0));
        assert_eq!(handle.await, Ok(Bytes::from("https://img.test/a")));
    }
}
