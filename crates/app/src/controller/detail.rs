//! Result detail controller.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use rebrowse_client::{FetchCache, RequestTicket};
use rebrowse_core::{Error, Published, ResultRecord};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Receives the dismissal of a detail screen.
pub trait DetailDelegate: Send + Sync {
    fn detail_dismissed(&self);
}

/// Published detail state: display texts plus the owner image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailState {
    pub name_text: String,
    pub full_name_text: String,
    pub description_text: String,
    pub language_text: String,
    pub stars_text: String,
    pub watchers_text: String,
    pub forks_text: String,
    pub issues_text: String,
    pub image: Option<Bytes>,
    pub loading: bool,
    pub image_error: Option<Error>,
}

fn count_text(n: u64, singular: &str) -> String {
    if n == 1 { format!("{n} {singular}") } else { format!("{n} {singular}s") }
}

impl DetailState {
    fn for_record(record: &ResultRecord) -> Self {
        Self {
            name_text: record.name.clone(),
            full_name_text: record.full_name.clone(),
            description_text: record.description.clone(),
            language_text: if record.language.is_empty() {
                String::new()
            } else {
                format!("Written in {}", record.language)
            },
            stars_text: count_text(record.stars, "star"),
            watchers_text: count_text(record.watchers, "watcher"),
            forks_text: count_text(record.forks, "fork"),
            issues_text: count_text(record.open_issues, "issue"),
            image: None,
            loading: true,
            image_error: None,
        }
    }
}

/// Shows one record and loads its image exactly once.
pub struct DetailController {
    record: ResultRecord,
    state: Arc<Published<DetailState>>,
    images: FetchCache,
    ticket: Option<RequestTicket>,
    task: Option<JoinHandle<()>>,
    delegate: Weak<dyn DetailDelegate>,
}

impl DetailController {
    /// Build the controller and issue its single image request.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(record: ResultRecord, images: FetchCache, delegate: Weak<dyn DetailDelegate>) -> Self {
        let state = Arc::new(Published::new(DetailState::for_record(&record)));

        let (ticket, task) = match record.image_locator() {
            Ok(locator) => {
                let handle = images.request(locator);
                let ticket = handle.ticket().clone();
                let published = Arc::clone(&state);
                let task = tokio::spawn(async move {
                    let outcome = handle.await;
                    published.update(|s| {
                        s.loading = false;
                        match outcome {
                            Ok(bytes) => s.image = Some(bytes),
                            Err(e) => s.image_error = Some(e),
                        }
                    });
                });
                (Some(ticket), Some(task))
            }
            Err(e) => {
                tracing::debug!(error = %e, "no image for {}", record.full_name);
                state.update(|s| {
                    s.loading = false;
                    s.image_error = Some(e);
                });
                (None, None)
            }
        };

        Self { record, state, images, ticket, task, delegate }
    }

    pub fn record(&self) -> &ResultRecord {
        &self.record
    }

    pub fn state(&self) -> DetailState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    /// Wait until the image request has settled and return the final state.
    pub async fn loaded(&self) -> DetailState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// The screen is done; tell whoever presented it.
    pub fn dismiss(&self) {
        match self.delegate.upgrade() {
            Some(delegate) => delegate.detail_dismissed(),
            None => tracing::debug!("dismiss ignored; detail delegate is gone"),
        }
    }
}

impl Drop for DetailController {
    fn drop(&mut self) {
        if let Some(ticket) = &self.ticket {
            self.images.cancel(ticket);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use rebrowse_client::{CacheConfig, Transport};
    use rebrowse_core::ResourceLocator;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTransport {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn fetch_bytes(&self, locator: &ResourceLocator) -> Result<Bytes, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::HttpError("status 404".into()));
            }
            Ok(Bytes::from(locator.to_string()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        dismissed: Mutex<usize>,
    }

    impl DetailDelegate for Recorder {
        fn detail_dismissed(&self) {
            *self.dismissed.lock().unwrap() += 1;
        }
    }

    fn record() -> ResultRecord {
        ResultRecord {
            name: "rust".into(),
            full_name: "rust-lang/rust".into(),
            owner_avatar_url: "https://img.test/rust-lang".into(),
            description: "Empowering everyone".into(),
            language: "Rust".into(),
            stars: 1,
            watchers: 2,
            forks: 0,
            open_issues: 12,
            html_url: None,
            updated_at: None,
        }
    }

    fn cache(fail: bool) -> (FetchCache, Arc<EchoTransport>) {
        let transport = Arc::new(EchoTransport { calls: AtomicUsize::new(0), fail });
        (FetchCache::new(transport.clone(), CacheConfig::default()), transport)
    }

    fn no_delegate() -> Weak<dyn DetailDelegate> {
        Weak::<Recorder>::new()
    }

    #[test]
    fn test_display_texts() {
        let state = DetailState::for_record(&record());
        assert_eq!(state.language_text, "Written in Rust");
        assert_eq!(state.stars_text, "1 star");
        assert_eq!(state.watchers_text, "2 watchers");
        assert_eq!(state.forks_text, "0 forks");
        assert_eq!(state.issues_text, "12 issues");
        assert!(state.loading);
    }

    #[test]
    fn test_language_text_blank_without_language() {
        let state = DetailState::for_record(&ResultRecord { language: String::new(), ..record() });
        assert_eq!(state.language_text, "");
    }

    #[tokio::test]
    async fn test_loads_image_once() {
        let (images, transport) = cache(false);
        let controller = DetailController::new(record(), images, no_delegate());

        let state = controller.loaded().await;
        assert_eq!(state.image, Some(Bytes::from("https://img.test/rust-lang")));
        assert!(state.image_error.is_none());
        assert!(!state.loading);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_image_failure_published() {
        let (images, _) = cache(true);
        let controller = DetailController::new(record(), images, no_delegate());

        let state = controller.loaded().await;
        assert!(state.image.is_none());
        assert!(matches!(state.image_error, Some(Error::HttpError(_))));
    }

    #[tokio::test]
    async fn test_invalid_image_url() {
        let (images, transport) = cache(false);
        let rec = ResultRecord { owner_avatar_url: "ftp://nope".into(), ..record() };
        let controller = DetailController::new(rec, images, no_delegate());

        let state = controller.loaded().await;
        assert!(matches!(state.image_error, Some(Error::InvalidUrl(_))));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dismiss_reports_to_delegate() {
        let (images, _) = cache(false);
        let recorder = Arc::new(Recorder::default());
        let delegate: Weak<dyn DetailDelegate> = Arc::downgrade(&recorder) as Weak<dyn DetailDelegate>;
        let controller = DetailController::new(record(), images, delegate);

        controller.dismiss();
        assert_eq!(*recorder.dismissed.lock().unwrap(), 1);

        drop(recorder);
        controller.dismiss();
    }
}
