//! Deduplicating in-memory cache for remote byte payloads.
//!
//! ### Lookup policy
//! - `Ready` entry: the handle resolves with the cached payload, no I/O.
//! - `Pending` entry: the request attaches to the in-flight fetch.
//! - No entry: a `Pending` entry is inserted, then one fetch is spawned.
//!
//! The create-vs-attach decision, every state transition and eviction all
//! happen under one mutex, so concurrent requests for an unseen locator start
//! exactly one fetch. The lock is never held across an `.await`.
//!
//! ### Failure and eviction
//! - A failed fetch resolves all attached requesters with the error and
//!   leaves no entry behind; the next request retries.
//! - Ready entries are bounded by count and total bytes. The least recently
//!   used ready entry goes first. Pending entries are never evicted.

mod handle;

pub use handle::{FetchHandle, FetchOutcome, RequestId, RequestTicket};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::oneshot;

use rebrowse_core::hash::short_digest;
use rebrowse_core::{AppConfig, Error, ResourceLocator};

use crate::fetch::Transport;

/// Bounds for resolved payloads held by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of ready entries (default: 200)
    pub max_entries: usize,

    /// Maximum total size of ready payloads in bytes (default: 64MB)
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 200, max_bytes: 64 * 1024 * 1024 }
    }
}

impl From<&AppConfig> for CacheConfig {
    fn from(config: &AppConfig) -> Self {
        Self { max_entries: config.cache_max_entries, max_bytes: config.cache_max_bytes }
    }
}

/// Observable state of one locator's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Ready,
}

/// Counters describing cache traffic since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a ready entry.
    pub hits: u64,
    /// Requests that started a new fetch.
    pub misses: u64,
    /// Requests that attached to an in-flight fetch.
    pub joins: u64,
    /// Fetches that completed successfully.
    pub successes: u64,
    /// Fetches that failed.
    pub failures: u64,
    /// Ready entries dropped to stay within bounds.
    pub evictions: u64,
    /// Requests withdrawn before resolution.
    pub cancellations: u64,
}

struct Waiter {
    id: RequestId,
    tx: oneshot::Sender<FetchOutcome>,
}

enum Entry {
    Pending { waiters: Vec<Waiter> },
    Ready { payload: Bytes, last_used: u64 },
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ResourceLocator, Entry>,
    ready_len: usize,
    ready_bytes: usize,
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove_ready(&mut self, locator: &ResourceLocator) -> bool {
        match self.entries.get(locator) {
            Some(Entry::Ready { payload, .. }) => {
                self.ready_len -= 1;
                self.ready_bytes -= payload.len();
                self.entries.remove(locator);
                true
            }
            _ => false,
        }
    }

    fn evict(&mut self, config: &CacheConfig) {
        while self.ready_len > config.max_entries || self.ready_bytes > config.max_bytes {
            let oldest = self
                .entries
                .iter()
                .filter_map(|(locator, entry)| match entry {
                    Entry::Ready { last_used, .. } => Some((*last_used, locator)),
                    Entry::Pending { .. } => None,
                })
                .min_by_key(|(last_used, _)| *last_used)
                .map(|(_, locator)| locator.clone());

            let Some(locator) = oldest else { break };
            self.remove_ready(&locator);
            self.stats.evictions += 1;
            tracing::debug!(key = %short_digest(&locator), "evicted image from cache");
        }
    }
}

pub(crate) struct Inner {
    transport: Arc<dyn Transport>,
    config: CacheConfig,
    state: Mutex<CacheState>,
    next_id: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove one requester from a pending entry. The fetch itself keeps
    /// running even when no requesters remain. Returns whether the requester
    /// was still waiting.
    pub(crate) fn withdraw(&self, ticket: &RequestTicket) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(Entry::Pending { waiters }) = state.entries.get_mut(&ticket.locator) else {
            return false;
        };
        let before = waiters.len();
        waiters.retain(|w| w.id != ticket.id);
        if waiters.len() == before {
            return false;
        }

        state.stats.cancellations += 1;
        if waiters.is_empty() {
            tracing::debug!(
                key = %short_digest(&ticket.locator),
                "no requesters remain; fetch continues to warm the cache"
            );
        }
        true
    }

    fn resolve(&self, locator: &ResourceLocator, outcome: FetchOutcome) {
        let waiters = {
            let mut guard = self.lock();
            let state = &mut *guard;

            let waiters = match state.entries.remove(locator) {
                Some(Entry::Pending { waiters }) => waiters,
                Some(ready @ Entry::Ready { .. }) => {
                    state.entries.insert(locator.clone(), ready);
                    tracing::error!(key = %short_digest(locator), "fetch resolved a locator that was already ready");
                    return;
                }
                None => Vec::new(),
            };

            match &outcome {
                Ok(payload) => {
                    state.stats.successes += 1;
                    if payload.len() <= self.config.max_bytes {
                        let now = state.tick();
                        state.ready_len += 1;
                        state.ready_bytes += payload.len();
                        state
                            .entries
                            .insert(locator.clone(), Entry::Ready { payload: payload.clone(), last_used: now });
                        state.evict(&self.config);
                    } else {
                        tracing::debug!(
                            key = %short_digest(locator),
                            size = payload.len(),
                            "payload exceeds cache capacity; delivered but not retained"
                        );
                    }
                }
                Err(e) => {
                    state.stats.failures += 1;
                    tracing::warn!(key = %short_digest(locator), error = %e, "image fetch failed");
                }
            }

            waiters
        };

        tracing::debug!(key = %short_digest(locator), requesters = waiters.len(), "fetch resolved");

        for waiter in waiters {
            let _ = waiter.tx.send(outcome.clone());
        }
    }
}

/// Single-flight, cancellable cache of remote byte payloads.
///
/// Cloning is cheap and every clone shares the same entries. Requests must be
/// made from within a Tokio runtime, since misses spawn their fetch.
#[derive(Clone)]
pub struct FetchCache {
    inner: Arc<Inner>,
}

impl FetchCache {
    pub fn new(transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: Mutex::new(CacheState::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register interest in a locator.
    ///
    /// Never blocks on I/O. The returned handle resolves with the cached
    /// payload, with the outcome of an in-flight fetch, or with the outcome
    /// of the one fetch this call starts.
    pub fn request(&self, locator: ResourceLocator) -> FetchHandle {
        let id = RequestId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();

        let start_fetch = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let now = state.tick();

            match state.entries.get_mut(&locator) {
                Some(Entry::Ready { payload, last_used }) => {
                    *last_used = now;
                    let _ = tx.send(Ok(payload.clone()));
                    state.stats.hits += 1;
                    tracing::debug!(key = %short_digest(&locator), "image cache hit");
                    false
                }
                Some(Entry::Pending { waiters }) => {
                    waiters.push(Waiter { id, tx });
                    state.stats.joins += 1;
                    tracing::debug!(key = %short_digest(&locator), "attached to in-flight fetch");
                    false
                }
                None => {
                    state
                        .entries
                        .insert(locator.clone(), Entry::Pending { waiters: vec![Waiter { id, tx }] });
                    state.stats.misses += 1;
                    true
                }
            }
        };

        if start_fetch {
            self.spawn_fetch(locator.clone());
        }

        FetchHandle {
            ticket: RequestTicket { locator, id, canceled: Arc::new(AtomicBool::new(false)) },
            rx: Some(rx),
            cache: Arc::downgrade(&self.inner),
        }
    }

    /// Withdraw one requester's interest.
    ///
    /// Sibling requesters on the same locator are unaffected, and the
    /// underlying fetch is never aborted.
    pub fn cancel(&self, ticket: &RequestTicket) {
        ticket.canceled.store(true, Ordering::Release);
        self.inner.withdraw(ticket);
    }

    /// Withdraw a requester only while it still waits on an in-flight fetch.
    ///
    /// Returns whether it was withdrawn. A requester whose outcome was
    /// already delivered keeps it and its handle still resolves.
    pub fn cancel_pending(&self, ticket: &RequestTicket) -> bool {
        let withdrawn = self.inner.withdraw(ticket);
        if withdrawn {
            ticket.canceled.store(true, Ordering::Release);
        }
        withdrawn
    }

    /// Whether the requester behind `ticket` is still waiting for a fetch.
    pub fn is_waiting(&self, ticket: &RequestTicket) -> bool {
        matches!(
            self.inner.lock().entries.get(&ticket.locator),
            Some(Entry::Pending { waiters }) if waiters.iter().any(|w| w.id == ticket.id)
        )
    }

    /// State of a locator's entry, if one exists.
    pub fn status(&self, locator: &ResourceLocator) -> Option<EntryStatus> {
        self.inner.lock().entries.get(locator).map(|entry| match entry {
            Entry::Pending { .. } => EntryStatus::Pending,
            Entry::Ready { .. } => EntryStatus::Ready,
        })
    }

    /// Number of ready entries.
    pub fn len(&self) -> usize {
        self.inner.lock().ready_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of ready payloads in bytes.
    pub fn ready_bytes(&self) -> usize {
        self.inner.lock().ready_bytes
    }

    /// Drop every ready entry. In-flight fetches are left alone.
    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.entries.retain(|_, entry| matches!(entry, Entry::Pending { .. }));
        state.ready_len = 0;
        state.ready_bytes = 0;
    }

    /// Explicitly drop one ready entry. Returns whether anything was removed.
    pub fn invalidate(&self, locator: &ResourceLocator) -> bool {
        self.inner.lock().remove_ready(locator)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    fn spawn_fetch(&self, locator: ResourceLocator) {
        let inner = Arc::clone(&self.inner);
        let guard = FetchGuard { inner: Arc::clone(&self.inner), locator: Some(locator.clone()) };
        tracing::debug!(key = %short_digest(&locator), "starting fetch");
        tokio::spawn(async move {
            let outcome = inner.transport.fetch_bytes(&locator).await;
            guard.finish(outcome);
        });
    }
}

/// Resolves a pending entry even when its fetch task never returns, whether
/// the transport panicked or the task was aborted.
struct FetchGuard {
    inner: Arc<Inner>,
    locator: Option<ResourceLocator>,
}

impl FetchGuard {
    fn finish(mut self, outcome: FetchOutcome) {
        if let Some(locator) = self.locator.take() {
            self.inner.resolve(&locator, outcome);
        }
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if let Some(locator) = self.locator.take() {
            tracing::error!(key = %short_digest(&locator), "fetch task ended without a result");
            self.inner
                .resolve(&locator, Err(Error::InvariantViolation(format!("fetch of {locator} ended without a result"))));
        }
    }
}

impl std::fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}
