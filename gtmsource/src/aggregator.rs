//! Search aggregation over every registered provider
//!
//! A search fans out to all providers concurrently. Each provider's stream is
//! drained into its own buffer inside a dedicated task, so a hung provider
//! only delays its own contribution and a panicking one contributes nothing.
//!
//! A newer search supersedes older ones. Starting a search aborts the
//! provider tasks of the one before it, so a superseded search stops pulling
//! from backends that share one session across searches. Nothing a
//! superseded search produced reaches the published result set.

use crate::resolver::ProviderRegistry;
use crate::{AudioResolver, ProviderKind, VideoPreview};
use futures::StreamExt;
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Result of one [`Aggregator::search`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The search was still current when it finished; these results were published
    Completed(Vec<VideoPreview>),
    /// A newer search started before this one finished; its results were dropped
    Superseded,
}

impl SearchOutcome {
    pub fn results(&self) -> Option<&[VideoPreview]> {
        match self {
            SearchOutcome::Completed(results) => Some(results),
            SearchOutcome::Superseded => None,
        }
    }
}

struct AggregatorInner {
    providers: Vec<Arc<dyn AudioResolver>>,
    generation: AtomicU64,
    in_flight: watch::Sender<usize>,
    results: watch::Sender<Arc<Vec<VideoPreview>>>,
    /// Provider tasks of the current search
    running: Mutex<Vec<AbortHandle>>,
}

impl AggregatorInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Replaces the published results unless `generation` has been superseded
    fn publish(&self, generation: u64, results: Vec<VideoPreview>) -> bool {
        // checked under the watch lock so a newer search cannot interleave
        self.results.send_if_modified(|current| {
            if self.is_current(generation) {
                *current = Arc::new(results);
                true
            } else {
                false
            }
        })
    }
}

/// Counts one running search until dropped
///
/// Dropping the search future mid-way also stops its provider tasks.
struct InFlight {
    inner: Arc<AggregatorInner>,
    tasks: Vec<AbortHandle>,
}

impl InFlight {
    fn enter(inner: Arc<AggregatorInner>) -> Self {
        inner.in_flight.send_modify(|count| *count += 1);
        Self {
            inner,
            tasks: Vec::new(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.inner.in_flight.send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Merges the results of all providers into one list
///
/// Cloning an `Aggregator` yields a handle to the same search state.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<AggregatorInner>,
}

impl Aggregator {
    pub fn new(registry: &ProviderRegistry) -> Self {
        Self::with_providers(registry.providers().to_vec())
    }

    pub fn with_providers(providers: Vec<Arc<dyn AudioResolver>>) -> Self {
        Self {
            inner: Arc::new(AggregatorInner {
                providers,
                generation: AtomicU64::new(0),
                in_flight: watch::channel(0).0,
                results: watch::channel(Arc::new(Vec::new())).0,
                running: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Runs a search across every provider
    ///
    /// Results are ordered by provider and, within a provider, in the order
    /// the provider yielded them. Provider failures reduce the result set and
    /// are never reported as errors.
    pub async fn search(&self, term: &str) -> SearchOutcome {
        let inner = &self.inner;
        let mut in_flight = InFlight::enter(inner.clone());

        let (generation, tasks) = {
            let mut running = inner.running.lock().unwrap();
            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            for task in running.drain(..) {
                task.abort();
            }
            inner.publish(generation, Vec::new());

            let tasks: Vec<_> = inner
                .providers
                .iter()
                .map(|provider| {
                    let provider = provider.clone();
                    let inner = self.inner.clone();
                    let term = term.to_string();
                    tokio::spawn(async move {
                        let mut buffer = Vec::new();
                        let mut previews = provider.search(&term);
                        while let Some(preview) = previews.next().await {
                            if !inner.is_current(generation) {
                                break;
                            }
                            buffer.push(preview);
                        }
                        buffer
                    })
                })
                .collect();
            running.extend(tasks.iter().map(|task| task.abort_handle()));
            in_flight.tasks = tasks.iter().map(|task| task.abort_handle()).collect();
            (generation, tasks)
        };

        info!(term = %term, generation, providers = inner.providers.len(), "Starting aggregated search");

        let kinds: Vec<ProviderKind> = inner.providers.iter().map(|p| p.kind()).collect();
        let drained = join_all(tasks).await;

        let mut merged = Vec::new();
        for (kind, result) in kinds.into_iter().zip(drained) {
            match result {
                Ok(buffer) => {
                    debug!(provider = %kind, count = buffer.len(), "Provider search finished");
                    merged.extend(buffer);
                }
                Err(e) if e.is_cancelled() => {
                    debug!(provider = %kind, "Provider search cancelled by a newer search");
                }
                Err(e) => {
                    warn!(provider = %kind, error = %e, "Provider search aborted, ignoring its results");
                }
            }
        }

        if inner.publish(generation, merged.clone()) {
            info!(term = %term, count = merged.len(), "Aggregated search complete");
            SearchOutcome::Completed(merged)
        } else {
            debug!(term = %term, generation, "Search superseded, discarding results");
            SearchOutcome::Superseded
        }
    }

    /// Number of searches still running, superseded ones included
    pub fn loading_count(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.loading_count() > 0
    }

    /// Watches the in-flight counter, e.g. to drive a loading indicator
    pub fn subscribe_loading(&self) -> watch::Receiver<usize> {
        self.inner.in_flight.subscribe()
    }

    /// Results of the most recent search
    pub fn results(&self) -> Arc<Vec<VideoPreview>> {
        self.inner.results.borrow().clone()
    }

    pub fn subscribe_results(&self) -> watch::Receiver<Arc<Vec<VideoPreview>>> {
        self.inner.results.subscribe()
    }

    pub fn providers(&self) -> &[Arc<dyn AudioResolver>] {
        &self.inner.providers
    }
}
