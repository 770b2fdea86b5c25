//! Re-fetching tickets without applying stale results
//!
//! At most one refresh per ticket id is in flight. Starting a new refresh
//! aborts the previous one, and a result is applied to the [`TicketStore`]
//! only while its request is still the newest for that id.

use crate::error::{HelpdeskError, Result};
use crate::models::Ticket;
use crate::normalizer::Normalizer;
use crate::raw::RawTask;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, instrument, warn};

/// Backend able to fetch a single raw task
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch the current record for `id`
    ///
    /// # Errors
    /// Returns an error if the task cannot be fetched
    async fn fetch_task(&self, id: u64) -> Result<RawTask>;
}

#[async_trait]
impl<T: TaskSource + ?Sized> TaskSource for Arc<T> {
    async fn fetch_task(&self, id: u64) -> Result<RawTask> {
        (**self).fetch_task(id).await
    }
}

/// Latest applied tickets, keyed by id
///
/// Snapshots are shared: the same `Arc` is returned until the store changes,
/// which lets [`crate::MetricsMemo`] skip recomputation.
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: RwLock<BTreeMap<u64, Ticket>>,
    snapshot: RwLock<Option<Arc<[Ticket]>>>,
}

impl TicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a ticket
    pub fn insert(&self, ticket: Ticket) {
        self.tickets.write().insert(ticket.id, ticket);
        *self.snapshot.write() = None;
    }

    pub fn extend(&self, tickets: impl IntoIterator<Item = Ticket>) {
        {
            let mut map = self.tickets.write();
            for ticket in tickets {
                map.insert(ticket.id, ticket);
            }
        }
        *self.snapshot.write() = None;
    }

    pub fn remove(&self, id: u64) -> Option<Ticket> {
        let removed = self.tickets.write().remove(&id);
        if removed.is_some() {
            *self.snapshot.write() = None;
        }
        removed
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<Ticket> {
        self.tickets.read().get(&id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.read().is_empty()
    }

    /// All tickets ordered by id
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Ticket]> {
        if let Some(snapshot) = self.snapshot.read().as_ref() {
            return Arc::clone(snapshot);
        }
        let tickets = self.tickets.read();
        let fresh: Arc<[Ticket]> = tickets.values().cloned().collect();
        *self.snapshot.write() = Some(Arc::clone(&fresh));
        fresh
    }
}

/// Result of a single refresh
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The ticket was fetched, normalized and stored
    Applied(Ticket),
    /// A newer refresh (or a cancel) for the same id took over
    Superseded,
    /// The fetch failed while this refresh was still the newest
    Failed(HelpdeskError),
}

impl RefreshOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// Coordinates fetch-and-normalize calls per ticket id
pub struct RefreshCoordinator<S> {
    source: Arc<S>,
    normalizer: Arc<Normalizer>,
    store: Arc<TicketStore>,
    generations: Arc<DashMap<u64, u64>>,
    in_flight: Arc<DashMap<u64, (u64, AbortHandle)>>,
}

impl<S> Clone for RefreshCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            normalizer: Arc::clone(&self.normalizer),
            store: Arc::clone(&self.store),
            generations: Arc::clone(&self.generations),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<S: TaskSource + 'static> RefreshCoordinator<S> {
    pub fn new(source: Arc<S>, normalizer: Arc<Normalizer>, store: Arc<TicketStore>) -> Self {
        Self {
            source,
            normalizer,
            store,
            generations: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<TicketStore> {
        &self.store
    }

    /// Number of refreshes currently running
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn next_generation(&self, id: u64) -> u64 {
        let mut generation = self.generations.entry(id).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, id: u64, generation: u64) -> bool {
        self.generations
            .get(&id)
            .is_some_and(|current| *current == generation)
    }

    /// Fetch, normalize and store ticket `id`
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self))]
    pub async fn refresh(&self, id: u64) -> RefreshOutcome {
        let generation = self.next_generation(id);

        let source = Arc::clone(&self.source);
        let normalizer = Arc::clone(&self.normalizer);
        let handle = tokio::spawn(async move {
            let raw = source.fetch_task(id).await?;
            Ok::<_, HelpdeskError>(normalizer.normalize(&raw))
        });

        if let Some((previous, abort)) = self
            .in_flight
            .insert(id, (generation, handle.abort_handle()))
        {
            debug!(id, previous, generation, "Aborting superseded refresh");
            abort.abort();
        }

        let joined = handle.await;
        self.in_flight
            .remove_if(&id, |_, (owner, _)| *owner == generation);

        match joined {
            Err(e) if e.is_cancelled() => RefreshOutcome::Superseded,
            Err(e) => {
                warn!(id, "Refresh task panicked: {e}");
                RefreshOutcome::Failed(HelpdeskError::unknown(format!(
                    "refresh of task {id} panicked"
                )))
            }
            Ok(Err(e)) if self.is_current(id, generation) => {
                warn!(id, "Refresh failed: {e}");
                RefreshOutcome::Failed(e)
            }
            Ok(Err(_)) => RefreshOutcome::Superseded,
            Ok(Ok(ticket)) => self.apply(id, generation, ticket),
        }
    }

    /// Store `ticket` unless a newer refresh for `id` has started
    fn apply(&self, id: u64, generation: u64, ticket: Ticket) -> RefreshOutcome {
        // The generation guard is held while storing so no newer refresh can
        // start in between the check and the insert
        let Some(current) = self.generations.get(&id) else {
            return RefreshOutcome::Superseded;
        };
        if *current != generation {
            return RefreshOutcome::Superseded;
        }
        self.store.insert(ticket.clone());
        drop(current);

        debug!(id, generation, "Applied refreshed ticket");
        RefreshOutcome::Applied(ticket)
    }

    /// Refresh several ids concurrently
    ///
    /// Outcomes are returned in the order the refreshes complete.
    pub async fn refresh_all(&self, ids: &[u64]) -> Vec<(u64, RefreshOutcome)> {
        let mut set = JoinSet::new();
        for &id in ids {
            let coordinator = self.clone();
            set.spawn(async move { (id, coordinator.refresh(id).await) });
        }

        let mut outcomes = Vec::with_capacity(ids.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Refresh worker failed: {e}"),
            }
        }
        outcomes
    }

    /// Abort any in-flight refresh of `id`
    ///
    /// Returns `true` if a refresh was running.
    pub fn cancel(&self, id: u64) -> bool {
        self.next_generation(id);
        match self.in_flight.remove(&id) {
            Some((_, (_, abort))) => {
                abort.abort();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoopReporter;
    use crate::config::NormalizerConfig;

    struct FailingSource;

    #[async_trait]
    impl TaskSource for FailingSource {
        async fn fetch_task(&self, id: u64) -> Result<RawTask> {
            Err(HelpdeskError::TaskNotFound { id })
        }
    }

    fn normalizer() -> Arc<Normalizer> {
        Arc::new(Normalizer::new(
            NormalizerConfig::default(),
            Arc::new(NoopReporter),
        ))
    }

    #[test]
    fn test_snapshot_is_shared_until_changed() {
        let store = TicketStore::new();
        let first = store.snapshot();
        assert!(first.is_empty());
        assert!(Arc::ptr_eq(&first, &store.snapshot()));

        store.insert(crate::test_utils::TicketBuilder::new(3).build());
        let second = store.snapshot();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
        assert!(store.remove(3).is_some());
        assert!(store.remove(3).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_store_untouched() {
        let coordinator =
            RefreshCoordinator::new(Arc::new(FailingSource), normalizer(), Arc::new(TicketStore::new()));
        let outcome = coordinator.refresh(5).await;

        assert!(matches!(
            outcome,
            RefreshOutcome::Failed(HelpdeskError::TaskNotFound { id: 5 })
        ));
        assert!(coordinator.store().is_empty());
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_without_refresh() {
        let coordinator =
            RefreshCoordinator::new(Arc::new(FailingSource), normalizer(), Arc::new(TicketStore::new()));
        assert!(!coordinator.cancel(1));
    }
}
