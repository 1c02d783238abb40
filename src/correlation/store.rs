use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot preparation that has started but not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparationRecord {
    pub key: String,
    pub started_at: Instant,
    /// Name of the committed snapshot this one is layered on, empty for a base layer.
    pub parent_key: String,
}

/// A committed snapshot together with the time it took to prepare it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPreparation {
    pub key: String,
    pub name: String,
    pub parent_name: String,
    pub duration: Duration,
    pub completed_at: Instant,
}

/// Limits applied by [`CorrelationStore::evict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub pending_ttl: Duration,
    /// `None` keeps completed preparations resolvable for the lifetime of the process.
    pub layer_retention: Option<Duration>,
}

/// Number of records dropped by a single [`CorrelationStore::evict`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub pending: usize,
    pub completed: usize,
}

/// In-flight and completed snapshot preparations, keyed for correlation.
///
/// Completed preparations are indexed by their ephemeral key and by their stable name.
/// Both indexes share the same allocation.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    pending_by_key: HashMap<String, PreparationRecord>,
    completed_by_key: HashMap<String, Arc<CompletedPreparation>>,
    completed_by_name: HashMap<String, Arc<CompletedPreparation>>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a preparation for `key`.
    ///
    /// Returns the record that was replaced if `key` was already in flight.
    pub fn record_start(
        &mut self,
        key: impl Into<String>,
        parent_key: impl Into<String>,
        started_at: Instant,
    ) -> Option<PreparationRecord> {
        let key = key.into();
        self.pending_by_key.insert(
            key.clone(),
            PreparationRecord {
                key,
                started_at,
                parent_key: parent_key.into(),
            },
        )
    }

    /// Matches a commit against the in-flight preparation for `key`.
    ///
    /// Returns `None` and leaves the store untouched if no preparation for `key` is known.
    /// On a match the in-flight record is consumed.
    pub fn record_completion(
        &mut self,
        key: &str,
        name: impl Into<String>,
        completed_at: Instant,
    ) -> Option<Arc<CompletedPreparation>> {
        let start = self.pending_by_key.remove(key)?;
        let completed = Arc::new(CompletedPreparation {
            duration: completed_at.saturating_duration_since(start.started_at),
            name: name.into(),
            parent_name: start.parent_key,
            key: start.key,
            completed_at,
        });
        self.completed_by_key
            .insert(completed.key.clone(), Arc::clone(&completed));
        self.completed_by_name
            .insert(completed.name.clone(), Arc::clone(&completed));

        Some(completed)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&Arc<CompletedPreparation>> {
        self.completed_by_name.get(name)
    }

    pub fn lookup_by_key(&self, key: &str) -> Option<&Arc<CompletedPreparation>> {
        self.completed_by_key.get(key)
    }

    pub fn lookup_start(&self, key: &str) -> Option<&PreparationRecord> {
        self.pending_by_key.get(key)
    }

    /// Drops in-flight starts older than the pending TTL and, if configured, completed
    /// preparations older than the layer retention.
    pub fn evict(&mut self, now: Instant, policy: &RetentionPolicy) -> Eviction {
        let mut eviction = Eviction::default();

        let pending_before = self.pending_by_key.len();
        self.pending_by_key
            .retain(|_, start| now.saturating_duration_since(start.started_at) < policy.pending_ttl);
        eviction.pending = pending_before - self.pending_by_key.len();

        if let Some(retention) = policy.layer_retention {
            let keep = |completed: &Arc<CompletedPreparation>| {
                now.saturating_duration_since(completed.completed_at) < retention
            };
            let completed_before = self.completed_by_key.len();
            self.completed_by_key.retain(|_, completed| keep(completed));
            self.completed_by_name.retain(|_, completed| keep(completed));
            eviction.completed = completed_before - self.completed_by_key.len();
        }

        eviction
    }

    pub fn pending_len(&self) -> usize {
        self.pending_by_key.len()
    }

    pub fn completed_len(&self) -> usize {
        self.completed_by_key.len()
    }
}
