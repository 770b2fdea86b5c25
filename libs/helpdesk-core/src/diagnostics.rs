//! Deduplicated reporting of data anomalies found during normalization
//!
//! Reporters are injected into the [`crate::Normalizer`] instead of living in
//! a process-wide set, so each caller (or test) owns its "already seen"
//! cache and can inspect or reset it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::warn;

/// A recoverable or structural problem in a raw task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Anomaly {
    UnknownStatus { code: String },
    UnknownPriority { code: String },
    MissingIdentity,
    MalformedRecord { reason: String },
    UnparseableTimestamp {
        task_id: Option<u64>,
        field: String,
        value: String,
    },
    MissingCreationTime { task_id: u64 },
    MultipleOwners { task_id: u64, count: usize },
    /// A field whose value had the wrong type and was ignored
    MistypedField { task_id: Option<u64>, field: String },
}

impl Anomaly {
    /// Short machine-readable kind label
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownStatus { .. } => "unknown_status",
            Self::UnknownPriority { .. } => "unknown_priority",
            Self::MissingIdentity => "missing_identity",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::UnparseableTimestamp { .. } => "unparseable_timestamp",
            Self::MissingCreationTime { .. } => "missing_creation_time",
            Self::MultipleOwners { .. } => "multiple_owners",
            Self::MistypedField { .. } => "mistyped_field",
        }
    }

    /// Key under which repeated reports collapse into one
    ///
    /// Unknown codes dedupe on the code value alone, whichever task they
    /// came from.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        match self {
            Self::UnknownStatus { code } | Self::UnknownPriority { code } => {
                format!("{}:{code}", self.kind())
            }
            Self::MissingIdentity => self.kind().to_string(),
            Self::MalformedRecord { reason } => format!("{}:{reason}", self.kind()),
            Self::UnparseableTimestamp { field, value, .. } => {
                format!("{}:{field}:{value}", self.kind())
            }
            Self::MissingCreationTime { task_id } | Self::MultipleOwners { task_id, .. } => {
                format!("{}:{task_id}", self.kind())
            }
            Self::MistypedField { task_id, field } => match task_id {
                Some(id) => format!("{}:{id}:{field}", self.kind()),
                None => format!("{}:{field}", self.kind()),
            },
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownStatus { code } => {
                write!(f, "unrecognized status code '{code}', using open")
            }
            Self::UnknownPriority { code } => {
                write!(f, "unrecognized priority code '{code}', using medium")
            }
            Self::MissingIdentity => write!(f, "task record has no id"),
            Self::MalformedRecord { reason } => write!(f, "malformed task record: {reason}"),
            Self::UnparseableTimestamp {
                task_id,
                field,
                value,
            } => match task_id {
                Some(id) => write!(f, "task {id}: cannot parse {field} '{value}'"),
                None => write!(f, "cannot parse {field} '{value}'"),
            },
            Self::MissingCreationTime { task_id } => {
                write!(f, "task {task_id} has no usable creation time")
            }
            Self::MultipleOwners { task_id, count } => {
                write!(f, "task {task_id} has {count} task owners, using the first")
            }
            Self::MistypedField { task_id, field } => match task_id {
                Some(id) => write!(f, "task {id}: ignoring {field} with unexpected type"),
                None => write!(f, "ignoring {field} with unexpected type"),
            },
        }
    }
}

/// Sink for anomalies discovered during normalization
///
/// Implementations must not panic or block for long; reporting never
/// changes the normalized output.
pub trait AnomalyReporter: Send + Sync {
    fn report(&self, anomaly: Anomaly);
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl AnomalyReporter for NoopReporter {
    fn report(&self, _anomaly: Anomaly) {}
}

/// Bounded FIFO set of already reported keys
#[derive(Debug)]
struct SeenCache {
    keys: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenCache {
    fn new(capacity: usize) -> Self {
        Self {
            keys: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns `true` if the key had not been seen
    fn insert(&mut self, key: String) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        self.keys.insert(key.clone());
        self.order.push_back(key);
        true
    }

    fn clear(&mut self) {
        self.keys.clear();
        self.order.clear();
    }
}

/// Reporter that logs each distinct anomaly once
///
/// Emitted anomalies are retained (up to the cache capacity) so tests and
/// diagnostics views can read them back.
#[derive(Debug)]
pub struct DedupReporter {
    seen: Mutex<SeenCache>,
    emitted: Mutex<VecDeque<Anomaly>>,
    capacity: usize,
}

impl DedupReporter {
    /// Create a reporter remembering up to `capacity` distinct anomalies
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(SeenCache::new(capacity)),
            emitted: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Anomalies logged so far, oldest first
    #[must_use]
    pub fn emitted(&self) -> Vec<Anomaly> {
        self.emitted.lock().iter().cloned().collect()
    }

    /// Number of distinct keys currently remembered
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.lock().keys.len()
    }

    /// Forget everything seen and emitted
    pub fn reset(&self) {
        self.seen.lock().clear();
        self.emitted.lock().clear();
    }
}

impl Default for DedupReporter {
    fn default() -> Self {
        Self::new(helpdesk_common::DEFAULT_SEEN_CAPACITY)
    }
}

impl AnomalyReporter for DedupReporter {
    fn report(&self, anomaly: Anomaly) {
        #[cfg(feature = "observability")]
        metrics::counter!("helpdesk_normalization_anomalies_total", "kind" => anomaly.kind())
            .increment(1);

        if !self.seen.lock().insert(anomaly.dedup_key()) {
            return;
        }

        warn!(kind = anomaly.kind(), "{anomaly}");

        let mut emitted = self.emitted.lock();
        if emitted.len() >= self.capacity {
            emitted.pop_front();
        }
        emitted.push_back(anomaly);
    }
}
