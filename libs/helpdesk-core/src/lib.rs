//! Helpdesk Core - Ticket normalization and dashboard metrics
//!
//! This library turns raw task records from the helpdesk REST API into
//! strongly typed [`Ticket`] view-models and aggregates them into
//! [`DashboardMetrics`].
//!
//! # Features
//!
//! - **Total normalization**: every record yields a ticket; unknown codes and
//!   missing fields fall back to documented defaults
//! - **Injectable diagnostics**: anomalies go to an [`AnomalyReporter`] with
//!   its own deduplication cache
//! - **Dashboard metrics**: status, priority and category breakdowns,
//!   response times and trends, participant counts
//! - **Ticket graph**: parent/child traversal with cycle detection
//! - **Refresh coordination**: at most one applied fetch result per ticket id
//!
//! # Quick Start
//!
//! ```
//! use helpdesk_core::{MetricsAggregator, Normalizer, TicketStatus};
//! use serde_json::json;
//!
//! let normalizer = Normalizer::default();
//! let ticket = normalizer.normalize_value(&json!({
//!     "id": 7,
//!     "detalle": "Monitor flickers",
//!     "estado": "in_review",
//!     "clasificacion": "U"
//! }));
//! assert_eq!(ticket.status, TicketStatus::Pending);
//!
//! let metrics = MetricsAggregator::default().aggregate(&[ticket]);
//! assert_eq!(metrics.pending_tickets, 1);
//! ```
//!
//! # Crate Features
//!
//! - `test-utils`: Enable builders, fixtures and a mock task source
//! - `observability`: Count reported anomalies through the `metrics` facade

pub mod config;
pub mod config_loader;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod observability;
pub mod raw;
pub mod refresh;
pub mod threads;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{DiagnosticsConfig, HelpdeskConfig, MetricsConfig, NormalizerConfig};
pub use config_loader::{load_config, load_config_with_paths, ConfigLoader};
pub use diagnostics::{Anomaly, AnomalyReporter, DedupReporter, NoopReporter};
pub use error::{HelpdeskError, Result};
pub use graph::TaskGraph;
pub use metrics::{
    DashboardMetrics, MemoStats, MetricsAggregator, MetricsMemo, PriorityBreakdown,
    StatusBreakdown,
};
pub use models::*;
pub use normalizer::{normalize, Normalizer};
pub use observability::{init_tracing, ObservabilityConfig, ObservabilityError};
pub use raw::{DecodedTask, RawTask};
pub use refresh::{RefreshCoordinator, RefreshOutcome, TaskSource, TicketStore};
pub use threads::{build_threads, sorted_by_time, MessageThread};

/// Re-export commonly used types
pub use chrono::{DateTime, FixedOffset, Utc};
