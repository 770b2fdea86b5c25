//! Dashboard metrics computed from normalized tickets
//!
//! [`MetricsAggregator`] is a pure function of its input and a reference
//! instant. [`MetricsMemo`] keeps the last result for an unchanged snapshot.

use crate::config::MetricsConfig;
use crate::models::{Ticket, TicketPriority, TicketStatus};
use chrono::{DateTime, Duration, FixedOffset, Local, Timelike, Utc};
use helpdesk_common::{hours_between, percentage, round_one_decimal};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One value per ticket status
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown<T> {
    pub open: T,
    pub in_progress: T,
    pub pending: T,
    pub resolved: T,
    pub closed: T,
}

impl<T: Copy> StatusBreakdown<T> {
    #[must_use]
    pub fn get(&self, status: TicketStatus) -> T {
        match status {
            TicketStatus::Open => self.open,
            TicketStatus::InProgress => self.in_progress,
            TicketStatus::Pending => self.pending,
            TicketStatus::Resolved => self.resolved,
            TicketStatus::Closed => self.closed,
        }
    }

    fn slot(&mut self, status: TicketStatus) -> &mut T {
        match status {
            TicketStatus::Open => &mut self.open,
            TicketStatus::InProgress => &mut self.in_progress,
            TicketStatus::Pending => &mut self.pending,
            TicketStatus::Resolved => &mut self.resolved,
            TicketStatus::Closed => &mut self.closed,
        }
    }

    fn map<U>(&self, f: impl Fn(T) -> U) -> StatusBreakdown<U> {
        StatusBreakdown {
            open: f(self.open),
            in_progress: f(self.in_progress),
            pending: f(self.pending),
            resolved: f(self.resolved),
            closed: f(self.closed),
        }
    }
}

/// One value per ticket priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityBreakdown<T> {
    pub urgent: T,
    pub high: T,
    pub medium: T,
    pub low: T,
}

impl<T: Copy> PriorityBreakdown<T> {
    #[must_use]
    pub fn get(&self, priority: TicketPriority) -> T {
        match priority {
            TicketPriority::Urgent => self.urgent,
            TicketPriority::High => self.high,
            TicketPriority::Medium => self.medium,
            TicketPriority::Low => self.low,
        }
    }

    fn slot(&mut self, priority: TicketPriority) -> &mut T {
        match priority {
            TicketPriority::Urgent => &mut self.urgent,
            TicketPriority::High => &mut self.high,
            TicketPriority::Medium => &mut self.medium,
            TicketPriority::Low => &mut self.low,
        }
    }

    fn map<U>(&self, f: impl Fn(T) -> U) -> PriorityBreakdown<U> {
        PriorityBreakdown {
            urgent: f(self.urgent),
            high: f(self.high),
            medium: f(self.medium),
            low: f(self.low),
        }
    }
}

/// Aggregated dashboard figures
///
/// Percentages are rounded half-up to one decimal. Hour values are left
/// unrounded for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub in_progress_tickets: usize,
    pub pending_tickets: usize,
    pub resolved_tickets: usize,
    pub closed_tickets: usize,
    pub status_percentages: StatusBreakdown<f64>,
    pub priority_counts: PriorityBreakdown<usize>,
    pub priority_percentages: PriorityBreakdown<f64>,
    pub by_category: BTreeMap<String, usize>,
    pub resolved_today: usize,
    pub resolved_this_week: usize,
    pub average_response_time_hours: f64,
    /// Signed change of the recent mean response time against the previous window
    pub response_time_variation: f64,
    pub total_participants: usize,
    pub active_participants: usize,
    pub unassigned_tickets: usize,
    pub unassigned_percentage: f64,
    /// Share of tickets that are resolved or closed
    pub resolution_rate: f64,
}

impl DashboardMetrics {
    #[must_use]
    pub fn status_count(&self, status: TicketStatus) -> usize {
        match status {
            TicketStatus::Open => self.open_tickets,
            TicketStatus::InProgress => self.in_progress_tickets,
            TicketStatus::Pending => self.pending_tickets,
            TicketStatus::Resolved => self.resolved_tickets,
            TicketStatus::Closed => self.closed_tickets,
        }
    }
}

/// Computes [`DashboardMetrics`]
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    config: MetricsConfig,
}

impl MetricsAggregator {
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Aggregate against the local clock
    #[must_use]
    pub fn aggregate(&self, tickets: &[Ticket]) -> DashboardMetrics {
        self.aggregate_at(tickets, Local::now().fixed_offset())
    }

    /// Aggregate against a fixed instant
    ///
    /// The offset of `now` defines the local day used for "resolved today".
    #[must_use]
    pub fn aggregate_at(&self, tickets: &[Ticket], now: DateTime<FixedOffset>) -> DashboardMetrics {
        let total = tickets.len();
        if total == 0 {
            return DashboardMetrics::default();
        }

        let now_utc = now.with_timezone(&Utc);
        let start_of_day = start_of_local_day(now);
        let week_start = now_utc - Duration::days(self.config.week_window_days);
        let active_since = now_utc - Duration::hours(self.config.active_window_hours);
        let window = Duration::days(self.config.trend_window_days);
        let recent_start = now_utc - window;
        let older_start = recent_start - window;

        let mut statuses = StatusBreakdown::<usize>::default();
        let mut priorities = PriorityBreakdown::<usize>::default();
        let mut by_category = BTreeMap::new();
        let mut resolved_today = 0;
        let mut resolved_this_week = 0;
        let mut unassigned = 0;
        let mut all_responses = Vec::new();
        let mut recent = Vec::new();
        let mut older = Vec::new();
        let mut participants = HashSet::new();
        let mut active = HashSet::new();

        for ticket in tickets {
            *statuses.slot(ticket.status) += 1;
            *priorities.slot(ticket.priority) += 1;
            *by_category.entry(ticket.category.clone()).or_insert(0) += 1;

            if ticket.assigned_to.is_none() {
                unassigned += 1;
            }

            let ids = participant_ids(ticket);
            if ticket.updated_at > active_since {
                active.extend(ids.iter().copied());
            }
            participants.extend(ids);

            if !ticket.is_done() {
                continue;
            }

            let resolved_at = ticket.resolution_time();
            if resolved_at >= start_of_day && resolved_at <= now_utc {
                resolved_today += 1;
            }
            if resolved_at > week_start && resolved_at <= now_utc {
                resolved_this_week += 1;
            }

            let Some(hours) = self.response_hours(ticket) else {
                continue;
            };
            all_responses.push(hours);
            if resolved_at > recent_start && resolved_at <= now_utc {
                recent.push(hours);
            } else if resolved_at > older_start && resolved_at <= recent_start {
                older.push(hours);
            }
        }

        let done = statuses.resolved + statuses.closed;
        debug!(
            total,
            done,
            responses = all_responses.len(),
            "Aggregated dashboard metrics"
        );

        DashboardMetrics {
            total_tickets: total,
            open_tickets: statuses.open,
            in_progress_tickets: statuses.in_progress,
            pending_tickets: statuses.pending,
            resolved_tickets: statuses.resolved,
            closed_tickets: statuses.closed,
            status_percentages: statuses.map(|count| percentage(count, total)),
            priority_counts: priorities,
            priority_percentages: priorities.map(|count| percentage(count, total)),
            by_category,
            resolved_today,
            resolved_this_week,
            average_response_time_hours: mean(&all_responses).unwrap_or(0.0),
            response_time_variation: variation(&recent, &older),
            total_participants: participants.len(),
            active_participants: active.len(),
            unassigned_tickets: unassigned,
            unassigned_percentage: percentage(unassigned, total),
            resolution_rate: percentage(done, total),
        }
    }

    /// Hours from creation to resolution, `None` for outliers
    fn response_hours(&self, ticket: &Ticket) -> Option<f64> {
        let hours = hours_between(&ticket.created_at, &ticket.resolution_time());
        (hours > 0.0 && hours <= self.config.max_response_hours).then_some(hours)
    }
}

fn start_of_local_day(now: DateTime<FixedOffset>) -> DateTime<Utc> {
    let since_midnight = Duration::seconds(i64::from(now.num_seconds_from_midnight()))
        + Duration::nanoseconds(i64::from(now.nanosecond() % 1_000_000_000));
    (now - since_midnight).with_timezone(&Utc)
}

fn participant_ids(ticket: &Ticket) -> Vec<u64> {
    ticket
        .created_by
        .id
        .into_iter()
        .chain(ticket.assigned_to.as_ref().and_then(|a| a.id))
        .chain(ticket.participants.iter().filter_map(|p| p.id))
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let len = values.len() as f64;
    Some(values.iter().sum::<f64>() / len)
}

/// Signed percentage change, 0 without a usable baseline
fn variation(recent: &[f64], older: &[f64]) -> f64 {
    match (mean(recent), mean(older)) {
        (Some(recent), Some(older)) if older > 0.0 => {
            round_one_decimal((recent - older) / older * 100.0)
        }
        _ => 0.0,
    }
}

/// Memo hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl MemoStats {
    #[allow(clippy::cast_precision_loss)]
    fn calculate_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
    }
}

#[derive(Debug)]
struct MemoEntry {
    snapshot: Arc<[Ticket]>,
    computed_at: Instant,
    metrics: DashboardMetrics,
}

/// Remembers the metrics of the last snapshot
///
/// Snapshots are compared by identity, not content: a new `Arc` always
/// triggers a recomputation. Entries expire after the configured TTL so that
/// clock-relative figures are refreshed.
#[derive(Debug)]
pub struct MetricsMemo {
    aggregator: MetricsAggregator,
    ttl: std::time::Duration,
    entry: Mutex<Option<MemoEntry>>,
    stats: Mutex<MemoStats>,
}

impl MetricsMemo {
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        let ttl = std::time::Duration::from_secs(config.memo_ttl_secs);
        Self {
            aggregator: MetricsAggregator::new(config),
            ttl,
            entry: Mutex::new(None),
            stats: Mutex::new(MemoStats::default()),
        }
    }

    /// Metrics for `snapshot`, reusing the previous result when possible
    pub fn get(&self, snapshot: &Arc<[Ticket]>) -> DashboardMetrics {
        let mut entry = self.entry.lock();
        if let Some(cached) = entry.as_ref() {
            if Arc::ptr_eq(&cached.snapshot, snapshot) && cached.computed_at.elapsed() < self.ttl {
                self.record(true);
                return cached.metrics.clone();
            }
        }

        let metrics = self.aggregator.aggregate(snapshot);
        *entry = Some(MemoEntry {
            snapshot: Arc::clone(snapshot),
            computed_at: Instant::now(),
            metrics: metrics.clone(),
        });
        self.record(false);
        metrics
    }

    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }

    #[must_use]
    pub fn stats(&self) -> MemoStats {
        *self.stats.lock()
    }

    fn record(&self, hit: bool) {
        let mut stats = self.stats.lock();
        if hit {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        stats.calculate_hit_rate();
    }
}
