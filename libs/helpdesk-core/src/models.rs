//! Normalized ticket view-model consumed by the dashboard

use chrono::{DateTime, Utc};
use helpdesk_common::percentage;
use serde::{Deserialize, Serialize};

/// Ticket status
///
/// `Closed` is part of the vocabulary but no backend state code maps to it;
/// only an action outside normalization can produce a closed ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TicketStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(rename = "closed")]
    Closed,
}

impl TicketStatus {
    /// All statuses in display order
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Open,
            Self::InProgress,
            Self::Pending,
            Self::Resolved,
            Self::Closed,
        ]
    }

    /// Wire label of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Whether work on the ticket is finished
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TicketPriority {
    #[serde(rename = "urgent")]
    Urgent,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "low")]
    Low,
}

impl TicketPriority {
    /// All priorities from most to least pressing
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Urgent, Self::High, Self::Medium, Self::Low]
    }

    /// Wire label of the priority
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Flattened user reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// Backend user id, `None` when the backend sent none
    pub id: Option<u64>,
    /// Trimmed "first last" or the unknown-user placeholder
    pub display_name: String,
}

/// Participant holding the task-owner role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub id: Option<u64>,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Option<u64>,
    pub name: String,
    pub role: Option<String>,
    pub has_privileges: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: Option<u64>,
    pub kind: String,
    pub user: UserRef,
}

/// Comment flattened for display
///
/// `parent_id` and `level` are kept so the reply tree can be rebuilt; see
/// [`crate::threads`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Option<u64>,
    pub author: UserRef,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
    pub parent_id: Option<u64>,
    pub level: u32,
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistAttribute {
    pub id: Option<u64>,
    pub title: String,
    pub completed: bool,
    pub order: u32,
}

/// Checklist stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Option<u64>,
    pub title: String,
    pub completed: bool,
    pub notes: Option<String>,
    pub order: u32,
    pub attributes: Vec<ChecklistAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Option<u64>,
    pub name: String,
    pub url: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Why a fallback ticket had to be synthesized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum StructuralAnomaly {
    /// The record carried no task id
    MissingIdentity,
    /// The record was not a task object at all
    MalformedRecord(String),
}

/// Checklist completion summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

/// Normalized ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
    /// Last update, falling back to creation time
    pub updated_at: DateTime<Utc>,
    /// Only set when it differs from `created_at`
    pub start_date: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_by: UserRef,
    pub assigned_to: Option<Assignee>,
    pub participants: Vec<Participant>,
    pub messages: Vec<Message>,
    pub checklist: Vec<ChecklistItem>,
    pub attachments: Vec<Attachment>,
    pub parent_ids: Vec<u64>,
    pub child_ids: Vec<u64>,
    /// Set on fallback tickets only
    pub anomaly: Option<StructuralAnomaly>,
}

impl Ticket {
    /// Whether the ticket is resolved or closed
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    /// When the ticket was finished, falling back to its last update
    #[must_use]
    pub fn resolution_time(&self) -> DateTime<Utc> {
        self.finished_at.unwrap_or(self.updated_at)
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.anomaly.is_some()
    }

    #[must_use]
    pub fn checklist_progress(&self) -> ChecklistProgress {
        let total = self.checklist.len();
        let completed = self.checklist.iter().filter(|item| item.completed).count();
        ChecklistProgress {
            completed,
            total,
            percentage: percentage(completed, total),
        }
    }
}
