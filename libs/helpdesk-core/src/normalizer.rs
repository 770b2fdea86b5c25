//! Conversion of raw API task records into [`Ticket`] view-models
//!
//! Normalization is total: every input yields a ticket. Recoverable gaps are
//! filled with documented defaults, unknown codes are coerced and reported,
//! and records that cannot be identified become tagged fallback tickets.

use crate::config::NormalizerConfig;
use crate::diagnostics::{Anomaly, AnomalyReporter, DedupReporter};
use crate::models::{
    Assignee, Attachment, ChecklistAttribute, ChecklistItem, Message, Participant, Reaction,
    StructuralAnomaly, Ticket, TicketPriority, TicketStatus, UserRef,
};
use crate::raw::{
    DecodedTask, RawAttachment, RawComment, RawParticipant, RawStage, RawTask, RawUser,
};
use chrono::{DateTime, Utc};
use helpdesk_common::{
    compose_display_name, parse_timestamp, truncate_string, TimestampError, ERROR_CATEGORY,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Backend state codes and the status each maps to
pub const STATUS_TABLE: &[(&str, TicketStatus)] = &[
    ("available", TicketStatus::Open),
    ("in_development", TicketStatus::InProgress),
    ("in_review", TicketStatus::Pending),
    ("archived", TicketStatus::Resolved),
];

/// Backend classification letters and the priority each maps to
pub const PRIORITY_TABLE: &[(&str, TicketPriority)] = &[
    ("U", TicketPriority::Urgent),
    ("P", TicketPriority::High),
    ("N", TicketPriority::Medium),
    ("C", TicketPriority::Low),
];

/// Status used for absent or unrecognized state codes
pub const DEFAULT_STATUS: TicketStatus = TicketStatus::Open;

/// Priority used for absent or unrecognized classification codes
pub const DEFAULT_PRIORITY: TicketPriority = TicketPriority::Medium;

/// Look up a state code; `None` means the code is not in the table
#[must_use]
pub fn lookup_status(code: &str) -> Option<TicketStatus> {
    STATUS_TABLE
        .iter()
        .find(|(raw, _)| *raw == code)
        .map(|(_, status)| *status)
}

/// Look up a classification letter; `None` means the code is not in the table
#[must_use]
pub fn lookup_priority(code: &str) -> Option<TicketPriority> {
    PRIORITY_TABLE
        .iter()
        .find(|(raw, _)| *raw == code)
        .map(|(_, priority)| *priority)
}

/// Normalize with the default configuration
pub fn normalize(task: &RawTask, reporter: &dyn AnomalyReporter) -> Ticket {
    Pass::new(&NormalizerConfig::default(), reporter, task.id).task(task)
}

/// Turns raw task records into tickets
///
/// Holds its configuration and an injected [`AnomalyReporter`]. Each call is
/// independent; nothing is cached between calls.
#[derive(Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    reporter: Arc<dyn AnomalyReporter>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default(), Arc::new(DedupReporter::default()))
    }
}

impl Normalizer {
    #[must_use]
    pub fn new(config: NormalizerConfig, reporter: Arc<dyn AnomalyReporter>) -> Self {
        Self { config, reporter }
    }

    #[must_use]
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn AnomalyReporter> {
        &self.reporter
    }

    /// Normalize one raw task
    #[instrument(level = "debug", skip_all, fields(task_id = task.id))]
    pub fn normalize(&self, task: &RawTask) -> Ticket {
        Pass::new(&self.config, self.reporter.as_ref(), task.id).task(task)
    }

    /// Normalize an untyped JSON record
    ///
    /// Fields of the wrong type are dropped and reported as
    /// [`Anomaly::MistypedField`]; the rest of the record is kept. Values
    /// that are not task objects, or whose `id` is not a non-negative
    /// integer, become fallback tickets tagged
    /// [`StructuralAnomaly::MalformedRecord`].
    pub fn normalize_value(&self, value: &Value) -> Ticket {
        let Some(object) = value.as_object() else {
            return self.fallback_pass().malformed(format!(
                "expected an object, got {}",
                kind_of(value)
            ));
        };
        if let Some(id) = object
            .get("id")
            .filter(|id| !id.is_null() && id.as_u64().is_none())
        {
            return self
                .fallback_pass()
                .malformed(format!("unusable id {id}"));
        }

        let DecodedTask { task, mistyped } = RawTask::from_object(object);
        for field in mistyped {
            self.reporter.report(Anomaly::MistypedField {
                task_id: task.id,
                field,
            });
        }
        self.normalize(&task)
    }

    fn fallback_pass(&self) -> Pass<'_> {
        Pass::new(&self.config, self.reporter.as_ref(), None)
    }

    pub fn normalize_all(&self, tasks: &[RawTask]) -> Vec<Ticket> {
        tasks.iter().map(|task| self.normalize(task)).collect()
    }

    pub fn normalize_values(&self, values: &[Value]) -> Vec<Ticket> {
        values.iter().map(|value| self.normalize_value(value)).collect()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn dedup_ids(ids: &[u64]) -> Vec<u64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// One normalization pass over a single record
struct Pass<'a> {
    config: &'a NormalizerConfig,
    reporter: &'a dyn AnomalyReporter,
    task_id: Option<u64>,
}

impl<'a> Pass<'a> {
    fn new(
        config: &'a NormalizerConfig,
        reporter: &'a dyn AnomalyReporter,
        task_id: Option<u64>,
    ) -> Self {
        Self {
            config,
            reporter,
            task_id,
        }
    }

    fn task(&self, task: &RawTask) -> Ticket {
        let Some(id) = task.id else {
            return self.missing_identity(task);
        };

        let (title, description) = self.title_and_description(task.detail.as_deref());
        let (created_at, updated_at) = self.created_and_updated(id, task);
        let start_date = self
            .timestamp("fecha_inicio", task.start_date.as_deref())
            .filter(|start| *start != created_at);
        let finished_at = self.timestamp("fecha_fin", task.finished_at.as_deref());

        let participants: Vec<Participant> = task
            .participants
            .iter()
            .map(|p| self.participant(p))
            .collect();
        let assigned_to = self.assignee(id, &participants);

        Ticket {
            id,
            title,
            description,
            category: non_empty(task.category.as_deref())
                .unwrap_or_else(|| self.config.default_category.clone()),
            status: self.status(task.state.as_deref()),
            priority: self.priority(task.classification.as_deref()),
            created_at,
            updated_at,
            start_date,
            finished_at,
            created_by: self.user(task.creator.as_ref()),
            assigned_to,
            participants,
            messages: self.messages(&task.comments),
            checklist: self.checklist(&task.stages),
            attachments: task.attachments.iter().map(|a| self.attachment(a)).collect(),
            parent_ids: dedup_ids(&task.parent_ids),
            child_ids: dedup_ids(&task.child_ids),
            anomaly: None,
        }
    }

    fn status(&self, code: Option<&str>) -> TicketStatus {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return DEFAULT_STATUS;
        };
        lookup_status(code).unwrap_or_else(|| {
            self.reporter.report(Anomaly::UnknownStatus {
                code: code.to_string(),
            });
            DEFAULT_STATUS
        })
    }

    fn priority(&self, code: Option<&str>) -> TicketPriority {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return DEFAULT_PRIORITY;
        };
        lookup_priority(code).unwrap_or_else(|| {
            self.reporter.report(Anomaly::UnknownPriority {
                code: code.to_string(),
            });
            DEFAULT_PRIORITY
        })
    }

    fn title_and_description(&self, detail: Option<&str>) -> (String, String) {
        let description = detail.map(str::trim).unwrap_or_default().to_string();
        let title = description
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map_or_else(
                || self.config.untitled_placeholder.clone(),
                |line| truncate_string(line, self.config.title_max_len),
            );
        (title, description)
    }

    fn timestamp(&self, field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
        match parse_timestamp(raw?) {
            Ok(dt) => Some(dt),
            Err(TimestampError::Empty) => None,
            Err(TimestampError::Unrecognized(value)) => {
                self.reporter.report(Anomaly::UnparseableTimestamp {
                    task_id: self.task_id,
                    field: field.to_string(),
                    value,
                });
                None
            }
        }
    }

    /// Creation falls back to the update time, then to the epoch; update
    /// falls back to creation
    fn created_and_updated(&self, id: u64, task: &RawTask) -> (DateTime<Utc>, DateTime<Utc>) {
        let created = self.timestamp("fecha_creacion", task.created_at.as_deref());
        let updated = self.timestamp("fecha_actualizacion", task.updated_at.as_deref());

        let created_at = created.or(updated).unwrap_or_else(|| {
            self.reporter
                .report(Anomaly::MissingCreationTime { task_id: id });
            DateTime::<Utc>::UNIX_EPOCH
        });
        (created_at, updated.unwrap_or(created_at))
    }

    fn user(&self, raw: Option<&RawUser>) -> UserRef {
        let (id, display_name) = match raw {
            Some(user) => (
                user.id,
                compose_display_name(
                    user.first_name.as_deref(),
                    user.last_name.as_deref(),
                    &self.config.unknown_user_placeholder,
                ),
            ),
            None => (None, self.config.unknown_user_placeholder.clone()),
        };
        UserRef { id, display_name }
    }

    fn participant(&self, raw: &RawParticipant) -> Participant {
        let user = self.user(raw.user.as_ref());
        Participant {
            id: user.id,
            name: user.display_name,
            role: non_empty(raw.role.as_deref()),
            has_privileges: raw.has_privileges,
        }
    }

    fn is_task_owner(&self, role: Option<&str>) -> bool {
        role.is_some_and(|r| {
            r.trim()
                .eq_ignore_ascii_case(self.config.task_owner_role.trim())
        })
    }

    fn assignee(&self, task_id: u64, participants: &[Participant]) -> Option<Assignee> {
        let mut owners = participants
            .iter()
            .filter(|p| self.is_task_owner(p.role.as_deref()));
        let first = owners.next()?;

        let extra = owners.count();
        if extra > 0 {
            self.reporter.report(Anomaly::MultipleOwners {
                task_id,
                count: extra + 1,
            });
        }

        Some(Assignee {
            id: first.id,
            display_name: first.name.clone(),
            role: first.role.clone().unwrap_or_default(),
        })
    }

    fn messages(&self, comments: &[RawComment]) -> Vec<Message> {
        let mut levels: HashMap<u64, u32> = comments
            .iter()
            .filter_map(|c| Some((c.id?, c.level?)))
            .collect();

        comments
            .iter()
            .map(|comment| {
                let level = comment.level.unwrap_or_else(|| match comment.parent {
                    None => 0,
                    Some(parent) => levels.get(&parent).map_or(1, |l| l + 1),
                });
                if let Some(id) = comment.id {
                    levels.entry(id).or_insert(level);
                }

                Message {
                    id: comment.id,
                    author: self.user(comment.user.as_ref()),
                    body: comment.content.clone().unwrap_or_default(),
                    created_at: self.timestamp("comentarios.fecha", comment.created_at.as_deref()),
                    parent_id: comment.parent,
                    level,
                    reactions: comment
                        .reactions
                        .iter()
                        .map(|r| Reaction {
                            id: r.id,
                            kind: non_empty(r.kind.as_deref())
                                .unwrap_or_else(|| "unknown".to_string()),
                            user: self.user(r.user.as_ref()),
                        })
                        .collect(),
                }
            })
            .collect()
    }

    fn checklist(&self, stages: &[RawStage]) -> Vec<ChecklistItem> {
        let mut items: Vec<ChecklistItem> = stages
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                let mut attributes: Vec<ChecklistAttribute> = stage
                    .attributes
                    .iter()
                    .enumerate()
                    .map(|(i, attr)| ChecklistAttribute {
                        id: attr.id,
                        title: self.label(attr.name.as_deref()),
                        completed: attr.completed,
                        order: attr.order.unwrap_or(position(i)),
                    })
                    .collect();
                attributes.sort_by_key(|a| a.order);

                ChecklistItem {
                    id: stage.id,
                    title: self.label(stage.name.as_deref()),
                    completed: stage.completed,
                    notes: non_empty(stage.notes.as_deref()),
                    order: stage.order.unwrap_or(position(index)),
                    attributes,
                }
            })
            .collect();
        items.sort_by_key(|item| item.order);
        items
    }

    fn attachment(&self, raw: &RawAttachment) -> Attachment {
        let from_url = raw
            .url
            .as_deref()
            .and_then(|url| url.rsplit('/').find(|segment| !segment.is_empty()));
        Attachment {
            id: raw.id,
            name: non_empty(raw.name.as_deref().or(from_url))
                .unwrap_or_else(|| self.config.untitled_placeholder.clone()),
            url: non_empty(raw.url.as_deref()),
            size_bytes: raw.size_bytes,
        }
    }

    fn label(&self, raw: Option<&str>) -> String {
        non_empty(raw).unwrap_or_else(|| self.config.untitled_placeholder.clone())
    }

    fn missing_identity(&self, task: &RawTask) -> Ticket {
        self.reporter.report(Anomaly::MissingIdentity);
        let (title, description) = self.title_and_description(task.detail.as_deref());
        let created_at = self
            .timestamp("fecha_creacion", task.created_at.as_deref())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let updated_at = self
            .timestamp("fecha_actualizacion", task.updated_at.as_deref())
            .unwrap_or(created_at);

        let mut ticket = self.fallback(0, StructuralAnomaly::MissingIdentity, created_at);
        ticket.title = title;
        ticket.description = description;
        ticket.updated_at = updated_at;
        ticket
    }

    fn malformed(&self, reason: String) -> Ticket {
        debug!(reason = %reason, "Building fallback ticket for malformed record");
        self.reporter.report(Anomaly::MalformedRecord {
            reason: reason.clone(),
        });
        self.fallback(
            0,
            StructuralAnomaly::MalformedRecord(reason),
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    fn fallback(&self, id: u64, anomaly: StructuralAnomaly, created_at: DateTime<Utc>) -> Ticket {
        Ticket {
            id,
            title: self.config.untitled_placeholder.clone(),
            description: String::new(),
            category: ERROR_CATEGORY.to_string(),
            status: DEFAULT_STATUS,
            priority: DEFAULT_PRIORITY,
            created_at,
            updated_at: created_at,
            start_date: None,
            finished_at: None,
            created_by: self.user(None),
            assigned_to: None,
            participants: Vec::new(),
            messages: Vec::new(),
            checklist: Vec::new(),
            attachments: Vec::new(),
            parent_ids: Vec::new(),
            child_ids: Vec::new(),
            anomaly: Some(anomaly),
        }
    }
}

fn position(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
