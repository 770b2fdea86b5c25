//! Builders, fixtures and a mock task source for tests and benchmarks

use crate::error::{HelpdeskError, Result};
use crate::models::{
    Assignee, Participant, Ticket, TicketPriority, TicketStatus, UserRef,
};
use crate::raw::{RawParticipant, RawTask, RawUser};
use crate::refresh::TaskSource;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use helpdesk_common::{TASK_OWNER_ROLE, UNKNOWN_USER_PLACEHOLDER};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fixed instant used as the default creation time of built tickets
///
/// # Panics
/// Never; the date is a valid constant
#[must_use]
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn split_name(name: &str) -> (Option<String>, Option<String>) {
    match name.split_once(' ') {
        Some((first, last)) => (Some(first.to_string()), Some(last.to_string())),
        None => (Some(name.to_string()), None),
    }
}

/// Builder for normalized tickets
#[derive(Debug, Clone)]
pub struct TicketBuilder {
    ticket: Ticket,
    updated_at: Option<DateTime<Utc>>,
}

impl TicketBuilder {
    #[must_use]
    pub fn new(id: u64) -> Self {
        let created = reference_time();
        Self {
            ticket: Ticket {
                id,
                title: format!("Ticket {id}"),
                description: format!("Ticket {id}"),
                category: "general".to_string(),
                status: TicketStatus::Open,
                priority: TicketPriority::Medium,
                created_at: created,
                updated_at: created,
                start_date: None,
                finished_at: None,
                created_by: UserRef {
                    id: None,
                    display_name: UNKNOWN_USER_PLACEHOLDER.to_string(),
                },
                assigned_to: None,
                participants: vec![],
                messages: vec![],
                checklist: vec![],
                attachments: vec![],
                parent_ids: vec![],
                child_ids: vec![],
                anomaly: None,
            },
            updated_at: None,
        }
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.ticket.title = title.to_string();
        self.ticket.description = title.to_string();
        self
    }

    #[must_use]
    pub fn category(mut self, category: &str) -> Self {
        self.ticket.category = category.to_string();
        self
    }

    #[must_use]
    pub fn status(mut self, status: TicketStatus) -> Self {
        self.ticket.status = status;
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: TicketPriority) -> Self {
        self.ticket.priority = priority;
        self
    }

    #[must_use]
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.ticket.created_at = at;
        self
    }

    /// Defaults to the creation time when not set
    #[must_use]
    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    #[must_use]
    pub fn finished_at(mut self, at: DateTime<Utc>) -> Self {
        self.ticket.finished_at = Some(at);
        self
    }

    #[must_use]
    pub fn creator(mut self, id: u64, name: &str) -> Self {
        self.ticket.created_by = UserRef {
            id: Some(id),
            display_name: name.to_string(),
        };
        self
    }

    #[must_use]
    pub fn participant(mut self, id: u64, name: &str) -> Self {
        self.ticket.participants.push(Participant {
            id: Some(id),
            name: name.to_string(),
            role: None,
            has_privileges: false,
        });
        self
    }

    /// Add a task-owner participant and assign the ticket to them
    #[must_use]
    pub fn owner(mut self, id: u64, name: &str) -> Self {
        self.ticket.participants.push(Participant {
            id: Some(id),
            name: name.to_string(),
            role: Some(TASK_OWNER_ROLE.to_string()),
            has_privileges: true,
        });
        self.ticket.assigned_to = Some(Assignee {
            id: Some(id),
            display_name: name.to_string(),
            role: TASK_OWNER_ROLE.to_string(),
        });
        self
    }

    #[must_use]
    pub fn parents(mut self, ids: &[u64]) -> Self {
        self.ticket.parent_ids = ids.to_vec();
        self
    }

    #[must_use]
    pub fn children(mut self, ids: &[u64]) -> Self {
        self.ticket.child_ids = ids.to_vec();
        self
    }

    #[must_use]
    pub fn build(mut self) -> Ticket {
        self.ticket.updated_at = self.updated_at.unwrap_or(self.ticket.created_at);
        self.ticket
    }
}

/// Builder for raw wire records
#[derive(Debug, Clone, Default)]
pub struct RawTaskBuilder {
    task: RawTask,
}

impl RawTaskBuilder {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            task: RawTask {
                id: Some(id),
                ..RawTask::default()
            },
        }
    }

    /// A record without an id
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn detail(mut self, detail: &str) -> Self {
        self.task.detail = Some(detail.to_string());
        self
    }

    #[must_use]
    pub fn category(mut self, category: &str) -> Self {
        self.task.category = Some(category.to_string());
        self
    }

    #[must_use]
    pub fn state(mut self, code: &str) -> Self {
        self.task.state = Some(code.to_string());
        self
    }

    #[must_use]
    pub fn classification(mut self, code: &str) -> Self {
        self.task.classification = Some(code.to_string());
        self
    }

    #[must_use]
    pub fn created_at(mut self, at: &str) -> Self {
        self.task.created_at = Some(at.to_string());
        self
    }

    #[must_use]
    pub fn updated_at(mut self, at: &str) -> Self {
        self.task.updated_at = Some(at.to_string());
        self
    }

    #[must_use]
    pub fn start_date(mut self, at: &str) -> Self {
        self.task.start_date = Some(at.to_string());
        self
    }

    #[must_use]
    pub fn finished_at(mut self, at: &str) -> Self {
        self.task.finished_at = Some(at.to_string());
        self
    }

    #[must_use]
    pub fn creator(mut self, id: u64, name: &str) -> Self {
        self.task.creator = Some(raw_user(id, name));
        self
    }

    #[must_use]
    pub fn participant(mut self, id: u64, name: &str, role: Option<&str>) -> Self {
        self.task.participants.push(RawParticipant {
            user: Some(raw_user(id, name)),
            has_privileges: false,
            role: role.map(str::to_string),
        });
        self
    }

    #[must_use]
    pub fn parents(mut self, ids: &[u64]) -> Self {
        self.task.parent_ids = ids.to_vec();
        self
    }

    #[must_use]
    pub fn children(mut self, ids: &[u64]) -> Self {
        self.task.child_ids = ids.to_vec();
        self
    }

    #[must_use]
    pub fn build(self) -> RawTask {
        self.task
    }
}

fn raw_user(id: u64, name: &str) -> RawUser {
    let (first_name, last_name) = split_name(name);
    RawUser {
        id: Some(id),
        first_name,
        last_name,
    }
}

/// Raw task records as the API would send them
#[must_use]
pub fn create_mock_raw_tasks() -> Vec<Value> {
    vec![
        json!({
            "id": 101,
            "detalle": "Printer on floor 3 jams\nHappens with duplex jobs only.",
            "categoria": "hardware",
            "estado": "available",
            "clasificacion": "P",
            "fecha_creacion": "2024-06-01T08:00:00Z",
            "fecha_actualizacion": "2024-06-01T09:30:00Z",
            "creador": {"id": 1, "nombre": "Ana", "apellido": "Ruiz"},
            "participantes": [
                {"usuario": {"id": 2, "nombre": "Luis", "apellido": "Gil"},
                 "rol": "task_owner", "tiene_privilegios": true}
            ],
            "comentarios": [
                {"id": 1, "contenido": "Which tray?", "usuario": {"id": 2, "nombre": "Luis"},
                 "fecha": "2024-06-01T08:15:00Z"},
                {"id": 2, "contenido": "Tray 2", "padre": 1, "usuario": {"id": 1, "nombre": "Ana"},
                 "fecha": "2024-06-01T08:20:00Z"}
            ],
            "subtareas": [102]
        }),
        json!({
            "id": 102,
            "detalle": "Order replacement rollers",
            "categoria": "hardware",
            "estado": "archived",
            "clasificacion": "N",
            "fecha_creacion": "2024-06-01T10:00:00Z",
            "fecha_fin": "2024-06-02T10:00:00Z",
            "creador": {"id": 2, "nombre": "Luis", "apellido": "Gil"},
            "tareas_padre": [101],
            "etapas": [
                {"id": 1, "nombre": "Request quote", "completada": true, "orden": 1},
                {"id": 2, "nombre": "Approve purchase", "completada": true, "orden": 2}
            ]
        }),
        json!({
            "id": 103,
            "detalle": "VPN drops every hour",
            "categoria": "network",
            "estado": "in_development",
            "clasificacion": "U",
            "fecha_creacion": "2024-06-03 07:45:00",
            "creador": {"id": 3, "nombre": "Eva", "apellido": "Sanz"},
            "participantes": null
        }),
        json!({
            "detalle": "Record without identity",
            "estado": "available"
        }),
    ]
}

/// A small normalized ticket set covering every status
#[must_use]
pub fn create_mock_tickets() -> Vec<Ticket> {
    let base = reference_time();
    vec![
        TicketBuilder::new(1)
            .category("hardware")
            .priority(TicketPriority::High)
            .creator(1, "Ana Ruiz")
            .owner(2, "Luis Gil")
            .build(),
        TicketBuilder::new(2)
            .category("network")
            .status(TicketStatus::InProgress)
            .priority(TicketPriority::Urgent)
            .creator(3, "Eva Sanz")
            .build(),
        TicketBuilder::new(3)
            .category("software")
            .status(TicketStatus::Pending)
            .creator(1, "Ana Ruiz")
            .build(),
        TicketBuilder::new(4)
            .category("hardware")
            .status(TicketStatus::Resolved)
            .priority(TicketPriority::Low)
            .owner(2, "Luis Gil")
            .finished_at(base + chrono::Duration::hours(6))
            .build(),
        TicketBuilder::new(5)
            .category("network")
            .status(TicketStatus::Closed)
            .finished_at(base + chrono::Duration::hours(30))
            .build(),
    ]
}

/// In-memory [`TaskSource`] with an optional per-call delay
#[derive(Debug, Default)]
pub struct MockTaskSource {
    tasks: Mutex<HashMap<u64, RawTask>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockTaskSource {
    #[must_use]
    pub fn new(tasks: impl IntoIterator<Item = RawTask>) -> Self {
        let tasks = tasks
            .into_iter()
            .filter_map(|task| Some((task.id?, task)))
            .collect();
        Self {
            tasks: Mutex::new(tasks),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the record served for its id
    pub fn put(&self, task: RawTask) {
        if let Some(id) = task.id {
            self.tasks.lock().insert(id, task);
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskSource for MockTaskSource {
    async fn fetch_task(&self, id: u64) -> Result<RawTask> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Read before sleeping so a later `put` does not leak into this call
        let task = self.tasks.lock().get(&id).cloned();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        task.ok_or(HelpdeskError::TaskNotFound { id })
    }
}
