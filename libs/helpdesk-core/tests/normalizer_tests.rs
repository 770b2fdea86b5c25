//! Behavioural tests for raw task normalization
//!
//! Covers the status and priority tables, diagnostics deduplication, date
//! fallbacks, assignee resolution and fallback tickets.

use chrono::{TimeZone, Utc};
use helpdesk_core::normalizer::{PRIORITY_TABLE, STATUS_TABLE};
use helpdesk_core::{
    Anomaly, DedupReporter, Normalizer, NormalizerConfig, RawTask, StructuralAnomaly,
    TicketPriority, TicketStatus,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn normalizer() -> (Normalizer, Arc<DedupReporter>) {
    let reporter = Arc::new(DedupReporter::new(64));
    let normalizer = Normalizer::new(NormalizerConfig::default(), reporter.clone());
    (normalizer, reporter)
}

fn raw(value: Value) -> RawTask {
    serde_json::from_value(value).unwrap()
}

// ===========================
// Code tables
// ===========================

#[test]
fn test_every_status_code_maps_exactly() {
    let (normalizer, reporter) = normalizer();
    for (code, expected) in STATUS_TABLE {
        let ticket = normalizer.normalize(&raw(json!({"id": 1, "estado": code})));
        assert_eq!(ticket.status, *expected, "code {code}");
    }
    assert!(reporter.emitted().is_empty());
}

#[test]
fn test_unknown_status_is_open_and_reported_once() {
    let (normalizer, reporter) = normalizer();
    for id in 1..=5 {
        let ticket = normalizer.normalize(&raw(json!({"id": id, "estado": "frozen"})));
        assert_eq!(ticket.status, TicketStatus::Open);
    }
    let emitted = reporter.emitted();
    assert_eq!(
        emitted,
        vec![Anomaly::UnknownStatus {
            code: "frozen".to_string()
        }]
    );

    normalizer.normalize(&raw(json!({"id": 9, "estado": "melted"})));
    assert_eq!(reporter.emitted().len(), 2);
}

#[test]
fn test_every_priority_code_maps_exactly() {
    let (normalizer, reporter) = normalizer();
    for (code, expected) in PRIORITY_TABLE {
        let ticket = normalizer.normalize(&raw(json!({"id": 1, "clasificacion": code})));
        assert_eq!(ticket.priority, *expected, "code {code}");
    }
    assert!(reporter.emitted().is_empty());
}

#[test]
fn test_unknown_priority_is_medium_and_reported_once() {
    let (normalizer, reporter) = normalizer();
    for _ in 0..3 {
        let ticket = normalizer.normalize(&raw(json!({"id": 1, "clasificacion": "Z"})));
        assert_eq!(ticket.priority, TicketPriority::Medium);
    }
    assert_eq!(reporter.emitted().len(), 1);
    assert_eq!(reporter.emitted()[0].kind(), "unknown_priority");
}

#[test]
fn test_blank_codes_are_treated_as_absent() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({"id": 1, "estado": "  ", "clasificacion": ""})));
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.priority, TicketPriority::Medium);
    assert!(reporter.emitted().is_empty());
}

#[test]
fn test_null_codes_without_participants() {
    let (normalizer, _) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 12,
        "estado": null,
        "clasificacion": null,
        "participantes": null
    })));
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.priority, TicketPriority::Medium);
    assert!(ticket.assigned_to.is_none());

    let value = serde_json::to_value(&ticket).unwrap();
    assert_eq!(value["status"], "open");
    assert_eq!(value["priority"], "medium");
    assert!(value["assignedTo"].is_null());
}

// ===========================
// Dates
// ===========================

#[test]
fn test_updated_at_falls_back_to_created_at() {
    let (normalizer, _) = normalizer();
    let created = Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap();
    let updated = Utc.with_ymd_and_hms(2024, 4, 3, 9, 30, 0).unwrap();

    let ticket = normalizer.normalize(&raw(json!({
        "id": 1,
        "fecha_creacion": "2024-04-02T08:00:00Z",
        "fecha_actualizacion": "2024-04-03T09:30:00Z"
    })));
    assert_eq!(ticket.updated_at, updated);

    let ticket = normalizer.normalize(&raw(json!({
        "id": 1,
        "fecha_creacion": "2024-04-02T08:00:00Z"
    })));
    assert_eq!(ticket.updated_at, created);
}

#[test]
fn test_start_date_equal_to_creation_is_omitted() {
    let (normalizer, _) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 1,
        "fecha_creacion": "2024-04-02T08:00:00Z",
        "fecha_inicio": "2024-04-02 08:00:00"
    })));
    assert!(ticket.start_date.is_none());

    let ticket = normalizer.normalize(&raw(json!({
        "id": 1,
        "fecha_creacion": "2024-04-02T08:00:00Z",
        "fecha_inicio": "2024-04-05T08:00:00+02:00"
    })));
    assert_eq!(
        ticket.start_date,
        Some(Utc.with_ymd_and_hms(2024, 4, 5, 6, 0, 0).unwrap())
    );
}

#[test]
fn test_unparseable_timestamp_is_reported_and_ignored() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 4,
        "fecha_creacion": "2024-04-02T08:00:00Z",
        "fecha_fin": "next tuesday"
    })));
    assert!(ticket.finished_at.is_none());
    assert_eq!(
        reporter.emitted(),
        vec![Anomaly::UnparseableTimestamp {
            task_id: Some(4),
            field: "fecha_fin".to_string(),
            value: "next tuesday".to_string()
        }]
    );
}

#[test]
fn test_missing_creation_time_uses_epoch() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({"id": 3})));
    assert_eq!(ticket.created_at, chrono::DateTime::<Utc>::UNIX_EPOCH);
    assert_eq!(ticket.updated_at, ticket.created_at);
    assert_eq!(
        reporter.emitted(),
        vec![Anomaly::MissingCreationTime { task_id: 3 }]
    );
}

#[test]
fn test_creation_falls_back_to_update_time() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 3,
        "fecha_actualizacion": "2024-04-03T09:30:00Z"
    })));
    assert_eq!(ticket.created_at, ticket.updated_at);
    assert!(reporter.emitted().is_empty());
}

#[test]
fn test_date_only_values_are_midnight_utc() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 4,
        "estado": "archived",
        "fecha_creacion": "2024-03-08T10:00:00Z",
        "fecha_inicio": "2024-03-09",
        "fecha_fin": "2024-03-10"
    })));
    assert_eq!(
        ticket.start_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap())
    );
    assert_eq!(
        ticket.finished_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap())
    );
    assert!(reporter.emitted().is_empty());
}

// ===========================
// People
// ===========================

#[test]
fn test_no_owner_means_unassigned() {
    let (normalizer, _) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 1,
        "participantes": [
            {"usuario": {"id": 4, "nombre": "Eva"}, "rol": "observer"}
        ]
    })));
    assert!(ticket.assigned_to.is_none());
    assert_eq!(ticket.participants.len(), 1);
}

#[test]
fn test_single_owner_is_assignee() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 1,
        "participantes": [
            {"usuario": {"id": 4, "nombre": "Eva"}, "rol": "observer"},
            {"usuario": {"id": 5, "nombre": "Marta", "apellido": "Vidal "},
             "rol": " Task_Owner ", "tiene_privilegios": true}
        ]
    })));
    let assignee = ticket.assigned_to.unwrap();
    assert_eq!(assignee.id, Some(5));
    assert_eq!(assignee.display_name, "Marta Vidal");
    assert_eq!(assignee.role, "Task_Owner");
    assert!(reporter.emitted().is_empty());
}

#[test]
fn test_multiple_owners_pick_first_and_report() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "id": 8,
        "participantes": [
            {"usuario": {"id": 4, "nombre": "Eva"}, "rol": "task_owner"},
            {"usuario": {"id": 5, "nombre": "Marta"}, "rol": "task_owner"}
        ]
    })));
    assert_eq!(ticket.assigned_to.unwrap().id, Some(4));
    assert_eq!(
        reporter.emitted(),
        vec![Anomaly::MultipleOwners {
            task_id: 8,
            count: 2
        }]
    );
}

#[test]
fn test_custom_owner_role() {
    let config = NormalizerConfig {
        task_owner_role: "responsable".to_string(),
        ..NormalizerConfig::default()
    };
    let normalizer = Normalizer::new(config, Arc::new(DedupReporter::default()));
    let ticket = normalizer.normalize(&raw(json!({
        "id": 1,
        "participantes": [{"usuario": {"id": 2, "nombre": "Luis"}, "rol": "responsable"}]
    })));
    assert_eq!(ticket.assigned_to.unwrap().display_name, "Luis");
}

// ===========================
// Fallback tickets
// ===========================

#[test]
fn test_missing_identity_yields_error_ticket() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize(&raw(json!({
        "detalle": "Lost record\nwith details",
        "estado": "archived",
        "participantes": [{"rol": "task_owner"}]
    })));
    assert_eq!(ticket.id, 0);
    assert_eq!(ticket.category, "error");
    assert_eq!(ticket.title, "Lost record");
    assert_eq!(ticket.anomaly, Some(StructuralAnomaly::MissingIdentity));
    assert!(ticket.participants.is_empty());
    assert!(ticket.assigned_to.is_none());
    assert_eq!(reporter.emitted(), vec![Anomaly::MissingIdentity]);
}

#[test]
fn test_non_object_values_become_malformed_tickets() {
    let (normalizer, reporter) = normalizer();
    let tickets = normalizer.normalize_values(&[json!(null), json!("task"), json!(42)]);
    assert_eq!(tickets.len(), 3);
    assert!(tickets.iter().all(|t| t.category == "error"));
    assert!(tickets
        .iter()
        .all(|t| matches!(t.anomaly, Some(StructuralAnomaly::MalformedRecord(_)))));
    assert_eq!(reporter.emitted().len(), 3);
}

#[test]
fn test_mistyped_nested_field_keeps_the_ticket() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize_value(&json!({
        "id": 5,
        "estado": "archived",
        "clasificacion": "U",
        "categoria": "hardware",
        "detalle": "Disk replaced",
        "archivos": [{"id": 1, "nombre": "a.png", "tamano": 1536.5}],
        "comentarios": [{"id": 9, "contenido": "done", "nivel": "top"}]
    }));

    assert!(!ticket.is_fallback());
    assert_eq!(ticket.id, 5);
    assert_eq!(ticket.status, TicketStatus::Resolved);
    assert_eq!(ticket.priority, TicketPriority::Urgent);
    assert_eq!(ticket.category, "hardware");
    assert_eq!(ticket.title, "Disk replaced");
    assert_eq!(ticket.attachments[0].name, "a.png");
    assert_eq!(ticket.attachments[0].size_bytes, None);
    assert_eq!(ticket.messages[0].body, "done");
    assert_eq!(ticket.messages[0].level, 0);

    assert_eq!(
        reporter.emitted(),
        vec![
            Anomaly::MistypedField {
                task_id: Some(5),
                field: "comentarios[0].nivel".to_string(),
            },
            Anomaly::MistypedField {
                task_id: Some(5),
                field: "archivos[0].tamano".to_string(),
            },
        ]
    );
}

#[test]
fn test_string_id_is_malformed() {
    let (normalizer, reporter) = normalizer();
    let ticket = normalizer.normalize_value(&json!({"id": "5", "estado": "archived"}));
    assert_eq!(ticket.category, "error");
    assert!(matches!(
        ticket.anomaly,
        Some(StructuralAnomaly::MalformedRecord(_))
    ));
    assert_eq!(reporter.emitted().len(), 1);
}

#[test]
fn test_english_field_names_are_accepted() {
    let (normalizer, _) = normalizer();
    let ticket = normalizer.normalize_value(&json!({
        "id": 2,
        "description": "Reset password",
        "state": "in_development",
        "classification": "C",
        "created_by": {"id": 1, "first_name": "Ana", "last_name": "Ruiz"}
    }));
    assert_eq!(ticket.title, "Reset password");
    assert_eq!(ticket.status, TicketStatus::InProgress);
    assert_eq!(ticket.priority, TicketPriority::Low);
    assert_eq!(ticket.created_by.display_name, "Ana Ruiz");
}

// ===========================
// Totality
// ===========================

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z_ ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map(
                prop_oneof![
                    Just("id".to_string()),
                    Just("estado".to_string()),
                    Just("clasificacion".to_string()),
                    Just("participantes".to_string()),
                    Just("comentarios".to_string()),
                    Just("fecha_creacion".to_string()),
                    "[a-z]{1,6}",
                ],
                inner,
                0..5
            )
            .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn prop_normalize_value_is_total(value in arb_json()) {
        let normalizer = Normalizer::new(
            NormalizerConfig::default(),
            Arc::new(helpdesk_core::NoopReporter),
        );
        let ticket = normalizer.normalize_value(&value);
        prop_assert!(!ticket.title.is_empty());
        prop_assert!(ticket.is_fallback() || value.is_object());
    }

    #[test]
    fn prop_object_with_valid_id_is_never_a_fallback(id in 1u64..10_000, value in arb_json()) {
        let normalizer = Normalizer::new(
            NormalizerConfig::default(),
            Arc::new(helpdesk_core::NoopReporter),
        );
        let mut object = match value {
            Value::Object(map) => map,
            other => [("detalle".to_string(), other)].into_iter().collect(),
        };
        object.insert("id".to_string(), json!(id));
        let ticket = normalizer.normalize_value(&Value::Object(object));
        prop_assert!(!ticket.is_fallback());
        prop_assert_eq!(ticket.id, id);
    }

    #[test]
    fn prop_any_status_code_maps_to_table_or_open(code in "\\PC{0,16}") {
        let normalizer = Normalizer::new(
            NormalizerConfig::default(),
            Arc::new(helpdesk_core::NoopReporter),
        );
        let ticket = normalizer.normalize(&RawTask {
            id: Some(1),
            state: Some(code.clone()),
            ..RawTask::default()
        });
        let expected = STATUS_TABLE
            .iter()
            .find(|(raw, _)| *raw == code.trim())
            .map_or(TicketStatus::Open, |(_, status)| *status);
        prop_assert_eq!(ticket.status, expected);
        prop_assert_ne!(ticket.status, TicketStatus::Closed);
    }
}
