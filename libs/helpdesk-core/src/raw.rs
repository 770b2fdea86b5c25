//! Wire model of a task record as delivered by the helpdesk REST API
//!
//! Every field is optional on the wire. `null` and a missing key mean the
//! same thing. Records are decoded field by field: a value of the wrong type
//! is dropped and its path recorded, so one bad field never costs the rest of
//! the record. Field names follow the backend; English aliases are accepted
//! as well.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// A decoded record plus the paths of fields that had the wrong type
///
/// Paths use the key found on the wire, e.g. `archivos[0].tamano`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTask {
    pub task: RawTask,
    pub mistyped: Vec<String>,
}

fn field_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// First non-null value under any of `keys`
fn lookup<'v>(object: &'v Object, keys: &[&'static str]) -> Option<(&'static str, &'v Value)> {
    keys.iter()
        .find_map(|&key| object.get(key).filter(|v| !v.is_null()).map(|v| (key, v)))
}

#[derive(Debug, Default)]
struct Decoder {
    mistyped: Vec<String>,
}

impl Decoder {
    fn value<T: DeserializeOwned>(&mut self, value: &Value, path: String) -> Option<T> {
        match T::deserialize(value) {
            Ok(decoded) => Some(decoded),
            Err(_) => {
                self.mistyped.push(path);
                None
            }
        }
    }

    fn scalar<T: DeserializeOwned>(
        &mut self,
        object: &Object,
        path: &str,
        keys: &[&'static str],
    ) -> Option<T> {
        let (key, value) = lookup(object, keys)?;
        self.value(value, field_path(path, key))
    }

    fn flag(&mut self, object: &Object, path: &str, keys: &[&'static str]) -> bool {
        self.scalar(object, path, keys).unwrap_or_default()
    }

    fn nested<T>(
        &mut self,
        object: &Object,
        path: &str,
        keys: &[&'static str],
        decode: impl FnOnce(&mut Self, &Object, &str) -> T,
    ) -> Option<T> {
        let (key, value) = lookup(object, keys)?;
        let path = field_path(path, key);
        match value.as_object() {
            Some(inner) => Some(decode(self, inner, &path)),
            None => {
                self.mistyped.push(path);
                None
            }
        }
    }

    /// Decode an array element by element; null elements are skipped
    fn list<T>(
        &mut self,
        object: &Object,
        path: &str,
        keys: &[&'static str],
        mut element: impl FnMut(&mut Self, &Value, String) -> Option<T>,
    ) -> Vec<T> {
        let Some((key, value)) = lookup(object, keys) else {
            return Vec::new();
        };
        let path = field_path(path, key);
        let Some(items) = value.as_array() else {
            self.mistyped.push(path);
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .filter_map(|(i, item)| element(self, item, format!("{path}[{i}]")))
            .collect()
    }

    fn records<T>(
        &mut self,
        object: &Object,
        path: &str,
        keys: &[&'static str],
        decode: impl Fn(&mut Self, &Object, &str) -> T,
    ) -> Vec<T> {
        self.list(object, path, keys, |d, item, path| match item.as_object() {
            Some(inner) => Some(decode(d, inner, &path)),
            None => {
                d.mistyped.push(path);
                None
            }
        })
    }

    fn ids(&mut self, object: &Object, path: &str, keys: &[&'static str]) -> Vec<u64> {
        self.list(object, path, keys, |d, item, path| d.value(item, path))
    }
}

/// Raw task record
///
/// Deserializing never fails for a JSON object; use [`RawTask::from_object`]
/// to learn which fields were dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawTask {
    pub id: Option<u64>,
    /// Free text serving as both title and description
    #[serde(rename = "detalle")]
    pub detail: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    /// Workflow state code (`available`, `in_development`, `in_review`, `archived`)
    #[serde(rename = "estado")]
    pub state: Option<String>,
    /// Priority letter (`U`, `P`, `N`, `C`)
    #[serde(rename = "clasificacion")]
    pub classification: Option<String>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: Option<String>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: Option<String>,
    #[serde(rename = "fecha_inicio")]
    pub start_date: Option<String>,
    #[serde(rename = "fecha_fin")]
    pub finished_at: Option<String>,
    #[serde(rename = "creador")]
    pub creator: Option<RawUser>,
    #[serde(rename = "participantes")]
    pub participants: Vec<RawParticipant>,
    #[serde(rename = "comentarios")]
    pub comments: Vec<RawComment>,
    #[serde(rename = "etapas")]
    pub stages: Vec<RawStage>,
    #[serde(rename = "archivos")]
    pub attachments: Vec<RawAttachment>,
    #[serde(rename = "tareas_padre")]
    pub parent_ids: Vec<u64>,
    #[serde(rename = "subtareas")]
    pub child_ids: Vec<u64>,
}

impl RawTask {
    /// Decode a JSON object, keeping every field whose value has the
    /// expected type
    #[must_use]
    pub fn from_object(object: &Object) -> DecodedTask {
        let mut decoder = Decoder::default();
        let task = Self::decode(&mut decoder, object, "");
        DecodedTask {
            task,
            mistyped: decoder.mistyped,
        }
    }

    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            id: d.scalar(o, path, &["id"]),
            detail: d.scalar(o, path, &["detalle", "detail", "description"]),
            category: d.scalar(o, path, &["categoria", "category"]),
            state: d.scalar(o, path, &["estado", "state"]),
            classification: d.scalar(o, path, &["clasificacion", "classification"]),
            created_at: d.scalar(o, path, &["fecha_creacion", "created_at"]),
            updated_at: d.scalar(o, path, &["fecha_actualizacion", "updated_at"]),
            start_date: d.scalar(o, path, &["fecha_inicio", "start_date"]),
            finished_at: d.scalar(o, path, &["fecha_fin", "finished_at", "end_date"]),
            creator: d.nested(o, path, &["creador", "creator", "created_by"], RawUser::decode),
            participants: d.records(
                o,
                path,
                &["participantes", "participants"],
                RawParticipant::decode,
            ),
            comments: d.records(o, path, &["comentarios", "comments"], RawComment::decode),
            stages: d.records(o, path, &["etapas", "stages"], RawStage::decode),
            attachments: d.records(
                o,
                path,
                &["archivos", "attachments", "files"],
                RawAttachment::decode,
            ),
            parent_ids: d.ids(o, path, &["tareas_padre", "parent_tasks"]),
            child_ids: d.ids(o, path, &["subtareas", "subtasks"]),
        }
    }
}

impl<'de> Deserialize<'de> for RawTask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Object::deserialize(deserializer)?;
        Ok(Self::from_object(&object).task)
    }
}

/// User reference embedded in tasks, comments and reactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawUser {
    pub id: Option<u64>,
    #[serde(rename = "nombre")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido")]
    pub last_name: Option<String>,
}

impl RawUser {
    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            id: d.scalar(o, path, &["id"]),
            first_name: d.scalar(o, path, &["nombre", "first_name"]),
            last_name: d.scalar(o, path, &["apellido", "last_name"]),
        }
    }
}

/// Participant entry of a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawParticipant {
    #[serde(rename = "usuario")]
    pub user: Option<RawUser>,
    #[serde(rename = "tiene_privilegios")]
    pub has_privileges: bool,
    #[serde(rename = "rol")]
    pub role: Option<String>,
}

impl RawParticipant {
    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            user: d.nested(o, path, &["usuario", "user"], RawUser::decode),
            has_privileges: d.flag(o, path, &["tiene_privilegios", "has_privileges"]),
            role: d.scalar(o, path, &["rol", "role"]),
        }
    }
}

/// Comment entry; `parent` and `level` encode the reply tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawComment {
    pub id: Option<u64>,
    #[serde(rename = "contenido")]
    pub content: Option<String>,
    #[serde(rename = "usuario")]
    pub user: Option<RawUser>,
    #[serde(rename = "fecha")]
    pub created_at: Option<String>,
    #[serde(rename = "padre")]
    pub parent: Option<u64>,
    #[serde(rename = "nivel")]
    pub level: Option<u32>,
    #[serde(rename = "reacciones")]
    pub reactions: Vec<RawReaction>,
}

impl RawComment {
    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            id: d.scalar(o, path, &["id"]),
            content: d.scalar(o, path, &["contenido", "content", "texto"]),
            user: d.nested(o, path, &["usuario", "user"], RawUser::decode),
            created_at: d.scalar(o, path, &["fecha", "created_at"]),
            parent: d.scalar(o, path, &["padre", "parent"]),
            level: d.scalar(o, path, &["nivel", "level"]),
            reactions: d.records(o, path, &["reacciones", "reactions"], RawReaction::decode),
        }
    }
}

/// Emoji-style reaction on a comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawReaction {
    pub id: Option<u64>,
    #[serde(rename = "tipo")]
    pub kind: Option<String>,
    #[serde(rename = "usuario")]
    pub user: Option<RawUser>,
}

impl RawReaction {
    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            id: d.scalar(o, path, &["id"]),
            kind: d.scalar(o, path, &["tipo", "kind", "emoji"]),
            user: d.nested(o, path, &["usuario", "user"], RawUser::decode),
        }
    }
}

/// Checklist stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawStage {
    pub id: Option<u64>,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "completada")]
    pub completed: bool,
    #[serde(rename = "notas")]
    pub notes: Option<String>,
    #[serde(rename = "orden")]
    pub order: Option<u32>,
    #[serde(rename = "atributos")]
    pub attributes: Vec<RawStageAttribute>,
}

impl RawStage {
    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            id: d.scalar(o, path, &["id"]),
            name: d.scalar(o, path, &["nombre", "name"]),
            completed: d.flag(o, path, &["completada", "completed"]),
            notes: d.scalar(o, path, &["notas", "notes"]),
            order: d.scalar(o, path, &["orden", "order"]),
            attributes: d.records(
                o,
                path,
                &["atributos", "attributes"],
                RawStageAttribute::decode,
            ),
        }
    }
}

/// Sub-attribute of a checklist stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawStageAttribute {
    pub id: Option<u64>,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "completado")]
    pub completed: bool,
    #[serde(rename = "orden")]
    pub order: Option<u32>,
}

impl RawStageAttribute {
    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            id: d.scalar(o, path, &["id"]),
            name: d.scalar(o, path, &["nombre", "name"]),
            completed: d.flag(o, path, &["completado", "completed"]),
            order: d.scalar(o, path, &["orden", "order"]),
        }
    }
}

/// File attachment metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawAttachment {
    pub id: Option<u64>,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "tamano")]
    pub size_bytes: Option<u64>,
}

impl RawAttachment {
    fn decode(d: &mut Decoder, o: &Object, path: &str) -> Self {
        Self {
            id: d.scalar(o, path, &["id"]),
            name: d.scalar(o, path, &["nombre", "name"]),
            url: d.scalar(o, path, &["url"]),
            size_bytes: d.scalar(o, path, &["tamano", "size"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backend_field_names() {
        let task: RawTask = serde_json::from_value(json!({
            "id": 12,
            "detalle": "Printer on fire",
            "categoria": "hardware",
            "estado": "in_review",
            "clasificacion": "U",
            "fecha_creacion": "2024-05-01T10:00:00Z",
            "creador": {"id": 3, "nombre": "Ana", "apellido": "Ruiz"},
            "participantes": [
                {"usuario": {"id": 4, "nombre": "Luis"}, "tiene_privilegios": true, "rol": "task_owner"}
            ],
            "tareas_padre": [1],
            "subtareas": [20, 21]
        }))
        .unwrap();

        assert_eq!(task.id, Some(12));
        assert_eq!(task.detail.as_deref(), Some("Printer on fire"));
        assert_eq!(task.state.as_deref(), Some("in_review"));
        assert_eq!(task.classification.as_deref(), Some("U"));
        assert_eq!(task.creator.unwrap().first_name.as_deref(), Some("Ana"));
        assert_eq!(task.participants.len(), 1);
        assert!(task.participants[0].has_privileges);
        assert_eq!(task.parent_ids, vec![1]);
        assert_eq!(task.child_ids, vec![20, 21]);
    }

    #[test]
    fn test_english_aliases() {
        let task: RawTask = serde_json::from_value(json!({
            "id": 1,
            "detail": "Reset password",
            "state": "archived",
            "classification": "C",
            "created_at": "2024-05-01T10:00:00Z",
            "comments": [{"id": 9, "content": "done", "parent": null, "level": 0}]
        }))
        .unwrap();

        assert_eq!(task.detail.as_deref(), Some("Reset password"));
        assert_eq!(task.state.as_deref(), Some("archived"));
        assert_eq!(task.comments[0].content.as_deref(), Some("done"));
    }

    #[test]
    fn test_nulls_become_defaults() {
        let task: RawTask = serde_json::from_value(json!({
            "id": 5,
            "estado": null,
            "clasificacion": null,
            "participantes": null,
            "comentarios": null,
            "etapas": [{"nombre": "triage", "completada": null, "atributos": null}],
            "archivos": null,
            "tareas_padre": null,
            "subtareas": null
        }))
        .unwrap();

        assert!(task.state.is_none());
        assert!(task.classification.is_none());
        assert!(task.participants.is_empty());
        assert!(task.comments.is_empty());
        assert!(!task.stages[0].completed);
        assert!(task.stages[0].attributes.is_empty());
        assert!(task.attachments.is_empty());
        assert!(task.parent_ids.is_empty());
    }

    #[test]
    fn test_empty_object_is_a_default_task() {
        let task: RawTask = serde_json::from_str("{}").unwrap();
        assert_eq!(task, RawTask::default());
    }

    fn decode(value: Value) -> DecodedTask {
        RawTask::from_object(value.as_object().unwrap())
    }

    #[test]
    fn test_mistyped_fields_are_dropped_individually() {
        let decoded = decode(json!({
            "id": 5,
            "estado": "archived",
            "archivos": [{"id": 1, "nombre": "a.png", "tamano": 1536.5}],
            "comentarios": [{"id": "c-1", "contenido": "hi", "nivel": "top"}],
            "etapas": [{"nombre": "triage", "orden": -1}]
        }));

        assert_eq!(decoded.task.id, Some(5));
        assert_eq!(decoded.task.state.as_deref(), Some("archived"));
        assert_eq!(decoded.task.attachments[0].name.as_deref(), Some("a.png"));
        assert_eq!(decoded.task.attachments[0].size_bytes, None);
        assert_eq!(decoded.task.comments[0].content.as_deref(), Some("hi"));
        assert_eq!(decoded.task.comments[0].id, None);
        assert_eq!(decoded.task.stages[0].order, None);
        assert_eq!(
            decoded.mistyped,
            vec![
                "comentarios[0].id",
                "comentarios[0].nivel",
                "etapas[0].orden",
                "archivos[0].tamano",
            ]
        );
    }

    #[test]
    fn test_bad_collection_elements_are_skipped() {
        let decoded = decode(json!({
            "id": 1,
            "participantes": "nobody",
            "tareas_padre": [3, "x", null, 4],
            "etapas": [7, {"nombre": "ok"}],
            "creador": "ana"
        }));

        assert!(decoded.task.participants.is_empty());
        assert_eq!(decoded.task.parent_ids, vec![3, 4]);
        assert_eq!(decoded.task.stages.len(), 1);
        assert!(decoded.task.creator.is_none());
        assert_eq!(
            decoded.mistyped,
            vec!["creador", "participantes", "etapas[0]", "tareas_padre[1]"]
        );
    }

    #[test]
    fn test_well_typed_record_reports_nothing() {
        let decoded = decode(json!({"id": 2, "detalle": "ok", "subtareas": [3]}));
        assert!(decoded.mistyped.is_empty());
        assert_eq!(decoded.task.child_ids, vec![3]);
    }

    #[test]
    fn test_non_object_does_not_deserialize() {
        assert!(serde_json::from_value::<RawTask>(json!([1, 2])).is_err());
    }
}
