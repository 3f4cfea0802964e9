//! Field-level change history and activity derivation.
//!
//! [`derive_changes`] compares an entity snapshot against an update payload
//! and produces one [`FieldChangeRecord`] per field whose value actually
//! changed, plus a status-transition [`ActivityRecord`] when the status
//! moves. Both pathways run independently over the same update.
//!
//! Derivation is total: missing or `null` values normalize to the empty
//! string rather than being rejected.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bulk::BulkOperationKind;
use crate::task::{TaskPriority, TaskStatus};
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Administrative fields that never produce history records.
pub const ADMIN_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// The field whose transitions produce status activity.
pub const STATUS_FIELD: &str = "status";

/// Display text for an empty value.
pub const EMPTY_DISPLAY: &str = "(none)";

/// Built-in field labels.
const DEFAULT_FIELD_LABELS: &[(&str, &str)] = &[
    ("title", "Title"),
    ("description", "Description"),
    ("status", "Status"),
    ("priority", "Priority"),
    ("project_id", "Project"),
    ("due_date", "Due date"),
    ("subcategory", "Subcategory"),
    ("archived", "Archived"),
];

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One field-level delta. Values are kept raw for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChangeRecord {
    pub entity_id: EntityId,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub occurred_at: Timestamp,
}

/// Semantic class of an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    StatusChanged,
    BulkUpdated,
    Archived,
    Deleted,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StatusChanged => "status_changed",
            Self::BulkUpdated => "bulk_updated",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }
}

/// A higher-level event derived from one or more field deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub entity_id: EntityId,
    pub kind: ActivityKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<String>,
    pub occurred_at: Timestamp,
}

impl ActivityRecord {
    /// A status transition `from -> to` (normalized status strings).
    pub fn status_changed(
        entity_id: impl Into<EntityId>,
        from: impl Into<String>,
        to: impl Into<String>,
        occurred_at: Timestamp,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        let description = format!(
            "Status changed from {} to {}",
            display_status(&from),
            display_status(&to)
        );
        Self {
            entity_id: entity_id.into(),
            kind: ActivityKind::StatusChanged,
            description,
            from_status: Some(from),
            to_status: Some(to),
            occurred_at,
        }
    }

    /// A bulk-path record for one succeeded target.
    pub fn bulk(
        entity_id: impl Into<EntityId>,
        kind: BulkOperationKind,
        fields: &[&str],
        occurred_at: Timestamp,
    ) -> Self {
        let activity_kind = match kind {
            BulkOperationKind::Update => ActivityKind::BulkUpdated,
            BulkOperationKind::Archive => ActivityKind::Archived,
            BulkOperationKind::Delete => ActivityKind::Deleted,
        };
        let description = if fields.is_empty() {
            format!("{} via bulk operation", kind.past_tense())
        } else {
            format!("{} {} via bulk operation", kind.past_tense(), fields.join(", "))
        };
        Self {
            entity_id: entity_id.into(),
            kind: activity_kind,
            description,
            from_status: None,
            to_status: None,
            occurred_at,
        }
    }
}

/// Output of [`derive_changes`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedChanges {
    pub changes: Vec<FieldChangeRecord>,
    pub activity: Option<ActivityRecord>,
}

impl DerivedChanges {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.activity.is_none()
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Normalize a value to its comparison string.
///
/// Missing and `null` become `""`; strings are taken verbatim; numbers and
/// booleans use their natural form; arrays and objects use compact JSON.
pub fn normalize(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Compare `before` against the fields present in `payload`.
///
/// Field records follow the payload's key order. Administrative fields are
/// skipped. A status activity record is emitted when the payload carries a
/// non-null `status` that differs from `before.status`, independent of the
/// field records.
pub fn derive_changes(
    entity_id: &str,
    before: &Map<String, Value>,
    payload: &Map<String, Value>,
    occurred_at: Timestamp,
) -> DerivedChanges {
    let changes = payload
        .iter()
        .filter(|(field, _)| !ADMIN_FIELDS.contains(&field.as_str()))
        .filter_map(|(field, new_value)| {
            let old_value = before.get(field);
            if normalize(old_value) == normalize(Some(new_value)) {
                return None;
            }
            Some(FieldChangeRecord {
                entity_id: entity_id.to_string(),
                field: field.clone(),
                old_value: old_value.cloned().unwrap_or(Value::Null),
                new_value: new_value.clone(),
                occurred_at,
            })
        })
        .collect();

    let activity = payload
        .get(STATUS_FIELD)
        .filter(|value| !value.is_null())
        .and_then(|new_status| {
            let from = normalize(before.get(STATUS_FIELD));
            let to = normalize(Some(new_status));
            (from != to).then(|| ActivityRecord::status_changed(entity_id, from, to, occurred_at))
        });

    DerivedChanges { changes, activity }
}

// ---------------------------------------------------------------------------
// Labels and formatting
// ---------------------------------------------------------------------------

fn display_status(raw: &str) -> String {
    if raw.is_empty() {
        return EMPTY_DISPLAY.to_string();
    }
    raw.parse::<TaskStatus>()
        .map(|status| status.label().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// `project_id` -> `Project id`.
fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lookup table of field labels and value formatting for history display.
#[derive(Debug, Clone)]
pub struct FieldLabels {
    labels: IndexMap<String, String>,
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self {
            labels: DEFAULT_FIELD_LABELS
                .iter()
                .map(|(field, label)| (field.to_string(), label.to_string()))
                .collect(),
        }
    }
}

impl FieldLabels {
    /// Override or add a label.
    pub fn with_label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field.into(), label.into());
        self
    }

    /// Label for a field; unknown fields fall back to a humanized key.
    pub fn label<'a>(&'a self, field: &str) -> Cow<'a, str> {
        match self.labels.get(field) {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(humanize(field)),
        }
    }

    /// Render a raw value for display.
    pub fn format_value(&self, field: &str, value: &Value) -> String {
        let normalized = normalize(Some(value));
        if normalized.is_empty() {
            return EMPTY_DISPLAY.to_string();
        }
        match field {
            "status" => display_status(&normalized),
            "priority" => normalized
                .parse::<TaskPriority>()
                .map(|p| p.label().to_string())
                .unwrap_or(normalized),
            "archived" => match value {
                Value::Bool(true) => "Yes".to_string(),
                Value::Bool(false) => "No".to_string(),
                _ => normalized,
            },
            _ => normalized,
        }
    }

    /// One-line human description of a change record.
    pub fn describe_change(&self, record: &FieldChangeRecord) -> String {
        let label = self.label(&record.field);
        let old = normalize(Some(&record.old_value));
        let new = normalize(Some(&record.new_value));
        let new_display = self.format_value(&record.field, &record.new_value);
        let old_display = self.format_value(&record.field, &record.old_value);

        if old.is_empty() {
            format!("{label} set to \"{new_display}\"")
        } else if new.is_empty() {
            format!("{label} cleared (was \"{old_display}\")")
        } else {
            format!("{label} changed from \"{old_display}\" to \"{new_display}\"")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    // -- normalize --------------------------------------------------------------

    #[test]
    fn normalize_handles_every_json_shape() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some(&json!(null))), "");
        assert_eq!(normalize(Some(&json!("todo"))), "todo");
        assert_eq!(normalize(Some(&json!(3))), "3");
        assert_eq!(normalize(Some(&json!(1.5))), "1.5");
        assert_eq!(normalize(Some(&json!(true))), "true");
        assert_eq!(normalize(Some(&json!(["a"]))), "[\"a\"]");
    }

    // -- derive_changes ---------------------------------------------------------

    #[test]
    fn status_change_yields_record_and_activity() {
        let before = obj(json!({"status": "todo", "priority": "medium"}));
        let payload = obj(json!({"status": "done"}));

        let derived = derive_changes("t1", &before, &payload, Utc::now());

        assert_eq!(derived.changes.len(), 1);
        let record = &derived.changes[0];
        assert_eq!(record.field, "status");
        assert_eq!(record.old_value, json!("todo"));
        assert_eq!(record.new_value, json!("done"));

        let activity = derived.activity.expect("status transition activity");
        assert_eq!(activity.kind, ActivityKind::StatusChanged);
        assert_eq!(activity.from_status.as_deref(), Some("todo"));
        assert_eq!(activity.to_status.as_deref(), Some("done"));
        assert_eq!(activity.description, "Status changed from To Do to Done");
    }

    #[test]
    fn empty_to_value_recorded() {
        let before = obj(json!({"description": ""}));
        let payload = obj(json!({"description": "New description"}));

        let derived = derive_changes("t1", &before, &payload, Utc::now());

        assert_eq!(derived.changes.len(), 1);
        assert_eq!(derived.changes[0].old_value, json!(""));
        assert_eq!(derived.changes[0].new_value, json!("New description"));
        assert!(derived.activity.is_none());
    }

    #[test]
    fn missing_field_treated_as_empty_baseline() {
        let before = obj(json!({}));
        let payload = obj(json!({"subcategory": "ops"}));

        let derived = derive_changes("t1", &before, &payload, Utc::now());

        assert_eq!(derived.changes.len(), 1);
        assert_eq!(derived.changes[0].old_value, Value::Null);
    }

    #[test]
    fn equal_after_normalization_produces_nothing() {
        let before = obj(json!({"project_id": null, "subcategory": "", "priority": "high"}));
        let payload = obj(json!({"project_id": "", "subcategory": null, "priority": "high"}));

        let derived = derive_changes("t1", &before, &payload, Utc::now());
        assert!(derived.is_empty());
    }

    #[test]
    fn number_and_string_forms_compare_equal() {
        let before = obj(json!({"estimate": 3}));
        let payload = obj(json!({"estimate": "3"}));
        assert!(derive_changes("t1", &before, &payload, Utc::now()).changes.is_empty());
    }

    #[test]
    fn admin_fields_skipped() {
        let before = obj(json!({"updated_at": "2026-01-01T00:00:00Z", "title": "a"}));
        let payload = obj(json!({"updated_at": "2026-02-01T00:00:00Z", "id": "x", "title": "b"}));

        let derived = derive_changes("t1", &before, &payload, Utc::now());
        assert_eq!(derived.changes.len(), 1);
        assert_eq!(derived.changes[0].field, "title");
    }

    #[test]
    fn records_follow_payload_key_order() {
        let before = obj(json!({"a": "1", "b": "1", "c": "1"}));
        let payload = obj(json!({"c": "2", "a": "2", "b": "2"}));

        let derived = derive_changes("t1", &before, &payload, Utc::now());
        let fields: Vec<&str> = derived.changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["c", "a", "b"]);
    }

    #[test]
    fn status_activity_fires_alongside_other_fields() {
        let before = obj(json!({"status": "todo", "priority": "low"}));
        let payload = obj(json!({"priority": "high", "status": "in_progress"}));

        let derived = derive_changes("t1", &before, &payload, Utc::now());
        assert_eq!(derived.changes.len(), 2);
        assert!(derived.activity.is_some());
    }

    #[test]
    fn unchanged_or_null_status_produces_no_activity() {
        let before = obj(json!({"status": "todo"}));

        let same = obj(json!({"status": "todo"}));
        assert!(derive_changes("t1", &before, &same, Utc::now()).activity.is_none());

        let null = obj(json!({"status": null}));
        assert!(derive_changes("t1", &before, &null, Utc::now()).activity.is_none());
    }

    #[test]
    fn records_carry_entity_and_timestamp() {
        let at = Utc::now();
        let before = obj(json!({"title": "a"}));
        let payload = obj(json!({"title": "b"}));
        let derived = derive_changes("task-9", &before, &payload, at);
        assert_eq!(derived.changes[0].entity_id, "task-9");
        assert_eq!(derived.changes[0].occurred_at, at);
    }

    // -- labels -----------------------------------------------------------------

    #[test]
    fn labels_from_table_and_fallback() {
        let labels = FieldLabels::default();
        assert_eq!(labels.label("due_date"), "Due date");
        assert_eq!(labels.label("time_spent"), "Time spent");

        let custom = labels.with_label("subcategory", "Area");
        assert_eq!(custom.label("subcategory"), "Area");
    }

    #[test]
    fn values_formatted_for_display() {
        let labels = FieldLabels::default();
        assert_eq!(labels.format_value("status", &json!("in_progress")), "In Progress");
        assert_eq!(labels.format_value("priority", &json!("urgent")), "Urgent");
        assert_eq!(labels.format_value("status", &json!("custom")), "custom");
        assert_eq!(labels.format_value("project_id", &json!(null)), EMPTY_DISPLAY);
        assert_eq!(labels.format_value("archived", &json!(true)), "Yes");
    }

    #[test]
    fn describe_change_variants() {
        let labels = FieldLabels::default();
        let record = |old: Value, new: Value| FieldChangeRecord {
            entity_id: "t1".to_string(),
            field: "status".to_string(),
            old_value: old,
            new_value: new,
            occurred_at: Utc::now(),
        };

        assert_eq!(
            labels.describe_change(&record(json!("todo"), json!("done"))),
            "Status changed from \"To Do\" to \"Done\""
        );
        assert_eq!(
            labels.describe_change(&record(json!(null), json!("review"))),
            "Status set to \"In Review\""
        );
        assert_eq!(
            labels.describe_change(&record(json!("done"), json!(""))),
            "Status cleared (was \"Done\")"
        );
    }
}
