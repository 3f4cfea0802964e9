//! Task model, enumerations, and request DTOs.
//!
//! Tasks are the entity every bulk operation and history record refers to.
//! Field names here are the canonical keys used in update payloads and
//! history records (`status`, `priority`, `project_id`, `due_date`, ...).

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::bulk::Identified;
use crate::error::CoreError;
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a task title, in characters.
pub const MAX_TITLE_LEN: usize = 500;

/// Maximum length of a task description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 20_000;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    /// All statuses in board order.
    pub const ALL: [TaskStatus; 4] = [Self::Todo, Self::InProgress, Self::Review, Self::Done];

    /// String representation for payloads and history records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Review => "In Review",
            Self::Done => "Done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown task status: '{s}'. Valid statuses: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// All priorities, lowest first.
    pub const ALL: [TaskPriority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown task priority: '{s}'. Valid priorities: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A task as held by the task store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub subcategory: Option<String>,
    pub archived: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// Build a new task from a validated create request.
    pub fn new(id: EntityId, input: CreateTask, now: Timestamp) -> Self {
        Self {
            id,
            title: input.title,
            description: input.description.unwrap_or_default(),
            status: input.status.unwrap_or(TaskStatus::Todo),
            priority: input.priority.unwrap_or(TaskPriority::Medium),
            project_id: input.project_id,
            due_date: input.due_date,
            subcategory: input.subcategory,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the bulk-updatable subset of fields.
    pub fn apply_changes(&mut self, changes: &TaskChanges, now: Timestamp) {
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(project_id) = &changes.project_id {
            self.project_id = project_id.clone();
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        if let Some(subcategory) = &changes.subcategory {
            self.subcategory = subcategory.clone();
        }
        self.updated_at = now;
    }

    /// Apply a full partial update (title/description plus bulk fields).
    pub fn apply_update(&mut self, update: &UpdateTask, now: Timestamp) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone().unwrap_or_default();
        }
        self.apply_changes(&update.changes(), now);
    }

    /// Mark the task archived.
    pub fn archive(&mut self, now: Timestamp) {
        self.archived = true;
        self.updated_at = now;
    }

    /// Snapshot the task as a plain key/value record for history derivation.
    pub fn to_record(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

impl Identified for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Deserialize a present key into `Some(..)` so that an explicit `null`
/// becomes `Some(None)` while a missing key stays `None`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// The partial record of fields a bulk update may set.
///
/// Nullable fields use a double `Option`: the outer `None` means "not
/// specified", `Some(None)` means "clear the field".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub subcategory: Option<Option<String>>,
}

impl TaskChanges {
    /// Returns `true` when no field is specified.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.project_id.is_none()
            && self.due_date.is_none()
            && self.subcategory.is_none()
    }
}

/// Request payload for creating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub subcategory: Option<String>,
}

/// Request payload for a partial task update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub project_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub subcategory: Option<Option<String>>,
}

impl UpdateTask {
    /// The bulk-updatable subset of this update.
    pub fn changes(&self) -> TaskChanges {
        TaskChanges {
            status: self.status,
            priority: self.priority,
            project_id: self.project_id.clone(),
            due_date: self.due_date,
            subcategory: self.subcategory.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a task title: non-blank and within [`MAX_TITLE_LEN`].
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation(
            "Task title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Task title exceeds maximum length of {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a task description length.
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Task description exceeds maximum length of {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a create request.
pub fn validate_create(input: &CreateTask) -> Result<(), CoreError> {
    validate_title(&input.title)?;
    if let Some(description) = &input.description {
        validate_description(description)?;
    }
    Ok(())
}

/// Fields an update payload may not set to `null`.
pub const NON_NULLABLE_FIELDS: &[&str] = &["title", "status", "priority"];

/// Reject explicit `null`s for fields that cannot be cleared.
pub fn validate_update_payload(
    payload: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), CoreError> {
    for field in NON_NULLABLE_FIELDS {
        if payload.get(*field).is_some_and(serde_json::Value::is_null) {
            return Err(CoreError::Validation(format!(
                "Field '{field}' cannot be null"
            )));
        }
    }
    Ok(())
}

/// Validate an update request.
pub fn validate_update(input: &UpdateTask) -> Result<(), CoreError> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(Some(description)) = &input.description {
        validate_description(description)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
