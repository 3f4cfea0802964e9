//! In-memory task store.
//!
//! Holds tasks in insertion order together with the field history and
//! activity logs derived from their updates. All state sits behind a single
//! `tokio::sync::RwLock`; a bulk operation holds the write lock for the whole
//! batch so items are applied sequentially with no interleaving writes.

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use taskdeck_core::bulk::{
    bulk_activity, BulkEngine, BulkMutator, BulkOperation, BulkOperationResult, Identified,
};
use taskdeck_core::error::CoreError;
use taskdeck_core::history::{derive_changes, ActivityRecord, DerivedChanges, FieldChangeRecord};
use taskdeck_core::task::{
    validate_create, validate_update, validate_update_payload, CreateTask, Task, TaskChanges,
    UpdateTask,
};
use taskdeck_core::types::{EntityId, Timestamp};

const TASK_ENTITY: &str = "Task";

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: TASK_ENTITY,
        id: id.to_string(),
    }
}

/// Per-task log of records, oldest first.
type Log<T> = IndexMap<EntityId, Vec<T>>;

#[derive(Default)]
struct StoreInner {
    tasks: IndexMap<EntityId, Task>,
    history: Log<FieldChangeRecord>,
    activity: Log<ActivityRecord>,
}

impl StoreInner {
    fn record_history(&mut self, records: impl IntoIterator<Item = FieldChangeRecord>) {
        for record in records {
            self.history
                .entry(record.entity_id.clone())
                .or_default()
                .push(record);
        }
    }

    fn record_activity(&mut self, records: impl IntoIterator<Item = ActivityRecord>) {
        for record in records {
            self.activity
                .entry(record.entity_id.clone())
                .or_default()
                .push(record);
        }
    }

    /// Records for `id`; unknown ids with nothing logged are not found.
    fn log_for<T: Clone>(&self, log: &Log<T>, id: &str) -> Result<Vec<T>, CoreError> {
        match log.get(id) {
            Some(records) => Ok(records.clone()),
            None if self.tasks.contains_key(id) => Ok(Vec::new()),
            None => Err(not_found(id)),
        }
    }
}

/// The outcome of a single-task update.
#[derive(Debug, Clone)]
pub struct TaskUpdate {
    pub task: Task,
    pub derived: DerivedChanges,
}

/// The outcome of a bulk operation, with the activity it produced.
#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub result: BulkOperationResult,
    pub activity: Vec<ActivityRecord>,
}

/// Process-wide task store, shared via `Arc<TaskStore>`.
#[derive(Default)]
pub struct TaskStore {
    inner: RwLock<StoreInner>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert a new task.
    pub async fn create(&self, input: CreateTask) -> Result<Task, CoreError> {
        validate_create(&input)?;
        let id = uuid::Uuid::new_v4().to_string();
        let task = Task::new(id.clone(), input, Utc::now());

        let mut inner = self.inner.write().await;
        inner.tasks.insert(id, task.clone());
        tracing::debug!(task_id = %task.id, "Task inserted");
        Ok(task)
    }

    /// List tasks in creation order.
    pub async fn list(&self, include_archived: bool) -> Vec<Task> {
        let inner = self.inner.read().await;
        inner
            .tasks
            .values()
            .filter(|t| include_archived || !t.archived)
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &str) -> Result<Task, CoreError> {
        let inner = self.inner.read().await;
        inner.tasks.get(id).cloned().ok_or_else(|| not_found(id))
    }

    /// Apply a partial update given as a raw key/value payload.
    ///
    /// History is derived against the pre-update snapshot, in payload key
    /// order, and appended to the store's logs together with any status
    /// transition.
    pub async fn update(
        &self,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<TaskUpdate, CoreError> {
        validate_update_payload(&payload)?;
        let update: UpdateTask = serde_json::from_value(Value::Object(payload.clone()))
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        validate_update(&update)?;

        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let task = inner.tasks.get_mut(id).ok_or_else(|| not_found(id))?;

        let before = task.to_record();
        let derived = derive_changes(id, &before, &payload, now);
        task.apply_update(&update, now);
        let task = task.clone();

        inner.record_history(derived.changes.iter().cloned());
        inner.record_activity(derived.activity.iter().cloned());
        tracing::debug!(
            task_id = %id,
            changes = derived.changes.len(),
            status_changed = derived.activity.is_some(),
            "Task updated",
        );

        Ok(TaskUpdate { task, derived })
    }

    pub async fn delete(&self, id: &str) -> Result<Task, CoreError> {
        let mut inner = self.inner.write().await;
        inner.tasks.shift_remove(id).ok_or_else(|| not_found(id))
    }

    /// Field history for a task, oldest first.
    pub async fn history(&self, id: &str) -> Result<Vec<FieldChangeRecord>, CoreError> {
        let inner = self.inner.read().await;
        inner.log_for(&inner.history, id)
    }

    /// Activity records for a task, oldest first.
    pub async fn activity(&self, id: &str) -> Result<Vec<ActivityRecord>, CoreError> {
        let inner = self.inner.read().await;
        inner.log_for(&inner.activity, id)
    }

    /// Run a bulk operation through `engine` under one write lock.
    pub async fn apply_bulk(
        &self,
        engine: &BulkEngine,
        operation: &BulkOperation,
    ) -> BulkOutcome {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let now = Utc::now();

        let keys: Vec<TaskKey> = inner.tasks.keys().cloned().map(TaskKey).collect();
        let mut mutator = StoreMutator {
            tasks: &mut inner.tasks,
            now,
        };
        let result = engine.apply(&keys, operation, &mut mutator);

        let activity = bulk_activity(operation, &result, now);
        inner.record_activity(activity.iter().cloned());

        BulkOutcome { result, activity }
    }
}

// ---------------------------------------------------------------------------
// Bulk plumbing
// ---------------------------------------------------------------------------

/// Id-only view of a stored task for engine lookups.
struct TaskKey(EntityId);

impl Identified for TaskKey {
    fn id(&self) -> &str {
        &self.0
    }
}

/// Mutates the locked task map on behalf of the bulk engine.
struct StoreMutator<'a> {
    tasks: &'a mut IndexMap<EntityId, Task>,
    now: Timestamp,
}

impl BulkMutator for StoreMutator<'_> {
    fn update(&mut self, id: &str, changes: &TaskChanges) -> Result<(), CoreError> {
        let task = self.tasks.get_mut(id).ok_or_else(|| not_found(id))?;
        task.apply_changes(changes, self.now);
        Ok(())
    }

    fn archive(&mut self, id: &str) -> Result<(), CoreError> {
        let task = self.tasks.get_mut(id).ok_or_else(|| not_found(id))?;
        if task.archived {
            return Err(CoreError::Conflict("Task is already archived".to_string()));
        }
        task.archive(self.now);
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), CoreError> {
        self.tasks
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use taskdeck_core::bulk::BulkOperationKind;
    use taskdeck_core::history::ActivityKind;
    use taskdeck_core::task::TaskStatus;

    use super::*;

    fn create_input(title: &str) -> CreateTask {
        serde_json::from_value(json!({ "title": title })).unwrap()
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn update_records_history_and_status_activity() {
        let store = TaskStore::new();
        let task = store.create(create_input("Write docs")).await.unwrap();

        let outcome = store
            .update(&task.id, payload(json!({"status": "done", "priority": "medium"})))
            .await
            .unwrap();

        assert_eq!(outcome.task.status, TaskStatus::Done);
        // priority was already medium, so only status changed
        assert_eq!(outcome.derived.changes.len(), 1);
        assert!(outcome.derived.activity.is_some());

        assert_eq!(store.history(&task.id).await.unwrap().len(), 1);
        let activity = store.activity(&task.id).await.unwrap();
        assert_eq!(activity[0].kind, ActivityKind::StatusChanged);
    }

    #[tokio::test]
    async fn update_rejects_unknown_fields_and_null_status() {
        let store = TaskStore::new();
        let task = store.create(create_input("Write docs")).await.unwrap();

        assert_matches!(
            store.update(&task.id, payload(json!({"colour": "red"}))).await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            store.update(&task.id, payload(json!({"status": null}))).await,
            Err(CoreError::Validation(_))
        );
        assert!(store.history(&task.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_unknown_task_is_not_found() {
        let store = TaskStore::new();
        assert_matches!(
            store.update("nope", payload(json!({"title": "x"}))).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn bulk_archive_isolates_already_archived_task() {
        let store = TaskStore::new();
        let a = store.create(create_input("a")).await.unwrap();
        let b = store.create(create_input("b")).await.unwrap();
        let engine = BulkEngine::default();

        store
            .apply_bulk(&engine, &BulkOperation::archive([a.id.clone()]))
            .await;
        let outcome = store
            .apply_bulk(&engine, &BulkOperation::archive([a.id.clone(), b.id.clone()]))
            .await;

        assert_eq!(outcome.result.succeeded_count, 1);
        assert_eq!(outcome.result.failed_count, 1);
        assert_eq!(outcome.result.failures[0].target_id.as_deref(), Some(a.id.as_str()));
        assert!(outcome.result.failures[0].reason.contains("already archived"));
        assert_eq!(outcome.activity.len(), 1);
        assert!(store.list(false).await.is_empty());
        assert_eq!(store.list(true).await.len(), 2);
    }

    #[tokio::test]
    async fn bulk_delete_removes_tasks_and_logs_activity() {
        let store = TaskStore::new();
        let a = store.create(create_input("a")).await.unwrap();

        let op = BulkOperation::delete([a.id.clone(), "ghost".to_string()]);
        let outcome = store.apply_bulk(&BulkEngine::default(), &op).await;

        assert_eq!(op.kind, BulkOperationKind::Delete);
        assert_eq!(outcome.result.succeeded_count, 1);
        assert_eq!(outcome.result.failures[0].target_id.as_deref(), Some("ghost"));
        assert_matches!(store.get(&a.id).await, Err(CoreError::NotFound { .. }));
        // Activity survives deletion of the task it refers to.
        let activity = store.activity(&a.id).await.unwrap();
        assert_eq!(activity[0].kind, ActivityKind::Deleted);
    }

    #[tokio::test]
    async fn bulk_update_applies_changes() {
        let store = TaskStore::new();
        let a = store.create(create_input("a")).await.unwrap();
        let changes = TaskChanges {
            status: Some(TaskStatus::InProgress),
            subcategory: Some(Some("writing".to_string())),
            ..Default::default()
        };

        let outcome = store
            .apply_bulk(&BulkEngine::default(), &BulkOperation::update([a.id.clone()], changes))
            .await;

        assert!(outcome.result.overall_success);
        let task = store.get(&a.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.subcategory.as_deref(), Some("writing"));
        // Bulk path keeps its own activity kind; no field history is written.
        assert_eq!(outcome.activity[0].kind, ActivityKind::BulkUpdated);
        assert!(store.history(&a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logs_are_kept_per_task() {
        let store = TaskStore::new();
        let a = store.create(create_input("a")).await.unwrap();
        let b = store.create(create_input("b")).await.unwrap();

        store
            .update(&a.id, payload(json!({"status": "done", "title": "a2"})))
            .await
            .unwrap();
        store
            .update(&b.id, payload(json!({"priority": "low"})))
            .await
            .unwrap();
        store
            .update(&a.id, payload(json!({"priority": "urgent"})))
            .await
            .unwrap();

        let fields: Vec<String> = store
            .history(&a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.field)
            .collect();
        assert_eq!(fields, ["status", "title", "priority"]);

        let b_history = store.history(&b.id).await.unwrap();
        assert_eq!(b_history.len(), 1);
        assert!(b_history.iter().all(|r| r.entity_id == b.id));
        assert!(store.activity(&b.id).await.unwrap().is_empty());
        assert_eq!(store.activity(&a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_for_unknown_task_is_not_found() {
        let store = TaskStore::new();
        assert_matches!(store.history("nope").await, Err(CoreError::NotFound { .. }));
        assert_matches!(store.activity("nope").await, Err(CoreError::NotFound { .. }));
    }
}
