//! Handlers for task CRUD, field history, and bulk operations.
//!
//! Single-task updates derive field history and status activity from the
//! raw request payload. Bulk requests run through the configured
//! [`BulkEngine`](taskdeck_core::bulk::BulkEngine) under one store lock.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use taskdeck_core::bulk::{changed_field_names, BulkOperation, BulkOperationResult};
use taskdeck_core::history::{FieldChangeRecord, FieldLabels};
use taskdeck_core::task::CreateTask;
use taskdeck_events::{event_types, PlatformEvent};

use crate::error::AppResult;
use crate::query::IncludeArchivedParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks
///
/// List tasks in creation order. Archived tasks are hidden unless
/// `?include_archived=true`.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<IncludeArchivedParams>,
) -> AppResult<impl IntoResponse> {
    let tasks = state.store.list(params.include_archived).await;
    Ok(Json(DataResponse { data: tasks }))
}

/// POST /api/v1/tasks
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTask>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let task = state.store.create(input).await?;

    tracing::info!(task_id = %task.id, status = %task.status, "Task created");
    state.event_bus.publish(
        PlatformEvent::for_task(event_types::TASK_CREATED, task.id.clone())
            .with_payload(json!({ "title": task.title })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let task = state.store.get(&id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// PATCH /api/v1/tasks/{id}
///
/// Apply a partial update. Only keys present in the body are considered;
/// `null` clears a nullable field. Publishes `task.updated` when any field
/// changed and `task.status_changed` on a status transition.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let outcome = state.store.update(&id, payload).await?;
    let derived = &outcome.derived;

    if !derived.changes.is_empty() {
        let fields: Vec<&str> = derived.changes.iter().map(|c| c.field.as_str()).collect();
        tracing::info!(task_id = %id, fields = ?fields, "Task updated");
        state.event_bus.publish(
            PlatformEvent::for_task(event_types::TASK_UPDATED, id.clone())
                .with_payload(json!({ "fields": fields })),
        );
    }

    if let Some(activity) = &derived.activity {
        state.event_bus.publish(
            PlatformEvent::for_task(event_types::TASK_STATUS_CHANGED, id.clone())
                .with_payload(json!({
                    "from": activity.from_status,
                    "to": activity.to_status,
                })),
        );
    }

    Ok(Json(DataResponse { data: outcome.task }))
}

/// DELETE /api/v1/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.delete(&id).await?;

    tracing::info!(task_id = %id, "Task deleted");
    state.event_bus.publish(
        PlatformEvent::for_task(event_types::TASK_DELETED, id),
    );

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// A field change with its human-readable rendering.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: FieldChangeRecord,
    pub description: String,
}

/// GET /api/v1/tasks/{id}/history
pub async fn task_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let labels = FieldLabels::default();
    let entries: Vec<HistoryEntry> = state
        .store
        .history(&id)
        .await?
        .into_iter()
        .map(|record| HistoryEntry {
            description: labels.describe_change(&record),
            record,
        })
        .collect();

    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/tasks/{id}/activity
pub async fn task_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let activity = state.store.activity(&id).await?;
    Ok(Json(DataResponse { data: activity }))
}

// ---------------------------------------------------------------------------
// Bulk
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/bulk
///
/// Run a bulk update, archive, or delete. A batch that fails validation is
/// not an HTTP error: it returns 200 with a rejected result carrying the
/// reason.
pub async fn bulk_operation(
    State(state): State<AppState>,
    payload: Result<Json<BulkOperation>, JsonRejection>,
) -> AppResult<Json<DataResponse<BulkOperationResult>>> {
    let Json(operation) = payload?;
    let outcome = state.store.apply_bulk(&state.bulk, &operation).await;
    let result = outcome.result;

    if result.is_rejected() {
        let reason = result.failures.first().map(|f| f.reason.as_str());
        tracing::info!(kind = %operation.kind, reason = ?reason, "Bulk operation rejected");
        return Ok(Json(DataResponse { data: result }));
    }

    tracing::info!(
        kind = %operation.kind,
        targets = operation.target_ids.len(),
        succeeded = result.succeeded_count,
        failed = result.failed_count,
        "Bulk operation completed",
    );

    let fields = operation
        .field_changes
        .as_ref()
        .map(changed_field_names)
        .unwrap_or_default();
    state.event_bus.publish(
        PlatformEvent::new(event_types::TASK_BULK_COMPLETED).with_payload(json!({
            "kind": operation.kind,
            "fields": fields,
            "succeeded_ids": result.succeeded_ids,
            "failed_count": result.failed_count,
            "activity_count": outcome.activity.len(),
        })),
    );

    Ok(Json(DataResponse { data: result }))
}

/// Request body for [`bulk_estimate`].
#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub target_count: usize,
}

/// POST /api/v1/tasks/bulk/estimate
///
/// Projected processing time for a batch of `target_count` tasks, and
/// whether it fits within the configured cap.
pub async fn bulk_estimate(
    State(state): State<AppState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let estimate = state.bulk.policy().estimate(input.target_count);
    Ok(Json(DataResponse { data: estimate }))
}
