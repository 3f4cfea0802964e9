//! Route definitions for tasks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Task routes mounted at `/tasks`.
///
/// ```text
/// GET    /               -> list_tasks
/// POST   /               -> create_task
/// POST   /bulk           -> bulk_operation
/// POST   /bulk/estimate  -> bulk_estimate
/// GET    /{id}           -> get_task
/// PATCH  /{id}           -> update_task
/// DELETE /{id}           -> delete_task
/// GET    /{id}/history   -> task_history
/// GET    /{id}/activity  -> task_activity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/bulk", post(tasks::bulk_operation))
        .route("/bulk/estimate", post(tasks::bulk_estimate))
        .route(
            "/{id}",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/{id}/history", get(tasks::task_history))
        .route("/{id}/activity", get(tasks::task_activity))
}
