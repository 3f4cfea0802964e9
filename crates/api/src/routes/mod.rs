pub mod analytics;
pub mod health;
pub mod shortcuts;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tasks                                  list, create
/// /tasks/bulk                             bulk update / archive / delete (POST)
/// /tasks/bulk/estimate                    processing time estimate (POST)
/// /tasks/{id}                             get, update (PATCH), delete
/// /tasks/{id}/history                     field change history
/// /tasks/{id}/activity                    activity records
///
/// /analytics/moving-average               trailing moving average (POST)
/// /analytics/trend                        trend direction and slope (POST)
/// /analytics/trend-line                   fitted trend-line points (POST)
///
/// /shortcuts                              list bindings
/// /shortcuts/resolve                      resolve a combo in a scope
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tasks", tasks::router())
        .nest("/analytics", analytics::router())
        .nest("/shortcuts", shortcuts::router())
}
