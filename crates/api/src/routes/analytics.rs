//! Route definitions for series analytics.

use axum::routing::post;
use axum::Router;

use crate::handlers::analytics;
use crate::state::AppState;

/// Analytics routes mounted at `/analytics`.
///
/// ```text
/// POST /moving-average  -> moving_average_handler
/// POST /trend           -> trend
/// POST /trend-line      -> trend_line_points
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/moving-average", post(analytics::moving_average_handler))
        .route("/trend", post(analytics::trend))
        .route("/trend-line", post(analytics::trend_line_points))
}
