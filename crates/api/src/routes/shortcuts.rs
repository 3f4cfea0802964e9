use axum::routing::get;
use axum::Router;

use crate::handlers::shortcuts;
use crate::state::AppState;

/// Shortcut routes mounted at `/shortcuts`.
///
/// ```text
/// GET /         -> list_shortcuts
/// GET /resolve  -> resolve_shortcut
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(shortcuts::list_shortcuts))
        .route("/resolve", get(shortcuts::resolve_shortcut))
}
