//! Handlers for the keyboard shortcut registry.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use taskdeck_core::shortcuts::{KeyCombo, Shortcut, GLOBAL_SCOPE};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/shortcuts
///
/// All registered bindings in registration order.
pub async fn list_shortcuts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let shortcuts: Vec<Shortcut> = state.shortcuts.iter().cloned().collect();
    Ok(Json(DataResponse { data: shortcuts }))
}

/// Query parameters for [`resolve_shortcut`].
#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub combo: String,
    pub scope: Option<String>,
}

/// Resolution of a combo in a scope, plus every binding that shares it.
#[derive(Debug, Serialize)]
pub struct ResolvedShortcut {
    pub combo: KeyCombo,
    pub scope: String,
    pub binding: Option<Shortcut>,
    pub bindings: Vec<Shortcut>,
}

/// GET /api/v1/shortcuts/resolve?combo=ctrl%2Bk&scope=task_list
///
/// `combo` must be URL-encoded (`+` is `%2B`). `scope` defaults to the
/// global scope. `binding` is `null` when nothing is bound.
pub async fn resolve_shortcut(
    State(state): State<AppState>,
    params: Result<Query<ResolveParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let combo = KeyCombo::parse(&params.combo)?;
    let scope = params.scope.unwrap_or_else(|| GLOBAL_SCOPE.to_string());

    let resolved = ResolvedShortcut {
        binding: state.shortcuts.resolve(&combo, &scope).cloned(),
        bindings: state.shortcuts.conflicts(&combo).into_iter().cloned().collect(),
        combo,
        scope,
    };

    Ok(Json(DataResponse { data: resolved }))
}
