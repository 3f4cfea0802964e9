//! HTTP-level integration tests for the shortcut registry endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};

#[tokio::test]
async fn list_shortcuts_returns_default_bindings() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/shortcuts").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let bindings = json["data"].as_array().unwrap();
    assert!(!bindings.is_empty());
    assert_eq!(bindings[0]["id"], "palette.open");
    assert_eq!(bindings[0]["combo"], "ctrl+k");
    assert_eq!(bindings[0]["scope"], "global");
}

#[tokio::test]
async fn resolve_prefers_scoped_then_global_binding() {
    let app = common::build_test_app();

    let response = get(
        app.clone(),
        "/api/v1/shortcuts/resolve?combo=shift%2BA&scope=task_list",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["combo"], "shift+a");
    assert_eq!(data["binding"]["id"], "bulk.archive");

    let response = get(app, "/api/v1/shortcuts/resolve?combo=Esc&scope=task_list").await;
    let data = &body_json(response).await["data"];
    assert_eq!(data["binding"]["id"], "selection.clear");
}

#[tokio::test]
async fn resolve_unbound_combo_returns_null_binding() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/shortcuts/resolve?combo=ctrl%2Bshift%2Bz").await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert!(data["binding"].is_null());
    assert_eq!(data["scope"], "global");
    assert!(data["bindings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn resolve_malformed_combo_returns_400() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/shortcuts/resolve?combo=ctrl%2B").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}
