use std::path::Path;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path as UrlPath, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::info;

use crate::controller::{Controller, ViewUpdate};
use crate::error::ControlError;

#[derive(Clone)]
pub struct AppState {
    controller: Controller,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default = "default_reset")]
    pub reset: bool,
    #[serde(default)]
    pub concurrency: Option<usize>,
}

fn default_reset() -> bool {
    true
}

/// JSON API under `/api`, with `ui_dir` served as static files.
pub fn router(controller: Controller, ui_dir: impl AsRef<Path>) -> Router {
    let state = AppState { controller };

    let api = Router::new()
        .route("/status", get(get_status))
        .route("/scan", post(post_scan))
        .route("/stop", post(post_stop))
        .route("/results", get(get_results))
        .route("/view", get(get_view).post(post_view))
        .route("/targets/reload", post(post_reload))
        .route("/servers/{host}", get(get_server))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state);

    let static_svc = ServeDir::new(ui_dir.as_ref()).append_index_html_on_directories(true);

    Router::new()
        .nest("/api", api)
        .fallback_service(static_svc)
        .layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(bind: &str, controller: Controller, ui_dir: impl AsRef<Path>) -> Result<()> {
    let app = router(controller, ui_dir);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "serving HTTP API");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.controller.status().await))
}

/// An empty body means a resetting scan with the configured concurrency.
async fn post_scan(State(app): State<AppState>, body: Bytes) -> impl IntoResponse {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        ScanRequest {
            reset: true,
            concurrency: None,
        }
    } else {
        match serde_json::from_slice::<ScanRequest>(&body) {
            Ok(req) => req,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid scan request: {e}") })),
                )
                    .into_response()
            }
        }
    };
    match app.controller.start_scan_with(req.reset, req.concurrency).await {
        Ok(status) => (StatusCode::ACCEPTED, Json(status)).into_response(),
        Err(e) => control_error(e).into_response(),
    }
}

async fn post_stop(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.controller.stop_scan().await))
}

async fn get_results(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.controller.snapshot().await))
}

async fn get_view(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.controller.view().await))
}

async fn post_view(
    State(app): State<AppState>,
    Json(update): Json<ViewUpdate>,
) -> impl IntoResponse {
    (StatusCode::OK, Json(app.controller.update_view(update).await))
}

async fn post_reload(State(app): State<AppState>) -> impl IntoResponse {
    let count = app.controller.reload_targets().await;
    (StatusCode::OK, Json(json!({ "targets": count })))
}

async fn get_server(
    State(app): State<AppState>,
    UrlPath(host): UrlPath<String>,
) -> impl IntoResponse {
    match app.controller.details(&host).await {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": format!("unable to load server details: {e}") })),
        )
            .into_response(),
    }
}

fn control_error(e: ControlError) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() })))
}
