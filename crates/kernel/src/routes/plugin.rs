//! Plugin API routes.
//!
//! REST endpoints for the plugin registry and load order.

use std::path::PathBuf;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::{NewPlugin, Plugin};
use crate::plugin::{LoadOrder, resolve_install_dir};
use crate::state::AppState;

/// Create the plugin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/plugins", get(list_plugins))
        .route("/api/plugins/load-order", get(load_order))
        .route("/api/plugin", post(install_plugin))
        .route("/api/plugin/from-manifest", post(install_from_manifest))
        .route("/api/plugin/{name}", get(get_plugin).delete(uninstall_plugin))
        .route("/api/plugin/{name}/enable", post(enable_plugin))
        .route("/api/plugin/{name}/disable", post(disable_plugin))
        .route("/api/plugin/{name}/config", put(update_config))
}

/// Manifest install request. `path` names a plugin directory under the
/// plugins directory; relative paths are resolved against it.
#[derive(Deserialize)]
struct ManifestInstall {
    path: PathBuf,
}

async fn list_plugins(State(state): State<AppState>) -> AppResult<Json<Vec<Plugin>>> {
    Ok(Json(state.plugins().list().await?))
}

async fn load_order(State(state): State<AppState>) -> AppResult<Json<LoadOrder>> {
    Ok(Json(state.plugins().load_order().await?))
}

async fn get_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Plugin>> {
    Ok(Json(state.plugins().get(&name).await?))
}

async fn install_plugin(
    State(state): State<AppState>,
    Json(input): Json<NewPlugin>,
) -> AppResult<(StatusCode, Json<Plugin>)> {
    let plugin = state.plugins().install(input).await?;
    Ok((StatusCode::CREATED, Json(plugin)))
}

async fn install_from_manifest(
    State(state): State<AppState>,
    Json(request): Json<ManifestInstall>,
) -> AppResult<(StatusCode, Json<Plugin>)> {
    let dir = resolve_install_dir(state.plugins_dir(), &request.path)?;
    let plugin = state.plugins().install_from_path(&dir).await?;
    Ok((StatusCode::CREATED, Json(plugin)))
}

async fn uninstall_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.plugins().uninstall(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn enable_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Plugin>> {
    Ok(Json(state.plugins().enable(&name).await?))
}

async fn disable_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Plugin>> {
    Ok(Json(state.plugins().disable(&name).await?))
}

async fn update_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(config): Json<Value>,
) -> AppResult<Json<Plugin>> {
    if config.is_null() {
        return Err(AppError::bad_request("config body is required"));
    }
    Ok(Json(state.plugins().update_config(&name, config).await?))
}
