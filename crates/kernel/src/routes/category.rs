//! Category API routes.
//!
//! REST endpoints for the category tree, including deletion with article
//! migration.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Category, CreateCategory, UpdateCategory};
use crate::state::AppState;
use crate::storage::CategoryRemoval;

/// Create the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/category", post(create_category))
        .route(
            "/api/category/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/api/category/{id}/breadcrumb", get(get_breadcrumb))
}

#[derive(Deserialize)]
struct DeleteQuery {
    migrate_to: Option<Uuid>,
}

async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.categories().list().await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.categories().get(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.categories().create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.categories().update(id, input).await?))
}

/// Delete a category. Its articles move to `?migrate_to=` or lose their category.
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Json<CategoryRemoval>> {
    Ok(Json(state.categories().delete(id, query.migrate_to).await?))
}

async fn get_breadcrumb(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.categories().breadcrumb(id).await?))
}
