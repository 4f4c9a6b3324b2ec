//! Tag API routes.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{CreateTag, Tag, TagWithArticles, UpdateTag};
use crate::state::AppState;

/// Create the tag router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(list_tags))
        .route("/api/tag", post(create_tag))
        .route(
            "/api/tag/{id}",
            get(get_tag).put(update_tag).delete(delete_tag),
        )
        .route("/api/tag/{id}/merge", post(merge_tag))
}

#[derive(Deserialize)]
struct MergeRequest {
    target_id: Uuid,
}

async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(state.tags().list().await?))
}

async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TagWithArticles>> {
    Ok(Json(state.tags().get(id).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(input): Json<CreateTag>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let tag = state.tags().create(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTag>,
) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags().update(id, input).await?))
}

async fn delete_tag(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.tags().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Merge the tag in the path into `target_id` and return the target.
async fn merge_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MergeRequest>,
) -> AppResult<Json<TagWithArticles>> {
    Ok(Json(state.tags().merge(id, request.target_id).await?))
}
