//! Article API routes.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use crate::content::ArticleView;
use crate::error::AppResult;
use crate::models::{Article, ArticleDetail, ArticleFilter, CreateArticle, UpdateArticle};
use crate::plugin::HookResult;
use crate::state::AppState;

/// Create the article router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/articles", get(list_articles))
        .route("/api/articles/{slug}", get(view_article))
        .route("/api/article", post(create_article))
        .route(
            "/api/article/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
}

/// A rendered article with the output of each plugin's `article_view` hook.
#[derive(Serialize)]
struct ArticlePage {
    article: ArticleView,
    extensions: Vec<HookResult>,
}

async fn list_articles(
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(state.articles().list(&filter).await?))
}

/// Published article by slug, extended by the enabled plugins.
async fn view_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ArticlePage>> {
    let article = state.articles().view(&slug).await?;
    let extensions = state.plugins().dispatch_article_view(article.clone()).await?;
    Ok(Json(ArticlePage {
        article,
        extensions,
    }))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArticleDetail>> {
    Ok(Json(state.articles().get(id).await?))
}

async fn create_article(
    State(state): State<AppState>,
    Json(input): Json<CreateArticle>,
) -> AppResult<(StatusCode, Json<ArticleDetail>)> {
    let article = state.articles().create(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateArticle>,
) -> AppResult<Json<ArticleDetail>> {
    Ok(Json(state.articles().update(id, input).await?))
}

async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.articles().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
