//! HTTP route handlers.

pub mod article;
pub mod category;
pub mod health;
pub mod plugin;
pub mod tag;

use axum::Router;

use crate::state::AppState;

/// All API routes, without middleware layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(plugin::router())
        .merge(tag::router())
        .merge(category::router())
        .merge(article::router())
        .with_state(state)
}
