//! Category model: hierarchical classification, one category per article.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// URL-safe identifier derived from the name.
    pub slug: String,

    /// Optional description.
    pub description: Option<String>,

    /// Parent category (None for top-level categories).
    pub parent_id: Option<Uuid>,

    /// Sort weight among siblings.
    pub weight: i16,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub weight: Option<i16>,
}

/// Input for updating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    /// Move the category to the top level (takes precedence over `parent_id`).
    #[serde(default)]
    pub detach: bool,
    pub weight: Option<i16>,
}
