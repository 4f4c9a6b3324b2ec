//! Tag model: flat labels attached to articles through `article_tag`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// URL-safe identifier derived from the name.
    pub slug: String,

    /// Optional description.
    pub description: Option<String>,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// A tag together with the articles it is attached to.
#[derive(Debug, Clone, Serialize)]
pub struct TagWithArticles {
    #[serde(flatten)]
    pub tag: Tag,
    pub article_ids: Vec<Uuid>,
}

/// Input for creating a tag.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTag {
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating a tag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTag {
    pub name: Option<String>,
    pub description: Option<String>,
}
