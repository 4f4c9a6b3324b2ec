//! Article model.
//!
//! Articles are the blog posts. Each belongs to at most one category and
//! carries any number of tags through the `article_tag` association table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication status: draft.
pub const STATUS_DRAFT: i16 = 0;
/// Publication status: published.
pub const STATUS_PUBLISHED: i16 = 1;

/// Article record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    pub title: String,

    /// URL-safe identifier derived from the title.
    pub slug: String,

    pub summary: Option<String>,

    /// Raw body in `format`.
    pub body: String,

    /// Text format: "markdown" or "plain_text".
    pub format: String,

    /// Publication status (0 = draft, 1 = published).
    pub status: i16,

    pub category_id: Option<Uuid>,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,

    /// Unix timestamp of first publication.
    pub published_at: Option<i64>,
}

impl Article {
    /// Check if this article is published.
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }
}

/// Article with its tag ids.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub tag_ids: Vec<Uuid>,
}

/// Input for creating an article.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticle {
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
    pub format: Option<String>,
    pub status: Option<i16>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Option<Vec<Uuid>>,
}

/// Input for updating an article.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub format: Option<String>,
    pub status: Option<i16>,
    pub category_id: Option<Uuid>,
    /// Remove the article from its category (takes precedence over `category_id`).
    #[serde(default)]
    pub clear_category: bool,
    /// Replaces the full tag set when present.
    pub tag_ids: Option<Vec<Uuid>>,
}

/// Filter for listing articles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleFilter {
    pub status: Option<i16>,
    pub category_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
}

impl ArticleFilter {
    /// Check an article against the status and category criteria.
    ///
    /// Tag membership lives in the association table and is checked by the
    /// storage backend.
    pub fn matches(&self, article: &Article) -> bool {
        self.status.is_none_or(|s| article.status == s)
            && self
                .category_id
                .is_none_or(|c| article.category_id == Some(c))
    }
}
