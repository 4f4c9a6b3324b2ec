//! Persistence abstraction layer.
//!
//! All entity reads and writes go through the [`Storage`] trait. Services hold
//! an `Arc<dyn Storage>` and never talk to a database directly, so the same
//! service code runs against PostgreSQL in production and against the
//! in-memory backend in tests and local development.
//!
//! The two multi-step workflows, tag merge and category deletion with
//! migration, are single trait methods so that each backend can make them
//! failure-atomic (a transaction for PostgreSQL, one write lock in memory).

mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use crate::models::{Article, ArticleFilter, Category, Plugin, Tag};

/// Summary of a category removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryRemoval {
    /// Articles re-pointed at the migration target (or detached).
    pub articles_moved: u64,
    /// Child categories moved up to the removed category's parent.
    pub children_reparented: u64,
}

/// Storage backend for all CMS entities.
#[async_trait]
pub trait Storage: Send + Sync {
    // ---- Plugins ----

    /// All plugins in installation order.
    async fn list_plugins(&self) -> Result<Vec<Plugin>>;

    /// Enabled plugins in installation order.
    async fn list_enabled_plugins(&self) -> Result<Vec<Plugin>>;

    async fn find_plugin(&self, name: &str) -> Result<Option<Plugin>>;

    async fn insert_plugin(&self, plugin: &Plugin) -> Result<()>;

    /// Overwrite a plugin record. Returns false if it does not exist.
    async fn update_plugin(&self, plugin: &Plugin) -> Result<bool>;

    async fn delete_plugin(&self, name: &str) -> Result<bool>;

    // ---- Tags ----

    /// All tags ordered by name.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>>;

    async fn tag_slug_exists(&self, slug: &str) -> Result<bool>;

    async fn insert_tag(&self, tag: &Tag) -> Result<()>;

    async fn update_tag(&self, tag: &Tag) -> Result<bool>;

    /// Delete a tag and its association rows.
    async fn delete_tag(&self, id: Uuid) -> Result<bool>;

    /// Articles associated with a tag.
    async fn tag_article_ids(&self, tag_id: Uuid) -> Result<Vec<Uuid>>;

    /// Move every association of `source` onto `target` and delete `source`.
    ///
    /// Associations the target already has are skipped. Returns the number
    /// of newly linked articles, or None if either tag does not exist (in
    /// which case nothing is changed).
    async fn merge_tags(&self, source: Uuid, target: Uuid) -> Result<Option<u64>>;

    // ---- Categories ----

    /// All categories ordered by weight, then name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>>;

    async fn category_slug_exists(&self, slug: &str) -> Result<bool>;

    async fn insert_category(&self, category: &Category) -> Result<()>;

    async fn update_category(&self, category: &Category) -> Result<bool>;

    /// Delete a category, moving its articles to `migrate_to` (or detaching
    /// them when None) and re-parenting its children to its own parent.
    ///
    /// Returns None if the category does not exist. Fails without changes
    /// if `migrate_to` names a missing category.
    async fn delete_category(
        &self,
        id: Uuid,
        migrate_to: Option<Uuid>,
    ) -> Result<Option<CategoryRemoval>>;

    // ---- Articles ----

    /// Articles matching a filter, newest first.
    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>>;

    async fn find_article(&self, id: Uuid) -> Result<Option<Article>>;

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    async fn article_slug_exists(&self, slug: &str) -> Result<bool>;

    /// Insert an article with its tag associations.
    async fn insert_article(&self, article: &Article, tag_ids: &[Uuid]) -> Result<()>;

    /// Overwrite an article; replaces its tag set when `tag_ids` is Some.
    async fn update_article(&self, article: &Article, tag_ids: Option<&[Uuid]>) -> Result<bool>;

    async fn delete_article(&self, id: Uuid) -> Result<bool>;

    async fn article_tag_ids(&self, article_id: Uuid) -> Result<Vec<Uuid>>;

    // ---- Health ----

    /// Check if the backend is reachable.
    async fn is_healthy(&self) -> bool;

    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Deduplicate ids while keeping first-seen order.
pub(crate) fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
