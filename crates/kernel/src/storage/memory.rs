//! In-memory storage backend.
//!
//! Used when no `DATABASE_URL` is configured and by the test suite. All
//! tables live behind a single `parking_lot::RwLock`; every trait method
//! takes the lock once and never awaits while holding it, which makes the
//! multi-step operations atomic.

use std::collections::BTreeSet;

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{CategoryRemoval, Storage, dedup_ids};
use crate::models::{Article, ArticleFilter, Category, Plugin, Tag};
use crate::taxonomy::plan_reassignment;

#[derive(Default)]
struct Tables {
    /// Kept in installation order.
    plugins: Vec<Plugin>,
    tags: Vec<Tag>,
    categories: Vec<Category>,
    articles: Vec<Article>,
    /// (article_id, tag_id) pairs; the set enforces uniqueness.
    article_tags: BTreeSet<(Uuid, Uuid)>,
}

impl Tables {
    fn tag_articles(&self, tag_id: Uuid) -> Vec<Uuid> {
        self.article_tags
            .iter()
            .filter(|(_, t)| *t == tag_id)
            .map(|(a, _)| *a)
            .collect()
    }

    fn set_article_tags(&mut self, article_id: Uuid, tag_ids: &[Uuid]) {
        self.article_tags.retain(|(a, _)| *a != article_id);
        for tag_id in tag_ids {
            self.article_tags.insert((article_id, *tag_id));
        }
    }
}

/// Storage backend keeping every table in process memory.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_plugins(&self) -> Result<Vec<Plugin>> {
        Ok(self.tables.read().plugins.clone())
    }

    async fn list_enabled_plugins(&self) -> Result<Vec<Plugin>> {
        Ok(self
            .tables
            .read()
            .plugins
            .iter()
            .filter(|p| p.enabled)
            .cloned()
            .collect())
    }

    async fn find_plugin(&self, name: &str) -> Result<Option<Plugin>> {
        Ok(self
            .tables
            .read()
            .plugins
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn insert_plugin(&self, plugin: &Plugin) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.plugins.iter().any(|p| p.name == plugin.name) {
            bail!("plugin '{}' already exists", plugin.name);
        }
        tables.plugins.push(plugin.clone());
        Ok(())
    }

    async fn update_plugin(&self, plugin: &Plugin) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.plugins.iter_mut().find(|p| p.id == plugin.id) {
            Some(existing) => {
                *existing = plugin.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_plugin(&self, name: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.plugins.len();
        tables.plugins.retain(|p| p.name != name);
        Ok(tables.plugins.len() < before)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.tables.read().tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>> {
        Ok(self.tables.read().tags.iter().find(|t| t.id == id).cloned())
    }

    async fn tag_slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.tables.read().tags.iter().any(|t| t.slug == slug))
    }

    async fn insert_tag(&self, tag: &Tag) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.tags.iter().any(|t| t.slug == tag.slug) {
            bail!("tag slug '{}' already exists", tag.slug);
        }
        tables.tags.push(tag.clone());
        Ok(())
    }

    async fn update_tag(&self, tag: &Tag) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables
            .tags
            .iter()
            .any(|t| t.slug == tag.slug && t.id != tag.id)
        {
            bail!("tag slug '{}' already exists", tag.slug);
        }
        match tables.tags.iter_mut().find(|t| t.id == tag.id) {
            Some(existing) => {
                *existing = tag.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.tags.len();
        tables.tags.retain(|t| t.id != id);
        if tables.tags.len() == before {
            return Ok(false);
        }
        tables.article_tags.retain(|(_, t)| *t != id);
        Ok(true)
    }

    async fn tag_article_ids(&self, tag_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self.tables.read().tag_articles(tag_id))
    }

    async fn merge_tags(&self, source: Uuid, target: Uuid) -> Result<Option<u64>> {
        let mut tables = self.tables.write();
        let exists = |id: Uuid| tables.tags.iter().any(|t| t.id == id);
        if !exists(source) || !exists(target) {
            return Ok(None);
        }

        let plan = plan_reassignment(&tables.tag_articles(source), &tables.tag_articles(target));
        for article_id in &plan {
            tables.article_tags.insert((*article_id, target));
        }

        tables.article_tags.retain(|(_, t)| *t != source);
        tables.tags.retain(|t| t.id != source);

        Ok(Some(plan.len() as u64))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.tables.read().categories.clone();
        categories.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self
            .tables
            .read()
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn category_slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.tables.read().categories.iter().any(|c| c.slug == slug))
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.categories.iter().any(|c| c.slug == category.slug) {
            bail!("category slug '{}' already exists", category.slug);
        }
        tables.categories.push(category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables
            .categories
            .iter()
            .any(|c| c.slug == category.slug && c.id != category.id)
        {
            bail!("category slug '{}' already exists", category.slug);
        }
        match tables.categories.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => {
                *existing = category.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(
        &self,
        id: Uuid,
        migrate_to: Option<Uuid>,
    ) -> Result<Option<CategoryRemoval>> {
        let mut tables = self.tables.write();
        let Some(parent_id) = tables
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.parent_id)
        else {
            return Ok(None);
        };

        if let Some(target) = migrate_to
            && (target == id || !tables.categories.iter().any(|c| c.id == target))
        {
            bail!("migration target category '{target}' is not available");
        }

        let now = chrono::Utc::now().timestamp();
        let mut removal = CategoryRemoval::default();

        for article in tables
            .articles
            .iter_mut()
            .filter(|a| a.category_id == Some(id))
        {
            article.category_id = migrate_to;
            article.changed = now;
            removal.articles_moved += 1;
        }

        for child in tables
            .categories
            .iter_mut()
            .filter(|c| c.parent_id == Some(id))
        {
            child.parent_id = parent_id;
            child.changed = now;
            removal.children_reparented += 1;
        }

        tables.categories.retain(|c| c.id != id);

        Ok(Some(removal))
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let tables = self.tables.read();
        let mut articles: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| filter.matches(a))
            .filter(|a| {
                filter
                    .tag_id
                    .is_none_or(|t| tables.article_tags.contains(&(a.id, t)))
            })
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));
        Ok(articles)
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<Article>> {
        Ok(self
            .tables
            .read()
            .articles
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        Ok(self
            .tables
            .read()
            .articles
            .iter()
            .find(|a| a.slug == slug)
            .cloned())
    }

    async fn article_slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.tables.read().articles.iter().any(|a| a.slug == slug))
    }

    async fn insert_article(&self, article: &Article, tag_ids: &[Uuid]) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.articles.iter().any(|a| a.slug == article.slug) {
            bail!("article slug '{}' already exists", article.slug);
        }
        tables.articles.push(article.clone());
        tables.set_article_tags(article.id, &dedup_ids(tag_ids));
        Ok(())
    }

    async fn update_article(&self, article: &Article, tag_ids: Option<&[Uuid]>) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables
            .articles
            .iter()
            .any(|a| a.slug == article.slug && a.id != article.id)
        {
            bail!("article slug '{}' already exists", article.slug);
        }
        let Some(existing) = tables.articles.iter_mut().find(|a| a.id == article.id) else {
            return Ok(false);
        };
        *existing = article.clone();
        if let Some(tag_ids) = tag_ids {
            tables.set_article_tags(article.id, &dedup_ids(tag_ids));
        }
        Ok(true)
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        let before = tables.articles.len();
        tables.articles.retain(|a| a.id != id);
        if tables.articles.len() == before {
            return Ok(false);
        }
        tables.article_tags.retain(|(a, _)| *a != id);
        Ok(true)
    }

    async fn article_tag_ids(&self, article_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .tables
            .read()
            .article_tags
            .range((article_id, Uuid::nil())..=(article_id, Uuid::max()))
            .map(|(_, t)| *t)
            .collect())
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            created: 0,
            changed: 0,
        }
    }

    fn article(slug: &str) -> Article {
        Article {
            id: Uuid::now_v7(),
            title: slug.to_string(),
            slug: slug.to_string(),
            summary: None,
            body: String::new(),
            format: "markdown".to_string(),
            status: 1,
            category_id: None,
            created: 0,
            changed: 0,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_tag_slug_is_rejected() {
        let storage = MemoryStorage::new();
        storage.insert_tag(&tag("Rust")).await.unwrap();
        assert!(storage.insert_tag(&tag("Rust")).await.is_err());
    }

    #[tokio::test]
    async fn article_tags_are_unique_and_replaced() {
        let storage = MemoryStorage::new();
        let (t1, t2) = (tag("a"), tag("b"));
        storage.insert_tag(&t1).await.unwrap();
        storage.insert_tag(&t2).await.unwrap();

        let a = article("post");
        storage
            .insert_article(&a, &[t1.id, t1.id, t2.id])
            .await
            .unwrap();
        assert_eq!(storage.article_tag_ids(a.id).await.unwrap().len(), 2);

        storage.update_article(&a, Some(&[t2.id])).await.unwrap();
        assert_eq!(storage.article_tag_ids(a.id).await.unwrap(), vec![t2.id]);
        assert!(storage.tag_article_ids(t1.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_with_missing_tag_changes_nothing() {
        let storage = MemoryStorage::new();
        let t1 = tag("a");
        storage.insert_tag(&t1).await.unwrap();

        let result = storage.merge_tags(t1.id, Uuid::now_v7()).await.unwrap();
        assert!(result.is_none());
        assert!(storage.find_tag(t1.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn plugins_keep_installation_order() {
        let storage = MemoryStorage::new();
        for name in ["zeta", "alpha", "mid"] {
            let plugin = Plugin::from_new(
                crate::models::NewPlugin {
                    name: name.to_string(),
                    version: "1.0.0".to_string(),
                    path: format!("builtin:{name}"),
                    dependencies: vec![],
                    config: None,
                    enabled: None,
                },
                0,
            );
            storage.insert_plugin(&plugin).await.unwrap();
        }
        let names: Vec<String> = storage
            .list_plugins()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
