//! PostgreSQL storage backend.
//!
//! Multi-step operations run inside a single transaction; an early return
//! drops the transaction, which rolls it back.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{CategoryRemoval, Storage, dedup_ids};
use crate::config::Config;
use crate::models::{Article, ArticleFilter, Category, Plugin, Tag};
use crate::taxonomy::plan_reassignment;

const PLUGIN_COLUMNS: &str =
    "id, name, version, path, enabled, config, dependencies, created, changed";
const TAG_COLUMNS: &str = "id, name, slug, description, created, changed";
const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, parent_id, weight, created, changed";
const ARTICLE_COLUMNS: &str = "id, title, slug, summary, body, format, status, category_id, created, changed, published_at";

/// Storage backend over a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured database URL.
    pub async fn connect(config: &Config) -> Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is required for PostgreSQL storage")?;

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(url)
            .await
            .context("failed to connect to PostgreSQL")?;

        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn list_plugins(&self) -> Result<Vec<Plugin>> {
        let plugins =
            sqlx::query_as::<_, Plugin>(&format!("SELECT {PLUGIN_COLUMNS} FROM plugin ORDER BY seq"))
                .fetch_all(&self.pool)
                .await
                .context("failed to list plugins")?;

        Ok(plugins)
    }

    async fn list_enabled_plugins(&self) -> Result<Vec<Plugin>> {
        let plugins = sqlx::query_as::<_, Plugin>(&format!(
            "SELECT {PLUGIN_COLUMNS} FROM plugin WHERE enabled ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to list enabled plugins")?;

        Ok(plugins)
    }

    async fn find_plugin(&self, name: &str) -> Result<Option<Plugin>> {
        let plugin = sqlx::query_as::<_, Plugin>(&format!(
            "SELECT {PLUGIN_COLUMNS} FROM plugin WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch plugin")?;

        Ok(plugin)
    }

    async fn insert_plugin(&self, plugin: &Plugin) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO plugin (id, name, version, path, enabled, config, dependencies, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(plugin.id)
        .bind(&plugin.name)
        .bind(&plugin.version)
        .bind(&plugin.path)
        .bind(plugin.enabled)
        .bind(&plugin.config)
        .bind(&plugin.dependencies)
        .bind(plugin.created)
        .bind(plugin.changed)
        .execute(&self.pool)
        .await
        .context("failed to insert plugin")?;

        Ok(())
    }

    async fn update_plugin(&self, plugin: &Plugin) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE plugin
            SET version = $1, path = $2, enabled = $3, config = $4, dependencies = $5, changed = $6
            WHERE id = $7
            "#,
        )
        .bind(&plugin.version)
        .bind(&plugin.path)
        .bind(plugin.enabled)
        .bind(&plugin.config)
        .bind(&plugin.dependencies)
        .bind(plugin.changed)
        .bind(plugin.id)
        .execute(&self.pool)
        .await
        .context("failed to update plugin")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_plugin(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM plugin WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .context("failed to delete plugin")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tag ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .context("failed to list tags")?;

        Ok(tags)
    }

    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tag WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch tag")?;

        Ok(tag)
    }

    async fn tag_slug_exists(&self, slug: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tag WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .context("failed to check tag slug")?;

        Ok(exists)
    }

    async fn insert_tag(&self, tag: &Tag) -> Result<()> {
        sqlx::query(
            "INSERT INTO tag (id, name, slug, description, created, changed) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(tag.id)
        .bind(&tag.name)
        .bind(&tag.slug)
        .bind(&tag.description)
        .bind(tag.created)
        .bind(tag.changed)
        .execute(&self.pool)
        .await
        .context("failed to insert tag")?;

        Ok(())
    }

    async fn update_tag(&self, tag: &Tag) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tag SET name = $1, slug = $2, description = $3, changed = $4 WHERE id = $5",
        )
        .bind(&tag.name)
        .bind(&tag.slug)
        .bind(&tag.description)
        .bind(tag.changed)
        .bind(tag.id)
        .execute(&self.pool)
        .await
        .context("failed to update tag")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        // article_tag rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete tag")?;

        Ok(result.rows_affected() > 0)
    }

    async fn tag_article_ids(&self, tag_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT article_id FROM article_tag WHERE tag_id = $1 ORDER BY article_id",
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch tag articles")?;

        Ok(ids)
    }

    async fn merge_tags(&self, source: Uuid, target: Uuid) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await.context("failed to start transaction")?;

        // Lock both rows so a concurrent merge or delete waits for us
        let locked: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM tag WHERE id = ANY($1) FOR UPDATE")
                .bind(vec![source, target])
                .fetch_all(&mut *tx)
                .await
                .context("failed to lock tags")?;

        if !(locked.contains(&source) && locked.contains(&target)) {
            return Ok(None);
        }

        let source_articles: Vec<Uuid> =
            sqlx::query_scalar("SELECT article_id FROM article_tag WHERE tag_id = $1")
                .bind(source)
                .fetch_all(&mut *tx)
                .await
                .context("failed to fetch source associations")?;

        let target_articles: Vec<Uuid> =
            sqlx::query_scalar("SELECT article_id FROM article_tag WHERE tag_id = $1")
                .bind(target)
                .fetch_all(&mut *tx)
                .await
                .context("failed to fetch target associations")?;

        let plan = plan_reassignment(&source_articles, &target_articles);

        for article_id in &plan {
            sqlx::query("INSERT INTO article_tag (article_id, tag_id) VALUES ($1, $2)")
                .bind(article_id)
                .bind(target)
                .execute(&mut *tx)
                .await
                .context("failed to reassign association")?;
        }

        sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(source)
            .execute(&mut *tx)
            .await
            .context("failed to delete merged tag")?;

        tx.commit().await.context("failed to commit transaction")?;

        Ok(Some(plan.len() as u64))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category ORDER BY weight, name"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to list categories")?;

        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch category")?;

        Ok(category)
    }

    async fn category_slug_exists(&self, slug: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM category WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await
                .context("failed to check category slug")?;

        Ok(exists)
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO category (id, name, slug, description, parent_id, weight, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.weight)
        .bind(category.created)
        .bind(category.changed)
        .execute(&self.pool)
        .await
        .context("failed to insert category")?;

        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE category
            SET name = $1, slug = $2, description = $3, parent_id = $4, weight = $5, changed = $6
            WHERE id = $7
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.weight)
        .bind(category.changed)
        .bind(category.id)
        .execute(&self.pool)
        .await
        .context("failed to update category")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_category(
        &self,
        id: Uuid,
        migrate_to: Option<Uuid>,
    ) -> Result<Option<CategoryRemoval>> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.context("failed to start transaction")?;

        let parent: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT parent_id FROM category WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("failed to lock category")?;

        let Some(parent_id) = parent else {
            return Ok(None);
        };

        if let Some(target) = migrate_to {
            let target_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM category WHERE id = $1 AND id <> $2)",
            )
            .bind(target)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .context("failed to check migration target")?;

            if !target_exists {
                bail!("migration target category '{target}' is not available");
            }
        }

        let articles = sqlx::query(
            "UPDATE article SET category_id = $1, changed = $2 WHERE category_id = $3",
        )
        .bind(migrate_to)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to migrate articles")?;

        let children =
            sqlx::query("UPDATE category SET parent_id = $1, changed = $2 WHERE parent_id = $3")
                .bind(parent_id)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("failed to re-parent child categories")?;

        sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to delete category")?;

        tx.commit().await.context("failed to commit transaction")?;

        Ok(Some(CategoryRemoval {
            articles_moved: articles.rows_affected(),
            children_reparented: children.rows_affected(),
        }))
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(&format!(
            r#"
            SELECT {ARTICLE_COLUMNS} FROM article
            WHERE ($1::SMALLINT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR category_id = $2)
              AND ($3::UUID IS NULL OR EXISTS (
                  SELECT 1 FROM article_tag at WHERE at.article_id = article.id AND at.tag_id = $3
              ))
            ORDER BY created DESC, id DESC
            "#
        ))
        .bind(filter.status)
        .bind(filter.category_id)
        .bind(filter.tag_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list articles")?;

        Ok(articles)
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM article WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch article")?;

        Ok(article)
    }

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM article WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch article by slug")?;

        Ok(article)
    }

    async fn article_slug_exists(&self, slug: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM article WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await
                .context("failed to check article slug")?;

        Ok(exists)
    }

    async fn insert_article(&self, article: &Article, tag_ids: &[Uuid]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("failed to start transaction")?;

        sqlx::query(
            r#"
            INSERT INTO article (id, title, slug, summary, body, format, status, category_id, created, changed, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.summary)
        .bind(&article.body)
        .bind(&article.format)
        .bind(article.status)
        .bind(article.category_id)
        .bind(article.created)
        .bind(article.changed)
        .bind(article.published_at)
        .execute(&mut *tx)
        .await
        .context("failed to insert article")?;

        sqlx::query(
            "INSERT INTO article_tag (article_id, tag_id) SELECT $1, UNNEST($2::UUID[]) ON CONFLICT DO NOTHING",
        )
        .bind(article.id)
        .bind(dedup_ids(tag_ids))
        .execute(&mut *tx)
        .await
        .context("failed to insert article tags")?;

        tx.commit().await.context("failed to commit transaction")?;

        Ok(())
    }

    async fn update_article(&self, article: &Article, tag_ids: Option<&[Uuid]>) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("failed to start transaction")?;

        let result = sqlx::query(
            r#"
            UPDATE article
            SET title = $1, slug = $2, summary = $3, body = $4, format = $5, status = $6,
                category_id = $7, changed = $8, published_at = $9
            WHERE id = $10
            "#,
        )
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.summary)
        .bind(&article.body)
        .bind(&article.format)
        .bind(article.status)
        .bind(article.category_id)
        .bind(article.changed)
        .bind(article.published_at)
        .bind(article.id)
        .execute(&mut *tx)
        .await
        .context("failed to update article")?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(tag_ids) = tag_ids {
            sqlx::query("DELETE FROM article_tag WHERE article_id = $1")
                .bind(article.id)
                .execute(&mut *tx)
                .await
                .context("failed to clear article tags")?;

            sqlx::query(
                "INSERT INTO article_tag (article_id, tag_id) SELECT $1, UNNEST($2::UUID[]) ON CONFLICT DO NOTHING",
            )
            .bind(article.id)
            .bind(dedup_ids(tag_ids))
            .execute(&mut *tx)
            .await
            .context("failed to insert article tags")?;
        }

        tx.commit().await.context("failed to commit transaction")?;

        Ok(true)
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM article WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete article")?;

        Ok(result.rows_affected() > 0)
    }

    async fn article_tag_ids(&self, article_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT tag_id FROM article_tag WHERE article_id = $1 ORDER BY tag_id",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch article tags")?;

        Ok(ids)
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
