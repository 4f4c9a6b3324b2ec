//! Article service: CRUD, validation and rendering.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::filter::{FORMAT_MARKDOWN, FilterPipeline, KNOWN_FORMATS, plain_text};
use crate::error::{AppError, AppResult};
use crate::models::{
    Article, ArticleDetail, ArticleFilter, CreateArticle, STATUS_DRAFT, STATUS_PUBLISHED,
    UpdateArticle,
};
use crate::slug::{now_millis, slug_or, with_time_suffix};
use crate::storage::Storage;

/// Longest accepted title.
const MAX_TITLE_LEN: usize = 255;

/// A published article prepared for display.
///
/// This is also the payload handed to plugins on the `article_view` hook.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub published_at: Option<i64>,
    /// Sanitized HTML body.
    pub html: String,
    /// Body reduced to plain words.
    pub text: String,
}

/// Service for managing articles.
pub struct ArticleService {
    storage: Arc<dyn Storage>,
}

impl ArticleService {
    /// Create a new ArticleService.
    pub fn new(storage: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self { storage })
    }

    pub async fn list(&self, filter: &ArticleFilter) -> AppResult<Vec<Article>> {
        Ok(self.storage.list_articles(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ArticleDetail> {
        let article = self
            .storage
            .find_article(id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))?;
        let tag_ids = self.storage.article_tag_ids(id).await?;
        Ok(ArticleDetail { article, tag_ids })
    }

    pub async fn create(&self, input: CreateArticle) -> AppResult<ArticleDetail> {
        let title = clean_title(&input.title)?;
        let format = validate_format(input.format.as_deref().unwrap_or(FORMAT_MARKDOWN))?;
        let status = validate_status(input.status.unwrap_or(STATUS_DRAFT))?;
        if let Some(category_id) = input.category_id {
            self.require_category(category_id).await?;
        }
        let tag_ids = input.tag_ids.unwrap_or_default();
        self.require_tags(&tag_ids).await?;

        let now = chrono::Utc::now().timestamp();
        let slug = self.unique_slug(&title).await?;
        let article = Article {
            id: Uuid::now_v7(),
            title,
            slug,
            summary: input.summary,
            body: input.body,
            format,
            status,
            category_id: input.category_id,
            created: now,
            changed: now,
            published_at: (status == STATUS_PUBLISHED).then_some(now),
        };
        self.storage.insert_article(&article, &tag_ids).await?;

        info!(article = %article.id, slug = %article.slug, status, "article created");
        self.get(article.id).await
    }

    pub async fn update(&self, id: Uuid, input: UpdateArticle) -> AppResult<ArticleDetail> {
        let mut article = self
            .storage
            .find_article(id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))?;

        if let Some(title) = input.title {
            let title = clean_title(&title)?;
            if title != article.title {
                if slug_or(&title, "article") != article.slug {
                    article.slug = self.unique_slug(&title).await?;
                }
                article.title = title;
            }
        }
        if input.summary.is_some() {
            article.summary = input.summary;
        }
        if let Some(body) = input.body {
            article.body = body;
        }
        if let Some(format) = input.format {
            article.format = validate_format(&format)?;
        }
        if let Some(status) = input.status {
            article.status = validate_status(status)?;
        }
        if input.clear_category {
            article.category_id = None;
        } else if let Some(category_id) = input.category_id {
            self.require_category(category_id).await?;
            article.category_id = Some(category_id);
        }
        if let Some(ref tag_ids) = input.tag_ids {
            self.require_tags(tag_ids).await?;
        }

        let now = chrono::Utc::now().timestamp();
        article.changed = now;
        if article.is_published() && article.published_at.is_none() {
            article.published_at = Some(now);
        }

        if !self
            .storage
            .update_article(&article, input.tag_ids.as_deref())
            .await?
        {
            return Err(AppError::not_found("article", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.storage.delete_article(id).await? {
            return Err(AppError::not_found("article", id));
        }
        info!(article = %id, "article deleted");
        Ok(())
    }

    /// Render a published article by slug. Drafts are not visible.
    pub async fn view(&self, slug: &str) -> AppResult<ArticleView> {
        let article = self
            .storage
            .find_article_by_slug(slug)
            .await?
            .filter(Article::is_published)
            .ok_or_else(|| AppError::not_found("article", slug))?;
        let tag_ids = self.storage.article_tag_ids(article.id).await?;

        let pipeline = FilterPipeline::for_format(&article.format);
        debug!(article = %article.id, filters = ?pipeline.filter_names(), "rendering article");

        Ok(ArticleView {
            html: pipeline.process(&article.body),
            text: plain_text(&article.body, &article.format),
            id: article.id,
            title: article.title,
            slug: article.slug,
            summary: article.summary,
            category_id: article.category_id,
            tag_ids,
            published_at: article.published_at,
        })
    }

    async fn require_category(&self, id: Uuid) -> AppResult<()> {
        if self.storage.find_category(id).await?.is_none() {
            return Err(AppError::bad_request(format!(
                "category '{id}' does not exist"
            )));
        }
        Ok(())
    }

    async fn require_tags(&self, ids: &[Uuid]) -> AppResult<()> {
        for id in ids {
            if self.storage.find_tag(*id).await?.is_none() {
                return Err(AppError::bad_request(format!("tag '{id}' does not exist")));
            }
        }
        Ok(())
    }

    async fn unique_slug(&self, title: &str) -> AppResult<String> {
        let slug = slug_or(title, "article");
        if self.storage.article_slug_exists(&slug).await? {
            return Ok(with_time_suffix(&slug, now_millis()));
        }
        Ok(slug)
    }
}

fn clean_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("article title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request(format!(
            "article title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_format(format: &str) -> AppResult<String> {
    if KNOWN_FORMATS.contains(&format) {
        Ok(format.to_string())
    } else {
        Err(AppError::bad_request(format!(
            "unknown text format '{format}', expected one of: {}",
            KNOWN_FORMATS.join(", ")
        )))
    }
}

fn validate_status(status: i16) -> AppResult<i16> {
    match status {
        STATUS_DRAFT | STATUS_PUBLISHED => Ok(status),
        other => Err(AppError::bad_request(format!(
            "invalid status {other}, expected 0 (draft) or 1 (published)"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn format_validation() {
        assert_eq!(validate_format("markdown").unwrap(), "markdown");
        assert_eq!(validate_format("plain_text").unwrap(), "plain_text");
        let err = validate_format("full_html").unwrap_err();
        assert!(err.to_string().contains("markdown, plain_text"));
    }

    #[test]
    fn status_validation() {
        assert!(validate_status(0).is_ok());
        assert!(validate_status(1).is_ok());
        assert!(validate_status(2).is_err());
    }

    #[test]
    fn title_is_trimmed() {
        assert_eq!(clean_title("  Hello ").unwrap(), "Hello");
        assert!(clean_title("").is_err());
    }
}
