//! Tag service: CRUD and merge.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CreateTag, Tag, TagWithArticles, UpdateTag};
use crate::slug::{now_millis, slug_or, with_time_suffix};
use crate::storage::Storage;

/// Longest accepted display name.
pub(crate) const MAX_NAME_LEN: usize = 255;

/// Validate and normalize a display name.
pub(crate) fn clean_name(kind: &str, name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request(format!("{kind} name is required")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::bad_request(format!(
            "{kind} name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Service for managing tags.
pub struct TagService {
    storage: Arc<dyn Storage>,
}

impl TagService {
    /// Create a new TagService.
    pub fn new(storage: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self { storage })
    }

    pub async fn list(&self) -> AppResult<Vec<Tag>> {
        Ok(self.storage.list_tags().await?)
    }

    /// Get a tag with the articles it is attached to.
    pub async fn get(&self, id: Uuid) -> AppResult<TagWithArticles> {
        let tag = self
            .storage
            .find_tag(id)
            .await?
            .ok_or_else(|| AppError::not_found("tag", id))?;
        let article_ids = self.storage.tag_article_ids(id).await?;

        Ok(TagWithArticles { tag, article_ids })
    }

    pub async fn create(&self, input: CreateTag) -> AppResult<Tag> {
        let name = clean_name("tag", &input.name)?;
        let slug = self.unique_slug(&name).await?;
        let now = chrono::Utc::now().timestamp();

        let tag = Tag {
            id: Uuid::now_v7(),
            name,
            slug,
            description: input.description,
            created: now,
            changed: now,
        };
        self.storage.insert_tag(&tag).await?;

        info!(tag = %tag.id, slug = %tag.slug, "tag created");
        Ok(tag)
    }

    /// Update a tag. The slug follows the name.
    pub async fn update(&self, id: Uuid, input: UpdateTag) -> AppResult<Tag> {
        let mut tag = self
            .storage
            .find_tag(id)
            .await?
            .ok_or_else(|| AppError::not_found("tag", id))?;

        if let Some(name) = input.name {
            let name = clean_name("tag", &name)?;
            if name != tag.name {
                let base = slug_or(&name, "tag");
                if base != tag.slug {
                    tag.slug = self.unique_slug(&name).await?;
                }
                tag.name = name;
            }
        }
        if input.description.is_some() {
            tag.description = input.description;
        }
        tag.changed = chrono::Utc::now().timestamp();

        if !self.storage.update_tag(&tag).await? {
            return Err(AppError::not_found("tag", id));
        }
        Ok(tag)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.storage.delete_tag(id).await? {
            return Err(AppError::not_found("tag", id));
        }
        info!(tag = %id, "tag deleted");
        Ok(())
    }

    /// Merge `source` into `target`.
    ///
    /// Every article tagged with the source ends up tagged with the target
    /// (exactly once), then the source is deleted. Returns the target with
    /// its updated article set.
    pub async fn merge(&self, source: Uuid, target: Uuid) -> AppResult<TagWithArticles> {
        if source == target {
            return Err(AppError::bad_request("cannot merge a tag into itself"));
        }

        let Some(reassigned) = self.storage.merge_tags(source, target).await? else {
            let missing = if self.storage.find_tag(source).await?.is_none() {
                source
            } else {
                target
            };
            return Err(AppError::not_found("tag", missing));
        };

        info!(%source, %target, reassigned, "tags merged");
        self.get(target).await
    }

    async fn unique_slug(&self, name: &str) -> AppResult<String> {
        let slug = slug_or(name, "tag");
        if self.storage.tag_slug_exists(&slug).await? {
            return Ok(with_time_suffix(&slug, now_millis()));
        }
        Ok(slug)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn clean_name_trims() {
        assert_eq!(clean_name("tag", "  Rust ").unwrap(), "Rust");
    }

    #[test]
    fn clean_name_rejects_blank() {
        let err = clean_name("tag", "   ").unwrap_err();
        assert!(err.to_string().contains("tag name is required"));
    }

    #[test]
    fn clean_name_rejects_long() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(clean_name("category", &long).is_err());
    }
}
