//! Category service with caching.
//!
//! Provides CRUD over the category tree plus deletion with article
//! migration. Categories are cached by id in a DashMap; every write
//! invalidates the affected entries.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use super::tag_service::clean_name;
use crate::error::{AppError, AppResult};
use crate::models::{Category, CreateCategory, UpdateCategory};
use crate::slug::{now_millis, slug_or, with_time_suffix};
use crate::storage::{CategoryRemoval, Storage};

/// Service for managing categories.
pub struct CategoryService {
    storage: Arc<dyn Storage>,
    /// Cache: category id -> category
    cache: DashMap<Uuid, Category>,
}

impl CategoryService {
    /// Create a new CategoryService.
    pub fn new(storage: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            storage,
            cache: DashMap::new(),
        })
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        Ok(self.storage.list_categories().await?)
    }

    /// Find a category by id, with caching.
    pub async fn find(&self, id: Uuid) -> AppResult<Option<Category>> {
        if let Some(category) = self.cache.get(&id) {
            return Ok(Some(category.clone()));
        }

        let category = self.storage.find_category(id).await?;
        if let Some(ref c) = category {
            self.cache.insert(id, c.clone());
        }
        Ok(category)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Category> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::not_found("category", id))
    }

    pub async fn create(&self, input: CreateCategory) -> AppResult<Category> {
        let name = clean_name("category", &input.name)?;
        if let Some(parent_id) = input.parent_id {
            self.require_parent(parent_id).await?;
        }
        let slug = self.unique_slug(&name).await?;
        let now = chrono::Utc::now().timestamp();

        let category = Category {
            id: Uuid::now_v7(),
            name,
            slug,
            description: input.description,
            parent_id: input.parent_id,
            weight: input.weight.unwrap_or(0),
            created: now,
            changed: now,
        };
        self.storage.insert_category(&category).await?;
        self.cache.insert(category.id, category.clone());

        info!(category = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, input: UpdateCategory) -> AppResult<Category> {
        let mut category = self.get(id).await?;

        if let Some(name) = input.name {
            let name = clean_name("category", &name)?;
            if name != category.name {
                let base = slug_or(&name, "category");
                if base != category.slug {
                    category.slug = self.unique_slug(&name).await?;
                }
                category.name = name;
            }
        }
        if input.description.is_some() {
            category.description = input.description;
        }
        if input.detach {
            category.parent_id = None;
        } else if let Some(parent_id) = input.parent_id {
            if parent_id == id {
                return Err(AppError::bad_request("a category cannot be its own parent"));
            }
            self.require_parent(parent_id).await?;
            let lineage = self.breadcrumb(parent_id).await?;
            if lineage.iter().any(|c| c.id == id) {
                return Err(AppError::bad_request(
                    "a category cannot be moved under its own descendant",
                ));
            }
            category.parent_id = Some(parent_id);
        }
        if let Some(weight) = input.weight {
            category.weight = weight;
        }
        category.changed = chrono::Utc::now().timestamp();

        self.cache.remove(&id);
        if !self.storage.update_category(&category).await? {
            return Err(AppError::not_found("category", id));
        }
        self.cache.insert(id, category.clone());
        Ok(category)
    }

    /// Delete a category.
    ///
    /// Articles in the category move to `migrate_to` when given, otherwise
    /// they are left without a category. Child categories move up to the
    /// deleted category's parent.
    pub async fn delete(&self, id: Uuid, migrate_to: Option<Uuid>) -> AppResult<CategoryRemoval> {
        if let Some(target) = migrate_to {
            if target == id {
                return Err(AppError::bad_request(
                    "cannot migrate articles to the category being deleted",
                ));
            }
            if self.find(target).await?.is_none() {
                return Err(AppError::not_found("category", target));
            }
        }

        let removal = self.storage.delete_category(id, migrate_to).await;

        // Children changed parents; drop everything rather than track them
        self.cache.clear();

        let removal = removal?.ok_or_else(|| AppError::not_found("category", id))?;
        info!(
            category = %id,
            migrate_to = ?migrate_to,
            articles_moved = removal.articles_moved,
            children_reparented = removal.children_reparented,
            "category deleted"
        );
        Ok(removal)
    }

    /// Path from the root down to `id`, inclusive.
    pub async fn breadcrumb(&self, id: Uuid) -> AppResult<Vec<Category>> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(cid) = current {
            // Stop on corrupted data instead of looping forever
            if !seen.insert(cid) {
                break;
            }
            let category = self.get(cid).await?;
            current = category.parent_id;
            path.push(category);
        }

        path.reverse();
        Ok(path)
    }

    async fn require_parent(&self, parent_id: Uuid) -> AppResult<()> {
        if self.find(parent_id).await?.is_none() {
            return Err(AppError::bad_request(format!(
                "parent category '{parent_id}' does not exist"
            )));
        }
        Ok(())
    }

    async fn unique_slug(&self, name: &str) -> AppResult<String> {
        let slug = slug_or(name, "category");
        if self.storage.category_slug_exists(&slug).await? {
            return Ok(with_time_suffix(&slug, now_millis()));
        }
        Ok(slug)
    }
}
