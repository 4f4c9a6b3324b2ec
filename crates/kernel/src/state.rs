//! Application state shared across all handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::content::ArticleService;
use crate::plugin::builtin::register_builtins;
use crate::plugin::{PluginHost, PluginService};
use crate::storage::{MemoryStorage, PgStorage, Storage};
use crate::taxonomy::{CategoryService, TagService};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    storage: Arc<dyn Storage>,

    /// Path to plugins directory on disk.
    plugins_dir: PathBuf,

    plugins: Arc<PluginService>,
    tags: Arc<TagService>,
    categories: Arc<CategoryService>,
    articles: Arc<ArticleService>,
}

impl AppState {
    /// Create new application state, connecting to PostgreSQL when configured.
    pub async fn new(config: &Config) -> Result<Self> {
        let storage: Arc<dyn Storage> = if config.database_url.is_some() {
            let pg = PgStorage::connect(config)
                .await
                .context("failed to connect to PostgreSQL")?;
            pg.migrate().await.context("failed to run migrations")?;
            info!("PostgreSQL storage ready");
            Arc::new(pg)
        } else {
            warn!("DATABASE_URL not set, using in-memory storage (data is not persisted)");
            Arc::new(MemoryStorage::new())
        };

        Self::with_storage(storage, config).await
    }

    /// Build state over an existing storage backend.
    ///
    /// Registers the built-in plugin handlers and installs any built-in
    /// plugin missing from the registry.
    pub async fn with_storage(storage: Arc<dyn Storage>, config: &Config) -> Result<Self> {
        let mut host = PluginHost::new();
        register_builtins(&mut host);

        let plugins = PluginService::new(Arc::clone(&storage), host, config);
        let installed = plugins
            .sync_builtins()
            .await
            .context("failed to install built-in plugins")?;
        if !installed.is_empty() {
            info!(plugins = ?installed, "built-in plugins installed");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                plugins_dir: config.plugins_dir.clone(),
                tags: TagService::new(Arc::clone(&storage)),
                categories: CategoryService::new(Arc::clone(&storage)),
                articles: ArticleService::new(Arc::clone(&storage)),
                plugins,
                storage,
            }),
        })
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.inner.plugins_dir
    }

    pub fn plugins(&self) -> &Arc<PluginService> {
        &self.inner.plugins
    }

    pub fn tags(&self) -> &Arc<TagService> {
        &self.inner.tags
    }

    pub fn categories(&self) -> &Arc<CategoryService> {
        &self.inner.categories
    }

    pub fn articles(&self) -> &Arc<ArticleService> {
        &self.inner.articles
    }

    /// Check if the storage backend is reachable.
    pub async fn storage_healthy(&self) -> bool {
        self.inner.storage.is_healthy().await
    }
}
