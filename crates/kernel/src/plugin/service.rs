//! Plugin registry service.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::builtin::BUILTIN_PLUGINS;
use super::dependency::{find_dependency_cycles, missing_dependencies, resolve_load_order};
use super::error::PluginError;
use super::executor::{PluginOutcome, execute_plugin};
use super::gate::should_auto_enable;
use super::host::{HookResult, PluginHost};
use super::manifest::{PluginManifest, validate_names};
use crate::config::Config;
use crate::content::ArticleView;
use crate::error::{AppError, AppResult};
use crate::models::{NewPlugin, Plugin};
use crate::storage::Storage;

/// Resolved load order of the enabled plugins, with diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOrder {
    /// Enabled plugins, dependencies first.
    pub plugins: Vec<Plugin>,
    /// Dependency cycles among the enabled plugins.
    pub cycles: Vec<Vec<String>>,
    /// Declared dependencies that are not enabled, keyed by plugin name.
    pub missing: BTreeMap<String, Vec<String>>,
}

impl LoadOrder {
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Service for installing, toggling and ordering plugins.
pub struct PluginService {
    storage: Arc<dyn Storage>,
    host: PluginHost,
    disabled_plugins: Vec<String>,
    strict_dependencies: bool,
}

impl PluginService {
    /// Create a new PluginService.
    pub fn new(storage: Arc<dyn Storage>, host: PluginHost, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            storage,
            host,
            disabled_plugins: config.disabled_plugins.clone(),
            strict_dependencies: config.strict_plugin_dependencies,
        })
    }

    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    /// All installed plugins in installation order.
    pub async fn list(&self) -> AppResult<Vec<Plugin>> {
        Ok(self.storage.list_plugins().await?)
    }

    pub async fn get(&self, name: &str) -> AppResult<Plugin> {
        self.storage
            .find_plugin(name)
            .await?
            .ok_or_else(|| AppError::not_found("plugin", name))
    }

    /// Register a plugin.
    pub async fn install(&self, input: NewPlugin) -> AppResult<Plugin> {
        validate_names(&input.name, &input.dependencies)?;
        if let Some(ref config) = input.config
            && !config.is_object()
        {
            return Err(PluginError::InvalidConfig { plugin: input.name }.into());
        }
        if input.version.trim().is_empty() {
            return Err(AppError::bad_request("plugin version is required"));
        }
        if self.storage.find_plugin(&input.name).await?.is_some() {
            return Err(AppError::conflict(format!(
                "plugin '{}' is already installed",
                input.name
            )));
        }

        let plugin = Plugin::from_new(input, chrono::Utc::now().timestamp());
        self.storage.insert_plugin(&plugin).await?;

        info!(
            plugin = %plugin.name,
            version = %plugin.version,
            enabled = plugin.enabled,
            "plugin installed"
        );
        Ok(plugin)
    }

    /// Install the plugin described by the `plugin.toml` at `path`.
    pub async fn install_from_path(&self, path: &Path) -> AppResult<Plugin> {
        let manifest = PluginManifest::load(path)?;
        let enabled = should_auto_enable(
            manifest.default_enabled,
            &self.disabled_plugins,
            &manifest.name,
        );
        let mut input = manifest.into_new_plugin(path);
        input.enabled = Some(enabled);
        self.install(input).await
    }

    pub async fn uninstall(&self, name: &str) -> AppResult<()> {
        if !self.storage.delete_plugin(name).await? {
            return Err(AppError::not_found("plugin", name));
        }
        info!(plugin = %name, "plugin uninstalled");
        Ok(())
    }

    pub async fn enable(&self, name: &str) -> AppResult<Plugin> {
        self.set_enabled(name, true).await
    }

    pub async fn disable(&self, name: &str) -> AppResult<Plugin> {
        self.set_enabled(name, false).await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> AppResult<Plugin> {
        let mut plugin = self.get(name).await?;
        if plugin.enabled == enabled {
            return Ok(plugin);
        }

        plugin.enabled = enabled;
        plugin.changed = chrono::Utc::now().timestamp();
        self.save(&plugin).await?;

        info!(plugin = %name, enabled, "plugin status changed");
        Ok(plugin)
    }

    /// Replace a plugin's config object.
    pub async fn update_config(&self, name: &str, config: Value) -> AppResult<Plugin> {
        if !config.is_object() {
            return Err(PluginError::InvalidConfig {
                plugin: name.to_string(),
            }
            .into());
        }

        let mut plugin = self.get(name).await?;
        plugin.config = config;
        plugin.changed = chrono::Utc::now().timestamp();
        self.save(&plugin).await?;

        debug!(plugin = %name, "plugin config updated");
        Ok(plugin)
    }

    async fn save(&self, plugin: &Plugin) -> AppResult<()> {
        if !self.storage.update_plugin(plugin).await? {
            return Err(AppError::not_found("plugin", &plugin.name));
        }
        Ok(())
    }

    /// Compute the load order of the enabled plugins.
    ///
    /// Cycles are logged, or rejected with a conflict when strict dependency
    /// checking is configured.
    pub async fn load_order(&self) -> AppResult<LoadOrder> {
        let order = self.resolve().await?;
        if self.strict_dependencies
            && let Some(cycle) = order.cycles.first()
        {
            return Err(AppError::conflict(format!(
                "plugin dependency cycle: {}",
                describe_cycle(cycle)
            )));
        }
        Ok(order)
    }

    async fn resolve(&self) -> AppResult<LoadOrder> {
        let enabled = self.storage.list_enabled_plugins().await?;

        let cycles = find_dependency_cycles(&enabled);
        for cycle in &cycles {
            warn!(cycle = %describe_cycle(cycle), "plugin dependency cycle");
        }

        let missing: BTreeMap<String, Vec<String>> = enabled
            .iter()
            .filter_map(|p| {
                let absent = missing_dependencies(p, &enabled);
                (!absent.is_empty()).then(|| {
                    (
                        p.name.clone(),
                        absent.into_iter().map(str::to_string).collect(),
                    )
                })
            })
            .collect();

        let plugins = resolve_load_order(&enabled).into_iter().cloned().collect();
        Ok(LoadOrder {
            plugins,
            cycles,
            missing,
        })
    }

    /// Run the `article_view` hook of every enabled plugin in load order.
    ///
    /// Always tolerant of cycles: strictness guards configuration changes,
    /// not page rendering.
    pub async fn dispatch_article_view(&self, article: ArticleView) -> AppResult<Vec<HookResult>> {
        let order = self.resolve().await?;
        Ok(self
            .host
            .dispatch_article_view(&order.plugins, Arc::new(article))
            .await)
    }

    /// Run the `article_view` hook of a single plugin, enabled or not.
    pub async fn execute(&self, name: &str, article: ArticleView) -> AppResult<PluginOutcome<Value>> {
        let plugin = self.get(name).await?;
        let Some(handler) = self.host.handler(name) else {
            return Err(AppError::bad_request(format!(
                "plugin '{name}' has no compiled-in handler"
            )));
        };

        let config = plugin.config;
        Ok(execute_plugin(name, async move { handler.article_view(&article, &config).await }).await)
    }

    /// Install built-in plugins that are not yet registered.
    ///
    /// Built-ins named in `DISABLED_PLUGINS` are installed disabled. Existing
    /// installs are left untouched. Returns the names that were installed.
    pub async fn sync_builtins(&self) -> AppResult<Vec<String>> {
        let mut installed = Vec::new();
        for builtin in BUILTIN_PLUGINS {
            if self.storage.find_plugin(builtin.name).await?.is_some() {
                continue;
            }
            let enabled = should_auto_enable(true, &self.disabled_plugins, builtin.name);
            self.install(builtin.new_plugin(enabled)).await?;
            installed.push(builtin.name.to_string());
        }
        Ok(installed)
    }
}

fn describe_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {first}", cycle.join(" -> ")),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_description_closes_the_loop() {
        assert_eq!(
            describe_cycle(&["a".to_string(), "b".to_string()]),
            "a -> b -> a"
        );
        assert_eq!(describe_cycle(&["solo".to_string()]), "solo -> solo");
    }
}
