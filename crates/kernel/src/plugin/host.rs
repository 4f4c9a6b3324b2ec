//! Hook dispatch to compiled-in plugin handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::executor::{PluginOutcome, execute_plugin};
use crate::content::ArticleView;
use crate::models::Plugin;

/// Hooks a plugin may implement.
#[async_trait]
pub trait PluginHandler: Send + Sync {
    /// Extend a rendered article. `config` is the plugin's stored config object.
    async fn article_view(&self, article: &ArticleView, config: &Value) -> anyhow::Result<Value>;
}

/// One plugin's contribution to a hook invocation.
#[derive(Debug, Clone, Serialize)]
pub struct HookResult {
    pub plugin: String,
    #[serde(flatten)]
    pub outcome: PluginOutcome<Value>,
}

/// Registry of plugin handlers keyed by plugin name.
#[derive(Default, Clone)]
pub struct PluginHost {
    handlers: HashMap<String, Arc<dyn PluginHandler>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn PluginHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn PluginHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke `article_view` on each plugin in the given order.
    ///
    /// `plugins` is expected to be the enabled set in load order. Each
    /// invocation is isolated: a failing plugin is reported in its own
    /// [`HookResult`] and the rest still run.
    pub async fn dispatch_article_view(
        &self,
        plugins: &[Plugin],
        article: Arc<ArticleView>,
    ) -> Vec<HookResult> {
        let mut results = Vec::new();
        for plugin in plugins {
            let Some(handler) = self.handlers.get(&plugin.name) else {
                debug!(plugin = %plugin.name, "no article_view handler");
                continue;
            };

            let handler = Arc::clone(handler);
            let article = Arc::clone(&article);
            let config = plugin.config.clone();
            let outcome = execute_plugin(&plugin.name, async move {
                handler.article_view(&article, &config).await
            })
            .await;

            results.push(HookResult {
                plugin: plugin.name.clone(),
                outcome,
            });
        }
        results
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::bail;
    use serde_json::json;
    use uuid::Uuid;

    struct Echo;

    #[async_trait]
    impl PluginHandler for Echo {
        async fn article_view(&self, article: &ArticleView, config: &Value) -> anyhow::Result<Value> {
            Ok(json!({ "title": article.title, "config": config }))
        }
    }

    struct Broken;

    #[async_trait]
    impl PluginHandler for Broken {
        async fn article_view(&self, _: &ArticleView, _: &Value) -> anyhow::Result<Value> {
            bail!("boom")
        }
    }

    fn article() -> Arc<ArticleView> {
        Arc::new(ArticleView {
            id: Uuid::nil(),
            title: "Hello".into(),
            slug: "hello".into(),
            summary: None,
            category_id: None,
            tag_ids: Vec::new(),
            published_at: Some(0),
            html: "<p>Hello</p>".into(),
            text: "Hello".into(),
        })
    }

    fn plugin(name: &str) -> Plugin {
        Plugin::from_new(
            crate::models::NewPlugin {
                name: name.into(),
                version: "1.0.0".into(),
                path: format!("builtin:{name}"),
                dependencies: Vec::new(),
                config: Some(json!({ "n": 1 })),
                enabled: Some(true),
            },
            0,
        )
    }

    #[tokio::test]
    async fn dispatch_isolates_failures() {
        let mut host = PluginHost::new();
        host.register("broken", Arc::new(Broken));
        host.register("echo", Arc::new(Echo));

        let plugins = vec![plugin("broken"), plugin("echo")];
        let results = host.dispatch_article_view(&plugins, article()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].plugin, "broken");
        assert_eq!(results[0].outcome, PluginOutcome::Failure("boom".into()));
        assert_eq!(
            results[1].outcome,
            PluginOutcome::Success(json!({ "title": "Hello", "config": { "n": 1 } }))
        );
    }

    #[tokio::test]
    async fn plugins_without_handler_are_skipped() {
        let mut host = PluginHost::new();
        host.register("echo", Arc::new(Echo));

        let plugins = vec![plugin("unknown"), plugin("echo")];
        let results = host.dispatch_article_view(&plugins, article()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].plugin, "echo");
    }

    #[test]
    fn hook_result_serializes_flat() {
        let result = HookResult {
            plugin: "echo".into(),
            outcome: PluginOutcome::Failure("boom".into()),
        };
        assert_eq!(
            serde_json::to_value(result).unwrap(),
            json!({ "plugin": "echo", "success": false, "error": "boom" })
        );
    }
}
