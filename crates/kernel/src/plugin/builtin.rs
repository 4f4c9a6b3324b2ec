//! Compiled-in plugins shipped with the kernel.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::host::{PluginHandler, PluginHost};
use crate::content::ArticleView;
use crate::models::NewPlugin;

/// Static description of a built-in plugin.
pub struct BuiltinPlugin {
    pub name: &'static str,
    pub version: &'static str,
    pub dependencies: &'static [&'static str],
    default_config: fn() -> Value,
    handler: fn() -> Arc<dyn PluginHandler>,
}

impl BuiltinPlugin {
    pub fn default_config(&self) -> Value {
        (self.default_config)()
    }

    pub fn handler(&self) -> Arc<dyn PluginHandler> {
        (self.handler)()
    }

    /// Registry input for installing this plugin.
    pub fn new_plugin(&self, enabled: bool) -> NewPlugin {
        NewPlugin {
            name: self.name.to_string(),
            version: self.version.to_string(),
            path: format!("builtin:{}", self.name),
            dependencies: self.dependencies.iter().map(|d| d.to_string()).collect(),
            config: Some(self.default_config()),
            enabled: Some(enabled),
        }
    }
}

pub const READING_TIME: &str = "reading_time";
pub const EXCERPT: &str = "excerpt";

const DEFAULT_WORDS_PER_MINUTE: u64 = 200;
const DEFAULT_EXCERPT_LENGTH: u64 = 160;

/// All built-in plugins.
pub const BUILTIN_PLUGINS: &[BuiltinPlugin] = &[
    BuiltinPlugin {
        name: READING_TIME,
        version: "1.0.0",
        dependencies: &[],
        default_config: reading_time_config,
        handler: reading_time_handler,
    },
    BuiltinPlugin {
        name: EXCERPT,
        version: "1.0.0",
        dependencies: &[],
        default_config: excerpt_config,
        handler: excerpt_handler,
    },
];

fn reading_time_config() -> Value {
    json!({ "words_per_minute": DEFAULT_WORDS_PER_MINUTE })
}

fn reading_time_handler() -> Arc<dyn PluginHandler> {
    Arc::new(ReadingTime)
}

fn excerpt_config() -> Value {
    json!({ "length": DEFAULT_EXCERPT_LENGTH })
}

fn excerpt_handler() -> Arc<dyn PluginHandler> {
    Arc::new(Excerpt)
}

/// Register handlers for every built-in plugin.
pub fn register_builtins(host: &mut PluginHost) {
    for builtin in BUILTIN_PLUGINS {
        host.register(builtin.name, builtin.handler());
    }
}

fn config_u64(config: &Value, key: &str, default: u64) -> u64 {
    config
        .get(key)
        .and_then(Value::as_u64)
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Estimated reading time from the article's word count.
pub struct ReadingTime;

#[async_trait]
impl PluginHandler for ReadingTime {
    async fn article_view(&self, article: &ArticleView, config: &Value) -> anyhow::Result<Value> {
        let wpm = config_u64(config, "words_per_minute", DEFAULT_WORDS_PER_MINUTE);
        let words = article.text.split_whitespace().count() as u64;
        let minutes = words.div_ceil(wpm).max(1);
        Ok(json!({ "words": words, "minutes": minutes }))
    }
}

/// Short teaser: the summary if present, otherwise the start of the body.
pub struct Excerpt;

#[async_trait]
impl PluginHandler for Excerpt {
    async fn article_view(&self, article: &ArticleView, config: &Value) -> anyhow::Result<Value> {
        let length = config_u64(config, "length", DEFAULT_EXCERPT_LENGTH) as usize;
        let source = match article.summary.as_deref() {
            Some(summary) if !summary.trim().is_empty() => summary,
            _ => &article.text,
        };
        Ok(json!({ "excerpt": truncate_words(source, length) }))
    }
}

/// Cut `text` to at most `max` characters, at a word boundary when possible.
fn truncate_words(text: &str, max: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let joined = words.join(" ");
    if joined.chars().count() <= max {
        return joined;
    }

    let cut: String = joined.chars().take(max).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) if pos > 0 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{trimmed}…")
}
