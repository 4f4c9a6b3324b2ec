//! Quill test utilities.
//!
//! Fixture builders for plugins, tags, categories and articles, and
//! assertion helpers for JSON responses. Builders produce the JSON bodies
//! the kernel API accepts, so the same fixture drives both service-level
//! tests (via `serde_json::from_value`) and HTTP tests.

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Create a test plugin with default values.
pub fn test_plugin(name: &str) -> TestPlugin {
    TestPlugin {
        name: name.to_string(),
        version: "1.0.0".to_string(),
        path: format!("/srv/plugins/{name}"),
        dependencies: Vec::new(),
        config: json!({}),
        enabled: true,
    }
}

/// A plugin install request builder.
#[derive(Debug, Clone)]
pub struct TestPlugin {
    pub name: String,
    pub version: String,
    pub path: String,
    pub dependencies: Vec<String>,
    pub config: JsonValue,
    pub enabled: bool,
}

impl TestPlugin {
    /// Declare dependencies by name.
    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the config object.
    pub fn with_config(mut self, config: JsonValue) -> Self {
        self.config = config;
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Install disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "name": self.name,
            "version": self.version,
            "path": self.path,
            "dependencies": self.dependencies,
            "config": self.config,
            "enabled": self.enabled,
        })
    }
}

/// Create a test tag.
pub fn test_tag(name: &str) -> TestTag {
    TestTag {
        name: name.to_string(),
        description: None,
    }
}

/// A tag create request builder.
#[derive(Debug, Clone)]
pub struct TestTag {
    pub name: String,
    pub description: Option<String>,
}

impl TestTag {
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn to_json(&self) -> JsonValue {
        json!({ "name": self.name, "description": self.description })
    }
}

/// Create a top-level test category.
pub fn test_category(name: &str) -> TestCategory {
    TestCategory {
        name: name.to_string(),
        description: None,
        parent_id: None,
        weight: 0,
    }
}

/// A category create request builder.
#[derive(Debug, Clone)]
pub struct TestCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub weight: i16,
}

impl TestCategory {
    /// Place under a parent category.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_weight(mut self, weight: i16) -> Self {
        self.weight = weight;
        self
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "name": self.name,
            "description": self.description,
            "parent_id": self.parent_id,
            "weight": self.weight,
        })
    }
}

/// Create a draft markdown test article.
pub fn test_article(title: &str) -> TestArticle {
    TestArticle {
        title: title.to_string(),
        summary: None,
        body: format!("# {title}\n\nSome body text."),
        format: "markdown".to_string(),
        status: 0,
        category_id: None,
        tag_ids: Vec::new(),
    }
}

/// An article create request builder.
#[derive(Debug, Clone)]
pub struct TestArticle {
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
    pub format: String,
    pub status: i16,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
}

impl TestArticle {
    /// Set as published.
    pub fn published(mut self) -> Self {
        self.status = 1;
        self
    }

    /// Set as draft.
    pub fn unpublished(mut self) -> Self {
        self.status = 0;
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    /// Use the plain text format.
    pub fn plain_text(mut self) -> Self {
        self.format = "plain_text".to_string();
        self
    }

    pub fn in_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tags(mut self, tag_ids: &[Uuid]) -> Self {
        self.tag_ids = tag_ids.to_vec();
        self
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "title": self.title,
            "summary": self.summary,
            "body": self.body,
            "format": self.format,
            "status": self.status,
            "category_id": self.category_id,
            "tag_ids": self.tag_ids,
        })
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that a JSON array of objects carries exactly the given ids, in any order.
    pub fn same_ids(actual: &Value, expected: &[uuid::Uuid]) {
        let mut actual: Vec<String> = actual
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let mut expected: Vec<String> = expected.iter().map(|id| id.to_string()).collect();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected, "id sets differ");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_builder() {
        let plugin = test_plugin("seo")
            .with_dependencies(&["excerpt"])
            .with_config(json!({ "site": "x" }))
            .disabled();
        let body = plugin.to_json();
        assert_eq!(body["dependencies"], json!(["excerpt"]));
        assert_eq!(body["enabled"], false);
        assert_eq!(body["path"], "/srv/plugins/seo");
    }

    #[test]
    fn article_builder() {
        let category = Uuid::now_v7();
        let body = test_article("Hello")
            .published()
            .in_category(category)
            .to_json();
        assert_eq!(body["status"], 1);
        assert_eq!(body["category_id"], category.to_string());
        assert_eq!(body["format"], "markdown");
    }

    #[test]
    fn same_ids_ignores_order() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert::same_ids(&json!([b.to_string(), a.to_string()]), &[a, b]);
    }
}
