//! Plugin registry record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An installed plugin.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plugin {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Machine name, unique across the registry.
    pub name: String,

    /// Semantic version (e.g., "1.0.0").
    pub version: String,

    /// Install path on disk (or `builtin:<name>` for compiled-in plugins).
    pub path: String,

    /// Whether the plugin participates in hook dispatch.
    pub enabled: bool,

    /// Free-form configuration object.
    pub config: serde_json::Value,

    /// Names of plugins that should load before this one.
    pub dependencies: Vec<String>,

    /// Unix timestamp when installed.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Input for installing a plugin.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlugin {
    pub name: String,
    pub version: String,
    pub path: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub config: Option<serde_json::Value>,
    pub enabled: Option<bool>,
}

impl Plugin {
    /// Build a registry record from install input.
    pub fn from_new(input: NewPlugin, now: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            version: input.version,
            path: input.path,
            enabled: input.enabled.unwrap_or(true),
            config: input
                .config
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            dependencies: input.dependencies,
            created: now,
            changed: now,
        }
    }
}
