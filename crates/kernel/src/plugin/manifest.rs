//! Parser for plugin `plugin.toml` manifest files.
//!
//! Each installable plugin directory carries a `plugin.toml`:
//!
//! ```toml
//! name = "seo_meta"
//! version = "1.2.0"
//! description = "Meta tags for articles"
//! dependencies = ["excerpt"]
//!
//! [config]
//! site_name = "My blog"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use super::error::PluginError;
use crate::models::NewPlugin;

/// Manifest file name inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Plugin metadata parsed from `plugin.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    /// Machine name.
    pub name: String,

    /// Semantic version (e.g., "1.0.0").
    pub version: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Other plugins this one should load after.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Whether to enable the plugin on install (default: true).
    #[serde(default = "default_true")]
    pub default_enabled: bool,

    /// Initial configuration.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// Check that a name is a valid machine name (`[a-z][a-z0-9_]*`, max 64).
pub fn is_valid_machine_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && name.len() <= 64
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Validate a plugin name and its dependency list.
pub fn validate_names(name: &str, dependencies: &[String]) -> Result<(), PluginError> {
    if !is_valid_machine_name(name) {
        return Err(PluginError::InvalidName {
            name: name.to_string(),
        });
    }
    for dep in dependencies {
        if !is_valid_machine_name(dep) {
            return Err(PluginError::InvalidName { name: dep.clone() });
        }
        if dep == name {
            return Err(PluginError::SelfDependency {
                plugin: name.to_string(),
            });
        }
    }
    Ok(())
}

impl PluginManifest {
    /// Resolve the manifest file for an install path (a directory or the file itself).
    pub fn manifest_path(install_path: &Path) -> PathBuf {
        if install_path.is_dir() {
            install_path.join(MANIFEST_FILE)
        } else {
            install_path.to_path_buf()
        }
    }

    /// Read and validate the manifest for an install path.
    pub fn load(install_path: &Path) -> Result<Self, PluginError> {
        let path = Self::manifest_path(install_path);
        if !path.is_file() {
            return Err(PluginError::MissingManifest {
                path: path.display().to_string(),
            });
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| invalid_manifest(&path, e.to_string()))?;

        Self::parse_str(&content, &path)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self, PluginError> {
        let manifest: PluginManifest =
            toml::from_str(content).map_err(|e| invalid_manifest(path, e.to_string()))?;

        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<(), PluginError> {
        validate_names(&self.name, &self.dependencies)?;
        if self.version.trim().is_empty() {
            return Err(invalid_manifest(path, "version must not be empty".to_string()));
        }
        Ok(())
    }

    /// Convert into install input for the registry.
    pub fn into_new_plugin(self, install_path: &Path) -> NewPlugin {
        NewPlugin {
            name: self.name,
            version: self.version,
            path: install_path.display().to_string(),
            dependencies: self.dependencies,
            config: Some(serde_json::Value::Object(self.config.into_iter().collect())),
            enabled: Some(self.default_enabled),
        }
    }
}

/// Build an `InvalidManifest` error, logging the details.
///
/// Parser messages quote the offending source line, so they go to the log
/// and never into the error text.
fn invalid_manifest(path: &Path, details: String) -> PluginError {
    warn!(path = %path.display(), details = %details, "invalid plugin manifest");
    PluginError::InvalidManifest {
        path: path.display().to_string(),
        details,
    }
}

/// Resolve a requested install path to a plugin directory under `plugins_dir`.
///
/// Relative paths are taken from `plugins_dir`. The canonical result must be
/// a directory strictly below the canonical plugins directory; anything else,
/// including a path that does not exist, is rejected with the same error.
pub fn resolve_install_dir(plugins_dir: &Path, requested: &Path) -> Result<PathBuf, PluginError> {
    let outside = || PluginError::OutsidePluginsDir {
        path: requested.display().to_string(),
    };

    let root = plugins_dir.canonicalize().map_err(|_| outside())?;
    let dir = root.join(requested).canonicalize().map_err(|_| outside())?;
    if dir == root || !dir.starts_with(&root) || !dir.is_dir() {
        return Err(outside());
    }
    Ok(dir)
}

/// Discover all plugin manifests in subdirectories of `plugins_dir`.
///
/// Directories with a broken manifest are logged and skipped.
pub fn discover_manifests(plugins_dir: &Path) -> Vec<(PluginManifest, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(plugins_dir) else {
        return Vec::new();
    };

    let mut found: Vec<(PluginManifest, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.join(MANIFEST_FILE).is_file())
        .filter_map(|dir| match PluginManifest::load(&dir) {
            Ok(manifest) => Some((manifest, dir)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping plugin with invalid manifest");
                None
            }
        })
        .collect();

    found.sort_by(|a, b| a.0.name.cmp(&b.0.name));
    found
}
