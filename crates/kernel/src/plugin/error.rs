//! Plugin manifest errors with clear, actionable messages.

use thiserror::Error;

use crate::error::AppError;

/// Errors raised while reading or validating a plugin manifest.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Install path has no manifest file.
    #[error("no plugin.toml manifest found at {path}")]
    MissingManifest { path: String },

    /// The manifest could not be read or parsed. `details` is logged only.
    #[error("plugin manifest at {path} is invalid")]
    InvalidManifest { path: String, details: String },

    /// Requested install path is not a plugin directory under the plugins directory.
    #[error("install path '{path}' is not a plugin directory inside the plugins directory")]
    OutsidePluginsDir { path: String },

    /// Plugin or dependency name is not a machine name.
    #[error(
        "'{name}' is not a valid plugin name: use lowercase letters, digits and underscores, starting with a letter (max 64)"
    )]
    InvalidName { name: String },

    /// Plugin lists itself as a dependency.
    #[error("plugin '{plugin}': cannot depend on itself")]
    SelfDependency { plugin: String },

    /// Plugin config must be a JSON object.
    #[error("plugin '{plugin}': config must be an object")]
    InvalidConfig { plugin: String },
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_name_explains_the_rule() {
        let msg = PluginError::InvalidName {
            name: "Reading-Time".to_string(),
        }
        .to_string();
        assert!(msg.contains("Reading-Time"));
        assert!(msg.contains("lowercase"));
    }

    #[test]
    fn converts_to_bad_request() {
        let err: AppError = PluginError::SelfDependency {
            plugin: "seo".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
