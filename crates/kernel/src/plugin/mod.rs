//! Plugin system for Quill.
//!
//! This module handles:
//! - Parsing plugin metadata from `plugin.toml` manifests
//! - Resolving plugin load order from declared dependencies
//! - Running plugin hooks with error isolation
//! - The plugin registry and the compiled-in plugins

pub mod builtin;
pub mod cli;
mod dependency;
mod error;
mod executor;
mod gate;
mod host;
mod manifest;
mod service;

pub use dependency::{
    Dependent, find_dependency_cycles, missing_dependencies, resolve_load_order,
};
pub use error::PluginError;
pub use executor::{PluginOutcome, execute_plugin};
pub use gate::should_auto_enable;
pub use host::{HookResult, PluginHandler, PluginHost};
pub use manifest::{
    MANIFEST_FILE, PluginManifest, discover_manifests, is_valid_machine_name,
    resolve_install_dir,
};
pub use service::{LoadOrder, PluginService};
