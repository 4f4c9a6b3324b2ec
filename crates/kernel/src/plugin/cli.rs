//! CLI command implementations for plugin management.
//!
//! These commands run against the configured storage without starting the
//! HTTP server.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;

use super::manifest::discover_manifests;
use super::service::PluginService;

/// List installed plugins, plus manifests on disk that are not installed.
pub async fn cmd_plugin_list(service: &PluginService, plugins_dir: &Path) -> Result<()> {
    let installed = service.list().await?;
    let discovered = discover_manifests(plugins_dir);

    if installed.is_empty() && discovered.is_empty() {
        println!("No plugins found.");
        return Ok(());
    }

    println!(
        "{:<20} {:<12} {:<14} {:<8} DEPENDENCIES",
        "PLUGIN", "VERSION", "STATUS", "HOOKS"
    );
    println!("{}", "-".repeat(72));

    for plugin in &installed {
        let status = if plugin.enabled { "enabled" } else { "disabled" };
        let hooks = if service.host().has_handler(&plugin.name) {
            "yes"
        } else {
            "no"
        };
        println!(
            "{:<20} {:<12} {:<14} {:<8} {}",
            plugin.name,
            plugin.version,
            status,
            hooks,
            plugin.dependencies.join(", ")
        );
    }

    let names: HashSet<&str> = installed.iter().map(|p| p.name.as_str()).collect();
    for (manifest, dir) in &discovered {
        if !names.contains(manifest.name.as_str()) {
            println!(
                "{:<20} {:<12} {:<14} {:<8} {} ({})",
                manifest.name,
                manifest.version,
                "not installed",
                "-",
                manifest.dependencies.join(", "),
                dir.display()
            );
        }
    }

    Ok(())
}

/// Print the enabled plugins in resolved load order.
pub async fn cmd_plugin_load_order(service: &PluginService) -> Result<()> {
    let order = service.load_order().await?;

    if order.plugins.is_empty() {
        println!("No enabled plugins.");
        return Ok(());
    }

    for (i, plugin) in order.plugins.iter().enumerate() {
        println!("{:>3}. {}", i + 1, plugin.name);
    }
    for cycle in &order.cycles {
        println!("warning: dependency cycle: {}", cycle.join(" -> "));
    }
    for (plugin, missing) in &order.missing {
        println!(
            "note: '{plugin}' depends on {} which is not enabled",
            missing.join(", ")
        );
    }

    Ok(())
}

/// Install the plugin whose manifest lives at `path`.
pub async fn cmd_plugin_install(service: &PluginService, path: &Path) -> Result<()> {
    let plugin = service.install_from_path(path).await?;
    let status = if plugin.enabled { "enabled" } else { "disabled" };
    println!(
        "Plugin '{}' v{} installed ({status}).",
        plugin.name, plugin.version
    );
    Ok(())
}

/// Enable an installed plugin.
pub async fn cmd_plugin_enable(service: &PluginService, name: &str) -> Result<()> {
    service.enable(name).await?;
    println!("Plugin '{name}' enabled.");
    Ok(())
}

/// Disable an installed plugin. Its config is kept.
pub async fn cmd_plugin_disable(service: &PluginService, name: &str) -> Result<()> {
    service.disable(name).await?;
    println!("Plugin '{name}' disabled.");
    Ok(())
}
