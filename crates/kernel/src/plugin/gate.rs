//! First-install enablement policy.

/// Compute whether a newly-installed plugin should start enabled.
///
/// A plugin is enabled on first install only if:
/// 1. Its `default_enabled` flag is `true` (manifest or built-in default), AND
/// 2. Its name is NOT listed in the `DISABLED_PLUGINS` env var.
///
/// Existing installs are never affected.
pub fn should_auto_enable(
    default_enabled: bool,
    disabled_plugins: &[String],
    plugin_name: &str,
) -> bool {
    default_enabled && !disabled_plugins.iter().any(|d| d == plugin_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_enable_default_true_not_disabled() {
        let disabled: Vec<String> = Vec::new();
        assert!(should_auto_enable(true, &disabled, "reading_time"));
    }

    #[test]
    fn auto_enable_default_false() {
        let disabled: Vec<String> = Vec::new();
        assert!(!should_auto_enable(false, &disabled, "excerpt"));
    }

    #[test]
    fn auto_enable_default_true_but_disabled() {
        let disabled: Vec<String> = vec!["excerpt".into(), "seo_meta".into()];
        assert!(!should_auto_enable(true, &disabled, "excerpt"));
    }

    #[test]
    fn disabled_list_does_not_affect_other_plugins() {
        let disabled: Vec<String> = vec!["excerpt".into()];
        assert!(should_auto_enable(true, &disabled, "reading_time"));
    }
}
