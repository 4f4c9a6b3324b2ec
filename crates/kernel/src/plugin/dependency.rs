//! Plugin dependency resolution.
//!
//! Dependencies are declared by name and resolved against the set of
//! plugins handed in (normally the enabled ones). Resolution is a
//! depth-first post-order walk with a visited set:
//!
//! - a dependency that names no plugin in the set is skipped, so optional
//!   soft dependencies never block loading;
//! - a cycle terminates because the walk never re-enters a visited plugin.
//!   The member of the cycle reached second is appended without waiting on
//!   its back-reference, so the order inside a cycle depends on where the
//!   walk started. Use [`find_dependency_cycles`] to report such cycles.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::Plugin;

use super::manifest::PluginManifest;

/// Anything that has a name and declares dependencies by name.
pub trait Dependent {
    fn name(&self) -> &str;
    fn dependencies(&self) -> &[String];
}

impl Dependent for Plugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl Dependent for PluginManifest {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Index plugins by name. The first plugin wins if a name repeats.
fn index_by_name<P: Dependent>(plugins: &[P]) -> HashMap<&str, usize> {
    let mut by_name = HashMap::with_capacity(plugins.len());
    for (i, p) in plugins.iter().enumerate() {
        by_name.entry(p.name()).or_insert(i);
    }
    by_name
}

/// Resolve plugin load order.
///
/// Returns every input plugin exactly once. For every plugin P that
/// declares a dependency D present in the input, D comes before P (cycles
/// excepted). The input order seeds the walk, so plugins with no
/// constraints between them keep their relative order.
pub fn resolve_load_order<P: Dependent>(plugins: &[P]) -> Vec<&P> {
    let by_name = index_by_name(plugins);
    let mut visited = vec![false; plugins.len()];
    let mut order = Vec::with_capacity(plugins.len());

    fn visit<P: Dependent>(
        i: usize,
        plugins: &[P],
        by_name: &HashMap<&str, usize>,
        visited: &mut [bool],
        order: &mut Vec<usize>,
    ) {
        if visited[i] {
            return;
        }
        visited[i] = true;
        for dep in plugins[i].dependencies() {
            if let Some(&j) = by_name.get(dep.as_str()) {
                visit(j, plugins, by_name, visited, order);
            }
        }
        order.push(i);
    }

    for i in 0..plugins.len() {
        visit(i, plugins, &by_name, &mut visited, &mut order);
    }

    order.into_iter().map(|i| &plugins[i]).collect()
}

/// Find dependency cycles among the given plugins.
///
/// Each cycle is reported once, as the names along the cycle starting from
/// the plugin where the walk first re-entered it. A plugin depending on
/// itself is a cycle of one.
pub fn find_dependency_cycles<P: Dependent>(plugins: &[P]) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    struct Walk<'a, P> {
        plugins: &'a [P],
        by_name: HashMap<&'a str, usize>,
        marks: Vec<Mark>,
        stack: Vec<usize>,
        seen: HashSet<BTreeSet<usize>>,
        cycles: Vec<Vec<String>>,
    }

    impl<P: Dependent> Walk<'_, P> {
        fn visit(&mut self, i: usize) {
            let plugins = self.plugins;
            self.marks[i] = Mark::Active;
            self.stack.push(i);
            for dep in plugins[i].dependencies() {
                let Some(&j) = self.by_name.get(dep.as_str()) else {
                    continue;
                };
                match self.marks[j] {
                    Mark::New => self.visit(j),
                    Mark::Active => {
                        let start = self.stack.iter().position(|&k| k == j).unwrap_or(0);
                        let members = &self.stack[start..];
                        if self.seen.insert(members.iter().copied().collect()) {
                            self.cycles.push(
                                members
                                    .iter()
                                    .map(|&k| plugins[k].name().to_string())
                                    .collect(),
                            );
                        }
                    }
                    Mark::Done => {}
                }
            }
            self.stack.pop();
            self.marks[i] = Mark::Done;
        }
    }

    let mut walk = Walk {
        plugins,
        by_name: index_by_name(plugins),
        marks: vec![Mark::New; plugins.len()],
        stack: Vec::new(),
        seen: HashSet::new(),
        cycles: Vec::new(),
    };

    for i in 0..plugins.len() {
        if walk.marks[i] == Mark::New {
            walk.visit(i);
        }
    }

    walk.cycles
}

/// Declared dependencies of `plugin` that are not among `available`.
pub fn missing_dependencies<'a, P: Dependent>(plugin: &'a P, available: &[P]) -> Vec<&'a str> {
    let names: HashSet<&str> = available.iter().map(|p| p.name()).collect();
    plugin
        .dependencies()
        .iter()
        .map(String::as_str)
        .filter(|d| !names.contains(d))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct P {
        name: String,
        deps: Vec<String>,
    }

    impl Dependent for P {
        fn name(&self) -> &str {
            &self.name
        }
        fn dependencies(&self) -> &[String] {
            &self.deps
        }
    }

    fn make_plugin(name: &str, deps: &[&str]) -> P {
        P {
            name: name.to_string(),
            deps: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn names(order: &[&P]) -> Vec<String> {
        order.iter().map(|p| p.name.clone()).collect()
    }

    fn pos(order: &[String], name: &str) -> usize {
        order.iter().position(|x| x == name).unwrap()
    }

    #[test]
    fn no_dependencies_keeps_input_order() {
        let plugins = vec![make_plugin("c", &[]), make_plugin("a", &[]), make_plugin("b", &[])];
        assert_eq!(names(&resolve_load_order(&plugins)), vec!["c", "a", "b"]);
    }

    #[test]
    fn simple_chain() {
        let plugins = vec![
            make_plugin("c", &["b"]),
            make_plugin("b", &["a"]),
            make_plugin("a", &[]),
        ];
        assert_eq!(names(&resolve_load_order(&plugins)), vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_dependency() {
        // a depends on b and c, both depend on d
        let plugins = vec![
            make_plugin("a", &["b", "c"]),
            make_plugin("b", &["d"]),
            make_plugin("c", &["d"]),
            make_plugin("d", &[]),
        ];
        let order = names(&resolve_load_order(&plugins));

        assert_eq!(order.len(), 4);
        assert!(pos(&order, "d") < pos(&order, "b"));
        assert!(pos(&order, "d") < pos(&order, "c"));
        assert!(pos(&order, "b") < pos(&order, "a"));
        assert!(pos(&order, "c") < pos(&order, "a"));
    }

    #[test]
    fn every_dependency_precedes_its_dependent() {
        let plugins = vec![
            make_plugin("seo", &["excerpt", "sitemap"]),
            make_plugin("excerpt", &[]),
            make_plugin("sitemap", &["router"]),
            make_plugin("router", &[]),
            make_plugin("feeds", &["excerpt", "router"]),
        ];
        let order = names(&resolve_load_order(&plugins));

        for p in &plugins {
            for d in &p.deps {
                assert!(
                    pos(&order, d) < pos(&order, &p.name),
                    "{d} should load before {}",
                    p.name
                );
            }
        }
    }

    #[test]
    fn output_is_complete_without_duplicates() {
        let plugins = vec![
            make_plugin("a", &["b", "c"]),
            make_plugin("b", &["c"]),
            make_plugin("c", &[]),
            make_plugin("d", &["c", "a"]),
        ];
        let order = names(&resolve_load_order(&plugins));

        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(order.len(), plugins.len());
        assert_eq!(unique.len(), plugins.len());
    }

    #[test]
    fn missing_dependency_is_skipped() {
        let plugins = vec![make_plugin("a", &["missing"]), make_plugin("b", &["a"])];
        assert_eq!(names(&resolve_load_order(&plugins)), vec!["a", "b"]);
    }

    #[test]
    fn circular_dependency_terminates() {
        let plugins = vec![make_plugin("a", &["b"]), make_plugin("b", &["a"])];
        let order = names(&resolve_load_order(&plugins));

        // Starting from "a", "b" is reached second and appended first.
        assert_eq!(order.len(), 2);
        assert!(order.contains(&"a".to_string()));
        assert!(order.contains(&"b".to_string()));
    }

    #[test]
    fn self_dependency_terminates() {
        let plugins = vec![make_plugin("a", &["a"])];
        assert_eq!(names(&resolve_load_order(&plugins)), vec!["a"]);
    }

    #[test]
    fn cycles_are_reported_once() {
        let plugins = vec![
            make_plugin("a", &["b"]),
            make_plugin("b", &["c"]),
            make_plugin("c", &["a"]),
            make_plugin("d", &["a"]),
        ];
        let cycles = find_dependency_cycles(&plugins);
        assert_eq!(cycles, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn direct_and_self_cycles() {
        let plugins = vec![
            make_plugin("a", &["b"]),
            make_plugin("b", &["a"]),
            make_plugin("solo", &["solo"]),
        ];
        let cycles = find_dependency_cycles(&plugins);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(cycles.contains(&vec!["solo".to_string()]));
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let plugins = vec![
            make_plugin("a", &["b", "c"]),
            make_plugin("b", &["c"]),
            make_plugin("c", &[]),
        ];
        assert!(find_dependency_cycles(&plugins).is_empty());
    }

    #[test]
    fn missing_dependencies_listed() {
        let plugins = vec![make_plugin("a", &[]), make_plugin("b", &["a", "ghost"])];
        assert_eq!(missing_dependencies(&plugins[1], &plugins), vec!["ghost"]);
        assert!(missing_dependencies(&plugins[0], &plugins).is_empty());
    }
}
