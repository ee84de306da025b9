//! Dependency graph between addons: cycle detection, load order and
//! dependency validation.
//!
//! Edges point from dependent to dependency: if A depends on B, the edge is
//! `A -> B`. Required and optional dependencies both produce edges; being
//! required only matters for validation. The load order puts dependencies
//! first (B before A).
//!
//! # Example
//!
//! ```
//! use addonkit_api::Dependency;
//! use addonkit_core::graph::{DependencyGraph, StaticNode};
//!
//! let addons = vec![
//!     StaticNode::new("formatter", "1.0").depends_on(Dependency::addon("syntax")),
//!     StaticNode::new("syntax", "2.0"),
//! ];
//!
//! let order = DependencyGraph::build(&addons).resolve().unwrap();
//! assert_eq!(order, vec!["syntax", "formatter"]);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use addonkit_api::Dependency;
use thiserror::Error;

use crate::loading_error::LoadingError;
use crate::version;

/// Anything that can take part in dependency resolution
pub trait GraphNode {
    fn identifier(&self) -> &str;
    fn version(&self) -> &str;
    fn dependencies(&self) -> &[Dependency];
}

impl<N: GraphNode> GraphNode for &N {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    fn version(&self) -> &str {
        (**self).version()
    }

    fn dependencies(&self) -> &[Dependency] {
        (**self).dependencies()
    }
}

/// Resolution failed because the graph contains a cycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency cycle: {}", .cycle.join(" -> "))]
pub struct DependencyCycle {
    /// Nodes on the cycle, starting where it was entered
    pub cycle: Vec<String>,
}

/// Ephemeral graph built fresh for one resolution pass
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node identifiers in discovery order
    nodes: Vec<String>,
    /// Adjacency list: key depends on each value, declaration order, deduplicated
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn build<N: GraphNode>(addons: &[N]) -> Self {
        let mut graph = Self::default();
        for addon in addons {
            let id = addon.identifier().to_string();
            let mut targets: Vec<String> = Vec::new();
            for dep in addon.dependencies() {
                if let Some(target) = dep.addon_identifier() {
                    if !targets.iter().any(|t| t == target) {
                        targets.push(target.to_string());
                    }
                }
            }
            if !graph.edges.contains_key(&id) {
                graph.nodes.push(id.clone());
            }
            graph.edges.insert(id, targets);
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Direct dependencies of a node that are part of this graph or not
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cycle check followed by a topological sort
    pub fn resolve(&self) -> Result<Vec<String>, DependencyCycle> {
        if let Some(cycle) = self.find_cycle() {
            return Err(DependencyCycle { cycle });
        }
        Ok(self.topological_order())
    }

    /// Depth-first search for the first cycle, in discovery order.
    ///
    /// Returns the path slice from the first occurrence of the repeated node
    /// to the node that closed the loop.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();

        for id in &self.nodes {
            if visited.contains(id.as_str()) {
                continue;
            }
            let mut path = vec![id.as_str()];
            if let Some(cycle) = self.visit(id, &mut visited, &mut on_stack, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        on_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        on_stack.insert(node);

        for next in self.dependencies_of(node) {
            let next = next.as_str();
            if on_stack.contains(next) {
                let start = path.iter().position(|p| *p == next).unwrap_or(0);
                return Some(path[start..].iter().map(|s| s.to_string()).collect());
            }
            if visited.contains(next) || !self.edges.contains_key(next) {
                continue;
            }
            path.push(next);
            if let Some(cycle) = self.visit(next, visited, on_stack, path) {
                return Some(cycle);
            }
            path.pop();
        }

        on_stack.remove(node);
        None
    }

    /// Kahn's algorithm, dependencies first.
    ///
    /// Ready nodes are taken in discovery order. Edges to identifiers outside
    /// the graph are ignored. On a cyclic graph the nodes on or behind the
    /// cycle are left out.
    pub fn topological_order(&self) -> Vec<String> {
        let mut pending: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for id in &self.nodes {
            let present: Vec<&str> = self
                .dependencies_of(id)
                .iter()
                .map(String::as_str)
                .filter(|dep| self.edges.contains_key(*dep))
                .collect();
            pending.insert(id.as_str(), present.len());
            for dep in present {
                dependents.entry(dep).or_default().push(id.as_str());
            }
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|id| pending.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(current) = queue.pop_front() {
            order.push(current.to_string());
            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        order
    }
}

/// Check an addon's declared addon dependencies against the full set.
///
/// The first failing required dependency is returned. Optional dependencies
/// that are missing or out of range are skipped.
pub fn validate_dependencies<N: GraphNode>(addon: &N, all: &[N]) -> Result<(), LoadingError> {
    for dep in addon.dependencies() {
        let Dependency::Addon {
            identifier,
            version_range,
            required,
        } = dep
        else {
            continue;
        };

        let Some(target) = all.iter().find(|a| a.identifier() == identifier) else {
            if *required {
                return Err(LoadingError::MissingDependency {
                    identifier: identifier.clone(),
                });
            }
            continue;
        };

        let range = version_range.as_deref().filter(|r| !r.trim().is_empty());
        if *required && !version::satisfies(target.version(), range) {
            return Err(LoadingError::IncompatibleAddonVersion {
                identifier: identifier.clone(),
                required: range.unwrap_or_default().to_string(),
                found: target.version().to_string(),
            });
        }
    }
    Ok(())
}

/// Addons holding a *required* dependency on `identifier`
pub fn dependents<'a, N: GraphNode>(identifier: &str, all: &'a [N]) -> Vec<&'a N> {
    all.iter()
        .filter(|a| a.identifier() != identifier)
        .filter(|a| {
            a.dependencies()
                .iter()
                .any(|d| d.is_required() && d.addon_identifier() == Some(identifier))
        })
        .collect()
}

/// Plain node for callers that only have metadata at hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticNode {
    pub identifier: String,
    pub version: String,
    pub dependencies: Vec<Dependency>,
}

impl StaticNode {
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, dep: Dependency) -> Self {
        self.dependencies.push(dep);
        self
    }
}

impl GraphNode for StaticNode {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}
