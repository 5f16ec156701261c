use crate::editor::DeclarationEditor;
use crate::error::Result;
use buckify_protocol::BuildTarget;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Dependency graph of declared rules, read back from their build files
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<BuildTarget, ()>,
    nodes: HashMap<BuildTarget, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph over `targets`; deps outside the set are not tracked
    pub fn from_declarations(editor: &DeclarationEditor, targets: &[BuildTarget]) -> Result<Self> {
        let mut graph = Self::new();
        for target in targets {
            graph.add_target(target.clone());
        }
        for target in targets {
            let Some(deps) = editor.deps(target)? else {
                continue;
            };
            for dep in deps {
                if graph.nodes.contains_key(&dep) {
                    graph.add_dependency(target, &dep);
                }
            }
        }
        Ok(graph)
    }

    pub fn add_target(&mut self, target: BuildTarget) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&target) {
            return index;
        }
        let index = self.graph.add_node(target.clone());
        self.nodes.insert(target, index);
        index
    }

    pub fn add_dependency(&mut self, from: &BuildTarget, to: &BuildTarget) {
        let from = self.add_target(from.clone());
        let to = self.add_target(to.clone());
        self.graph.update_edge(from, to, ());
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies of a target, sorted
    pub fn dependencies(&self, target: &BuildTarget) -> Vec<&BuildTarget> {
        let Some(&index) = self.nodes.get(target) else {
            return Vec::new();
        };
        let mut deps: Vec<&BuildTarget> = self
            .graph
            .neighbors(index)
            .map(|dep| &self.graph[dep])
            .collect();
        deps.sort();
        deps
    }

    /// Strongly connected components that form a cycle, members sorted
    pub fn cycles(&self) -> Vec<Vec<BuildTarget>> {
        let mut cycles: Vec<Vec<BuildTarget>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self.graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut members: Vec<BuildTarget> =
                    component.into_iter().map(|index| self.graph[index].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }
}
