use crate::diagnostics::find_cycle;
use crate::editor::DeclarationEditor;
use crate::error::Result;
use crate::tool::BuildTool;
use buckify_protocol::{BuildTarget, DependencyCycle, RuleEdit};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Files claimed by the two ends of one cycle edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeComparison {
    pub from: BuildTarget,
    pub to: BuildTarget,
    pub from_files: usize,
    pub to_files: usize,
    /// Files claimed by both ends
    pub shared_files: usize,
}

/// Edge proposed for removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedEdge {
    pub from: BuildTarget,
    pub to: BuildTarget,
}

/// Analysis of one dependency cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: DependencyCycle,
    pub files: BTreeMap<BuildTarget, BTreeSet<String>>,
    pub edges: Vec<EdgeComparison>,
    pub suggested: Option<SuggestedEdge>,
}

/// Picks the weakest edge of a cycle reported by the build tool
pub struct CycleAnalyzer<'a> {
    tool: &'a dyn BuildTool,
    editor: &'a DeclarationEditor,
}

impl<'a> CycleAnalyzer<'a> {
    pub fn new(tool: &'a dyn BuildTool, editor: &'a DeclarationEditor) -> Self {
        Self { tool, editor }
    }

    /// Ask the tool to parse the whole graph and return the cycle it reports
    pub fn find_cycle(&self) -> Result<Option<DependencyCycle>> {
        let output = self.tool.check_graph()?;
        if output.success {
            return Ok(None);
        }
        Ok(find_cycle(&output.combined()))
    }

    /// Input files of `target` with its deps cleared.
    ///
    /// The build file is restored byte for byte afterwards, also when the
    /// query fails.
    pub fn files_for_target(&self, target: &BuildTarget) -> Result<BTreeSet<String>> {
        let original = self.editor.read(target)?;
        let cleared = self
            .editor
            .edit(target, RuleEdit::new().deps(|_| BTreeSet::new()))?;

        let inputs = self.tool.audit_inputs(target);

        if let (true, Some(text)) = (cleared.changed, original) {
            self.editor.restore(target, &text)?;
        }
        Ok(inputs?.into_iter().collect())
    }

    pub fn analyze(&self, cycle: &DependencyCycle) -> Result<CycleReport> {
        let mut graph: DiGraph<BuildTarget, EdgeComparison> = DiGraph::new();
        let mut nodes: HashMap<BuildTarget, NodeIndex> = HashMap::new();
        let mut files: BTreeMap<BuildTarget, BTreeSet<String>> = BTreeMap::new();

        for target in cycle.targets() {
            if !files.contains_key(target) {
                files.insert(target.clone(), self.files_for_target(target)?);
            }
            nodes
                .entry(target.clone())
                .or_insert_with(|| graph.add_node(target.clone()));
        }

        for (from, to) in cycle.edges() {
            let from_files = &files[from];
            let to_files = &files[to];
            let comparison = EdgeComparison {
                from: from.clone(),
                to: to.clone(),
                from_files: from_files.len(),
                to_files: to_files.len(),
                shared_files: from_files.intersection(to_files).count(),
            };
            graph.add_edge(nodes[from], nodes[to], comparison);
        }

        if !petgraph::algo::is_cyclic_directed(&graph) {
            log::warn!("Reported cycle {cycle} does not close");
        }

        // Fewest files on the depending side, then fewest shared, then by name
        let suggested = graph
            .edge_references()
            .map(|edge| edge.weight())
            .min_by(|a, b| {
                (a.from_files, a.shared_files, &a.from, &a.to).cmp(&(
                    b.from_files,
                    b.shared_files,
                    &b.from,
                    &b.to,
                ))
            })
            .map(|edge| SuggestedEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
            });

        let edges = graph
            .edge_references()
            .map(|edge| edge.weight().clone())
            .collect();

        Ok(CycleReport {
            cycle: cycle.clone(),
            files,
            edges,
            suggested,
        })
    }
}
