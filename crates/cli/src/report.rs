use crate::pipeline::{CompileReport, IndexSummary, ProjectSetup, RunSummary};
use buckify_graph::{ConvergenceReport, CycleReport};
use buckify_indexer::GenerationStats;
use buckify_protocol::BuildTarget;

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    if let Some(project) = &summary.project {
        render_project(&mut out, project);
    }
    if let Some(index) = &summary.class_index {
        render_index(&mut out, index);
    }
    if let Some(stats) = &summary.generation {
        render_generation(&mut out, stats);
    }
    for cycle in &summary.suspected_cycles {
        out.push_str(&format!("Suspected cycle: {}\n", join_targets(cycle.iter())));
    }
    if let Some(convergence) = &summary.convergence {
        render_convergence(&mut out, convergence);
    }
    for report in &summary.cycles {
        out.push_str(&render_cycle(report));
    }
    if let Some(compile) = &summary.compile {
        render_compile(&mut out, compile);
    }
    out
}

fn render_project(out: &mut String, project: &ProjectSetup) {
    out.push_str(&format!(
        "Project: {} gradle modules, {} source roots\n",
        project.gradle_modules,
        project.source_roots.len()
    ));
    if project.buckconfig_written {
        out.push_str("  wrote .buckconfig\n");
    }
    for path in &project.android_build_files {
        out.push_str(&format!("  wrote {}\n", path.display()));
    }
    if !project.third_party_declared.is_empty() {
        out.push_str(&format!(
            "  third-party: {}\n",
            project.third_party_declared.join(", ")
        ));
    }
    for coordinate in &project.unresolved_artifacts {
        out.push_str(&format!("  unresolved artifact {coordinate}\n"));
    }
    for coordinate in &project.unparsable_coordinates {
        out.push_str(&format!("  unparsable coordinate {coordinate}\n"));
    }
}

fn render_index(out: &mut String, index: &IndexSummary) {
    out.push_str(&format!(
        "Class index: {} classes, {} platform targets\n",
        index.classes, index.platform_targets
    ));
    for conflict in &index.conflicts {
        out.push_str(&format!(
            "  {} provided by {} and {}\n",
            conflict.class_name, conflict.replaced, conflict.owner
        ));
    }
    if !index.unlisted_archives.is_empty() {
        out.push_str(&format!(
            "  no listing for {}\n",
            join_targets(index.unlisted_archives.iter())
        ));
    }
}

fn render_generation(out: &mut String, stats: &GenerationStats) {
    out.push_str(&format!(
        "Generated {} rules ({} interface, {} platform) in {} build files\n",
        stats.rules(),
        stats.interface_rules,
        stats.platform_rules,
        stats.build_files
    ));
    out.push_str(&format!(
        "  imports: {} resolved, {} unresolved; {} directories kept their build file\n",
        stats.resolved_imports, stats.unresolved_imports, stats.skipped_existing
    ));
}

fn render_convergence(out: &mut String, report: &ConvergenceReport) {
    for pass in &report.passes {
        out.push_str(&format!(
            "Pass {}: {} built, {} failed, {} files changed\n",
            pass.pass, pass.built, pass.failed, pass.files_changed
        ));
        if !pass.unrecognized.is_empty() {
            out.push_str(&format!(
                "  unrecognized failures: {}\n",
                join_targets(pass.unrecognized.iter())
            ));
        }
    }
    let state = if report.converged {
        "converged"
    } else {
        "stopped"
    };
    out.push_str(&format!(
        "Dependencies {state} after {} passes: {} deps added, {} files changed\n",
        report.passes.len(),
        report.deps_added(),
        report.files_changed()
    ));
}

/// Cycle members, per-edge file counts and the edge worth removing
pub fn render_cycle(report: &CycleReport) -> String {
    let mut out = format!("Dependency cycle: {}\n", report.cycle);
    for (target, files) in &report.files {
        out.push_str(&format!("  {target}: {} files\n", files.len()));
    }
    for edge in &report.edges {
        out.push_str(&format!(
            "  {} -> {}: {} / {} files, {} shared\n",
            edge.from, edge.to, edge.from_files, edge.to_files, edge.shared_files
        ));
    }
    match &report.suggested {
        Some(edge) => out.push_str(&format!(
            "  Suggest removing the dependency of {} on {}\n",
            edge.from, edge.to
        )),
        None => out.push_str("  No edge to suggest\n"),
    }
    out
}

fn render_compile(out: &mut String, compile: &CompileReport) {
    out.push_str(&format!(
        "{} out of {} rules compile\n",
        compile.passing, compile.total
    ));
    for target in &compile.failing {
        out.push_str(&format!("  failing: {target}\n"));
    }
}

fn join_targets<'a>(targets: impl Iterator<Item = &'a BuildTarget>) -> String {
    targets.map(BuildTarget::as_str).collect::<Vec<_>>().join(", ")
}
