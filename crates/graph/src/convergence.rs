use crate::diagnostics::{diagnose, Diagnosis};
use crate::editor::DeclarationEditor;
use crate::error::Result;
use crate::tool::BuildTool;
use buckify_protocol::{BuildTarget, DependencyCycle, LibraryKind, PlatformLibrarySet, RuleEdit};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

/// Convergence loop settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceOptions {
    /// Stop after this many passes even if the last one changed files
    pub max_passes: Option<usize>,
}

/// Outcome of one build-and-repair sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassSummary {
    pub pass: usize,
    pub built: usize,
    pub failed: usize,
    /// Rewrites that changed a build file
    pub files_changed: usize,
    pub deps_added: usize,
    pub kinds_changed: usize,
    /// Failures matching no known diagnostic
    pub unrecognized: Vec<BuildTarget>,
}

/// Outcome of the whole loop
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvergenceReport {
    pub passes: Vec<PassSummary>,
    /// Distinct cycles reported by the tool
    pub cycles: Vec<DependencyCycle>,
    /// The last pass changed nothing
    pub converged: bool,
    pub time_ms: u64,
}

impl ConvergenceReport {
    pub fn files_changed(&self) -> usize {
        self.passes.iter().map(|pass| pass.files_changed).sum()
    }

    pub fn deps_added(&self) -> usize {
        self.passes.iter().map(|pass| pass.deps_added).sum()
    }

    fn record_cycle(&mut self, cycle: DependencyCycle) {
        if self.cycles.iter().any(|known| known.is_rotation_of(&cycle)) {
            return;
        }
        log::warn!("Dependency cycle: {cycle}");
        self.cycles.push(cycle);
    }
}

/// Builds targets and patches their declarations until nothing changes
pub struct ConvergenceLoop<'a> {
    tool: &'a dyn BuildTool,
    editor: &'a DeclarationEditor,
    options: ConvergenceOptions,
}

impl<'a> ConvergenceLoop<'a> {
    pub fn new(
        tool: &'a dyn BuildTool,
        editor: &'a DeclarationEditor,
        options: ConvergenceOptions,
    ) -> Self {
        Self {
            tool,
            editor,
            options,
        }
    }

    pub fn run(
        &self,
        targets: &[BuildTarget],
        platform: &mut PlatformLibrarySet,
    ) -> Result<ConvergenceReport> {
        let started = Instant::now();
        let mut report = ConvergenceReport::default();

        loop {
            let number = report.passes.len() + 1;
            if self.options.max_passes.is_some_and(|max| number > max) {
                log::warn!("Stopping after {} passes without converging", number - 1);
                break;
            }

            log::info!("Adding deps: pass {number}");
            let pass = self.run_pass(number, targets, platform, &mut report)?;
            log::info!("Pass {number} modified {} build files", pass.files_changed);
            let settled = pass.files_changed == 0;
            report.passes.push(pass);
            if settled {
                report.converged = true;
                break;
            }
        }

        report.time_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    fn run_pass(
        &self,
        number: usize,
        targets: &[BuildTarget],
        platform: &mut PlatformLibrarySet,
        report: &mut ConvergenceReport,
    ) -> Result<PassSummary> {
        let mut pass = PassSummary {
            pass: number,
            ..PassSummary::default()
        };

        for target in targets {
            pass.built += 1;
            let output = self.tool.build(target)?;
            if output.success {
                continue;
            }
            pass.failed += 1;

            let missing = match diagnose(target, &output.combined()) {
                Diagnosis::MissingDeps(missing) => missing,
                Diagnosis::Cycle(cycle) => {
                    report.record_cycle(cycle);
                    BTreeSet::new()
                }
                Diagnosis::Unrecognized => {
                    log::warn!(
                        "Unrecognized failure of {target}: {}",
                        first_line(&output.combined())
                    );
                    pass.unrecognized.push(target.clone());
                    BTreeSet::new()
                }
            };

            let existing = self.editor.deps(target)?.unwrap_or_default();
            let needs_platform = platform.contains(target)
                || platform.contains_any(existing.iter().chain(missing.iter()));
            if needs_platform && platform.insert(target.clone()) {
                log::debug!("{target} joins the platform library set");
            }
            if missing.is_empty() && !needs_platform {
                continue;
            }

            let edit = RuleEdit::new()
                .deps(|current| {
                    let mut next = current.clone();
                    next.extend(missing.iter().filter(|dep| *dep != target).cloned());
                    next
                })
                .kind(needs_platform.then_some(LibraryKind::Android));
            let rewrite = self.editor.edit(target, edit)?;
            if rewrite.changed {
                pass.files_changed += 1;
                pass.deps_added += rewrite
                    .new_deps
                    .len()
                    .saturating_sub(rewrite.existing_deps.len());
                if rewrite.kind_changed {
                    pass.kinds_changed += 1;
                }
            }
        }

        Ok(pass)
    }
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}
