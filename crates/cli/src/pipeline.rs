use crate::config::{ListerKind, SynthesizerConfig};
use anyhow::{Context, Result};
use buckify_graph::{
    BuildTool, ConvergenceLoop, ConvergenceOptions, ConvergenceReport, CycleAnalyzer, CycleReport,
    DeclarationEditor, DependencyGraph, InventoryCollector,
};
use buckify_indexer::{
    normalize_source_roots, ClassConflict, ClassIndexBuild, ClassIndexBuilder, ClassLister,
    GeneratedRule, Generation, GenerationStats, JarToolLister, RuleGenerator, ZipClassLister,
};
use buckify_project::{
    read_source_roots, write_buckconfig_if_missing, AndroidRuleWriter, ArtifactResolution,
    ArtifactResolver, ProjectLayout, ThirdPartyWriter, BUCKCONFIG_FILE,
};
use buckify_protocol::{BuildTarget, DependencyCycle, PlatformLibrarySet, RuleType};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Project level files written before generation
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectSetup {
    pub gradle_modules: usize,
    pub source_roots: Vec<PathBuf>,
    pub buckconfig_written: bool,
    pub android_build_files: Vec<PathBuf>,
    pub third_party_declared: Vec<String>,
    pub unresolved_artifacts: Vec<String>,
    pub unparsable_coordinates: Vec<String>,
}

/// Class index figures
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexSummary {
    pub classes: usize,
    pub platform_targets: usize,
    pub conflicts: Vec<ClassConflict>,
    pub unlisted_archives: Vec<BuildTarget>,
}

impl IndexSummary {
    pub fn of(build: &ClassIndexBuild) -> Self {
        Self {
            classes: build.index.len(),
            platform_targets: build.platform.len(),
            conflicts: build.conflicts.clone(),
            unlisted_archives: build.unlisted.clone(),
        }
    }
}

/// Final build of every generated rule
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompileReport {
    pub passing: usize,
    pub total: usize,
    pub failing: Vec<BuildTarget>,
}

/// Everything a command did, printed at the end
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSetup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_index: Option<IndexSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<GeneratedRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suspected_cycles: Vec<Vec<BuildTarget>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence: Option<ConvergenceReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<CycleReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile: Option<CompileReport>,
}

impl RunSummary {
    /// A dependency cycle needs manual repair
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Steps of a synthesis run over one project
pub struct Pipeline<'a> {
    config: &'a SynthesizerConfig,
    tool: &'a dyn BuildTool,
    editor: DeclarationEditor,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a SynthesizerConfig, tool: &'a dyn BuildTool) -> Self {
        Self {
            config,
            tool,
            editor: DeclarationEditor::new(&config.project_root, config.build_file_name.as_str()),
        }
    }

    /// Gradle discovery, `.buckconfig`, Android rules and third-party rules
    pub fn prepare_project(&self) -> Result<ProjectSetup> {
        let root = &self.config.project_root;
        let layout = ProjectLayout::discover(root)?;
        let source_roots = layout.source_roots();

        let buckconfig_written = write_buckconfig_if_missing(
            root,
            &source_roots,
            layout.repositories.iter().map(String::as_str),
        )?;

        let android_build_files = AndroidRuleWriter::new(&self.config.build_file_name)
            .write_all(layout.android_directories())?;

        let mut setup = ProjectSetup {
            gradle_modules: layout.modules.len(),
            source_roots,
            buckconfig_written,
            android_build_files,
            ..ProjectSetup::default()
        };

        let Some(gradle_cache) = &self.config.gradle_cache else {
            log::warn!("No gradle cache configured, skipping third-party artifacts");
            return Ok(setup);
        };
        let resolver = ArtifactResolver::new(self.config.android_home.clone(), gradle_cache.clone());
        let resolution = ArtifactResolution::collect(&resolver, layout.gradle_files())?;

        let existing: BTreeSet<String> = self
            .tool
            .targets_of_type(&[RuleType::PrebuiltJar, RuleType::AndroidPrebuiltAar])?
            .iter()
            .map(|target| target.rule_name().to_string())
            .collect();
        let writer =
            ThirdPartyWriter::new(self.config.resolve_path(&self.config.third_party_build_file));
        setup.third_party_declared = writer.append(resolution.artifacts.values(), &existing)?;
        setup.unresolved_artifacts = resolution.unresolved;
        setup.unparsable_coordinates = resolution.unparsable;
        Ok(setup)
    }

    /// Source roots listed in `.buckconfig`
    pub fn source_roots(&self) -> Result<Vec<PathBuf>> {
        let path = self.config.project_root.join(BUCKCONFIG_FILE);
        let roots = read_source_roots(&path)
            .with_context(|| format!("Cannot read source roots from {}", path.display()))?;
        if roots.is_empty() {
            log::warn!("{} lists no src_roots", path.display());
        }
        Ok(normalize_source_roots(&roots))
    }

    fn lister(&self) -> Box<dyn ClassLister> {
        match self.config.lister {
            ListerKind::Zip => Box::new(ZipClassLister),
            ListerKind::JarTool => Box::new(JarToolLister::new(&self.config.jar)),
        }
    }

    /// Class index over the project's prebuilt archives and generating rules
    pub fn class_index(&self) -> Result<ClassIndexBuild> {
        let inventory = InventoryCollector::new(self.tool, &self.editor).collect()?;
        let lister = self.lister();
        Ok(ClassIndexBuilder::new(lister.as_ref()).build(&inventory.archives, &inventory.generated))
    }

    pub fn generate(
        &self,
        index: &ClassIndexBuild,
        source_roots: &[PathBuf],
        platform: &mut PlatformLibrarySet,
    ) -> Result<Generation> {
        let options = self.config.generator_options();
        let generation =
            RuleGenerator::new(&self.config.project_root, source_roots, &index.index, &options)
                .generate(platform)?;
        Ok(generation)
    }

    /// Cycles among the declared deps of `targets`, before asking the tool
    pub fn suspected_cycles(&self, targets: &[BuildTarget]) -> Result<Vec<Vec<BuildTarget>>> {
        let graph = DependencyGraph::from_declarations(&self.editor, targets)?;
        let cycles = graph.cycles();
        for cycle in &cycles {
            let members: Vec<&str> = cycle.iter().map(BuildTarget::as_str).collect();
            log::warn!("Suspected dependency cycle among {}", members.join(", "));
        }
        Ok(cycles)
    }

    pub fn converge(
        &self,
        targets: &[BuildTarget],
        platform: &mut PlatformLibrarySet,
    ) -> Result<ConvergenceReport> {
        let options = ConvergenceOptions {
            max_passes: self.config.max_passes,
        };
        let report = ConvergenceLoop::new(self.tool, &self.editor, options).run(targets, platform)?;
        if !report.converged {
            log::warn!("Dependencies did not settle after {} passes", report.passes.len());
        }
        Ok(report)
    }

    /// Analyze `known` cycles, or ask the tool for one when there are none
    pub fn analyze_cycles(&self, known: &[DependencyCycle]) -> Result<Vec<CycleReport>> {
        let analyzer = CycleAnalyzer::new(self.tool, &self.editor);
        let cycles = if known.is_empty() {
            analyzer.find_cycle()?.into_iter().collect()
        } else {
            known.to_vec()
        };
        let mut reports = Vec::with_capacity(cycles.len());
        for cycle in &cycles {
            reports.push(analyzer.analyze(cycle)?);
        }
        Ok(reports)
    }

    /// Build every target once more
    pub fn compile_report(&self, targets: &[BuildTarget]) -> Result<CompileReport> {
        let mut report = CompileReport {
            total: targets.len(),
            ..CompileReport::default()
        };
        for target in targets {
            if self.tool.build(target)?.success {
                report.passing += 1;
            } else {
                report.failing.push(target.clone());
            }
        }
        log::info!("{} out of {} rules compile", report.passing, report.total);
        Ok(report)
    }

    /// Library targets already declared in the project
    pub fn declared_libraries(&self) -> Result<Vec<BuildTarget>> {
        Ok(self
            .tool
            .targets_of_type(&[RuleType::JavaLibrary, RuleType::AndroidLibrary])?)
    }

    /// Platform seed for repairing existing declarations
    pub fn existing_platform_libraries(&self, index: &ClassIndexBuild) -> Result<PlatformLibrarySet> {
        let mut platform = index.platform.clone();
        platform.extend(self.tool.targets_of_type(&[RuleType::AndroidLibrary])?);
        Ok(platform)
    }
}
