use crate::class_index::ClassIndex;
use crate::error::{IndexerError, Result};
use crate::java;
use crate::resolver::{directory_rule_name, ImportResolver, ResolverOptions};
use crate::scanner::{SourceDirectory, SourceScanner};
use crate::stats::GenerationStats;
use buckify_protocol::templates::{render_interface_files, render_library_rule, Sources};
use buckify_protocol::{BuildTarget, LibraryKind, PlatformLibrarySet};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Rule generation settings
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub resolver: ResolverOptions,
    /// Kind of rules without platform dependencies
    pub default_kind: LibraryKind,
    pub build_file_name: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            resolver: ResolverOptions::default(),
            default_kind: LibraryKind::Java,
            build_file_name: buckify_protocol::BUILD_FILE_NAME.to_string(),
        }
    }
}

/// One emitted rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedRule {
    pub target: BuildTarget,
    pub kind: LibraryKind,
    pub deps: BTreeSet<BuildTarget>,
    pub interface_only: bool,
}

/// Build file planned for one source directory
#[derive(Debug, Clone)]
pub struct DirectoryPlan {
    pub build_file: PathBuf,
    pub text: String,
    /// Interface rule (if any) before the main rule
    pub rules: Vec<GeneratedRule>,
}

/// Result of a generation run
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// Generated targets, interface rule before main rule within a directory
    pub targets: Vec<BuildTarget>,
    pub rules: Vec<GeneratedRule>,
    pub stats: GenerationStats,
}

/// Writes one build file per source directory that lacks one
pub struct RuleGenerator<'a> {
    project_root: &'a Path,
    source_roots: &'a [PathBuf],
    index: &'a ClassIndex,
    options: &'a GeneratorOptions,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(
        project_root: &'a Path,
        source_roots: &'a [PathBuf],
        index: &'a ClassIndex,
        options: &'a GeneratorOptions,
    ) -> Self {
        Self {
            project_root,
            source_roots,
            index,
            options,
        }
    }

    /// Generate and write build files, growing `platform` with every
    /// platform flavoured rule.
    pub fn generate(&self, platform: &mut PlatformLibrarySet) -> Result<Generation> {
        let started = Instant::now();
        let mut generation = Generation::default();

        let scanner =
            SourceScanner::new(self.project_root, self.source_roots, &self.options.build_file_name);
        for directory in scanner.scan()? {
            generation.stats.directories += 1;
            if directory.has_build_file {
                log::debug!("{} already has a build file", directory.relative.display());
                generation.stats.skipped_existing += 1;
                continue;
            }

            let plan = self.plan_directory(&directory, platform, &mut generation.stats)?;
            fs::write(&plan.build_file, &plan.text)
                .map_err(|source| IndexerError::io(&plan.build_file, source))?;
            generation.stats.build_files += 1;

            for rule in plan.rules {
                generation.targets.push(rule.target.clone());
                generation.rules.push(rule);
            }
        }

        generation.stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Generated {} rules in {} build files ({} platform, {} imports unresolved)",
            generation.stats.rules(),
            generation.stats.build_files,
            generation.stats.platform_rules,
            generation.stats.unresolved_imports
        );
        Ok(generation)
    }

    /// Compute the build file of one directory without writing it
    pub fn plan_directory(
        &self,
        directory: &SourceDirectory,
        platform: &mut PlatformLibrarySet,
        stats: &mut GenerationStats,
    ) -> Result<DirectoryPlan> {
        let resolver = ImportResolver::new(
            self.project_root,
            self.source_roots,
            self.index,
            &self.options.resolver,
        );
        let interface_files = self.interface_files(directory)?;
        let main_files: Vec<&String> = directory
            .java_files
            .iter()
            .filter(|name| !interface_files.contains(*name))
            .collect();
        let basename = directory_rule_name(&directory.relative);

        let mut text = String::new();
        let mut rules = Vec::new();

        if !interface_files.is_empty() {
            text.push_str(&render_interface_files(interface_files.iter().map(String::as_str)));

            let name = format!("{basename}{}", self.options.resolver.interface_suffix);
            let target = BuildTarget::for_directory(&directory.relative, &name)?;
            let resolved = resolver.resolve_files(
                &directory.relative,
                &directory.file_paths(&interface_files),
                platform,
            )?;
            let rule = self.emit(target, resolved.deps, resolved.platform, true, platform, stats);
            text.push_str(&render_library_rule(rule.kind, &name, Sources::Interfaces, &rule.deps));
            stats.add_imports(resolved.resolved, resolved.unresolved);
            rules.push(rule);
        }

        let target = BuildTarget::for_directory(&directory.relative, &basename)?;
        let resolved =
            resolver.resolve_files(&directory.relative, &directory.file_paths(main_files), platform)?;
        let sources = if interface_files.is_empty() {
            Sources::All
        } else {
            Sources::AllExceptInterfaces
        };
        let rule = self.emit(target, resolved.deps, resolved.platform, false, platform, stats);
        text.push_str(&render_library_rule(rule.kind, &basename, sources, &rule.deps));
        stats.add_imports(resolved.resolved, resolved.unresolved);
        rules.push(rule);

        Ok(DirectoryPlan {
            build_file: directory.path.join(&self.options.build_file_name),
            text,
            rules,
        })
    }

    fn emit(
        &self,
        target: BuildTarget,
        deps: BTreeSet<BuildTarget>,
        is_platform: bool,
        interface_only: bool,
        platform: &mut PlatformLibrarySet,
        stats: &mut GenerationStats,
    ) -> GeneratedRule {
        let kind = if is_platform {
            platform.insert(target.clone());
            stats.platform_rules += 1;
            LibraryKind::Android
        } else {
            self.options.default_kind
        };
        if interface_only {
            stats.interface_rules += 1;
        } else {
            stats.main_rules += 1;
        }
        GeneratedRule {
            target,
            kind,
            deps,
            interface_only,
        }
    }

    fn interface_files(&self, directory: &SourceDirectory) -> Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        if !self.options.resolver.split_interfaces {
            return Ok(files);
        }
        for name in &directory.java_files {
            if java::is_interface_file(&directory.path.join(name))? {
                files.insert(name.clone());
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn splits_interfaces_into_their_own_rule() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("src/bar");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Api.java"), "package bar;\n\npublic interface Api {}\n").unwrap();
        fs::write(dir.join("Impl.java"), "package bar;\n\nimport bar.Api;\n\npublic class Impl implements Api {}\n").unwrap();

        let roots = vec![PathBuf::from("src")];
        let index = ClassIndex::new();
        let options = GeneratorOptions {
            resolver: ResolverOptions {
                split_interfaces: true,
                ..ResolverOptions::default()
            },
            ..GeneratorOptions::default()
        };
        let generator = RuleGenerator::new(temp.path(), &roots, &index, &options);
        let scanned = SourceScanner::new(temp.path(), &roots, "BUCK").scan().unwrap();
        let mut platform = PlatformLibrarySet::new();
        let mut stats = GenerationStats::new();
        let plan = generator
            .plan_directory(&scanned[0], &mut platform, &mut stats)
            .unwrap();

        assert_eq!(
            plan.text,
            "INTERFACE_FILES = [\n  'Api.java',\n]\n\njava_library(\n  name = 'bar-interfaces',\n  srcs = INTERFACE_FILES,\n  deps = [\n  ],\n  visibility = [\n    'PUBLIC',\n  ],\n)\n\njava_library(\n  name = 'bar',\n  srcs = glob(['*.java'], excludes=INTERFACE_FILES),\n  deps = [\n  ],\n  visibility = [\n    'PUBLIC',\n  ],\n)\n\n"
        );
        let targets: Vec<_> = plan.rules.iter().map(|r| r.target.to_string()).collect();
        assert_eq!(targets, vec!["//src/bar:bar-interfaces", "//src/bar:bar"]);
        assert_eq!(stats.interface_rules, 1);
        assert_eq!(stats.main_rules, 1);
    }

    #[test]
    fn platform_rules_join_the_platform_set() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("src/ui");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Screen.java"), "package ui;\n\nimport android.app.Activity;\n").unwrap();

        let roots = vec![PathBuf::from("src")];
        let index = ClassIndex::new();
        let options = GeneratorOptions::default();
        let mut platform = PlatformLibrarySet::new();
        let generation = RuleGenerator::new(temp.path(), &roots, &index, &options)
            .generate(&mut platform)
            .unwrap();

        let target = BuildTarget::parse("//src/ui:ui").unwrap();
        assert_eq!(generation.targets, vec![target.clone()]);
        assert_eq!(generation.rules[0].kind, LibraryKind::Android);
        assert!(platform.contains(&target));
        let written = fs::read_to_string(dir.join("BUCK")).unwrap();
        assert!(written.starts_with("android_library(\n  name = 'ui',\n"));
    }
}
