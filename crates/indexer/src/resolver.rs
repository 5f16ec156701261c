use crate::class_index::ClassIndex;
use crate::error::Result;
use crate::java::{self, JavaImport};
use buckify_protocol::{BuildTarget, PlatformLibrarySet};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Settings shared by the import resolver and the rule generator
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Class name prefixes that force the platform library kind
    pub platform_prefixes: Vec<String>,
    /// Interface-only sources get their own rule
    pub split_interfaces: bool,
    /// Suffix of interface rule names
    pub interface_suffix: String,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            platform_prefixes: vec!["android".to_string(), "com.android".to_string()],
            split_interfaces: false,
            interface_suffix: buckify_protocol::INTERFACE_SUFFIX.to_string(),
        }
    }
}

/// Dependencies inferred for one set of source files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDeps {
    pub deps: BTreeSet<BuildTarget>,
    /// Sources or dependencies need the platform library kind
    pub platform: bool,
    pub resolved: usize,
    pub unresolved: usize,
}

/// How a single import was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Owned by a target in the class index
    Indexed(BuildTarget),
    /// Source file under a recognized root
    Local(BuildTarget),
    /// Source file in the directory being analyzed
    SameDirectory,
    Unresolved,
}

/// Resolves `import` statements to build targets
pub struct ImportResolver<'a> {
    project_root: &'a Path,
    source_roots: &'a [PathBuf],
    index: &'a ClassIndex,
    options: &'a ResolverOptions,
}

impl<'a> ImportResolver<'a> {
    /// `source_roots` are relative to `project_root`
    pub fn new(
        project_root: &'a Path,
        source_roots: &'a [PathBuf],
        index: &'a ClassIndex,
        options: &'a ResolverOptions,
    ) -> Self {
        Self {
            project_root,
            source_roots,
            index,
            options,
        }
    }

    /// Resolve every import of `files`, which live in `directory` (relative to the project root).
    pub fn resolve_files(
        &self,
        directory: &Path,
        files: &[PathBuf],
        platform: &PlatformLibrarySet,
    ) -> Result<ResolvedDeps> {
        let mut out = ResolvedDeps::default();
        for file in files {
            let source = java::read_source(file)?;
            for import in java::imports_in(&source) {
                if self.is_platform_name(&import.name) {
                    out.platform = true;
                }
                match self.resolve_import(directory, &import)? {
                    Resolution::Indexed(target) | Resolution::Local(target) => {
                        if platform.contains(&target) {
                            out.platform = true;
                        }
                        out.deps.insert(target);
                        out.resolved += 1;
                    }
                    Resolution::SameDirectory => out.resolved += 1,
                    Resolution::Unresolved => {
                        log::debug!("Unresolved import {} in {}", import.name, file.display());
                        out.unresolved += 1;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Index lookup first, then the source roots, then the best-effort fallbacks
    pub fn resolve_import(&self, directory: &Path, import: &JavaImport) -> Result<Resolution> {
        if import.wildcard && !starts_uppercase(last_segment(&import.name)) && !import.is_static {
            return self.resolve_package(directory, &import.name);
        }

        for candidate in class_candidates(import) {
            if let Some(owner) = self.index.get(&candidate) {
                return Ok(Resolution::Indexed(owner.clone()));
            }
            if let Some(resolution) = self.resolve_local_class(directory, &candidate)? {
                return Ok(resolution);
            }
        }
        Ok(Resolution::Unresolved)
    }

    pub fn is_platform_name(&self, class_name: &str) -> bool {
        self.options
            .platform_prefixes
            .iter()
            .any(|prefix| class_name.starts_with(prefix.as_str()))
    }

    fn resolve_local_class(&self, directory: &Path, class_name: &str) -> Result<Option<Resolution>> {
        let relative_file = PathBuf::from(format!("{}.java", class_name.replace('.', "/")));
        for root in self.source_roots {
            let candidate = root.join(&relative_file);
            let absolute = self.project_root.join(&candidate);
            if !absolute.is_file() {
                continue;
            }
            let Some(owner_dir) = candidate.parent() else {
                continue;
            };
            if owner_dir.as_os_str().is_empty() {
                log::debug!("{class_name} lives in the project root, which has no rule");
                continue;
            }
            if owner_dir == directory {
                return Ok(Some(Resolution::SameDirectory));
            }
            let mut rule = directory_rule_name(owner_dir);
            if self.options.split_interfaces && java::is_interface_file(&absolute)? {
                rule.push_str(&self.options.interface_suffix);
            }
            let target = BuildTarget::for_directory(owner_dir, &rule)?;
            return Ok(Some(Resolution::Local(target)));
        }
        Ok(None)
    }

    fn resolve_package(&self, directory: &Path, package: &str) -> Result<Resolution> {
        let relative_dir = PathBuf::from(package.replace('.', "/"));
        for root in self.source_roots {
            let candidate = root.join(&relative_dir);
            if !has_java_files(&self.project_root.join(&candidate)) {
                continue;
            }
            if candidate == directory {
                return Ok(Resolution::SameDirectory);
            }
            let target = BuildTarget::for_directory(&candidate, &directory_rule_name(&candidate))?;
            return Ok(Resolution::Local(target));
        }
        Ok(Resolution::Unresolved)
    }
}

/// Main rule name of a source directory
pub fn directory_rule_name(directory: &Path) -> String {
    directory
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn parent_name(name: &str) -> Option<&str> {
    name.rfind('.').map(|idx| &name[..idx])
}

fn starts_uppercase(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

/// Class names worth looking up for an import, most specific first.
///
/// Static imports name a member, so their enclosing class comes first.
/// Nested classes fall back to their enclosing top-level class.
fn class_candidates(import: &JavaImport) -> Vec<String> {
    let mut first = import.name.as_str();
    if import.is_static && !import.wildcard {
        if let Some(parent) = parent_name(first) {
            first = parent;
        }
    }

    let mut candidates = vec![first.to_string()];
    let mut current = first;
    while let Some(parent) = parent_name(current) {
        if !starts_uppercase(last_segment(current)) || !starts_uppercase(last_segment(parent)) {
            break;
        }
        candidates.push(parent.to_string());
        current = parent;
    }
    if import.is_static && !import.wildcard && first != import.name {
        candidates.push(import.name.clone());
    }
    candidates
}

fn has_java_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|entry| entry.ok()).any(|entry| {
                java::is_java_file(&entry.file_name().to_string_lossy())
                    && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn target(raw: &str) -> BuildTarget {
        BuildTarget::parse(raw).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn import(name: &str) -> JavaImport {
        java::import_statement(&format!("import {name};")).unwrap()
    }

    fn project() -> TempDir {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "src/bar/Baz.java", "package bar;\n\npublic class Baz {}\n");
        write(temp.path(), "src/bar/Api.java", "package bar;\n\npublic interface Api {}\n");
        write(temp.path(), "src/foo/Foo.java", "package foo;\n\nimport bar.Baz;\n");
        write(temp.path(), "src/foo/Helper.java", "package foo;\n");
        temp
    }

    #[test]
    fn candidates_cover_static_and_nested_imports() {
        assert_eq!(class_candidates(&import("a.b.Outer.Inner")), vec!["a.b.Outer.Inner", "a.b.Outer"]);
        assert_eq!(class_candidates(&import("a.b.C")), vec!["a.b.C"]);
        assert_eq!(
            class_candidates(&import("static a.b.C.member")),
            vec!["a.b.C", "a.b.C.member"]
        );
    }

    #[test]
    fn index_lookup_precedes_local_files() {
        let temp = project();
        let roots = vec![PathBuf::from("src")];
        let mut index = ClassIndex::new();
        index.insert("bar.Baz", target("//libs:bar"));
        let options = ResolverOptions::default();
        let resolver = ImportResolver::new(temp.path(), &roots, &index, &options);

        let resolution = resolver.resolve_import(Path::new("src/foo"), &import("bar.Baz")).unwrap();
        assert_eq!(resolution, Resolution::Indexed(target("//libs:bar")));
    }

    #[test]
    fn local_class_resolves_to_directory_target() {
        let temp = project();
        let roots = vec![PathBuf::from("src")];
        let index = ClassIndex::new();
        let options = ResolverOptions::default();
        let resolver = ImportResolver::new(temp.path(), &roots, &index, &options);

        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("bar.Baz")).unwrap(),
            Resolution::Local(target("//src/bar:bar"))
        );
        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("bar.Api")).unwrap(),
            Resolution::Local(target("//src/bar:bar"))
        );
        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("foo.Helper")).unwrap(),
            Resolution::SameDirectory
        );
        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("java.util.List")).unwrap(),
            Resolution::Unresolved
        );
    }

    #[test]
    fn interface_files_resolve_to_interface_rule_when_splitting() {
        let temp = project();
        let roots = vec![PathBuf::from("src")];
        let index = ClassIndex::new();
        let options = ResolverOptions {
            split_interfaces: true,
            ..ResolverOptions::default()
        };
        let resolver = ImportResolver::new(temp.path(), &roots, &index, &options);

        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("bar.Api")).unwrap(),
            Resolution::Local(target("//src/bar:bar-interfaces"))
        );
        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("bar.Baz")).unwrap(),
            Resolution::Local(target("//src/bar:bar"))
        );
    }

    #[test]
    fn wildcard_and_nested_imports_fall_back_to_local_sources() {
        let temp = project();
        let roots = vec![PathBuf::from("src")];
        let index = ClassIndex::new();
        let options = ResolverOptions::default();
        let resolver = ImportResolver::new(temp.path(), &roots, &index, &options);

        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("bar.*")).unwrap(),
            Resolution::Local(target("//src/bar:bar"))
        );
        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("bar.Baz.Inner")).unwrap(),
            Resolution::Local(target("//src/bar:bar"))
        );
    }

    #[test]
    fn first_matching_root_wins() {
        let temp = project();
        write(temp.path(), "gen/bar/Baz.java", "package bar;\npublic class Baz {}\n");
        let roots = vec![PathBuf::from("gen"), PathBuf::from("src")];
        let index = ClassIndex::new();
        let options = ResolverOptions::default();
        let resolver = ImportResolver::new(temp.path(), &roots, &index, &options);

        assert_eq!(
            resolver.resolve_import(Path::new("src/foo"), &import("bar.Baz")).unwrap(),
            Resolution::Local(target("//gen/bar:bar"))
        );
    }

    #[test]
    fn platform_imports_and_platform_deps_flag_the_rule() {
        let temp = project();
        write(
            temp.path(),
            "src/ui/Screen.java",
            "package ui;\n\nimport android.app.Activity;\nimport bar.Baz;\nimport ui.Other;\n",
        );
        let roots = vec![PathBuf::from("src")];
        let index = ClassIndex::new();
        let options = ResolverOptions::default();
        let resolver = ImportResolver::new(temp.path(), &roots, &index, &options);

        let resolved = resolver
            .resolve_files(
                Path::new("src/ui"),
                &[temp.path().join("src/ui/Screen.java")],
                &PlatformLibrarySet::new(),
            )
            .unwrap();
        assert!(resolved.platform);
        assert_eq!(resolved.deps, BTreeSet::from([target("//src/bar:bar")]));
        assert_eq!(resolved.resolved, 1);
        assert_eq!(resolved.unresolved, 2);

        let platform: PlatformLibrarySet = [target("//src/bar:bar")].into_iter().collect();
        let resolved = resolver
            .resolve_files(
                Path::new("src/foo"),
                &[temp.path().join("src/foo/Foo.java")],
                &platform,
            )
            .unwrap();
        assert!(resolved.platform);
    }
}
