use crate::archive::{ArchiveFormat, ClassLister};
use buckify_protocol::{BuildTarget, PlatformLibrarySet};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Fully qualified class name -> owning build target
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    owners: HashMap<String, BuildTarget>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner, returning the owner it replaced
    pub fn insert(&mut self, class_name: impl Into<String>, owner: BuildTarget) -> Option<BuildTarget> {
        self.owners.insert(class_name.into(), owner)
    }

    pub fn get(&self, class_name: &str) -> Option<&BuildTarget> {
        self.owners.get(class_name)
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.owners.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Built third-party archive and where its artifact lives
#[derive(Debug, Clone)]
pub struct ArchiveArtifact {
    pub target: BuildTarget,
    pub path: PathBuf,
    pub format: ArchiveFormat,
}

/// Class synthesized by a local generating rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedClass {
    /// `android_build_config` -> `<package>.BuildConfig`
    BuildConfig,
    /// `android_resource` -> `<package>.R`
    Resource,
}

impl GeneratedClass {
    pub const fn simple_name(self) -> &'static str {
        match self {
            GeneratedClass::BuildConfig => "BuildConfig",
            GeneratedClass::Resource => "R",
        }
    }
}

/// Local rule that generates a class for its declared package
#[derive(Debug, Clone)]
pub struct GeneratedClassSource {
    pub target: BuildTarget,
    pub package: String,
    pub class: GeneratedClass,
}

/// A class claimed by more than one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassConflict {
    pub class_name: String,
    /// Owner that lost
    pub replaced: BuildTarget,
    /// Owner kept in the index
    pub owner: BuildTarget,
}

/// Output of [`ClassIndexBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct ClassIndexBuild {
    pub index: ClassIndex,
    /// Seed of the platform library set
    pub platform: PlatformLibrarySet,
    pub conflicts: Vec<ClassConflict>,
    /// Archives that yielded no class listing
    pub unlisted: Vec<BuildTarget>,
}

/// Builds the class index from archives and generating rules
pub struct ClassIndexBuilder<'a> {
    lister: &'a dyn ClassLister,
}

impl<'a> ClassIndexBuilder<'a> {
    pub fn new(lister: &'a dyn ClassLister) -> Self {
        Self { lister }
    }

    /// Later entries win when two targets export the same class; every
    /// replaced owner is reported as a conflict.
    pub fn build(
        &self,
        archives: &[ArchiveArtifact],
        generated: &[GeneratedClassSource],
    ) -> ClassIndexBuild {
        let mut out = ClassIndexBuild::default();

        for archive in archives {
            let classes = match self.lister.list_classes(&archive.path, archive.format) {
                Ok(classes) => classes,
                Err(err) => {
                    log::warn!(
                        "No class listing for {} ({}): {err}",
                        archive.target,
                        archive.path.display()
                    );
                    out.unlisted.push(archive.target.clone());
                    Vec::new()
                }
            };
            log::debug!("{} provides {} classes", archive.target, classes.len());

            for class_name in classes {
                Self::register(&mut out, class_name, &archive.target);
            }
            if archive.format.is_platform() {
                out.platform.insert(archive.target.clone());
            }
        }

        for source in generated {
            let class_name = format!("{}.{}", source.package, source.class.simple_name());
            Self::register(&mut out, class_name, &source.target);
            out.platform.insert(source.target.clone());
        }

        log::info!(
            "Class index: {} classes, {} platform targets, {} conflicts",
            out.index.len(),
            out.platform.len(),
            out.conflicts.len()
        );
        out
    }

    fn register(out: &mut ClassIndexBuild, class_name: String, owner: &BuildTarget) {
        if let Some(replaced) = out.index.insert(class_name.clone(), owner.clone()) {
            if &replaced != owner {
                log::warn!("{class_name} is provided by both {replaced} and {owner}; using {owner}");
                out.conflicts.push(ClassConflict {
                    class_name,
                    replaced,
                    owner: owner.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexerError, Result};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::Path;

    struct FixedLister(HashMap<PathBuf, Vec<String>>);

    impl ClassLister for FixedLister {
        fn list_classes(&self, archive: &Path, _format: ArchiveFormat) -> Result<Vec<String>> {
            self.0
                .get(archive)
                .cloned()
                .ok_or_else(|| IndexerError::InvalidPath(archive.display().to_string()))
        }
    }

    fn target(raw: &str) -> BuildTarget {
        BuildTarget::parse(raw).unwrap()
    }

    fn archive(id: &str, path: &str, format: ArchiveFormat) -> ArchiveArtifact {
        ArchiveArtifact {
            target: target(id),
            path: PathBuf::from(path),
            format,
        }
    }

    #[test]
    fn maps_archive_classes_and_generated_classes() {
        let lister = FixedLister(HashMap::from([
            (PathBuf::from("guava.jar"), vec!["com.google.common.base.Optional".to_string()]),
            (PathBuf::from("support.aar"), vec!["android.support.v4.app.Fragment".to_string()]),
        ]));
        let build = ClassIndexBuilder::new(&lister).build(
            &[
                archive("//libs:guava", "guava.jar", ArchiveFormat::Jar),
                archive("//libs:support", "support.aar", ArchiveFormat::Aar),
            ],
            &[
                GeneratedClassSource {
                    target: target("//app/src/main:build-config"),
                    package: "com.example".to_string(),
                    class: GeneratedClass::BuildConfig,
                },
                GeneratedClassSource {
                    target: target("//app/src/main:res"),
                    package: "com.example".to_string(),
                    class: GeneratedClass::Resource,
                },
            ],
        );

        assert_eq!(build.index.get("com.google.common.base.Optional"), Some(&target("//libs:guava")));
        assert_eq!(build.index.get("com.example.BuildConfig"), Some(&target("//app/src/main:build-config")));
        assert_eq!(build.index.get("com.example.R"), Some(&target("//app/src/main:res")));
        assert!(!build.platform.contains(&target("//libs:guava")));
        assert!(build.platform.contains(&target("//libs:support")));
        assert!(build.platform.contains(&target("//app/src/main:res")));
        assert_eq!(build.platform.len(), 3);
        assert!(build.conflicts.is_empty());
    }

    #[test]
    fn missing_listing_contributes_nothing() {
        let lister = FixedLister(HashMap::new());
        let build = ClassIndexBuilder::new(&lister)
            .build(&[archive("//libs:gone", "gone.jar", ArchiveFormat::Jar)], &[]);
        assert!(build.index.is_empty());
        assert_eq!(build.unlisted, vec![target("//libs:gone")]);
    }

    #[test]
    fn duplicate_classes_keep_last_owner_and_report_conflict() {
        let lister = FixedLister(HashMap::from([
            (PathBuf::from("a.jar"), vec!["x.Y".to_string()]),
            (PathBuf::from("b.jar"), vec!["x.Y".to_string()]),
        ]));
        let build = ClassIndexBuilder::new(&lister).build(
            &[
                archive("//libs:a", "a.jar", ArchiveFormat::Jar),
                archive("//libs:b", "b.jar", ArchiveFormat::Jar),
            ],
            &[],
        );
        assert_eq!(build.index.get("x.Y"), Some(&target("//libs:b")));
        assert_eq!(
            build.conflicts,
            vec![ClassConflict {
                class_name: "x.Y".to_string(),
                replaced: target("//libs:a"),
                owner: target("//libs:b"),
            }]
        );
    }
}
