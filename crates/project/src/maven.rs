use crate::error::{ProjectError, Result};
use crate::gradle::dependency_coordinates;
use buckify_protocol::RuleType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

static MAVEN_COORDINATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:]+):([^:]+):(?:([^:]+):)?([^:]+)$").expect("valid maven coordinate regex")
});

/// Remote repository scheme of generated `remote_file` rules
pub const MAVEN_SCHEME: &str = "mvn";

/// `group:artifact[:packaging]:version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MavenCoordinate {
    pub group: String,
    pub artifact: String,
    pub packaging: Option<String>,
    pub version: String,
}

impl MavenCoordinate {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = MAVEN_COORDINATE.captures(raw.trim())?;
        Some(Self {
            group: caps.get(1)?.as_str().to_string(),
            artifact: caps.get(2)?.as_str().to_string(),
            packaging: caps.get(3).map(|m| m.as_str().to_string()),
            version: caps.get(4)?.as_str().to_string(),
        })
    }

    /// File name of the artifact in a repository or cache
    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!("{}-{}.{}", self.artifact, self.version, kind.extension())
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.packaging {
            Some(packaging) => write!(
                f,
                "{}:{}:{}:{}",
                self.group, self.artifact, packaging, self.version
            ),
            None => write!(f, "{}:{}:{}", self.group, self.artifact, self.version),
        }
    }
}

/// Packaging of a resolved artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Aar,
    Jar,
}

impl ArtifactKind {
    /// Lookup order when the packaging is not known
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Aar, ArtifactKind::Jar];

    pub const fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Aar => "aar",
            ArtifactKind::Jar => "jar",
        }
    }

    pub const fn rule_type(self) -> RuleType {
        match self {
            ArtifactKind::Aar => RuleType::AndroidPrebuiltAar,
            ArtifactKind::Jar => RuleType::PrebuiltJar,
        }
    }
}

/// Artifact located on disk together with its checksum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub coordinate: MavenCoordinate,
    pub kind: ArtifactKind,
    pub sha1: String,
}

impl ResolvedArtifact {
    /// Rule name of the prebuilt declaration
    pub fn name(&self) -> &str {
        &self.coordinate.artifact
    }

    /// Coordinate with the resolved packaging spelled out
    pub fn qualified_coordinate(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.coordinate.group,
            self.coordinate.artifact,
            self.kind.extension(),
            self.coordinate.version
        )
    }
}

/// Finds artifacts in the Android SDK repositories and the gradle cache
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    android_home: Option<PathBuf>,
    gradle_cache: PathBuf,
}

impl ArtifactResolver {
    pub fn new(android_home: Option<PathBuf>, gradle_cache: impl Into<PathBuf>) -> Self {
        Self {
            android_home,
            gradle_cache: gradle_cache.into(),
        }
    }

    /// SDK repository serving `group`, for coordinates without packaging
    fn sdk_repository(&self, coordinate: &MavenCoordinate) -> Option<PathBuf> {
        if coordinate.packaging.is_some() {
            return None;
        }
        let extras = if coordinate.group.starts_with("com.google.android") {
            "extras/google/m2repository"
        } else if coordinate.group.starts_with("com.android") {
            "extras/android/m2repository"
        } else {
            return None;
        };
        match &self.android_home {
            Some(home) => Some(home.join(extras)),
            None => {
                log::warn!("ANDROID_HOME is not set, cannot look up {coordinate}");
                None
            }
        }
    }

    pub fn resolve(&self, coordinate: &MavenCoordinate) -> Result<Option<ResolvedArtifact>> {
        let found = match self.sdk_repository(coordinate) {
            Some(repository) => self.from_sdk_repository(&repository, coordinate)?,
            None => self.from_gradle_cache(coordinate),
        };
        Ok(found.map(|(kind, sha1)| ResolvedArtifact {
            coordinate: coordinate.clone(),
            kind,
            sha1: pad_hash(sha1),
        }))
    }

    /// `<group path>/<artifact>/<version>/<file>.sha1`
    fn from_sdk_repository(
        &self,
        repository: &Path,
        coordinate: &MavenCoordinate,
    ) -> Result<Option<(ArtifactKind, String)>> {
        let dir = repository
            .join(coordinate.group.replace('.', "/"))
            .join(&coordinate.artifact)
            .join(&coordinate.version);
        for kind in ArtifactKind::ALL {
            let sha_file = dir.join(format!("{}.sha1", coordinate.file_name(kind)));
            if !sha_file.is_file() {
                continue;
            }
            let sha1 = fs::read_to_string(&sha_file)
                .map_err(|source| ProjectError::io(&sha_file, source))?;
            return Ok(Some((kind, sha1.trim().to_string())));
        }
        Ok(None)
    }

    /// The cache stores each file in a directory named after its checksum
    fn from_gradle_cache(&self, coordinate: &MavenCoordinate) -> Option<(ArtifactKind, String)> {
        ArtifactKind::ALL.into_iter().find_map(|kind| {
            let expected = coordinate.file_name(kind);
            WalkDir::new(&self.gradle_cache)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .find(|entry| entry.file_name().to_str() == Some(expected.as_str()))
                .and_then(|entry| {
                    let hash = entry.path().parent()?.file_name()?.to_str()?.to_string();
                    Some((kind, hash))
                })
        })
    }
}

/// Checksums with a dropped leading zero get it back
pub fn pad_hash(hash: String) -> String {
    if hash.len() % 2 == 0 {
        hash
    } else {
        format!("0{hash}")
    }
}

/// Third-party artifacts declared across gradle files
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactResolution {
    /// Keyed by qualified coordinate
    pub artifacts: BTreeMap<String, ResolvedArtifact>,
    /// Coordinates with no located artifact
    pub unresolved: Vec<String>,
    /// Dependency strings that are not maven coordinates
    pub unparsable: Vec<String>,
}

impl ArtifactResolution {
    pub fn collect<'a>(
        resolver: &ArtifactResolver,
        gradle_files: impl IntoIterator<Item = &'a Path>,
    ) -> Result<Self> {
        let mut resolution = ArtifactResolution::default();

        for gradle_file in gradle_files {
            let bytes =
                fs::read(gradle_file).map_err(|source| ProjectError::io(gradle_file, source))?;
            let text = String::from_utf8_lossy(&bytes);
            for raw in dependency_coordinates(&text) {
                let Some(coordinate) = MavenCoordinate::parse(raw) else {
                    log::warn!("Couldn't parse maven coordinate {raw}");
                    resolution.unparsable.push(raw.to_string());
                    continue;
                };
                match resolver.resolve(&coordinate)? {
                    Some(artifact) => {
                        resolution
                            .artifacts
                            .insert(artifact.qualified_coordinate(), artifact);
                    }
                    None => {
                        log::warn!("Couldn't find a hash for {coordinate}");
                        resolution.unresolved.push(coordinate.to_string());
                    }
                }
            }
        }

        log::info!(
            "Resolved {} third-party artifacts ({} unresolved)",
            resolution.artifacts.len(),
            resolution.unresolved.len()
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn coordinate(raw: &str) -> MavenCoordinate {
        MavenCoordinate::parse(raw).unwrap()
    }

    #[test]
    fn parses_coordinates() {
        let plain = coordinate("com.google.guava:guava:18.0");
        assert_eq!(plain.group, "com.google.guava");
        assert_eq!(plain.artifact, "guava");
        assert_eq!(plain.packaging, None);
        assert_eq!(plain.version, "18.0");

        let packaged = coordinate("com.squareup:otto:jar:1.3.8");
        assert_eq!(packaged.packaging.as_deref(), Some("jar"));
        assert_eq!(packaged.to_string(), "com.squareup:otto:jar:1.3.8");

        assert_eq!(MavenCoordinate::parse("not-a-coordinate"), None);
        assert_eq!(MavenCoordinate::parse("a:b:c:d:e"), None);
    }

    #[test]
    fn pads_odd_length_hashes() {
        assert_eq!(pad_hash("abc".to_string()), "0abc");
        assert_eq!(pad_hash("abcd".to_string()), "abcd");
    }

    #[test]
    fn resolves_from_gradle_cache_directory_name() {
        let temp = tempdir().unwrap();
        let dir = temp
            .path()
            .join("modules-2/files-2.1/com.google.guava/guava/18.0/cce0823396aa693798f8882e64213b1772032b09");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("guava-18.0.jar"), b"").unwrap();

        let resolver = ArtifactResolver::new(None, temp.path());
        let artifact = resolver
            .resolve(&coordinate("com.google.guava:guava:18.0"))
            .unwrap()
            .unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Jar);
        assert_eq!(artifact.sha1, "cce0823396aa693798f8882e64213b1772032b09");
        assert_eq!(artifact.qualified_coordinate(), "com.google.guava:guava:jar:18.0");
        assert_eq!(artifact.name(), "guava");
    }

    #[test]
    fn resolves_support_libraries_from_the_sdk() {
        let temp = tempdir().unwrap();
        let dir = temp
            .path()
            .join("extras/android/m2repository/com/android/support/support-v4/23.0.1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("support-v4-23.0.1.aar.sha1"), "abc\n").unwrap();

        let resolver = ArtifactResolver::new(Some(temp.path().to_path_buf()), temp.path().join("cache"));
        let artifact = resolver
            .resolve(&coordinate("com.android.support:support-v4:23.0.1"))
            .unwrap()
            .unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Aar);
        assert_eq!(artifact.kind.rule_type(), RuleType::AndroidPrebuiltAar);
        assert_eq!(artifact.sha1, "0abc");
    }

    #[test]
    fn collects_and_reports_unresolved() {
        let temp = tempdir().unwrap();
        let gradle = temp.path().join("build.gradle");
        fs::write(
            &gradle,
            "dependencies {\n    compile 'org.example:missing:1.0'\n    compile 'broken'\n}\n",
        )
        .unwrap();

        let resolver = ArtifactResolver::new(None, temp.path().join("cache"));
        let resolution = ArtifactResolution::collect(&resolver, [gradle.as_path()]).unwrap();

        assert!(resolution.artifacts.is_empty());
        assert_eq!(resolution.unresolved, vec!["org.example:missing:1.0"]);
        assert_eq!(resolution.unparsable, vec!["broken"]);
    }
}
