use crate::error::{ProjectError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const GRADLE_BUILD_FILE: &str = "build.gradle";
pub const ANDROID_MANIFEST: &str = "AndroidManifest.xml";

/// Repository functions with a fixed location
const WELL_KNOWN_REPOSITORIES: &[(&str, &str)] = &[
    ("jcenter", "https://jcenter.bintray.com"),
    ("mavenCentral", "https://repo1.maven.org/maven2"),
];

static REPOSITORIES_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\brepositories\s*\{").expect("valid repositories regex"));

static INLINE_MAVEN_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"maven\s*\{\s*url\s*=?\s*(?:uri\()?["']([^"']+)["']\)?\s*\}"#)
        .expect("valid maven url regex")
});

static URL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*url\s*=?\s*(?:uri\()?["']([^"']+)["']"#).expect("valid url regex")
});

static DEPENDENCY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\S*ompile|provided)\s*'(\S*)'$").expect("valid dependency regex")
});

/// Coordinate of a `compile 'g:a:v'` style dependency line
pub fn dependency_declaration(line: &str) -> Option<&str> {
    DEPENDENCY_LINE
        .captures(line.trim_end())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Dependency coordinates declared in a gradle file, in file order
pub fn dependency_coordinates(text: &str) -> Vec<&str> {
    text.lines().filter_map(dependency_declaration).collect()
}

/// Repository URLs named inside `repositories { }` blocks
pub fn repositories_in(text: &str) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    let mut depth: i32 = 0;

    for line in text.lines() {
        if depth == 0 {
            if REPOSITORIES_START.is_match(line) {
                depth = brace_delta(line).max(0);
            }
            continue;
        }

        let url = INLINE_MAVEN_URL
            .captures(line)
            .or_else(|| URL_LINE.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        if let Some(url) = url {
            urls.insert(url);
        } else {
            let function = line.trim().trim_matches(|c| c == '(' || c == ')');
            if let Some((_, url)) = WELL_KNOWN_REPOSITORIES
                .iter()
                .find(|(name, _)| *name == function)
            {
                urls.insert((*url).to_string());
            }
        }

        depth = (depth + brace_delta(line)).max(0);
    }

    urls
}

fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |delta, c| match c {
        '{' => delta + 1,
        '}' => delta - 1,
        _ => delta,
    })
}

/// One directory holding a `build.gradle`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleModule {
    pub build_file: PathBuf,
    /// `src/main/java`, relative to the project root
    pub source_root: Option<PathBuf>,
    /// `src/main` when it holds an Android manifest
    pub android_directory: Option<PathBuf>,
}

/// Gradle modules of a project and the repositories they name
#[derive(Debug, Clone, Default)]
pub struct ProjectLayout {
    pub modules: Vec<GradleModule>,
    pub repositories: BTreeSet<String>,
}

impl ProjectLayout {
    /// Walk `root` (following links) for gradle build files
    pub fn discover(root: &Path) -> Result<Self> {
        let mut layout = ProjectLayout::default();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || entry.file_name() != GRADLE_BUILD_FILE {
                continue;
            }

            let build_file = entry.path().to_path_buf();
            let text = fs::read(&build_file).map_err(|source| ProjectError::io(&build_file, source))?;
            layout
                .repositories
                .extend(repositories_in(&String::from_utf8_lossy(&text)));

            let module_dir = build_file.parent().unwrap_or(root);
            let main = module_dir.join("src").join("main");
            let java = main.join("java");
            let source_root = java
                .is_dir()
                .then(|| java.strip_prefix(root).map(Path::to_path_buf).unwrap_or(java));
            let android_directory = main.join(ANDROID_MANIFEST).is_file().then_some(main);

            log::debug!("Gradle module at {}", module_dir.display());
            layout.modules.push(GradleModule {
                build_file,
                source_root,
                android_directory,
            });
        }

        if layout.modules.is_empty() {
            return Err(ProjectError::NoGradleFiles(root.to_path_buf()));
        }
        log::info!(
            "Found {} gradle modules, {} repositories",
            layout.modules.len(),
            layout.repositories.len()
        );
        Ok(layout)
    }

    pub fn gradle_files(&self) -> impl Iterator<Item = &Path> {
        self.modules.iter().map(|module| module.build_file.as_path())
    }

    pub fn source_roots(&self) -> Vec<PathBuf> {
        self.modules
            .iter()
            .filter_map(|module| module.source_root.clone())
            .collect()
    }

    pub fn android_directories(&self) -> Vec<&Path> {
        self.modules
            .iter()
            .filter_map(|module| module.android_directory.as_deref())
            .collect()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}
