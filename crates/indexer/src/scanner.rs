use crate::error::{IndexerError, Result};
use crate::java::is_java_file;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory holding Java sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDirectory {
    /// Absolute location
    pub path: PathBuf,
    /// Location relative to the project root
    pub relative: PathBuf,
    /// `.java` file names, sorted
    pub java_files: Vec<String>,
    /// A build file already exists in the directory
    pub has_build_file: bool,
}

impl SourceDirectory {
    pub fn file_paths<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Vec<PathBuf> {
        names.into_iter().map(|name| self.path.join(name)).collect()
    }
}

/// Scanner for source directories under the recognized source roots
pub struct SourceScanner {
    root: PathBuf,
    source_roots: Vec<PathBuf>,
    build_file_name: String,
}

impl SourceScanner {
    pub fn new(
        root: impl AsRef<Path>,
        source_roots: &[PathBuf],
        build_file_name: impl Into<String>,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            source_roots: source_roots.to_vec(),
            build_file_name: build_file_name.into(),
        }
    }

    /// Directories containing at least one `.java` file, in sorted walk order.
    ///
    /// A directory reachable from several (nested) roots is listed once.
    pub fn scan(&self) -> Result<Vec<SourceDirectory>> {
        let mut directories = Vec::new();
        let mut seen = BTreeSet::new();

        for source_root in &self.source_roots {
            let start = self.root.join(source_root);
            if !start.is_dir() {
                log::warn!("Source root {} does not exist", start.display());
                continue;
            }

            let walker = WalkDir::new(&start)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !Self::is_hidden(entry.path()));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("Failed to read entry: {e}");
                        continue;
                    }
                };
                if !entry.file_type().is_dir() {
                    continue;
                }
                let Some(directory) = self.inspect(entry.path())? else {
                    continue;
                };
                if directory.relative.as_os_str().is_empty() {
                    log::warn!(
                        "Skipping Java sources in the project root {}: a rule needs a named directory",
                        self.root.display()
                    );
                    continue;
                }
                if seen.insert(directory.relative.clone()) {
                    directories.push(directory);
                } else {
                    log::debug!("{} is under more than one source root", directory.relative.display());
                }
            }
        }

        log::info!("Found {} source directories", directories.len());
        Ok(directories)
    }

    fn inspect(&self, dir: &Path) -> Result<Option<SourceDirectory>> {
        let mut java_files = Vec::new();
        let mut has_build_file = false;

        let entries = std::fs::read_dir(dir).map_err(|source| IndexerError::io(dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| IndexerError::io(dir, source))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry.path().is_file();
            if name == self.build_file_name && is_file {
                has_build_file = true;
            } else if is_file && is_java_file(&name) {
                java_files.push(name);
            }
        }

        if java_files.is_empty() {
            return Ok(None);
        }
        java_files.sort();

        let relative = dir
            .strip_prefix(&self.root)
            .map_err(|_| IndexerError::InvalidPath(dir.display().to_string()))?
            .to_path_buf();

        Ok(Some(SourceDirectory {
            path: dir.to_path_buf(),
            relative,
            java_files,
            has_build_file,
        }))
    }

    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'))
    }
}

/// Normalize `.buckconfig` style roots (`/java/src`, `./java/src/`) to relative paths.
///
/// `/` and `.` name the project root itself and become the empty path.
pub fn normalize_source_roots<S: AsRef<str>>(roots: &[S]) -> Vec<PathBuf> {
    roots
        .iter()
        .map(|root| root.as_ref().trim())
        .filter(|root| !root.is_empty())
        .map(|root| {
            let relative = root.trim_start_matches('/');
            let relative = relative.strip_prefix("./").unwrap_or(relative);
            let relative = relative.trim_end_matches('/');
            if relative.is_empty() || relative == "." {
                log::debug!("Source root {root} is the project root");
                PathBuf::new()
            } else {
                PathBuf::from(relative)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_java_directories_in_sorted_order() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("b")).unwrap();
        fs::create_dir_all(src.join("a/empty")).unwrap();
        fs::create_dir_all(src.join(".hidden")).unwrap();
        fs::write(src.join("b/B.java"), b"class B {}").unwrap();
        fs::write(src.join("a/A2.java"), b"class A2 {}").unwrap();
        fs::write(src.join("a/A1.java"), b"class A1 {}").unwrap();
        fs::write(src.join("a/notes.txt"), b"").unwrap();
        fs::write(src.join(".hidden/H.java"), b"class H {}").unwrap();
        fs::write(src.join("b/BUCK"), b"").unwrap();

        let scanner = SourceScanner::new(temp.path(), &[PathBuf::from("src")], "BUCK");
        let dirs = scanner.scan().unwrap();

        let relative: Vec<_> = dirs.iter().map(|d| d.relative.clone()).collect();
        assert_eq!(relative, vec![PathBuf::from("src/a"), PathBuf::from("src/b")]);
        assert_eq!(dirs[0].java_files, vec!["A1.java".to_string(), "A2.java".to_string()]);
        assert!(!dirs[0].has_build_file);
        assert!(dirs[1].has_build_file);
    }

    #[test]
    fn missing_roots_are_skipped() {
        let temp = tempdir().unwrap();
        let scanner = SourceScanner::new(temp.path(), &[PathBuf::from("nope")], "BUCK");
        assert!(scanner.scan().unwrap().is_empty());
    }

    #[test]
    fn normalizes_buckconfig_roots() {
        assert_eq!(
            normalize_source_roots(&["/app/src/main/java", " ./lib/src/ ", ""]),
            vec![PathBuf::from("app/src/main/java"), PathBuf::from("lib/src")]
        );
        assert_eq!(
            normalize_source_roots(&["/", "."]),
            vec![PathBuf::new(), PathBuf::new()]
        );
    }

    #[test]
    fn nested_roots_list_a_directory_once() {
        let temp = tempdir().unwrap();
        let foo = temp.path().join("java/foo");
        fs::create_dir_all(&foo).unwrap();
        fs::write(foo.join("Foo.java"), b"class Foo {}").unwrap();

        let roots = [PathBuf::from("java"), PathBuf::from("java/foo")];
        let dirs = SourceScanner::new(temp.path(), &roots, "BUCK").scan().unwrap();

        let relative: Vec<_> = dirs.iter().map(|d| d.relative.clone()).collect();
        assert_eq!(relative, vec![PathBuf::from("java/foo")]);
    }

    #[test]
    fn project_root_sources_are_skipped() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("Main.java"), b"class Main {}").unwrap();
        fs::create_dir_all(temp.path().join("util")).unwrap();
        fs::write(temp.path().join("util/Util.java"), b"class Util {}").unwrap();

        let dirs = SourceScanner::new(temp.path(), &[PathBuf::new()], "BUCK").scan().unwrap();

        let relative: Vec<_> = dirs.iter().map(|d| d.relative.clone()).collect();
        assert_eq!(relative, vec![PathBuf::from("util")]);
    }
}
