use crate::error::{IndexerError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use zip::result::ZipError;
use zip::ZipArchive;

/// Classes of an `.aar` live in this nested jar
const AAR_CLASSES_JAR: &str = "classes.jar";

static CLASS_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(\S+)\.class$").expect("valid class listing regex"));

/// Packaging of a third-party archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Jar,
    Aar,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jar" => Some(ArchiveFormat::Jar),
            "aar" => Some(ArchiveFormat::Aar),
            _ => None,
        }
    }

    /// Android archives always need the platform library kind
    pub const fn is_platform(self) -> bool {
        matches!(self, ArchiveFormat::Aar)
    }
}

/// Lists fully qualified class names contained in an archive
pub trait ClassLister {
    fn list_classes(&self, archive: &Path, format: ArchiveFormat) -> Result<Vec<String>>;
}

/// Convert an archive entry path without `.class` into a dotted class name
pub fn class_name_from_entry(entry: &str) -> Option<String> {
    let entry = entry.trim_start_matches('/');
    let file = entry.rsplit('/').next().unwrap_or(entry);
    if entry.is_empty() || file == "module-info" || file == "package-info" {
        return None;
    }
    Some(entry.replace(['/', '$'], "."))
}

/// Class names from `jar tvf` output
pub fn parse_class_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| CLASS_FILE.captures(line.trim_end()))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| class_name_from_entry(m.as_str()))
        .collect()
}

/// Reads archives in process
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipClassLister;

impl ZipClassLister {
    fn classes_in<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Vec<String> {
        archive
            .file_names()
            .filter_map(|name| name.strip_suffix(".class"))
            .filter_map(class_name_from_entry)
            .collect()
    }

    fn zip_error(path: &Path, source: ZipError) -> IndexerError {
        IndexerError::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ClassLister for ZipClassLister {
    fn list_classes(&self, archive: &Path, format: ArchiveFormat) -> Result<Vec<String>> {
        let file = File::open(archive).map_err(|source| IndexerError::io(archive, source))?;
        let mut zip = ZipArchive::new(BufReader::new(file))
            .map_err(|source| Self::zip_error(archive, source))?;

        match format {
            ArchiveFormat::Jar => Ok(Self::classes_in(&mut zip)),
            ArchiveFormat::Aar => {
                let mut bytes = Vec::new();
                match zip.by_name(AAR_CLASSES_JAR) {
                    Ok(mut entry) => {
                        entry
                            .read_to_end(&mut bytes)
                            .map_err(|source| IndexerError::io(archive, source))?;
                    }
                    Err(ZipError::FileNotFound) => {
                        log::debug!("{} has no {AAR_CLASSES_JAR}", archive.display());
                        return Ok(Vec::new());
                    }
                    Err(source) => return Err(Self::zip_error(archive, source)),
                }
                let mut inner = ZipArchive::new(Cursor::new(bytes))
                    .map_err(|source| Self::zip_error(archive, source))?;
                Ok(Self::classes_in(&mut inner))
            }
        }
    }
}

/// Lists archives with the JDK `jar tvf` tool
#[derive(Debug, Clone)]
pub struct JarToolLister {
    program: PathBuf,
}

impl JarToolLister {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn list_jar(&self, jar: &Path) -> Result<Vec<String>> {
        let command = format!("{} tvf {}", self.program.display(), jar.display());
        let output = Command::new(&self.program)
            .arg("tvf")
            .arg(jar)
            .output()
            .map_err(|source| IndexerError::ToolSpawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(IndexerError::ToolFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(parse_class_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Default for JarToolLister {
    fn default() -> Self {
        Self::new("jar")
    }
}

impl ClassLister for JarToolLister {
    fn list_classes(&self, archive: &Path, format: ArchiveFormat) -> Result<Vec<String>> {
        match format {
            ArchiveFormat::Jar => self.list_jar(archive),
            ArchiveFormat::Aar => {
                let file = File::open(archive).map_err(|source| IndexerError::io(archive, source))?;
                let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|source| {
                    IndexerError::Zip {
                        path: archive.to_path_buf(),
                        source,
                    }
                })?;
                let mut entry = match zip.by_name(AAR_CLASSES_JAR) {
                    Ok(entry) => entry,
                    Err(ZipError::FileNotFound) => return Ok(Vec::new()),
                    Err(source) => {
                        return Err(IndexerError::Zip {
                            path: archive.to_path_buf(),
                            source,
                        })
                    }
                };
                let mut extracted = tempfile::Builder::new()
                    .suffix(".jar")
                    .tempfile()
                    .map_err(|source| IndexerError::io(std::env::temp_dir(), source))?;
                let mut bytes = Vec::new();
                entry
                    .read_to_end(&mut bytes)
                    .and_then(|_| extracted.write_all(&bytes))
                    .and_then(|_| extracted.flush())
                    .map_err(|source| IndexerError::io(extracted.path(), source))?;
                self.list_jar(extracted.path())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn jar_bytes(entries: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in entries {
            writer
                .start_file(*entry, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"\xCA\xFE\xBA\xBE").unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn parses_jar_tvf_output() {
        let output = "     0 Mon Jan 01 00:00:00 UTC 2018 META-INF/\n   120 Mon Jan 01 00:00:00 UTC 2018 META-INF/MANIFEST.MF\n  2048 Mon Jan 01 00:00:00 UTC 2018 com/google/common/base/Optional.class\n   512 Mon Jan 01 00:00:00 UTC 2018 com/google/common/base/Optional$Absent.class\n";
        assert_eq!(
            parse_class_listing(output),
            vec![
                "com.google.common.base.Optional".to_string(),
                "com.google.common.base.Optional.Absent".to_string(),
            ]
        );
    }

    #[test]
    fn skips_module_descriptors() {
        assert_eq!(class_name_from_entry("module-info"), None);
        assert_eq!(class_name_from_entry("a/b/package-info"), None);
        assert_eq!(class_name_from_entry("a/B$1").as_deref(), Some("a.B.1"));
    }

    #[test]
    fn detects_archive_format_from_extension() {
        assert_eq!(ArchiveFormat::from_path(Path::new("x/guava.jar")), Some(ArchiveFormat::Jar));
        assert_eq!(ArchiveFormat::from_path(Path::new("x/support.AAR")), Some(ArchiveFormat::Aar));
        assert_eq!(ArchiveFormat::from_path(Path::new("x/readme.txt")), None);
        assert!(ArchiveFormat::Aar.is_platform());
    }

    #[test]
    fn zip_lister_reads_jar_and_nested_aar_classes() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        std::fs::write(&jar, jar_bytes(&["a/b/C.class", "a/b/C$D.class", "a/b/notes.txt"])).unwrap();

        let mut classes = ZipClassLister.list_classes(&jar, ArchiveFormat::Jar).unwrap();
        classes.sort();
        assert_eq!(classes, vec!["a.b.C".to_string(), "a.b.C.D".to_string()]);

        let inner = jar_bytes(&["x/Y.class"]);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("classes.jar", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&inner).unwrap();
        writer
            .start_file("AndroidManifest.xml", SimpleFileOptions::default())
            .unwrap();
        let aar = dir.path().join("lib.aar");
        std::fs::write(&aar, writer.finish().unwrap().into_inner()).unwrap();

        let classes = ZipClassLister.list_classes(&aar, ArchiveFormat::Aar).unwrap();
        assert_eq!(classes, vec!["x.Y".to_string()]);
    }

    #[test]
    fn aar_without_classes_jar_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let aar = dir.path().join("res-only.aar");
        std::fs::write(&aar, jar_bytes(&["res/values/values.xml"])).unwrap();
        let classes = ZipClassLister.list_classes(&aar, ArchiveFormat::Aar).unwrap();
        assert!(classes.is_empty());
    }
}
