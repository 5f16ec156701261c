//! Line recognizers for Java sources.

use crate::error::{IndexerError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static JAVA_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^import\s+(static\s+)?([\w.$]+?)(\.\*)?\s*;").expect("valid import regex")
});
static INTERFACE_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^public\s+@?interface\s+").expect("valid interface regex"));

/// One `import` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaImport {
    /// Imported name without a trailing `.*`
    pub name: String,
    pub is_static: bool,
    pub wildcard: bool,
}

/// Recognize an `import` statement starting at the beginning of the line
pub fn import_statement(line: &str) -> Option<JavaImport> {
    let caps = JAVA_IMPORT.captures(line)?;
    Some(JavaImport {
        name: caps.get(2)?.as_str().to_string(),
        is_static: caps.get(1).is_some(),
        wildcard: caps.get(3).is_some(),
    })
}

/// Top-level `public interface` (or annotation type) declaration line.
///
/// Only unindented declarations count, so nested interfaces are ignored.
pub fn is_interface_declaration(line: &str) -> bool {
    INTERFACE_DECLARATION.is_match(line)
}

pub fn imports_in(source: &str) -> impl Iterator<Item = JavaImport> + '_ {
    source.lines().filter_map(import_statement)
}

pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| IndexerError::io(path, source))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Whether the file declares a top-level public interface
pub fn is_interface_file(path: &Path) -> Result<bool> {
    Ok(read_source(path)?.lines().any(is_interface_declaration))
}

pub fn is_java_file(name: &str) -> bool {
    name.ends_with(".java")
}
