use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Build target identifier (`//<directory>:<rule>`)
///
/// Targets order by their textual form, which is what the emitted dependency
/// lists are sorted by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildTarget {
    id: String,
    colon: usize,
}

impl BuildTarget {
    /// Parse a target identifier.
    ///
    /// Accepts fully qualified (`//a/b:c`), cell qualified (`cell//a:c`) and
    /// package relative (`:c`) forms. The rule name must be non-empty and the
    /// identifier must not contain whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidTarget(raw.to_string()));
        }
        let colon = raw
            .rfind(':')
            .ok_or_else(|| ProtocolError::InvalidTarget(raw.to_string()))?;
        if colon + 1 == raw.len() {
            return Err(ProtocolError::InvalidTarget(raw.to_string()));
        }
        Ok(Self {
            id: raw.to_string(),
            colon,
        })
    }

    /// Target for the rule `name` declared in `directory` (relative to the project root)
    pub fn for_directory(directory: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = directory
            .as_ref()
            .to_string_lossy()
            .replace('\\', "/")
            .trim_matches('/')
            .to_string();
        let dir = dir.strip_prefix("./").unwrap_or(&dir).to_string();
        let dir = if dir == "." { String::new() } else { dir };
        Self::parse(&format!("//{dir}:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Rule name after the colon
    pub fn rule_name(&self) -> &str {
        &self.id[self.colon + 1..]
    }

    /// Directory part without the leading `//` (and without any cell prefix)
    pub fn directory(&self) -> &str {
        let base = &self.id[..self.colon];
        match base.find("//") {
            Some(idx) => &base[idx + 2..],
            None => base,
        }
    }

    /// Whether the target is written relative to its own package (`:name`)
    pub fn is_relative(&self) -> bool {
        self.colon == 0
    }

    /// Location of the build file declaring this target
    pub fn build_file(&self, project_root: &Path, build_file_name: &str) -> PathBuf {
        let dir = self.directory();
        if dir.is_empty() {
            project_root.join(build_file_name)
        } else {
            project_root.join(dir).join(build_file_name)
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl FromStr for BuildTarget {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BuildTarget {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<BuildTarget> for String {
    fn from(value: BuildTarget) -> Self {
        value.id
    }
}

impl AsRef<str> for BuildTarget {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_fully_qualified_target() {
        let target = BuildTarget::parse("//java/src/foo:foo-interfaces").unwrap();
        assert_eq!(target.directory(), "java/src/foo");
        assert_eq!(target.rule_name(), "foo-interfaces");
        assert!(!target.is_relative());
    }

    #[test]
    fn parses_relative_and_cell_targets() {
        let relative = BuildTarget::parse(":res").unwrap();
        assert!(relative.is_relative());
        assert_eq!(relative.directory(), "");

        let cell = BuildTarget::parse("third//libs:guava").unwrap();
        assert_eq!(cell.directory(), "libs");
        assert_eq!(cell.rule_name(), "guava");
    }

    #[test]
    fn rejects_malformed_targets() {
        assert!(BuildTarget::parse("").is_err());
        assert!(BuildTarget::parse("//a/b").is_err());
        assert!(BuildTarget::parse("//a:").is_err());
        assert!(BuildTarget::parse("//a: b").is_err());
    }

    #[test]
    fn orders_by_textual_form() {
        let mut targets = vec![
            BuildTarget::parse("//a:b").unwrap(),
            BuildTarget::parse("//a/b:c").unwrap(),
            BuildTarget::parse("//a:a").unwrap(),
        ];
        targets.sort();
        let ids: Vec<_> = targets.iter().map(BuildTarget::as_str).collect();
        assert_eq!(ids, vec!["//a/b:c", "//a:a", "//a:b"]);
    }

    #[test]
    fn builds_target_for_directory() {
        let target = BuildTarget::for_directory("app/src/main/java/com/foo", "foo").unwrap();
        assert_eq!(target.as_str(), "//app/src/main/java/com/foo:foo");
        assert_eq!(
            target.build_file(Path::new("/p"), "BUCK"),
            PathBuf::from("/p/app/src/main/java/com/foo/BUCK")
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let target = BuildTarget::parse("//a:a").unwrap();
        assert_eq!(serde_json::to_string(&target).unwrap(), "\"//a:a\"");
        let back: BuildTarget = serde_json::from_str("\"//b:b\"").unwrap();
        assert_eq!(back.rule_name(), "b");
    }
}
