use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Library flavour of a generated rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibraryKind {
    /// Plain `java_library`
    #[default]
    #[serde(rename = "java_library")]
    Java,

    /// Platform flavoured `android_library`
    #[serde(rename = "android_library")]
    Android,
}

impl LibraryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            LibraryKind::Java => "java_library",
            LibraryKind::Android => "android_library",
        }
    }

    pub const fn is_platform(self) -> bool {
        matches!(self, LibraryKind::Android)
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LibraryKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "java_library" => Ok(LibraryKind::Java),
            "android_library" => Ok(LibraryKind::Android),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// Rule types the synthesizer queries from the build tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    PrebuiltJar,
    AndroidPrebuiltAar,
    AndroidBuildConfig,
    AndroidResource,
    JavaLibrary,
    AndroidLibrary,
}

impl RuleType {
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleType::PrebuiltJar => "prebuilt_jar",
            RuleType::AndroidPrebuiltAar => "android_prebuilt_aar",
            RuleType::AndroidBuildConfig => "android_build_config",
            RuleType::AndroidResource => "android_resource",
            RuleType::JavaLibrary => "java_library",
            RuleType::AndroidLibrary => "android_library",
        }
    }

    /// Binary attribute used by prebuilt archive rules
    pub const fn binary_field(self) -> Option<&'static str> {
        match self {
            RuleType::PrebuiltJar => Some("binary_jar"),
            RuleType::AndroidPrebuiltAar => Some("aar"),
            _ => None,
        }
    }
}

impl From<LibraryKind> for RuleType {
    fn from(kind: LibraryKind) -> Self {
        match kind {
            LibraryKind::Java => RuleType::JavaLibrary,
            LibraryKind::Android => RuleType::AndroidLibrary,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
