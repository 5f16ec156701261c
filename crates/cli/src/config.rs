use anyhow::{Context, Result};
use buckify_indexer::{GeneratorOptions, ResolverOptions};
use buckify_protocol::LibraryKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the project root
pub const CONFIG_FILE: &str = "buckify.toml";

/// How archive class listings are obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListerKind {
    /// Read archives in process
    #[default]
    Zip,
    /// Run `jar tvf`
    JarTool,
}

/// Effective settings of a run
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizerConfig {
    pub project_root: PathBuf,
    pub buck: PathBuf,
    pub build_file_name: String,
    pub split_interfaces: bool,
    pub platform_prefixes: Vec<String>,
    pub interface_suffix: String,
    pub default_kind: LibraryKind,
    /// Relative to the project root unless absolute
    pub third_party_build_file: PathBuf,
    pub gradle_cache: Option<PathBuf>,
    pub android_home: Option<PathBuf>,
    pub lister: ListerKind,
    pub jar: PathBuf,
    pub max_passes: Option<usize>,
}

/// `buckify.toml` as written; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    buck: Option<PathBuf>,
    build_file_name: Option<String>,
    split_interfaces: Option<bool>,
    platform_prefixes: Option<Vec<String>>,
    interface_suffix: Option<String>,
    default_kind: Option<LibraryKind>,
    third_party_build_file: Option<PathBuf>,
    gradle_cache: Option<PathBuf>,
    android_home: Option<PathBuf>,
    lister: Option<ListerKind>,
    jar: Option<PathBuf>,
    max_passes: Option<usize>,
}

impl SynthesizerConfig {
    pub fn defaults(project_root: impl Into<PathBuf>) -> Self {
        let resolver = ResolverOptions::default();
        Self {
            project_root: project_root.into(),
            buck: PathBuf::from("buck"),
            build_file_name: buckify_protocol::BUILD_FILE_NAME.to_string(),
            split_interfaces: resolver.split_interfaces,
            platform_prefixes: resolver.platform_prefixes,
            interface_suffix: resolver.interface_suffix,
            default_kind: LibraryKind::Java,
            third_party_build_file: PathBuf::from("libs").join(buckify_protocol::BUILD_FILE_NAME),
            gradle_cache: dirs::home_dir().map(|home| home.join(".gradle").join("caches")),
            android_home: None,
            lister: ListerKind::Zip,
            jar: PathBuf::from("jar"),
            max_passes: None,
        }
    }

    /// Defaults overlaid with `explicit` or, without it, the project's
    /// `buckify.toml` when present
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::defaults(project_root);
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = project_root.join(CONFIG_FILE);
                candidate.is_file().then_some(candidate)
            }
        };
        if let Some(path) = path {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let raw: RawConfig = toml::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?;
            log::debug!("Loaded config from {}", path.display());
            config.merge(raw);
        }
        Ok(config)
    }

    fn merge(&mut self, raw: RawConfig) {
        if let Some(buck) = raw.buck {
            self.buck = buck;
        }
        if let Some(build_file_name) = raw.build_file_name {
            self.build_file_name = build_file_name;
        }
        if let Some(split_interfaces) = raw.split_interfaces {
            self.split_interfaces = split_interfaces;
        }
        if let Some(platform_prefixes) = raw.platform_prefixes {
            self.platform_prefixes = platform_prefixes;
        }
        if let Some(interface_suffix) = raw.interface_suffix {
            self.interface_suffix = interface_suffix;
        }
        if let Some(default_kind) = raw.default_kind {
            self.default_kind = default_kind;
        }
        if let Some(third_party_build_file) = raw.third_party_build_file {
            self.third_party_build_file = third_party_build_file;
        }
        if raw.gradle_cache.is_some() {
            self.gradle_cache = raw.gradle_cache;
        }
        if raw.android_home.is_some() {
            self.android_home = raw.android_home;
        }
        if let Some(lister) = raw.lister {
            self.lister = lister;
        }
        if let Some(jar) = raw.jar {
            self.jar = jar;
        }
        if raw.max_passes.is_some() {
            self.max_passes = raw.max_passes;
        }
    }

    /// `ANDROID_HOME` and `BUCKIFY_BUCK` override the config file
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(home) = lookup("ANDROID_HOME").filter(|value| !value.is_empty()) {
            self.android_home = Some(PathBuf::from(home));
        }
        if let Some(buck) = lookup("BUCKIFY_BUCK").filter(|value| !value.is_empty()) {
            self.buck = PathBuf::from(buck);
        }
    }

    /// Path relative to the project root unless absolute
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            resolver: ResolverOptions {
                platform_prefixes: self.platform_prefixes.clone(),
                split_interfaces: self.split_interfaces,
                interface_suffix: self.interface_suffix.clone(),
            },
            default_kind: self.default_kind,
            build_file_name: self.build_file_name.clone(),
        }
    }
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self::defaults(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn project_config_overrides_defaults() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "split_interfaces = true\nlister = \"jar-tool\"\nmax_passes = 5\ndefault_kind = \"android_library\"\n",
        )
        .unwrap();

        let config = SynthesizerConfig::load(temp.path(), None).unwrap();

        assert!(config.split_interfaces);
        assert_eq!(config.lister, ListerKind::JarTool);
        assert_eq!(config.max_passes, Some(5));
        assert_eq!(config.default_kind, LibraryKind::Android);
        assert_eq!(config.build_file_name, "BUCK");
        assert_eq!(config.third_party_build_file, PathBuf::from("libs/BUCK"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "split_interface = true\n").unwrap();

        let err = SynthesizerConfig::load(temp.path(), Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn environment_overrides_file() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "buck = \"/opt/buck/bin/buck\"\n").unwrap();
        let env = HashMap::from([
            ("ANDROID_HOME", "/opt/android-sdk"),
            ("BUCKIFY_BUCK", "/usr/local/bin/buck"),
        ]);

        let mut config = SynthesizerConfig::load(temp.path(), None).unwrap();
        config.apply_env(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.buck, PathBuf::from("/usr/local/bin/buck"));
        assert_eq!(config.android_home, Some(PathBuf::from("/opt/android-sdk")));
    }

    #[test]
    fn relative_paths_resolve_against_the_project() {
        let config = SynthesizerConfig::defaults("/work/app");
        assert_eq!(
            config.resolve_path(&config.third_party_build_file),
            PathBuf::from("/work/app/libs/BUCK")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/BUCK")),
            PathBuf::from("/abs/BUCK")
        );
    }
}
