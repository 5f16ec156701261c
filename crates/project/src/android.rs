use crate::error::{ProjectError, Result};
use crate::gradle::ANDROID_MANIFEST;
use buckify_protocol::templates::{render_android_build_config, render_android_resource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static MANIFEST_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<manifest\b[^>]*?\bpackage\s*=\s*["']([^"']+)["']"#)
        .expect("valid manifest package regex")
});

/// `package` attribute of the manifest's root element
pub fn manifest_package(manifest: &str) -> Option<&str> {
    MANIFEST_PACKAGE
        .captures(manifest)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Writes `android_build_config` and `android_resource` rules next to manifests
pub struct AndroidRuleWriter<'a> {
    build_file_name: &'a str,
}

impl<'a> AndroidRuleWriter<'a> {
    pub fn new(build_file_name: &'a str) -> Self {
        Self { build_file_name }
    }

    /// Returns the build files written; directories that have one are skipped
    pub fn write_all<'p>(
        &self,
        directories: impl IntoIterator<Item = &'p Path>,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for directory in directories {
            if let Some(path) = self.write(directory)? {
                written.push(path);
            }
        }
        Ok(written)
    }

    pub fn write(&self, directory: &Path) -> Result<Option<PathBuf>> {
        let build_file = directory.join(self.build_file_name);
        if build_file.exists() {
            return Ok(None);
        }

        let manifest_path = directory.join(ANDROID_MANIFEST);
        let manifest = fs::read_to_string(&manifest_path)
            .map_err(|source| ProjectError::io(&manifest_path, source))?;
        let Some(package) = manifest_package(&manifest) else {
            log::warn!("{} declares no package", manifest_path.display());
            return Ok(None);
        };

        let mut text = render_android_build_config(package);
        if directory.join("res").is_dir() {
            text.push_str(&render_android_resource(package));
        }
        fs::write(&build_file, text).map_err(|source| ProjectError::io(&build_file, source))?;
        log::debug!("Wrote Android rules for {package} to {}", build_file.display());
        Ok(Some(build_file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn reads_manifest_package() {
        let manifest = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.app">
    <application android:label="@string/app_name" />
</manifest>"#;
        assert_eq!(manifest_package(manifest), Some("com.example.app"));
        assert_eq!(
            manifest_package("<manifest><uses-sdk package=\"nope\"/></manifest>"),
            None
        );
    }

    #[test]
    fn writes_build_config_and_resource_rules() {
        let temp = tempdir().unwrap();
        let main = temp.path().join("app/src/main");
        fs::create_dir_all(main.join("res")).unwrap();
        fs::write(
            main.join(ANDROID_MANIFEST),
            "<manifest package=\"com.example.app\"/>",
        )
        .unwrap();

        let writer = AndroidRuleWriter::new("BUCK");
        let written = writer.write_all([main.as_path()]).unwrap();
        assert_eq!(written, vec![main.join("BUCK")]);

        let text = fs::read_to_string(main.join("BUCK")).unwrap();
        assert!(text.starts_with("android_build_config(\n  name = 'build-config',\n  package = 'com.example.app',\n"));
        assert!(text.contains("android_resource(\n  name = 'res',\n"));

        assert_eq!(writer.write(&main).unwrap(), None);
    }

    #[test]
    fn skips_resource_rule_without_res_directory() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join(ANDROID_MANIFEST),
            "<manifest package='com.example.lib'/>",
        )
        .unwrap();

        AndroidRuleWriter::new("BUCK").write(temp.path()).unwrap();
        let text = fs::read_to_string(temp.path().join("BUCK")).unwrap();
        assert!(!text.contains("android_resource"));
    }
}
