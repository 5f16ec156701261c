//! Text templates for the generated build files.

use crate::kind::{LibraryKind, RuleType};
use crate::target::BuildTarget;
use std::collections::BTreeSet;

/// Name of the list variable holding interface-only sources
pub const INTERFACE_FILES_VAR: &str = "INTERFACE_FILES";

/// Sources expression of a main rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sources {
    /// Every `.java` file of the directory
    All,
    /// Every `.java` file except the interface list
    AllExceptInterfaces,
    /// Exactly the interface list
    Interfaces,
}

impl Sources {
    pub fn expression(self) -> String {
        match self {
            Sources::All => "glob(['*.java'])".to_string(),
            Sources::AllExceptInterfaces => {
                format!("glob(['*.java'], excludes={INTERFACE_FILES_VAR})")
            }
            Sources::Interfaces => INTERFACE_FILES_VAR.to_string(),
        }
    }
}

/// One line per dependency, sorted and deduplicated
pub fn format_dep_lines<'a>(deps: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    deps.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|dep| format!("     '{dep}',"))
        .collect()
}

/// `deps = [...]` block, opening and closing lines included
pub fn render_deps_block<'a>(deps: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut lines = vec!["  deps = [".to_string()];
    lines.extend(format_dep_lines(deps));
    lines.push("  ],".to_string());
    lines
}

pub fn render_library_rule(
    kind: LibraryKind,
    name: &str,
    sources: Sources,
    deps: &BTreeSet<BuildTarget>,
) -> String {
    let mut out = format!(
        "{kind}(\n  name = '{name}',\n  srcs = {},\n",
        sources.expression()
    );
    for line in render_deps_block(deps.iter().map(BuildTarget::as_str)) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("  visibility = [\n    'PUBLIC',\n  ],\n)\n\n");
    out
}

pub fn render_interface_files<'a>(files: impl IntoIterator<Item = &'a str>) -> String {
    let entries: Vec<String> = files
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|file| format!("  '{file}',"))
        .collect();
    format!("{INTERFACE_FILES_VAR} = [\n{}\n]\n\n", entries.join("\n"))
}

pub fn render_android_resource(package: &str) -> String {
    format!(
        "android_resource(\n  name = 'res',\n  package = '{package}',\n  res = 'res',\n  deps = [\n  ],\n  visibility = [\n    'PUBLIC',\n  ],\n)\n\n"
    )
}

pub fn render_android_build_config(package: &str) -> String {
    format!(
        "android_build_config(\n  name = 'build-config',\n  package = '{package}',\n  visibility = [\n    'PUBLIC',\n  ],\n)\n\n"
    )
}

/// Prebuilt archive rule fetched through a `remote_file` rule
pub struct RemoteArtifact<'a> {
    pub name: &'a str,
    pub rule_type: RuleType,
    pub repository: &'a str,
    pub coordinate: &'a str,
    pub sha1: &'a str,
}

pub fn render_remote_artifact(artifact: &RemoteArtifact<'_>) -> String {
    let field = artifact.rule_type.binary_field().unwrap_or("binary_jar");
    format!(
        "\n{rule}(\n  name = '{name}',\n  {field} = ':{name}-jar',\n  visibility = [\n    'PUBLIC',\n  ],\n)\n\nremote_file(\n  name = '{name}-jar',\n  url = '{repo}:{coordinate}',\n  sha1 = '{sha1}',\n)\n\n",
        rule = artifact.rule_type,
        name = artifact.name,
        repo = artifact.repository,
        coordinate = artifact.coordinate,
        sha1 = artifact.sha1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn library_rule_lists_sorted_deps() {
        let deps: BTreeSet<BuildTarget> = ["//z:z", "//a:a"]
            .iter()
            .map(|id| BuildTarget::parse(id).unwrap())
            .collect();
        let text = render_library_rule(LibraryKind::Java, "foo", Sources::All, &deps);
        assert_eq!(
            text,
            "java_library(\n  name = 'foo',\n  srcs = glob(['*.java']),\n  deps = [\n     '//a:a',\n     '//z:z',\n  ],\n  visibility = [\n    'PUBLIC',\n  ],\n)\n\n"
        );
    }

    #[test]
    fn main_rule_excludes_interface_list() {
        let text = render_library_rule(
            LibraryKind::Android,
            "foo",
            Sources::AllExceptInterfaces,
            &BTreeSet::new(),
        );
        assert!(text.starts_with("android_library(\n"));
        assert!(text.contains("srcs = glob(['*.java'], excludes=INTERFACE_FILES),"));
        assert!(text.contains("  deps = [\n  ],\n"));
    }

    #[test]
    fn interface_list_is_sorted() {
        let text = render_interface_files(["Zed.java", "Api.java"]);
        assert_eq!(
            text,
            "INTERFACE_FILES = [\n  'Api.java',\n  'Zed.java',\n]\n\n"
        );
    }

    #[test]
    fn remote_artifact_pairs_prebuilt_with_remote_file() {
        let text = render_remote_artifact(&RemoteArtifact {
            name: "support-annotations",
            rule_type: RuleType::AndroidPrebuiltAar,
            repository: "mvn",
            coordinate: "com.android.support:support-annotations:aar:23.1.1",
            sha1: "abc",
        });
        assert!(text.contains("android_prebuilt_aar(\n  name = 'support-annotations',\n  aar = ':support-annotations-jar',"));
        assert!(text.contains("url = 'mvn:com.android.support:support-annotations:aar:23.1.1',"));
        assert!(text.contains("sha1 = 'abc',"));
    }
}
