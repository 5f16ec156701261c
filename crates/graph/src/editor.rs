use crate::error::{GraphError, Result};
use buckify_protocol::{rewrite_rule, rule_attribute, rule_deps, BuildTarget, Rewrite, RuleEdit};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads and patches rule declarations in their build files
#[derive(Debug, Clone)]
pub struct DeclarationEditor {
    project_root: PathBuf,
    build_file_name: String,
}

impl DeclarationEditor {
    pub fn new(project_root: impl Into<PathBuf>, build_file_name: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            build_file_name: build_file_name.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn build_file(&self, target: &BuildTarget) -> PathBuf {
        target.build_file(&self.project_root, &self.build_file_name)
    }

    /// Build file text of the target, `None` when the file does not exist
    pub fn read(&self, target: &BuildTarget) -> Result<Option<String>> {
        let path = self.build_file(target);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(GraphError::io(path, source)),
        }
    }

    /// Current dependencies, `None` when the rule is not declared
    pub fn deps(&self, target: &BuildTarget) -> Result<Option<BTreeSet<BuildTarget>>> {
        Ok(self
            .read(target)?
            .and_then(|text| rule_deps(&text, target.rule_name())))
    }

    /// String attribute of the target's rule, e.g. `package`
    pub fn attribute(&self, target: &BuildTarget, attribute: &str) -> Result<Option<String>> {
        Ok(self
            .read(target)?
            .and_then(|text| rule_attribute(&text, target.rule_name(), attribute)))
    }

    /// Apply an edit; the file is only written when its text changes
    pub fn edit(&self, target: &BuildTarget, edit: RuleEdit<'_>) -> Result<Rewrite> {
        let Some(text) = self.read(target)? else {
            log::debug!("No build file for {target}, nothing to edit");
            return Ok(Rewrite::default());
        };
        let rewrite = rewrite_rule(&text, target.rule_name(), edit);
        if !rewrite.found {
            log::debug!("{target} is not declared in {}", self.build_file(target).display());
        }
        if rewrite.changed {
            self.write(target, &rewrite.text)?;
            log::debug!(
                "Rewrote {target}: {} -> {} deps{}",
                rewrite.existing_deps.len(),
                rewrite.new_deps.len(),
                if rewrite.kind_changed { ", kind changed" } else { "" }
            );
        }
        Ok(rewrite)
    }

    /// Put back a build file's previous text
    pub fn restore(&self, target: &BuildTarget, text: &str) -> Result<()> {
        self.write(target, text)
    }

    fn write(&self, target: &BuildTarget, text: &str) -> Result<()> {
        let path = self.build_file(target);
        fs::write(&path, text).map_err(|source| GraphError::io(path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buckify_protocol::templates::{render_library_rule, Sources};
    use buckify_protocol::LibraryKind;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn target(raw: &str) -> BuildTarget {
        BuildTarget::parse(raw).unwrap()
    }

    fn write_rule(root: &Path, dir: &str, name: &str, deps: &[&str]) -> PathBuf {
        let deps: BTreeSet<BuildTarget> = deps.iter().map(|d| target(d)).collect();
        let path = root.join(dir).join("BUCK");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            render_library_rule(LibraryKind::Java, name, Sources::All, &deps),
        )
        .unwrap();
        path
    }

    #[test]
    fn identical_deps_leave_file_untouched() {
        let temp = tempdir().unwrap();
        let path = write_rule(temp.path(), "a", "a", &["//b:b"]);
        let before = fs::read_to_string(&path).unwrap();

        let editor = DeclarationEditor::new(temp.path(), "BUCK");
        let rewrite = editor
            .edit(&target("//a:a"), RuleEdit::new().deps(|deps| deps.clone()))
            .unwrap();

        assert!(!rewrite.changed);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn merges_deps_and_kind() {
        let temp = tempdir().unwrap();
        let path = write_rule(temp.path(), "a", "a", &["//b:b"]);

        let editor = DeclarationEditor::new(temp.path(), "BUCK");
        let a = target("//a:a");
        let rewrite = editor
            .edit(
                &a,
                RuleEdit::new()
                    .deps(|deps| {
                        let mut next = deps.clone();
                        next.insert(target("//c:c"));
                        next
                    })
                    .kind(Some(LibraryKind::Android)),
            )
            .unwrap();

        assert!(rewrite.changed);
        assert!(rewrite.kind_changed);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("android_library(\n"));
        assert_eq!(
            editor.deps(&a).unwrap(),
            Some(BTreeSet::from([target("//b:b"), target("//c:c")]))
        );
    }

    #[test]
    fn missing_build_file_is_a_no_op() {
        let temp = tempdir().unwrap();
        let editor = DeclarationEditor::new(temp.path(), "BUCK");
        let missing = target("//nowhere:x");

        assert_eq!(editor.read(&missing).unwrap(), None);
        assert_eq!(editor.deps(&missing).unwrap(), None);
        let rewrite = editor
            .edit(&missing, RuleEdit::new().deps(|_| BTreeSet::new()))
            .unwrap();
        assert!(!rewrite.found);
        assert!(!temp.path().join("nowhere").exists());
    }

    #[test]
    fn reads_package_attribute() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("app")).unwrap();
        fs::write(
            temp.path().join("app/BUCK"),
            buckify_protocol::templates::render_android_resource("com.example.app"),
        )
        .unwrap();

        let editor = DeclarationEditor::new(temp.path(), "BUCK");
        assert_eq!(
            editor.attribute(&target("//app:res"), "package").unwrap(),
            Some("com.example.app".to_string())
        );
    }
}
