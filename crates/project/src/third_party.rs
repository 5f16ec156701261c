use crate::error::{ProjectError, Result};
use crate::maven::{ResolvedArtifact, MAVEN_SCHEME};
use buckify_protocol::declaration::declared_rules;
use buckify_protocol::templates::{render_remote_artifact, RemoteArtifact};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Appends prebuilt + `remote_file` rules to the third-party build file
pub struct ThirdPartyWriter {
    build_file: PathBuf,
}

impl ThirdPartyWriter {
    pub fn new(build_file: impl Into<PathBuf>) -> Self {
        Self {
            build_file: build_file.into(),
        }
    }

    pub fn build_file(&self) -> &Path {
        &self.build_file
    }

    /// Rule names already declared in the third-party build file
    pub fn declared_names(&self) -> Result<BTreeSet<String>> {
        match fs::read_to_string(&self.build_file) {
            Ok(text) => Ok(declared_rules(&text)
                .into_iter()
                .map(|rule| rule.name)
                .collect()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(source) => Err(ProjectError::io(&self.build_file, source)),
        }
    }

    /// Append rules for artifacts whose name is not yet taken, either by
    /// `existing` prebuilt targets or by the file itself. Returns the names
    /// written.
    pub fn append<'a>(
        &self,
        artifacts: impl IntoIterator<Item = &'a ResolvedArtifact>,
        existing: &BTreeSet<String>,
    ) -> Result<Vec<String>> {
        let mut taken = self.declared_names()?;
        taken.extend(existing.iter().cloned());

        let mut text = String::new();
        let mut written = Vec::new();
        for artifact in artifacts {
            if !taken.insert(artifact.name().to_string()) {
                log::debug!("{} is already declared", artifact.name());
                continue;
            }
            let coordinate = artifact.qualified_coordinate();
            text.push_str(&render_remote_artifact(&RemoteArtifact {
                name: artifact.name(),
                rule_type: artifact.kind.rule_type(),
                repository: MAVEN_SCHEME,
                coordinate: &coordinate,
                sha1: &artifact.sha1,
            }));
            written.push(artifact.name().to_string());
        }

        if written.is_empty() {
            return Ok(written);
        }
        if let Some(parent) = self.build_file.parent() {
            fs::create_dir_all(parent).map_err(|source| ProjectError::io(parent, source))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.build_file)
            .map_err(|source| ProjectError::io(&self.build_file, source))?;
        file.write_all(text.as_bytes())
            .map_err(|source| ProjectError::io(&self.build_file, source))?;

        log::info!(
            "Declared {} third-party artifacts in {}",
            written.len(),
            self.build_file.display()
        );
        Ok(written)
    }
}
