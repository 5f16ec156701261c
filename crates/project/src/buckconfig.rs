use crate::error::{ProjectError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

pub const BUCKCONFIG_FILE: &str = ".buckconfig";

static SRC_ROOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*src_roots\s*=\s*(.*)$").expect("valid src_roots regex"));

/// Comma separated roots of a `src_roots = ...` line
pub fn source_roots_line(line: &str) -> Option<Vec<String>> {
    let caps = SRC_ROOTS.captures(line.trim_end())?;
    Some(
        caps.get(1)?
            .as_str()
            .split(',')
            .map(str::trim)
            .filter(|root| !root.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Source roots of the last `src_roots` line; empty when there is none
pub fn source_roots_in(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(source_roots_line)
        .last()
        .unwrap_or_default()
}

pub fn read_source_roots(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| ProjectError::io(path, source))?;
    Ok(source_roots_in(&text))
}

/// Text of a fresh `.buckconfig`
pub fn render_buckconfig<'a>(
    source_roots: &[PathBuf],
    repositories: impl IntoIterator<Item = &'a str>,
) -> String {
    let roots: Vec<String> = source_roots
        .iter()
        .map(|root| format!("/{}", root.to_string_lossy().replace('\\', "/")))
        .collect();
    let repositories: Vec<String> = repositories
        .into_iter()
        .enumerate()
        .map(|(i, url)| format!("  mvn{i} = {url}\n"))
        .collect();

    format!(
        r"[java]
    ; Indicates that any folder named src or test
    ; are folders that contain Java code.
    src_roots = {roots}
[project]
  ignore = \
    .git, \
    .buckd, \
    .gradle, \
    build, \
    proguard
  temp_files = \
    .*\.swp$, \
    ^#.*#$, .*~$, \
    .*___jb_bak___$, .*___jb_old___$, \
    .*\.ap_$
[cache]
  mode = dir
  dir = buck-cache
  dir_max_size = 10GB
[download]
  in_build = true

[maven_repositories]
{repositories}",
        roots = roots.join(","),
        repositories = repositories.concat(),
    )
}

/// Write `.buckconfig` unless one exists; returns whether it was written
pub fn write_buckconfig_if_missing<'a>(
    project_root: &Path,
    source_roots: &[PathBuf],
    repositories: impl IntoIterator<Item = &'a str>,
) -> Result<bool> {
    let path = project_root.join(BUCKCONFIG_FILE);
    if path.exists() {
        log::debug!("Keeping existing {}", path.display());
        return Ok(false);
    }
    fs::write(&path, render_buckconfig(source_roots, repositories))
        .map_err(|source| ProjectError::io(&path, source))?;
    log::info!("Wrote {}", path.display());
    Ok(true)
}
