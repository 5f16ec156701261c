//! Recognizers for the build tool's failure reports.
//!
//! Two report forms carry missing dependencies:
//!
//! ```text
//! Try adding the following deps:
//! //b:b
//! //c:c
//!
//! //a:a is missing deps:
//!   '//b:b',
//! ```
//!
//! and a cycle is reported on a single line:
//!
//! ```text
//! BUILD FAILED: Cycle found: //a:a -> //b:b -> //a:a
//! ```

use buckify_protocol::declaration::dep_declaration;
use buckify_protocol::{BuildTarget, DependencyCycle};
use std::collections::BTreeSet;

pub const TRY_ADDING_HEADER: &str = "Try adding the following deps:";
pub const MISSING_DEPS_SUFFIX: &str = " is missing deps:";
pub const CYCLE_PREFIX: &str = "BUILD FAILED: Cycle found: ";
const CYCLE_SEPARATOR: &str = " -> ";

/// What a failed build asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    MissingDeps(BTreeSet<BuildTarget>),
    Cycle(DependencyCycle),
    Unrecognized,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    TryAdding,
    MissingDeps,
}

/// Dependencies the tool reports as missing for `target`, never `target` itself
pub fn missing_deps(target: &BuildTarget, output: &str) -> BTreeSet<BuildTarget> {
    let mut raw: Vec<&str> = Vec::new();
    let mut block = Block::None;

    for line in output.lines().map(str::trim) {
        match block {
            _ if line == TRY_ADDING_HEADER => block = Block::TryAdding,
            Block::TryAdding => {
                if line.is_empty() {
                    block = Block::None;
                } else {
                    raw.push(line);
                }
            }
            _ if line.ends_with(MISSING_DEPS_SUFFIX) => block = Block::MissingDeps,
            Block::MissingDeps => match dep_declaration(line) {
                Some(dep) => raw.push(dep),
                None => block = Block::None,
            },
            Block::None => {}
        }
    }

    raw.into_iter()
        .filter_map(|dep| match BuildTarget::parse(dep) {
            Ok(dep) => Some(dep),
            Err(err) => {
                log::debug!("Ignoring suggested dep '{dep}' of {target}: {err}");
                None
            }
        })
        .filter(|dep| dep != target)
        .collect()
}

/// Targets of a `BUILD FAILED: Cycle found:` line
pub fn cycle_line(line: &str) -> Option<Vec<&str>> {
    let rest = line.trim_end().strip_prefix(CYCLE_PREFIX)?;
    let members: Vec<&str> = rest.split(CYCLE_SEPARATOR).map(str::trim).collect();
    if members.iter().any(|member| member.is_empty()) {
        return None;
    }
    Some(members)
}

/// First well-formed cycle reported in the output
pub fn find_cycle(output: &str) -> Option<DependencyCycle> {
    output.lines().filter_map(cycle_line).find_map(|members| {
        let targets = members
            .into_iter()
            .map(BuildTarget::parse)
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        DependencyCycle::new(targets).ok()
    })
}

/// Classify a failed build of `target`; missing deps take precedence
pub fn diagnose(target: &BuildTarget, output: &str) -> Diagnosis {
    let missing = missing_deps(target, output);
    if !missing.is_empty() {
        return Diagnosis::MissingDeps(missing);
    }
    match find_cycle(output) {
        Some(cycle) => Diagnosis::Cycle(cycle),
        None => Diagnosis::Unrecognized,
    }
}
