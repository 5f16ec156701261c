//! Line-oriented reading and rewriting of rule declarations.
//!
//! The generated build files have a narrow, templated shape, so every
//! construct is recognized by a single line pattern instead of a parser.

use crate::kind::LibraryKind;
use crate::target::BuildTarget;
use crate::templates::render_deps_block;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static NAME_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*name\s*=\s*'(\S*)'").expect("valid name regex"));
static DEP_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*'(\S*)',").expect("valid dep regex"));
static DEPS_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*deps\s*=\s*\[$").expect("valid deps regex"));
static RULE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\($").expect("valid rule regex"));
static STRING_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*'([^']*)'").expect("valid attribute regex")
});

/// Rule name declared on a `name = '<rule>'` line
pub fn name_declaration(line: &str) -> Option<&str> {
    NAME_DECLARATION
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Dependency listed on a `'<target>',` line
pub fn dep_declaration(line: &str) -> Option<&str> {
    DEP_DECLARATION
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Opening `deps = [` line of a multi-line dependency list
pub fn is_deps_start(line: &str) -> bool {
    DEPS_START.is_match(line)
}

/// Closing `],` line of a list
pub fn is_list_end(line: &str) -> bool {
    line.trim_end().ends_with("],")
}

/// Rule type on an opening `<type>(` line
pub fn rule_opening(line: &str) -> Option<&str> {
    RULE_OPEN
        .captures(line.trim_end())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Closing `)` line of a rule
pub fn is_rule_close(line: &str) -> bool {
    line.trim() == ")"
}

/// `attribute = 'value'` pair on a single line
pub fn string_attribute(line: &str) -> Option<(&str, &str)> {
    let caps = STRING_ATTRIBUTE.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Rule found in a build file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredRule {
    pub rule_type: String,
    pub name: String,
}

/// Rules declared in a build file, in file order
pub fn declared_rules(text: &str) -> Vec<DeclaredRule> {
    let mut rules = Vec::new();
    let mut open: Option<&str> = None;
    for line in text.lines() {
        if let Some(rule_type) = rule_opening(line) {
            open = Some(rule_type);
        } else if let Some(rule_type) = open.take() {
            if let Some(name) = name_declaration(line) {
                rules.push(DeclaredRule {
                    rule_type: rule_type.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }
    rules
}

/// Value of a single-quoted string attribute of rule `rule_name`
pub fn rule_attribute(text: &str, rule_name: &str, attribute: &str) -> Option<String> {
    let mut in_rule = false;
    for line in text.lines() {
        if !in_rule {
            in_rule = name_declaration(line) == Some(rule_name);
            continue;
        }
        if is_rule_close(line) {
            return None;
        }
        if let Some((key, value)) = string_attribute(line) {
            if key == attribute {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Dependencies of rule `rule_name`, or `None` when the rule is not declared
pub fn rule_deps(text: &str, rule_name: &str) -> Option<BTreeSet<BuildTarget>> {
    let outcome = rewrite_rule(text, rule_name, RuleEdit::default());
    outcome.found.then_some(outcome.existing_deps)
}

type DepsUpdate<'a> = Box<dyn FnOnce(&BTreeSet<BuildTarget>) -> BTreeSet<BuildTarget> + 'a>;

/// Requested change to one rule
#[derive(Default)]
pub struct RuleEdit<'a> {
    deps: Option<DepsUpdate<'a>>,
    kind: Option<LibraryKind>,
}

impl<'a> RuleEdit<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dependency set with the result of `update`
    pub fn deps(
        mut self,
        update: impl FnOnce(&BTreeSet<BuildTarget>) -> BTreeSet<BuildTarget> + 'a,
    ) -> Self {
        self.deps = Some(Box::new(update));
        self
    }

    /// Force the rule type of the declaration
    pub fn kind(mut self, kind: Option<LibraryKind>) -> Self {
        self.kind = kind;
        self
    }
}

/// Result of rewriting one rule
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    /// The rule name was declared in the text
    pub found: bool,
    /// Dependencies listed before the rewrite
    pub existing_deps: BTreeSet<BuildTarget>,
    /// Dependencies listed after the rewrite (equal to `existing_deps` without a deps update)
    pub new_deps: BTreeSet<BuildTarget>,
    /// The rule type line was rewritten
    pub kind_changed: bool,
    /// The text differs from the input
    pub changed: bool,
    /// Rewritten text, identical to the input when nothing changed
    pub text: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Searching,
    InRule,
    InDeps,
    Done,
}

/// Rewrite the dependency list and/or rule type of `rule_name`.
///
/// Lines outside the matched rule's type line and dependency block are kept
/// verbatim. Dependency lines that are not valid targets survive the rewrite
/// unchanged. An unknown rule name leaves the text untouched.
pub fn rewrite_rule(text: &str, rule_name: &str, edit: RuleEdit<'_>) -> Rewrite {
    let RuleEdit { deps: update, kind } = edit;
    let mut update = update;
    let mut out: Vec<String> = Vec::new();
    let mut existing = BTreeSet::new();
    let mut opaque: BTreeSet<String> = BTreeSet::new();
    let mut new_deps: Option<BTreeSet<BuildTarget>> = None;
    let mut found = false;
    let mut kind_changed = false;
    let mut scan = Scan::Searching;

    for line in text.lines() {
        match scan {
            Scan::Searching => {
                if name_declaration(line) == Some(rule_name) {
                    found = true;
                    if let (Some(kind), Some(opening)) = (kind, out.last_mut()) {
                        if !opening.starts_with(kind.as_str()) {
                            *opening = format!("{kind}(");
                            kind_changed = true;
                        }
                    }
                    scan = Scan::InRule;
                }
                out.push(line.to_string());
            }
            Scan::InRule => {
                if is_deps_start(line) {
                    scan = Scan::InDeps;
                    if update.is_none() {
                        out.push(line.to_string());
                    }
                } else {
                    if is_rule_close(line) {
                        scan = Scan::Done;
                    }
                    out.push(line.to_string());
                }
            }
            Scan::InDeps => {
                if is_list_end(line) {
                    scan = Scan::Done;
                    match update.take() {
                        Some(update) => {
                            let next = update(&existing);
                            let rendered: Vec<String> = next
                                .iter()
                                .map(|dep| dep.to_string())
                                .chain(opaque.iter().cloned())
                                .collect();
                            out.extend(render_deps_block(rendered.iter().map(String::as_str)));
                            new_deps = Some(next);
                        }
                        None => out.push(line.to_string()),
                    }
                } else {
                    if let Some(dep) = dep_declaration(line) {
                        match BuildTarget::parse(dep) {
                            Ok(target) => {
                                existing.insert(target);
                            }
                            Err(_) => {
                                opaque.insert(dep.to_string());
                            }
                        }
                    }
                    if update.is_none() {
                        out.push(line.to_string());
                    }
                }
            }
            Scan::Done => out.push(line.to_string()),
        }
    }

    if scan == Scan::InDeps {
        log::warn!("Unterminated deps list for rule '{rule_name}', leaving it untouched");
        return Rewrite {
            found,
            new_deps: existing.clone(),
            existing_deps: existing,
            text: text.to_string(),
            ..Rewrite::default()
        };
    }

    let deps_changed = new_deps.as_ref().is_some_and(|next| next != &existing);
    let changed = deps_changed || kind_changed;
    let text = if changed {
        let mut joined = out.join("\n");
        if text.ends_with('\n') {
            joined.push('\n');
        }
        joined
    } else {
        text.to_string()
    };

    Rewrite {
        found,
        new_deps: new_deps.unwrap_or_else(|| existing.clone()),
        existing_deps: existing,
        kind_changed,
        changed,
        text,
    }
}
