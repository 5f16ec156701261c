use crate::target::BuildTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Targets known to need the platform flavoured library kind.
///
/// The set only grows during a run. It is passed explicitly between the class
/// index, the rule generator and the convergence loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLibrarySet {
    targets: BTreeSet<BuildTarget>,
}

impl PlatformLibrarySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the target was not yet a member
    pub fn insert(&mut self, target: BuildTarget) -> bool {
        self.targets.insert(target)
    }

    pub fn contains(&self, target: &BuildTarget) -> bool {
        self.targets.contains(target)
    }

    /// Whether any of the given targets is a member
    pub fn contains_any<'a>(&self, targets: impl IntoIterator<Item = &'a BuildTarget>) -> bool {
        targets.into_iter().any(|target| self.contains(target))
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = BuildTarget>) {
        self.targets.extend(other);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildTarget> {
        self.targets.iter()
    }
}

impl FromIterator<BuildTarget> for PlatformLibrarySet {
    fn from_iter<I: IntoIterator<Item = BuildTarget>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(raw: &str) -> BuildTarget {
        BuildTarget::parse(raw).unwrap()
    }

    #[test]
    fn membership_checks_any_dependency() {
        let mut set = PlatformLibrarySet::new();
        assert!(set.insert(target("//libs:support-aar")));
        assert!(!set.insert(target("//libs:support-aar")));

        let deps = [target("//a:a"), target("//libs:support-aar")];
        assert!(set.contains_any(deps.iter()));
        assert!(!set.contains_any([target("//a:a")].iter()));
        assert_eq!(set.len(), 1);
    }
}
