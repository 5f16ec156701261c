use crate::error::{ProtocolError, Result};
use crate::target::BuildTarget;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered targets where each depends on the next and the last on the first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyCycle {
    targets: Vec<BuildTarget>,
}

impl DependencyCycle {
    /// Build a cycle, dropping a trailing repeat of the first target
    /// (`a -> b -> a` and `a -> b` describe the same cycle).
    pub fn new(mut targets: Vec<BuildTarget>) -> Result<Self> {
        if targets.len() > 1 && targets.first() == targets.last() {
            targets.pop();
        }
        if targets.is_empty() {
            return Err(ProtocolError::EmptyCycle);
        }
        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Edges `(current, next)`, wrapping from the last target to the first
    pub fn edges(&self) -> impl Iterator<Item = (&BuildTarget, &BuildTarget)> {
        let len = self.targets.len();
        (0..len).map(move |i| (&self.targets[i], &self.targets[(i + 1) % len]))
    }

    /// Same cycle regardless of the member it starts at
    pub fn is_rotation_of(&self, other: &DependencyCycle) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let Some(start) = other.targets.iter().position(|t| t == &self.targets[0]) else {
            return false;
        };
        (0..self.len()).all(|i| self.targets[i] == other.targets[(start + i) % other.len()])
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.targets.iter().map(BuildTarget::as_str).collect();
        write!(f, "{}", joined.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cycle(ids: &[&str]) -> DependencyCycle {
        DependencyCycle::new(ids.iter().map(|id| BuildTarget::parse(id).unwrap()).collect())
            .unwrap()
    }

    #[test]
    fn edges_wrap_around() {
        let c = cycle(&["//a:a", "//b:b", "//c:c"]);
        let edges: Vec<_> = c
            .edges()
            .map(|(from, to)| format!("{from}->{to}"))
            .collect();
        assert_eq!(edges, vec!["//a:a->//b:b", "//b:b->//c:c", "//c:c->//a:a"]);
    }

    #[test]
    fn closing_repeat_is_dropped() {
        let c = cycle(&["//a:a", "//b:b", "//a:a"]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.to_string(), "//a:a -> //b:b");
    }

    #[test]
    fn rotations_are_the_same_cycle() {
        let a = cycle(&["//a:a", "//b:b", "//c:c"]);
        let b = cycle(&["//c:c", "//a:a", "//b:b"]);
        let reversed = cycle(&["//c:c", "//b:b", "//a:a"]);
        assert!(a.is_rotation_of(&b));
        assert!(!a.is_rotation_of(&reversed));
    }

    #[test]
    fn empty_cycle_is_rejected() {
        assert!(DependencyCycle::new(Vec::new()).is_err());
    }
}
