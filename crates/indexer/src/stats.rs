use serde::Serialize;

/// Statistics about a rule generation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStats {
    /// Directories containing Java sources
    pub directories: usize,

    /// Directories skipped because a build file already exists
    pub skipped_existing: usize,

    /// Build files written
    pub build_files: usize,

    /// Main rules emitted
    pub main_rules: usize,

    /// Interface-only rules emitted
    pub interface_rules: usize,

    /// Rules emitted with the platform library kind
    pub platform_rules: usize,

    /// Imports resolved to a target or to the same directory
    pub resolved_imports: usize,

    /// Imports left unresolved
    pub unresolved_imports: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl GenerationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> usize {
        self.main_rules + self.interface_rules
    }

    pub fn add_imports(&mut self, resolved: usize, unresolved: usize) {
        self.resolved_imports += resolved;
        self.unresolved_imports += unresolved;
    }
}
