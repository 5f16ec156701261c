//! # Buckify Graph
//!
//! Repairs generated build files against the real build tool.
//!
//! ## Architecture
//!
//! ```text
//! Generated targets
//!     │
//!     ├──> Inventory (prebuilt archives, generating rules)
//!     │      └─> class index inputs
//!     │
//!     ├──> Dependency Graph (petgraph, declared deps)
//!     │      └─> suspected cycles before building
//!     │
//!     ├──> Convergence Loop
//!     │      ├─ build every target
//!     │      ├─ diagnose failures (missing deps, cycles)
//!     │      └─ patch declarations until a pass changes nothing
//!     │
//!     └──> Cycle Analyzer
//!            ├─ input files per cycle member
//!            └─ suggested edge to remove
//! ```

mod convergence;
mod cycle;
pub mod diagnostics;
mod editor;
mod error;
mod graph;
mod inventory;
mod tool;

pub use convergence::{ConvergenceLoop, ConvergenceOptions, ConvergenceReport, PassSummary};
pub use cycle::{CycleAnalyzer, CycleReport, EdgeComparison, SuggestedEdge};
pub use diagnostics::Diagnosis;
pub use editor::DeclarationEditor;
pub use error::{GraphError, Result};
pub use graph::DependencyGraph;
pub use inventory::{Inventory, InventoryCollector};
pub use tool::{parse_show_output, parse_target_lines, BuckCli, BuildTool, ToolOutput};
