//! # Buckify Indexer
//!
//! Infers build rules for Java source directories from their imports.
//!
//! ## Pipeline
//!
//! ```text
//! Built archives + generating rules
//!     │
//!     ├──> Class Index Builder (archive listings)
//!     │      └─> class name -> owning target
//!     │
//!     ├──> Source Scanner (recognized source roots)
//!     │      └─> source directories without a build file
//!     │
//!     ├──> Import Resolver (index first, then local sources)
//!     │      └─> dependencies + platform flag
//!     │
//!     └──> Rule Generator
//!            └─> one build file per directory
//! ```

mod archive;
mod class_index;
mod error;
mod generator;
pub mod java;
mod resolver;
mod scanner;
mod stats;

pub use archive::{
    class_name_from_entry, parse_class_listing, ArchiveFormat, ClassLister, JarToolLister,
    ZipClassLister,
};
pub use class_index::{
    ArchiveArtifact, ClassConflict, ClassIndex, ClassIndexBuild, ClassIndexBuilder,
    GeneratedClass, GeneratedClassSource,
};
pub use error::{IndexerError, Result};
pub use generator::{DirectoryPlan, GeneratedRule, Generation, GeneratorOptions, RuleGenerator};
pub use resolver::{directory_rule_name, ImportResolver, Resolution, ResolvedDeps, ResolverOptions};
pub use scanner::{normalize_source_roots, SourceDirectory, SourceScanner};
pub use stats::GenerationStats;
