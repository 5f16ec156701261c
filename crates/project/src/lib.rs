//! # Buckify Project
//!
//! Everything the synthesizer learns from a gradle project before any Java
//! source is read: modules, source roots, Android directories, repositories
//! and third-party artifacts. Also writes the project level files Buck needs
//! (`.buckconfig`, the third-party build file, Android generating rules).

mod android;
pub mod buckconfig;
mod error;
pub mod gradle;
mod maven;
mod third_party;

pub use android::{manifest_package, AndroidRuleWriter};
pub use buckconfig::{read_source_roots, write_buckconfig_if_missing, BUCKCONFIG_FILE};
pub use error::{ProjectError, Result};
pub use gradle::{GradleModule, ProjectLayout};
pub use maven::{
    pad_hash, ArtifactKind, ArtifactResolution, ArtifactResolver, MavenCoordinate,
    ResolvedArtifact, MAVEN_SCHEME,
};
pub use third_party::ThirdPartyWriter;
