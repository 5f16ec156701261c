//! # Buckify Protocol
//!
//! Shared vocabulary of the build-graph synthesizer: build targets, rule
//! kinds, the platform library set, dependency cycles, and the text format of
//! the generated build files.
//!
//! ## Build file shape
//!
//! ```text
//! java_library(
//!   name = 'foo',
//!   srcs = glob(['*.java']),
//!   deps = [
//!      '//bar:bar',
//!   ],
//!   visibility = [
//!     'PUBLIC',
//!   ],
//! )
//! ```

mod cycle;
pub mod declaration;
mod error;
mod kind;
mod platform;
mod target;
pub mod templates;

pub use cycle::DependencyCycle;
pub use declaration::{rewrite_rule, rule_attribute, rule_deps, DeclaredRule, Rewrite, RuleEdit};
pub use error::{ProtocolError, Result};
pub use kind::{LibraryKind, RuleType};
pub use platform::PlatformLibrarySet;
pub use target::BuildTarget;

/// Default build file name
pub const BUILD_FILE_NAME: &str = "BUCK";

/// Default suffix of interface-only rules
pub const INTERFACE_SUFFIX: &str = "-interfaces";
