//! Manifest (`pom.xml`) parsing.
//!
//! A manifest declares a module's coordinates, properties, dependencies, an
//! optional parent pointer and, for aggregators, a module list.

mod parser;
mod types;

pub use parser::{ManifestError, parse, parse_str};
pub use types::{DependencyRecord, DependencyType, Exclusion, ManifestRecord, ParentRef, Scope};
