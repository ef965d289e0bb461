//! Dependency resolution.
//!
//! Turns one module manifest into a [`ProjectDescriptor`]: the parent chain is
//! walked and its properties merged, every dependency is re-resolved against
//! the merged properties and then classified as local, third-party or
//! external.

mod context;
mod refs;
mod resolver;

use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;
use crate::template::TemplateError;

pub use context::{
  EXTERNAL_PROTOS_PROPERTY, LocalModule, LocalTargetIndex, MAIN_JAVA_TARGET, MAIN_PROTO_TARGET, ManagedArtifact,
  RunContext, TEST_JAVA_TARGET, ThirdPartyIndex,
};
pub use refs::{DepRef, format_references};
pub use resolver::{DependencyLists, ProjectDescriptor, Resolver};

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("dependency {artifact} declared in {manifest} has no version and is not managed")]
  MissingVersion { artifact: String, manifest: PathBuf },

  #[error("parent chain of {manifest} loops back to {parent}")]
  ParentCycle { manifest: PathBuf, parent: PathBuf },

  #[error("failed to render dependency of {manifest}: {source}")]
  Template {
    manifest: PathBuf,
    #[source]
    source: TemplateError,
  },
}
