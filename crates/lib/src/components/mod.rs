//! Build components: the generators that turn a resolved project into targets.

mod registry;
mod targets;

use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

pub use registry::{
  BuildComponentRegistry, CODEGEN_ARGS_PROPERTY, CODEGEN_ENV_PREFIX, CODEGEN_EXECUTABLE_PROPERTY, Component,
  EXTERNAL_TEST_PROTOS_PROPERTY, MAIN_CLASS_PROPERTY, PIPELINE, SourceSet, SourceStrategy,
};
pub use targets::TargetSet;

#[derive(Debug, Error)]
pub enum ComponentError {
  #[error("duplicate target '{name}' in {directory} (from {manifest})")]
  DuplicateTarget {
    name: String,
    directory: PathBuf,
    manifest: PathBuf,
  },

  #[error("failed to render {target}: {source}")]
  Template {
    target: String,
    #[source]
    source: TemplateError,
  },

  #[error("property {property} of {manifest} must be groupId:artifactId:version, got '{value}'")]
  InvalidProperty {
    property: String,
    value: String,
    manifest: PathBuf,
  },
}
