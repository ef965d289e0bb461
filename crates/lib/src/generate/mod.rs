//! Whole-repository generation.
//!
//! Resolves every module, runs the component pipeline over it, adds the
//! third-party aggregate and writes the descriptor files.

mod outputs;

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::components::{BuildComponentRegistry, ComponentError, TargetSet};
use crate::consts::THIRD_PARTY_DIR;
use crate::resolve::{ResolveError, Resolver, RunContext};
use crate::template::{Params, TargetDescriptor, TargetKind, TemplateError, TemplateValue, jar};

pub use outputs::{delete_outputs, is_generated_descriptor, render_file, write_outputs};

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error("failed to generate targets for {manifest}: {source}")]
  Component {
    manifest: PathBuf,
    #[source]
    source: ComponentError,
  },

  #[error("failed to render third-party target {artifact}: {source}")]
  ThirdParty {
    artifact: String,
    #[source]
    source: TemplateError,
  },

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },
}

/// A local dependency that was left out of a project's targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedDependency {
  pub manifest: PathBuf,
  pub dependency: String,
}

/// Summary of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
  pub projects: usize,
  pub targets: usize,
  /// Repository-relative descriptor files written.
  pub outputs: Vec<PathBuf>,
  pub dropped: Vec<DroppedDependency>,
}

/// Build the targets of every module plus the third-party aggregate.
///
/// Nothing is written. Any project error aborts the whole run.
pub fn generate_targets(
  ctx: &RunContext,
  registry: &BuildComponentRegistry,
) -> Result<(TargetSet, GenerateReport), GenerateError> {
  let mut targets = TargetSet::new(ctx.repo_root());
  let mut report = GenerateReport::default();
  let resolver = Resolver::new(ctx);

  for manifest in ctx.modules()? {
    let mut project = resolver.resolve(manifest)?;
    registry
      .generate(&mut project, ctx, &mut targets)
      .map_err(|source| GenerateError::Component {
        manifest: manifest.clone(),
        source,
      })?;

    report.dropped.extend(project.dropped.iter().map(|dependency| DroppedDependency {
      manifest: manifest.clone(),
      dependency: dependency.clone(),
    }));
    report.projects += 1;
  }

  third_party_targets(ctx, &mut targets)?;
  report.targets = targets.len();
  Ok((targets, report))
}

/// Add one `jar_library` per managed artifact to the third-party aggregate.
pub fn third_party_targets(ctx: &RunContext, targets: &mut TargetSet) -> Result<usize, GenerateError> {
  let dir = Path::new(THIRD_PARTY_DIR);
  let mut count = 0;

  for artifact in ctx.third_party()?.artifacts() {
    let name = artifact.target_name();
    let Some(version) = artifact.version.as_deref() else {
      warn!(artifact = %name, "managed artifact has no version, skipping");
      continue;
    };

    let declaration = jar(
      &artifact.group_id,
      &artifact.artifact_id,
      version,
      artifact.classifier.as_deref(),
      &artifact.exclusions,
    )
    .map_err(|source| GenerateError::ThirdParty {
      artifact: name.clone(),
      source,
    })?;
    let params = Params::new().set("jars", TemplateValue::List(vec![TemplateValue::Raw(declaration)]));
    let target = TargetDescriptor::render(dir, &targets.target_name(dir, &name), TargetKind::JarLibrary, params, None)
      .map_err(|source| GenerateError::ThirdParty {
        artifact: name.clone(),
        source,
      })?;

    targets.insert(target).map_err(|source| GenerateError::Component {
      manifest: ctx.repo_root().join(THIRD_PARTY_DIR),
      source,
    })?;
    count += 1;
  }
  Ok(count)
}

/// Regenerate every descriptor: sweep old outputs, generate, write.
pub fn regenerate(
  ctx: &RunContext,
  registry: &BuildComponentRegistry,
  excludes: &[String],
) -> Result<GenerateReport, GenerateError> {
  let removed = delete_outputs(ctx.repo_root(), excludes)?;
  if !removed.is_empty() {
    info!(count = removed.len(), "removed previous descriptor files");
  }

  let (targets, mut report) = generate_targets(ctx, registry)?;
  report.outputs = write_outputs(&targets)?;
  info!(
    projects = report.projects,
    targets = report.targets,
    files = report.outputs.len(),
    "generation complete"
  );
  Ok(report)
}
