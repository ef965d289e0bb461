//! Implementation of the `pomgen` run.
//!
//! Loads the repository configuration, applies command-line overrides and
//! drives one incremental generation run.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use pomgen_lib::cache::{CacheDecision, IncrementalCacheController, RunOptions, RunReport};
use pomgen_lib::config::Config;

use crate::output::{
  OutputFormat, format_duration, print_info, print_json, print_stat, print_success, print_warning, truncate_hash,
};

pub struct RunArgs {
  pub repo: PathBuf,
  pub options: RunOptions,
  pub no_cache: bool,
  pub cache_dir: Option<PathBuf>,
  pub output: OutputFormat,
}

/// Run generation for `args.repo` and print a summary.
pub fn cmd_run(args: &RunArgs) -> Result<()> {
  let repo = dunce::canonicalize(&args.repo)
    .with_context(|| format!("Repository not found: {}", args.repo.display()))?;

  let mut config = Config::load(&repo).context("Failed to load configuration")?;
  if args.no_cache {
    config.cache_enabled = false;
  }
  if let Some(dir) = &args.cache_dir {
    config.cache_dir = Some(dir.clone());
  }
  debug!(repo = %repo.display(), ?config, "configuration loaded");

  let controller = IncrementalCacheController::new(&repo, config, args.options);

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(controller.run()).context("Generation failed")?;

  if args.output.is_json() {
    return print_json(&report);
  }
  print_report(&report);
  print_stat("Took", &format_duration(started.elapsed()));
  Ok(())
}

fn print_report(report: &RunReport) {
  match report.decision {
    CacheDecision::NoOp => print_success("Up to date, nothing to do"),
    CacheDecision::RestoreFromCache => print_success(&format!(
      "Restored {} descriptor(s) from cache",
      report.restored.len()
    )),
    CacheDecision::FullRegenerate => match &report.generated {
      Some(generated) => print_success(&format!(
        "Generated {} target(s) in {} file(s) for {} project(s)",
        generated.targets,
        generated.outputs.len(),
        generated.projects
      )),
      None => print_success("Regenerated"),
    },
  }

  for path in &report.removed {
    print_info(&format!("Removed {} (hand-authored BUILD present)", path.display()));
  }
  if let Some(generated) = &report.generated {
    for dropped in &generated.dropped {
      print_warning(&format!(
        "{}: dropped local dependency {}",
        dropped.manifest.display(),
        dropped.dependency
      ));
    }
  }

  print_stat("Cache scope", truncate_hash(&report.scope));
  print_stat("Inputs", &report.inputs.to_string());
}
