//! Input discovery.
//!
//! Runs one `find` process per (root, pattern group) concurrently and merges
//! the results once every process has exited.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::consts::{AUX_BUILD_FILE, BUILD_FILE, CONFIG_FILE, GENERATED_BUILD_FILE, MANIFEST_FILE};
use crate::util::fs::normalize;

use super::CacheError;

const FIND: &str = "find";

/// A family of paths that affects generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternGroup {
  Manifests,
  Descriptors,
  SourceRoots,
  /// Every file under a generator root.
  GeneratorSources,
}

impl PatternGroup {
  fn find_args(self) -> Vec<String> {
    let names = |names: &[&str]| {
      let mut args = vec!["(".to_string()];
      for (i, name) in names.iter().enumerate() {
        if i > 0 {
          args.push("-o".to_string());
        }
        args.push("-name".to_string());
        args.push(name.to_string());
      }
      args.push(")".to_string());
      args
    };

    match self {
      PatternGroup::Manifests => vec!["-type".into(), "f".into(), "-name".into(), MANIFEST_FILE.into()],
      PatternGroup::Descriptors => {
        let mut args = vec!["-type".to_string(), "f".to_string()];
        args.extend(names(&[BUILD_FILE, GENERATED_BUILD_FILE, AUX_BUILD_FILE]));
        args
      }
      PatternGroup::SourceRoots => {
        let mut args = vec!["-type".to_string(), "d".to_string(), "-path".to_string(), "*/src/*".to_string()];
        args.extend(names(&["java", "proto", "resources"]));
        args
      }
      PatternGroup::GeneratorSources => vec!["-type".into(), "f".into()],
    }
  }
}

/// One `find` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryJob {
  pub root: PathBuf,
  pub group: PatternGroup,
}

/// Every (root, group) pair to search.
pub fn discovery_jobs(roots: &[impl AsRef<Path>], generator_roots: &[impl AsRef<Path>]) -> Vec<DiscoveryJob> {
  let mut jobs = Vec::new();
  for root in roots {
    for group in [PatternGroup::Manifests, PatternGroup::Descriptors, PatternGroup::SourceRoots] {
      jobs.push(DiscoveryJob {
        root: root.as_ref().to_path_buf(),
        group,
      });
    }
  }
  for root in generator_roots {
    jobs.push(DiscoveryJob {
      root: root.as_ref().to_path_buf(),
      group: PatternGroup::GeneratorSources,
    });
  }
  jobs
}

async fn run_find(repo_root: PathBuf, job: DiscoveryJob) -> Result<Vec<PathBuf>, CacheError> {
  let search_root = normalize(&repo_root.join(&job.root));
  if !search_root.exists() {
    warn!(root = %job.root.display(), "discovery root does not exist, skipping");
    return Ok(Vec::new());
  }

  let output = Command::new(FIND)
    .arg(&search_root)
    .args(job.group.find_args())
    .output()
    .await
    .map_err(|source| match source.kind() {
      io::ErrorKind::NotFound => CacheError::MissingTool {
        tool: FIND.to_string(),
      },
      _ => CacheError::Io {
        path: search_root.clone(),
        source,
      },
    })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    debug!(stderr = %stderr, "find stderr");
    return Err(CacheError::Discovery {
      root: job.root,
      code: output.status.code(),
      message: stderr,
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout);
  let found: Vec<PathBuf> = stdout.lines().filter(|l| !l.is_empty()).map(PathBuf::from).collect();
  debug!(root = %job.root.display(), group = ?job.group, count = found.len(), "find finished");
  Ok(found)
}

/// Discover every input path under `repo_root`.
///
/// Paths containing an `excludes` substring are dropped. The result is
/// relative to `repo_root`, sorted and deduplicated.
pub async fn discover(
  repo_root: &Path,
  jobs: Vec<DiscoveryJob>,
  excludes: &[String],
) -> Result<BTreeSet<PathBuf>, CacheError> {
  let mut set = JoinSet::new();
  for job in jobs {
    set.spawn(run_find(normalize(repo_root), job));
  }

  let mut found = Vec::new();
  let mut first_error = None;
  while let Some(joined) = set.join_next().await {
    match joined? {
      Ok(paths) => found.extend(paths),
      Err(e) => {
        first_error.get_or_insert(e);
      }
    }
  }
  if let Some(e) = first_error {
    return Err(e);
  }

  let root = normalize(repo_root);
  let config = root.join(CONFIG_FILE);
  if config.is_file() {
    found.push(config);
  }

  let paths = found
    .into_iter()
    .filter(|path| {
      let text = path.to_string_lossy();
      !excludes.iter().any(|exclude| text.contains(exclude.as_str()))
    })
    .filter_map(|path| path.strip_prefix(&root).ok().map(normalize))
    .filter(|path| !path.as_os_str().is_empty())
    .collect();
  Ok(paths)
}
