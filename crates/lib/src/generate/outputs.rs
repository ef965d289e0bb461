//! Writing and sweeping descriptor files.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::components::TargetSet;
use crate::consts::{AUX_BUILD_FILE, GENERATED_BUILD_FILE, GENERATED_HEADER};
use crate::template::TargetDescriptor;
use crate::util::fs::{remove_file_if_exists, write_atomic};

use super::GenerateError;

/// True for file names the generator owns.
pub fn is_generated_descriptor(path: &Path) -> bool {
  path
    .file_name()
    .is_some_and(|name| name == GENERATED_BUILD_FILE || name == AUX_BUILD_FILE)
}

/// Render the full text of one descriptor file.
pub fn render_file(targets: &[TargetDescriptor]) -> String {
  let mut content = String::from(GENERATED_HEADER);
  for target in targets {
    content.push('\n');
    content.push_str(&target.text);
  }
  content
}

/// Write one descriptor file per directory of `targets`.
///
/// Returns the repository-relative paths written, in directory order.
pub fn write_outputs(targets: &TargetSet) -> Result<Vec<PathBuf>, GenerateError> {
  let mut written = Vec::new();
  for (directory, dir_targets) in targets.directories() {
    let relative = directory.join(targets.file_name_for(directory));
    let path = targets.repo_root().join(&relative);
    write_atomic(&path, render_file(dir_targets).as_bytes()).map_err(|source| GenerateError::Io {
      path: path.clone(),
      source,
    })?;
    debug!(path = %relative.display(), targets = dir_targets.len(), "wrote descriptor");
    written.push(relative);
  }
  info!(files = written.len(), "wrote descriptor files");
  Ok(written)
}

/// Delete every generated descriptor under `repo_root`.
///
/// Paths containing one of `excludes` are left alone. Returns the
/// repository-relative paths removed.
pub fn delete_outputs(repo_root: &Path, excludes: &[String]) -> Result<Vec<PathBuf>, GenerateError> {
  let mut removed = Vec::new();
  let walker = WalkDir::new(repo_root).into_iter().filter_entry(|entry| {
    let path = entry.path().to_string_lossy();
    !excludes.iter().any(|exclude| path.contains(exclude.as_str()))
  });

  for entry in walker {
    let entry = entry.map_err(|source| GenerateError::Walk {
      path: repo_root.to_path_buf(),
      source,
    })?;
    if !entry.file_type().is_file() || !is_generated_descriptor(entry.path()) {
      continue;
    }

    if remove_file_if_exists(entry.path()).map_err(|source| GenerateError::Io {
      path: entry.path().to_path_buf(),
      source,
    })? {
      let relative = entry.path().strip_prefix(repo_root).unwrap_or(entry.path()).to_path_buf();
      debug!(path = %relative.display(), "removed generated descriptor");
      removed.push(relative);
    }
  }
  Ok(removed)
}
