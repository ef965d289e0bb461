//! The persisted dependency index.
//!
//! One `path<TAB>hash` line per discovered input, after a version header:
//!
//! ```text
//! # pomgen index version 2
//! core/pom.xml	3f786850e387550fdab836ed7e6dc881de23001b
//! core/src/main/java	89e6c98d92887913cadf06b2adb97f26cde4849b
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::consts::{APP_NAME, INDEX_VERSION};
use crate::util::fs::{slash_path, write_atomic};
use crate::util::hash::hash_entry;

use super::CacheError;

fn header_prefix() -> String {
  format!("# {APP_NAME} index version ")
}

/// Content hashes of every discovered input, keyed by repository-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIndex {
  pub entries: BTreeMap<String, String>,
}

/// Differences between two indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDiff {
  pub added: BTreeSet<String>,
  pub removed: BTreeSet<String>,
  pub changed: BTreeSet<String>,
}

impl IndexDiff {
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
  }

  /// Every path that differs, in sorted order.
  pub fn paths(&self) -> impl Iterator<Item = &String> {
    self.added.iter().chain(&self.removed).chain(&self.changed)
  }
}

impl CacheIndex {
  /// Hash every path in `paths`, relative to `repo_root`.
  pub fn build(repo_root: &Path, paths: &BTreeSet<PathBuf>) -> Self {
    let entries = paths
      .iter()
      .map(|path| (slash_path(path), hash_entry(&repo_root.join(path)).0))
      .collect();
    Self { entries }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Compare `self` (the previous index) against `current`.
  pub fn diff(&self, current: &CacheIndex) -> IndexDiff {
    let mut diff = IndexDiff::default();
    for (path, hash) in &current.entries {
      match self.entries.get(path) {
        None => {
          diff.added.insert(path.clone());
        }
        Some(old) if old != hash => {
          diff.changed.insert(path.clone());
        }
        Some(_) => {}
      }
    }
    for path in self.entries.keys() {
      if !current.entries.contains_key(path) {
        diff.removed.insert(path.clone());
      }
    }
    diff
  }

  /// Serialize with the current version header.
  pub fn to_text(&self) -> String {
    let mut out = format!("{}{INDEX_VERSION}\n", header_prefix());
    for (path, hash) in &self.entries {
      out.push_str(path);
      out.push('\t');
      out.push_str(hash);
      out.push('\n');
    }
    out
  }

  /// Parse index text read from `path`.
  ///
  /// Returns `Ok(None)` when the index cannot be used as a baseline: it was
  /// written by an older version, or by a newer one and `force` is set.
  pub fn parse(text: &str, path: &Path, force: bool) -> Result<Option<Self>, CacheError> {
    let mut lines = text.lines().enumerate();
    let format_error = |line: usize, content: &str| CacheError::IndexFormat {
      path: path.to_path_buf(),
      line: line + 1,
      content: content.to_string(),
    };

    let (_, header) = lines.next().ok_or_else(|| format_error(0, ""))?;
    let version: u32 = header
      .strip_prefix(&header_prefix())
      .and_then(|v| v.trim().parse().ok())
      .ok_or_else(|| format_error(0, header))?;

    if version < INDEX_VERSION {
      debug!(path = %path.display(), version, "index written by an older version, ignoring it");
      return Ok(None);
    }
    if version > INDEX_VERSION {
      if !force {
        return Err(CacheError::OutdatedIndex {
          path: path.to_path_buf(),
          found: version,
          supported: INDEX_VERSION,
        });
      }
      warn!(
        path = %path.display(),
        version,
        supported = INDEX_VERSION,
        "index written by a newer version, ignoring it"
      );
      return Ok(None);
    }

    let mut entries = BTreeMap::new();
    for (number, line) in lines {
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      match line.split('\t').collect::<Vec<_>>().as_slice() {
        [entry_path, hash] if !entry_path.is_empty() && !hash.is_empty() => {
          entries.insert(entry_path.to_string(), hash.to_string());
        }
        _ => return Err(format_error(number, line)),
      }
    }
    Ok(Some(Self { entries }))
  }

  /// Read the index at `path`; `Ok(None)` when there is none or it is unusable.
  pub fn read(path: &Path, force: bool) -> Result<Option<Self>, CacheError> {
    let text = match fs::read_to_string(path) {
      Ok(text) => text,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(source) => {
        return Err(CacheError::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };
    Self::parse(&text, path, force)
  }

  /// Write the index to `path` atomically.
  pub fn write(&self, path: &Path) -> Result<(), CacheError> {
    write_atomic(path, self.to_text().as_bytes()).map_err(|source| CacheError::Io {
      path: path.to_path_buf(),
      source,
    })
  }
}
