//! Cached copies of generated descriptors.
//!
//! After a full regeneration every written descriptor is copied into the
//! branch store, and the outputs index records one `cachedCopy<TAB>original`
//! pair per copy so a later run can restore them without regenerating.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::util::fs::{remove_dir_if_exists, slash_path, write_atomic};
use crate::util::hash::hash_path_string;

use super::CacheError;

/// One cached descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOutput {
  /// File name inside the store directory.
  pub cached: String,
  /// Repository-relative path of the descriptor.
  pub original: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputsIndex {
  pub outputs: Vec<StoredOutput>,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
  move |source| CacheError::Io {
    path: path.to_path_buf(),
    source,
  }
}

impl OutputsIndex {
  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }

  pub fn to_text(&self) -> String {
    self
      .outputs
      .iter()
      .map(|o| format!("{}\t{}\n", o.cached, slash_path(&o.original)))
      .collect()
  }

  pub fn parse(text: &str, path: &Path) -> Result<Self, CacheError> {
    let mut outputs = Vec::new();
    for (number, line) in text.lines().enumerate() {
      if line.is_empty() {
        continue;
      }
      match line.split_once('\t') {
        Some((cached, original)) if !cached.is_empty() && !original.is_empty() && !original.contains('\t') => {
          outputs.push(StoredOutput {
            cached: cached.to_string(),
            original: PathBuf::from(original),
          });
        }
        _ => {
          return Err(CacheError::IndexFormat {
            path: path.to_path_buf(),
            line: number + 1,
            content: line.to_string(),
          });
        }
      }
    }
    Ok(Self { outputs })
  }

  /// Read the outputs index; `Ok(None)` when none exists.
  pub fn read(path: &Path) -> Result<Option<Self>, CacheError> {
    match fs::read_to_string(path) {
      Ok(text) => Self::parse(&text, path).map(Some),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(io_error(path)(source)),
    }
  }

  pub fn write(&self, path: &Path) -> Result<(), CacheError> {
    write_atomic(path, self.to_text().as_bytes()).map_err(io_error(path))
  }
}

/// Replace the contents of `store` with copies of `outputs`.
///
/// `outputs` are repository-relative descriptor paths. Each copy is named
/// after the sha1 of its original path, with a numeric suffix if that name
/// is already taken.
pub fn store_outputs(repo_root: &Path, store: &Path, outputs: &[PathBuf]) -> Result<OutputsIndex, CacheError> {
  remove_dir_if_exists(store).map_err(io_error(store))?;
  fs::create_dir_all(store).map_err(io_error(store))?;

  let mut taken = BTreeSet::new();
  let mut index = OutputsIndex::default();
  for original in outputs {
    let base = hash_path_string(original).0;
    let mut cached = base.clone();
    let mut suffix = 1;
    while !taken.insert(cached.clone()) {
      cached = format!("{base}-{suffix}");
      suffix += 1;
    }

    let source = repo_root.join(original);
    let destination = store.join(&cached);
    fs::copy(&source, &destination).map_err(io_error(&source))?;
    debug!(original = %original.display(), cached = %cached, "stored descriptor");
    index.outputs.push(StoredOutput {
      cached,
      original: original.clone(),
    });
  }
  Ok(index)
}
