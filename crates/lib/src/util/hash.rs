//! Hashing utilities for change detection and the content-addressed store.
//!
//! Every hash in pomgen is a lowercase hex sha1 digest:
//! - `hash_bytes()`: arbitrary bytes
//! - `hash_file()`: a file's contents
//! - `hash_path_string()`: the textual path, used for directories and unreadable files
//! - `hash_entry()`: the index hashing policy combining the above

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A 40-character sha1 hex digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha1::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

/// Hash a single file's contents, streaming it in chunks.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha1::new();
  let mut buffer = [0u8; 8192];

  loop {
    let n = file.read(&mut buffer)?;
    if n == 0 {
      break;
    }
    hasher.update(&buffer[..n]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash the textual form of a path rather than anything it points to.
pub fn hash_path_string(path: &Path) -> ContentHash {
  hash_bytes(path.to_string_lossy().as_bytes())
}

/// Hash an indexed path.
///
/// Directories and anything that cannot be read (broken symlinks, permission
/// errors) hash their path string so they still participate in add/remove
/// detection.
pub fn hash_entry(path: &Path) -> ContentHash {
  if path.is_dir() {
    return hash_path_string(path);
  }

  match hash_file(path) {
    Ok(hash) => hash,
    Err(e) => {
      tracing::debug!(path = %path.display(), error = %e, "unreadable file, hashing path instead");
      hash_path_string(path)
    }
  }
}
