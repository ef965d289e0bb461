//! Repository configuration.
//!
//! Settings come from an optional `pomgen.json` in the repository root. Every
//! field has a default, so a repository without the file behaves like one with
//! an empty object:
//!
//! ```json
//! {
//!   "roots": ["."],
//!   "excludes": ["/.git/", "/target/"],
//!   "generatorRoots": ["tools/pomgen"],
//!   "rootManifest": "pom.xml",
//!   "dependencyManagement": "parents/external-deps/pom.xml",
//!   "cacheEnabled": true,
//!   "cacheDir": "/var/cache/pomgen"
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{CONFIG_FILE, MANIFEST_FILE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
  /// Directories (relative to the repository root) scanned for inputs.
  pub roots: Vec<String>,
  /// Path substrings excluded from discovery.
  pub excludes: Vec<String>,
  /// Directories whose every file is an input, such as the generator's own sources.
  pub generator_roots: Vec<String>,
  /// The aggregator manifest listing the modules.
  pub root_manifest: String,
  /// The manifest pinning third-party artifacts.
  pub dependency_management: String,
  pub cache_enabled: bool,
  /// Cache root. Falls back to `POMGEN_CACHE_DIR`, then the user cache directory.
  pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      roots: vec![".".to_string()],
      excludes: vec!["/.git/".to_string(), "/target/".to_string()],
      generator_roots: Vec::new(),
      root_manifest: MANIFEST_FILE.to_string(),
      dependency_management: "parents/external-deps/pom.xml".to_string(),
      cache_enabled: true,
      cache_dir: None,
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

impl Config {
  /// Path of the configuration file for `repo_root`.
  pub fn path(repo_root: &Path) -> PathBuf {
    repo_root.join(CONFIG_FILE)
  }

  /// Load the configuration for `repo_root`, using defaults when no file exists.
  pub fn load(repo_root: &Path) -> Result<Self, ConfigError> {
    let path = Self::path(repo_root);
    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => return Err(ConfigError::Read { path, source }),
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
  }
}
