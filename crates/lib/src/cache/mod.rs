//! Incremental generation.
//!
//! Each run hashes every input, compares the hashes with the index left by the
//! previous successful run and then does nothing, restores descriptors from the
//! branch store, or regenerates everything.

mod controller;
mod decision;
mod discovery;
mod index;
mod paths;
mod store;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::generate::GenerateError;

pub use controller::{IncrementalCacheController, RunOptions, RunReport};
pub use decision::{CacheDecision, DecisionInput, decide};
pub use discovery::{DiscoveryJob, PatternGroup, discover, discovery_jobs};
pub use index::{CacheIndex, IndexDiff};
pub use paths::{CachePaths, scope_key};
pub use store::{OutputsIndex, StoredOutput, store_outputs};

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("required tool '{tool}' was not found on PATH")]
  MissingTool { tool: String },

  #[error("discovery under {root} failed (exit code {code:?}): {message}")]
  Discovery {
    root: PathBuf,
    code: Option<i32>,
    message: String,
  },

  #[error("malformed cache index {path} at line {line}: '{content}'")]
  IndexFormat {
    path: PathBuf,
    line: usize,
    content: String,
  },

  #[error("cache index {path} has version {found}, newer than supported version {supported} (use --force to ignore it)")]
  OutdatedIndex {
    path: PathBuf,
    found: u32,
    supported: u32,
  },

  #[error("interrupted")]
  Interrupted,

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Generate(#[from] GenerateError),

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}
