use std::path::Path;

use serde::Serialize;

use crate::consts::BUILD_FILE;
use crate::generate::is_generated_descriptor;

use super::index::IndexDiff;

/// What a run does with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheDecision {
  /// Nothing changed since the last successful run.
  NoOp,
  /// Only descriptors changed: put the cached outputs back.
  RestoreFromCache,
  FullRegenerate,
}

impl std::fmt::Display for CacheDecision {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      CacheDecision::NoOp => "no-op",
      CacheDecision::RestoreFromCache => "restore",
      CacheDecision::FullRegenerate => "full regenerate",
    };
    f.write_str(name)
  }
}

/// Inputs to [`decide`].
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
  pub cache_enabled: bool,
  pub rebuild: bool,
  /// `None` when there was no usable previous index.
  pub diff: Option<&'a IndexDiff>,
  pub has_outputs_index: bool,
}

fn is_descriptor(path: &str) -> bool {
  let path = Path::new(path);
  is_generated_descriptor(path) || path.file_name().is_some_and(|name| name == BUILD_FILE)
}

/// Choose between doing nothing, restoring cached outputs and regenerating.
pub fn decide(input: DecisionInput<'_>) -> CacheDecision {
  if !input.cache_enabled || input.rebuild {
    return CacheDecision::FullRegenerate;
  }
  let Some(diff) = input.diff else {
    return CacheDecision::FullRegenerate;
  };
  if diff.is_empty() {
    return CacheDecision::NoOp;
  }
  if !input.has_outputs_index {
    return CacheDecision::FullRegenerate;
  }

  let inputs_changed = diff.paths().any(|path| !is_descriptor(path));
  let descriptor_removed = !diff.removed.is_empty();
  if inputs_changed || descriptor_removed {
    CacheDecision::FullRegenerate
  } else {
    CacheDecision::RestoreFromCache
  }
}
