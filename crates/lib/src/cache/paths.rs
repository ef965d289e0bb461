//! Cache directory layout.
//!
//! ```text
//! {root}/tool.sha1
//! {root}/{branch}/index
//! {root}/{branch}/outputs-index
//! {root}/{branch}/store/
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{INDEX_FILENAME, OUTPUTS_INDEX_FILENAME, STORE_DIRNAME, TOOL_HASH_FILENAME};
use crate::util::hash::hash_path_string;

/// Resolved locations of every cache file for one repository and branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
  pub root: PathBuf,
  pub branch: String,
  pub branch_dir: PathBuf,
  pub index: PathBuf,
  pub outputs_index: PathBuf,
  pub store: PathBuf,
  pub tool_hash: PathBuf,
}

impl CachePaths {
  /// Lay out the cache under `root` for the scope `branch`.
  pub fn new(root: &Path, branch: &str) -> Self {
    let branch_dir = root.join(branch);
    Self {
      root: root.to_path_buf(),
      branch: branch.to_string(),
      index: branch_dir.join(INDEX_FILENAME),
      outputs_index: branch_dir.join(OUTPUTS_INDEX_FILENAME),
      store: branch_dir.join(STORE_DIRNAME),
      tool_hash: root.join(TOOL_HASH_FILENAME),
      branch_dir,
    }
  }

  /// Lay out the cache for `repo_root`, keyed by its current branch.
  pub fn for_repo(root: &Path, repo_root: &Path) -> Self {
    Self::new(root, &scope_key(repo_root))
  }
}

/// Name of the cache scope for `repo_root`.
///
/// The checked-out branch with `/` replaced by `_`, or the sha1 of the
/// repository path when there is no git repository or HEAD is detached.
pub fn scope_key(repo_root: &Path) -> String {
  match current_branch(repo_root) {
    Some(branch) => branch.replace('/', "_"),
    None => {
      debug!(repo = %repo_root.display(), "no branch found, keying cache by repository path");
      hash_path_string(repo_root).0
    }
  }
}

fn current_branch(repo_root: &Path) -> Option<String> {
  let repo = gix::discover(repo_root).ok()?;
  let head = repo.head_name().ok()??;
  Some(head.shorten().to_string())
}
