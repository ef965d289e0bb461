//! The run state machine.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::components::BuildComponentRegistry;
use crate::config::Config;
use crate::consts::{BUILD_FILE, GENERATED_BUILD_FILE};
use crate::generate::{GenerateReport, delete_outputs, regenerate};
use crate::platform::paths::cache_dir;
use crate::resolve::RunContext;
use crate::util::fs::{remove_dir_if_exists, remove_file_if_exists, write_atomic};
use crate::util::hash::{ContentHash, hash_bytes, hash_file};

use super::decision::{CacheDecision, DecisionInput, decide};
use super::discovery::{discover, discovery_jobs};
use super::index::CacheIndex;
use super::paths::CachePaths;
use super::store::{OutputsIndex, store_outputs};
use super::CacheError;

/// Flags for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
  /// Regenerate even when nothing changed.
  pub rebuild: bool,
  /// Ignore an index written by a newer version instead of failing.
  pub force: bool,
  /// Wipe this branch's cache before running.
  pub clean: bool,
  /// Wipe the whole cache root before running.
  pub clean_all: bool,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub decision: CacheDecision,
  pub scope: String,
  /// Number of indexed inputs after the run.
  pub inputs: usize,
  /// Descriptors copied back from the store.
  pub restored: Vec<PathBuf>,
  /// Stale generated descriptors deleted in favor of hand-authored ones.
  pub removed: Vec<PathBuf>,
  pub generated: Option<GenerateReport>,
}

pub struct IncrementalCacheController {
  repo_root: PathBuf,
  config: Config,
  options: RunOptions,
  paths: CachePaths,
  tool_hash: ContentHash,
}

fn current_tool_hash() -> ContentHash {
  match std::env::current_exe().and_then(|exe| hash_file(&exe)) {
    Ok(hash) => hash,
    Err(e) => {
      debug!(error = %e, "cannot hash own executable, using the version instead");
      hash_bytes(env!("CARGO_PKG_VERSION").as_bytes())
    }
  }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
  move |source| CacheError::Io {
    path: path.to_path_buf(),
    source,
  }
}

impl IncrementalCacheController {
  pub fn new(repo_root: impl Into<PathBuf>, config: Config, options: RunOptions) -> Self {
    let repo_root = repo_root.into();
    let cache_root = config.cache_dir.clone().unwrap_or_else(cache_dir);
    let paths = CachePaths::for_repo(&cache_root, &repo_root);
    Self {
      repo_root,
      config,
      options,
      paths,
      tool_hash: current_tool_hash(),
    }
  }

  /// Override the executable hash used for the freshness check.
  pub fn with_tool_hash(mut self, tool_hash: ContentHash) -> Self {
    self.tool_hash = tool_hash;
    self
  }

  pub fn paths(&self) -> &CachePaths {
    &self.paths
  }

  /// Run until done or until Ctrl-C.
  pub async fn run(&self) -> Result<RunReport, CacheError> {
    self
      .run_until(async {
        if tokio::signal::ctrl_c().await.is_err() {
          warn!("cannot listen for Ctrl-C, the run cannot be interrupted cleanly");
          std::future::pending::<()>().await;
        }
      })
      .await
  }

  /// Run until done or until `shutdown` resolves.
  ///
  /// On shutdown the in-flight stage is allowed to finish, then the branch
  /// cache and every generated descriptor are deleted and
  /// [`CacheError::Interrupted`] is returned.
  pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<RunReport, CacheError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let work = self.execute(Arc::clone(&cancel));
    tokio::pin!(work);

    tokio::select! {
      result = &mut work => result,
      () = shutdown => {
        warn!("interrupted, discarding cache and generated descriptors");
        cancel.store(true, Ordering::SeqCst);
        if let Err(e) = (&mut work).await {
          debug!(error = %e, "interrupted stage stopped");
        }
        self.discard()?;
        Err(CacheError::Interrupted)
      }
    }
  }

  fn discard(&self) -> Result<(), CacheError> {
    remove_dir_if_exists(&self.paths.branch_dir).map_err(io_error(&self.paths.branch_dir))?;
    let removed = delete_outputs(&self.repo_root, &self.config.excludes)?;
    info!(count = removed.len(), "deleted generated descriptors");
    Ok(())
  }

  async fn execute(&self, cancel: Arc<AtomicBool>) -> Result<RunReport, CacheError> {
    let interrupted = || {
      if cancel.load(Ordering::SeqCst) {
        Err(CacheError::Interrupted)
      } else {
        Ok(())
      }
    };

    if !self.config.cache_enabled {
      info!("caching disabled, regenerating everything");
      let generated = self.generate(Arc::clone(&cancel)).await?;
      return Ok(RunReport {
        decision: CacheDecision::FullRegenerate,
        scope: self.paths.branch.clone(),
        inputs: 0,
        restored: Vec::new(),
        removed: Vec::new(),
        generated: Some(generated),
      });
    }

    self.prepare_cache_root()?;

    let current = self.index_inputs().await?;
    let previous = CacheIndex::read(&self.paths.index, self.options.force)?;
    let outputs = OutputsIndex::read(&self.paths.outputs_index)?;
    let diff = previous.as_ref().map(|previous| previous.diff(&current));
    if let Some(diff) = &diff {
      debug!(
        added = diff.added.len(),
        removed = diff.removed.len(),
        changed = diff.changed.len(),
        "compared inputs with the previous run"
      );
    }

    let mut decision = decide(DecisionInput {
      cache_enabled: true,
      rebuild: self.options.rebuild,
      diff: diff.as_ref(),
      has_outputs_index: outputs.is_some(),
    });
    info!(decision = %decision, scope = %self.paths.branch, inputs = current.len(), "cache decision");
    interrupted()?;

    let mut report = RunReport {
      decision,
      scope: self.paths.branch.clone(),
      inputs: current.len(),
      restored: Vec::new(),
      removed: Vec::new(),
      generated: None,
    };
    if decision == CacheDecision::NoOp {
      return Ok(report);
    }

    // Outputs are about to change; a failed run must not leave a usable index.
    remove_file_if_exists(&self.paths.index).map_err(io_error(&self.paths.index))?;

    if decision == CacheDecision::RestoreFromCache {
      match outputs.as_ref().filter(|outputs| self.store_is_complete(outputs)) {
        Some(outputs) => self.restore(outputs, &mut report)?,
        None => {
          warn!("cached descriptors are missing, regenerating everything");
          decision = CacheDecision::FullRegenerate;
        }
      }
    }

    if decision == CacheDecision::FullRegenerate {
      let generated = self.generate(Arc::clone(&cancel)).await?;
      interrupted()?;
      let stored = store_outputs(&self.repo_root, &self.paths.store, &generated.outputs)?;
      stored.write(&self.paths.outputs_index)?;
      report.generated = Some(generated);
    }
    report.decision = decision;

    interrupted()?;
    let after = self.index_inputs().await?;
    after.write(&self.paths.index)?;
    report.inputs = after.len();
    info!(path = %self.paths.index.display(), entries = after.len(), "saved cache index");
    Ok(report)
  }

  /// Apply the clean flags and the executable freshness check.
  fn prepare_cache_root(&self) -> Result<(), CacheError> {
    let root = &self.paths.root;
    if self.options.clean_all && remove_dir_if_exists(root).map_err(io_error(root))? {
      info!(path = %root.display(), "wiped cache root");
    }

    let recorded = match fs::read_to_string(&self.paths.tool_hash) {
      Ok(text) => Some(text.trim().to_string()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
      Err(source) => return Err(io_error(&self.paths.tool_hash)(source)),
    };
    if recorded.as_deref().is_some_and(|hash| hash != self.tool_hash.as_str()) {
      warn!(path = %root.display(), "executable changed since the cache was written, wiping it");
      remove_dir_if_exists(root).map_err(io_error(root))?;
    }

    if self.options.clean && remove_dir_if_exists(&self.paths.branch_dir).map_err(io_error(&self.paths.branch_dir))? {
      info!(scope = %self.paths.branch, "wiped branch cache");
    }

    write_atomic(&self.paths.tool_hash, self.tool_hash.as_str().as_bytes()).map_err(io_error(&self.paths.tool_hash))
  }

  async fn index_inputs(&self) -> Result<CacheIndex, CacheError> {
    let jobs = discovery_jobs(&self.config.roots, &self.config.generator_roots);
    let paths = discover(&self.repo_root, jobs, &self.config.excludes).await?;
    let repo_root = self.repo_root.clone();
    Ok(tokio::task::spawn_blocking(move || CacheIndex::build(&repo_root, &paths)).await?)
  }

  async fn generate(&self, cancel: Arc<AtomicBool>) -> Result<GenerateReport, CacheError> {
    let repo_root = self.repo_root.clone();
    let config = self.config.clone();
    tokio::task::spawn_blocking(move || {
      if cancel.load(Ordering::SeqCst) {
        return Err(CacheError::Interrupted);
      }
      let ctx = RunContext::new(repo_root, &config);
      Ok(regenerate(&ctx, &BuildComponentRegistry::default(), &config.excludes)?)
    })
    .await?
  }

  fn store_is_complete(&self, outputs: &OutputsIndex) -> bool {
    outputs
      .outputs
      .iter()
      .all(|output| self.paths.store.join(&output.cached).is_file())
  }

  fn restore(&self, outputs: &OutputsIndex, report: &mut RunReport) -> Result<(), CacheError> {
    for output in &outputs.outputs {
      let target = self.repo_root.join(&output.original);
      let is_generated = output
        .original
        .file_name()
        .is_some_and(|name| name == GENERATED_BUILD_FILE);
      if is_generated && target.with_file_name(BUILD_FILE).is_file() {
        if remove_file_if_exists(&target).map_err(io_error(&target))? {
          debug!(path = %output.original.display(), "hand-authored descriptor wins, removed generated one");
          report.removed.push(output.original.clone());
        }
        continue;
      }

      let cached = self.paths.store.join(&output.cached);
      let wanted = hash_file(&cached).map_err(io_error(&cached))?;
      if hash_file(&target).is_ok_and(|hash| hash == wanted) {
        continue;
      }
      let content = fs::read(&cached).map_err(io_error(&cached))?;
      write_atomic(&target, &content).map_err(io_error(&target))?;
      debug!(path = %output.original.display(), "restored descriptor");
      report.restored.push(output.original.clone());
    }
    info!(restored = report.restored.len(), removed = report.removed.len(), "restored descriptors from cache");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::{GENERATED_HEADER, INDEX_VERSION};
  use crate::util::testutil::{TestRepo, dependency, external_deps_pom, module_pom, root_pom};
  use tempfile::TempDir;

  fn find_available() -> bool {
    std::process::Command::new("find").arg(".").arg("-maxdepth").arg("0").output().is_ok()
  }

  struct Fixture {
    repo: TestRepo,
    cache: TempDir,
  }

  impl Fixture {
    fn new() -> Self {
      let repo = TestRepo::new();
      repo.write("pom.xml", &root_pom(&["core", "app"], ""));
      repo.write(
        "parents/external-deps/pom.xml",
        &external_deps_pom(&[("com.google.guava", "guava", "32.1")]),
      );
      repo.write("core/pom.xml", &module_pom("core", &dependency("com.google.guava", "guava", "")));
      repo.source("core/src/main/java", "Core.java");
      repo.write("app/pom.xml", &module_pom("app", &dependency("com.example", "core", "")));
      repo.source("app/src/main/java", "App.java");
      Self {
        repo,
        cache: TempDir::new().unwrap(),
      }
    }

    fn config(&self) -> Config {
      Config {
        cache_dir: Some(self.cache.path().to_path_buf()),
        ..Config::default()
      }
    }

    fn controller(&self, options: RunOptions) -> IncrementalCacheController {
      IncrementalCacheController::new(self.repo.root(), self.config(), options)
        .with_tool_hash(hash_bytes(b"tool"))
    }

    async fn run(&self) -> RunReport {
      self
        .controller(RunOptions::default())
        .run_until(std::future::pending())
        .await
        .unwrap()
    }

    fn read(&self, relative: &str) -> String {
      fs::read_to_string(self.repo.path(relative)).unwrap()
    }
  }

  #[tokio::test]
  async fn second_run_is_a_no_op() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();

    let first = fixture.run().await;
    assert_eq!(first.decision, CacheDecision::FullRegenerate);
    let before = fixture.read("core/src/main/java/BUILD.gen");

    let second = fixture.run().await;
    assert_eq!(second.decision, CacheDecision::NoOp);
    assert!(second.generated.is_none());
    assert_eq!(fixture.read("core/src/main/java/BUILD.gen"), before);
  }

  #[tokio::test]
  async fn manifest_edit_regenerates() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    fixture.run().await;

    fixture.repo.write("app/pom.xml", &module_pom("app", ""));
    let report = fixture.run().await;
    assert_eq!(report.decision, CacheDecision::FullRegenerate);
    assert!(!fixture.read("app/src/main/java/BUILD.gen").contains("core/src/main/java:lib"));
  }

  #[tokio::test]
  async fn edited_descriptor_is_restored() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    fixture.run().await;
    let original = fixture.read("core/src/main/java/BUILD.gen");

    fixture.repo.write("core/src/main/java/BUILD.gen", "# tampered\n");
    let report = fixture.run().await;
    assert_eq!(report.decision, CacheDecision::RestoreFromCache);
    assert_eq!(report.restored, vec![PathBuf::from("core/src/main/java/BUILD.gen")]);
    assert_eq!(fixture.read("core/src/main/java/BUILD.gen"), original);

    assert_eq!(fixture.run().await.decision, CacheDecision::NoOp);
  }

  #[tokio::test]
  async fn hand_authored_descriptor_wins_on_restore() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    fixture.run().await;

    fixture
      .repo
      .write("app/src/main/java/BUILD", "java_library(name='lib', sources=globs('*.java'))\n");
    let report = fixture.run().await;
    assert_eq!(report.decision, CacheDecision::RestoreFromCache);
    assert_eq!(report.removed, vec![PathBuf::from("app/src/main/java/BUILD.gen")]);
    assert!(!fixture.repo.path("app/src/main/java/BUILD.gen").exists());
    assert!(fixture.repo.path("app/src/main/java/BUILD").exists());
  }

  #[tokio::test]
  async fn deleted_descriptor_regenerates() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    fixture.run().await;

    fs::remove_file(fixture.repo.path("3rdparty/BUILD.gen")).unwrap();
    let report = fixture.run().await;
    assert_eq!(report.decision, CacheDecision::FullRegenerate);
    assert!(fixture.read("3rdparty/BUILD.gen").starts_with(GENERATED_HEADER));
  }

  #[tokio::test]
  async fn rebuild_flag_forces_regeneration() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    fixture.run().await;

    let options = RunOptions {
      rebuild: true,
      ..RunOptions::default()
    };
    let report = fixture
      .controller(options)
      .run_until(std::future::pending())
      .await
      .unwrap();
    assert_eq!(report.decision, CacheDecision::FullRegenerate);
  }

  #[tokio::test]
  async fn disabled_cache_writes_no_index() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    let config = Config {
      cache_enabled: false,
      ..fixture.config()
    };
    let controller = IncrementalCacheController::new(fixture.repo.root(), config, RunOptions::default());
    let report = controller.run_until(std::future::pending()).await.unwrap();

    assert_eq!(report.decision, CacheDecision::FullRegenerate);
    assert!(!controller.paths().index.exists());
    assert!(fixture.repo.path("core/src/main/java/BUILD.gen").exists());
  }

  #[tokio::test]
  async fn newer_index_fails_unless_forced() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    let controller = fixture.controller(RunOptions::default());
    fs::create_dir_all(&controller.paths().branch_dir).unwrap();
    fs::write(
      &controller.paths().index,
      format!("# pomgen index version {}\n", INDEX_VERSION + 1),
    )
    .unwrap();

    let err = controller.run_until(std::future::pending()).await.unwrap_err();
    assert!(matches!(err, CacheError::OutdatedIndex { .. }));
    assert!(!fixture.repo.path("core/src/main/java/BUILD.gen").exists());

    let forced = fixture.controller(RunOptions {
      force: true,
      ..RunOptions::default()
    });
    let report = forced.run_until(std::future::pending()).await.unwrap();
    assert_eq!(report.decision, CacheDecision::FullRegenerate);
  }

  #[tokio::test]
  async fn changed_executable_wipes_the_cache_root() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    fixture.run().await;
    let marker = fixture.cache.path().join("other-branch/index");
    fs::create_dir_all(marker.parent().unwrap()).unwrap();
    fs::write(&marker, "x").unwrap();

    let report = IncrementalCacheController::new(fixture.repo.root(), fixture.config(), RunOptions::default())
      .with_tool_hash(hash_bytes(b"new tool"))
      .run_until(std::future::pending())
      .await
      .unwrap();
    assert_eq!(report.decision, CacheDecision::FullRegenerate);
    assert!(!marker.exists());
  }

  #[tokio::test]
  async fn interruption_discards_cache_and_outputs() {
    if !find_available() {
      return;
    }
    let fixture = Fixture::new();
    fixture.run().await;
    assert!(fixture.repo.path("core/src/main/java/BUILD.gen").exists());

    let controller = fixture.controller(RunOptions {
      rebuild: true,
      ..RunOptions::default()
    });
    let err = controller.run_until(async {}).await.unwrap_err();

    assert!(matches!(err, CacheError::Interrupted));
    assert!(!controller.paths().branch_dir.exists());
    assert!(!fixture.repo.path("core/src/main/java/BUILD.gen").exists());
    assert!(!fixture.repo.path("3rdparty/BUILD.gen").exists());
  }
}
