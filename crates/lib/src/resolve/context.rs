//! Run-scoped state shared by every resolution in one generation run.
//!
//! Building the local target index and the third-party index requires reading
//! every manifest in the repository, so both are computed lazily on first use
//! and then kept for the rest of the run. Parsed manifests are memoized too.

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::consts::MANIFEST_FILE;
use crate::manifest::{ManifestError, ManifestRecord, parse};
use crate::placeholder::substitute;
use crate::util::fs::{is_non_empty_dir, normalize};

use super::ResolveError;

/// Property naming an archive that supplies a module's protobuf sources.
pub const EXTERNAL_PROTOS_PROPERTY: &str = "protos.external.artifact";

/// Target suffixes relative to a module directory.
pub const MAIN_JAVA_TARGET: &str = "src/main/java:lib";
pub const TEST_JAVA_TARGET: &str = "src/test/java:lib";
pub const MAIN_PROTO_TARGET: &str = "src/main/proto:proto";

/// One module known to exist in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalModule {
  /// Repository-relative module directory.
  pub directory: PathBuf,
  /// Target suffixes (`src/main/java:lib`, ...) this module will produce.
  pub targets: BTreeSet<&'static str>,
}

/// Local modules keyed by `(groupId, artifactId)`.
#[derive(Debug, Clone, Default)]
pub struct LocalTargetIndex {
  modules: HashMap<(String, String), LocalModule>,
}

impl LocalTargetIndex {
  pub fn get(&self, group_id: &str, artifact_id: &str) -> Option<&LocalModule> {
    self.modules.get(&(group_id.to_string(), artifact_id.to_string()))
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }
}

/// An artifact pinned by the dependency-management manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedArtifact {
  pub group_id: String,
  pub artifact_id: String,
  pub version: Option<String>,
  pub classifier: Option<String>,
  pub exclusions: Vec<(String, String)>,
}

impl ManagedArtifact {
  /// Target name inside the third-party aggregate: `groupId.artifactId`.
  pub fn target_name(&self) -> String {
    format!("{}.{}", self.group_id, self.artifact_id)
  }
}

/// Third-party artifacts in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ThirdPartyIndex {
  artifacts: Vec<ManagedArtifact>,
  keys: HashSet<(String, String)>,
}

impl ThirdPartyIndex {
  pub fn contains(&self, group_id: &str, artifact_id: &str) -> bool {
    self.keys.contains(&(group_id.to_string(), artifact_id.to_string()))
  }

  pub fn artifacts(&self) -> &[ManagedArtifact] {
    &self.artifacts
  }
}

/// State for one run. Construct at run start and pass by reference.
#[derive(Debug)]
pub struct RunContext {
  repo_root: PathBuf,
  root_manifest: PathBuf,
  dependency_management: PathBuf,
  manifests: RefCell<HashMap<PathBuf, Arc<ManifestRecord>>>,
  modules: OnceCell<Vec<PathBuf>>,
  local: OnceCell<LocalTargetIndex>,
  third_party: OnceCell<ThirdPartyIndex>,
}

impl RunContext {
  pub fn new(repo_root: impl Into<PathBuf>, config: &Config) -> Self {
    Self {
      repo_root: repo_root.into(),
      root_manifest: PathBuf::from(&config.root_manifest),
      dependency_management: PathBuf::from(&config.dependency_management),
      manifests: RefCell::new(HashMap::new()),
      modules: OnceCell::new(),
      local: OnceCell::new(),
      third_party: OnceCell::new(),
    }
  }

  pub fn repo_root(&self) -> &Path {
    &self.repo_root
  }

  /// Drop every memoized manifest and index.
  pub fn reset(&mut self) {
    self.manifests.get_mut().clear();
    self.modules = OnceCell::new();
    self.local = OnceCell::new();
    self.third_party = OnceCell::new();
  }

  /// Parse (or recall) the manifest at the repository-relative `path`.
  ///
  /// The returned record's `path` is repository-relative.
  pub fn manifest(&self, path: &Path) -> Result<Arc<ManifestRecord>, ManifestError> {
    let path = normalize(path);
    if let Some(record) = self.manifests.borrow().get(&path) {
      return Ok(Arc::clone(record));
    }

    let mut record = parse(&self.repo_root.join(&path))?;
    record.path = path.clone();
    let record = Arc::new(record);
    self.manifests.borrow_mut().insert(path, Arc::clone(&record));
    Ok(record)
  }

  /// Repository-relative manifest paths of every generated module, in
  /// aggregator declaration order.
  ///
  /// Aggregators (packaging `pom`) are walked but not returned themselves.
  /// Listed modules whose manifest is missing are skipped with a warning.
  pub fn modules(&self) -> Result<&[PathBuf], ResolveError> {
    if let Some(modules) = self.modules.get() {
      return Ok(modules);
    }

    let root = self.manifest(&self.root_manifest)?;
    let mut found = Vec::new();
    let mut visited = HashSet::from([root.path.clone()]);
    self.collect_modules(&root, &mut found, &mut visited)?;
    debug!(count = found.len(), "enumerated modules");

    Ok(self.modules.get_or_init(|| found))
  }

  fn collect_modules(
    &self,
    aggregator: &ManifestRecord,
    found: &mut Vec<PathBuf>,
    visited: &mut HashSet<PathBuf>,
  ) -> Result<(), ResolveError> {
    for module in &aggregator.modules {
      let mut path = aggregator.directory().join(module);
      if path.extension().is_none_or(|ext| ext != "xml") {
        path = path.join(MANIFEST_FILE);
      }
      let path = normalize(&path);
      if !visited.insert(path.clone()) {
        continue;
      }

      let record = match self.manifest(&path) {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
          warn!(module = %module, manifest = %path.display(), "listed module has no manifest, skipping");
          continue;
        }
        Err(e) => return Err(e.into()),
      };

      if record.packaging.as_deref() == Some("pom") {
        self.collect_modules(&record, found, visited)?;
      } else {
        found.push(path);
      }
    }
    Ok(())
  }

  /// Index of every local module and the targets it will produce.
  pub fn local_targets(&self) -> Result<&LocalTargetIndex, ResolveError> {
    if let Some(index) = self.local.get() {
      return Ok(index);
    }

    let mut index = LocalTargetIndex::default();
    for path in self.modules()? {
      let record = self.manifest(path)?;
      let Some(group_id) = record.effective_group_id() else {
        warn!(manifest = %path.display(), "module has no groupId, it cannot be referenced");
        continue;
      };

      let directory = record.directory().to_path_buf();
      let targets = self.on_disk_targets(&record);
      index.modules.insert(
        (group_id.to_string(), record.artifact_id.clone()),
        LocalModule { directory, targets },
      );
    }
    debug!(count = index.len(), "built local target index");

    Ok(self.local.get_or_init(|| index))
  }

  fn on_disk_targets(&self, record: &ManifestRecord) -> BTreeSet<&'static str> {
    let dir = self.repo_root.join(record.directory());
    let mut targets = BTreeSet::new();
    if is_non_empty_dir(&dir.join("src/main/java")) {
      targets.insert(MAIN_JAVA_TARGET);
    }
    if is_non_empty_dir(&dir.join("src/test/java")) {
      targets.insert(TEST_JAVA_TARGET);
    }
    if is_non_empty_dir(&dir.join("src/main/proto")) || record.properties.contains_key(EXTERNAL_PROTOS_PROPERTY) {
      targets.insert(MAIN_PROTO_TARGET);
    }
    targets
  }

  /// Artifacts pinned by the dependency-management manifest.
  ///
  /// A repository without that manifest has no third-party artifacts.
  pub fn third_party(&self) -> Result<&ThirdPartyIndex, ResolveError> {
    if let Some(index) = self.third_party.get() {
      return Ok(index);
    }

    let mut index = ThirdPartyIndex::default();
    match self.manifest(&self.dependency_management) {
      Ok(record) => {
        for dep in &record.managed_dependencies {
          let resolve = |value: &str| substitute(value, &record.properties);
          let artifact = ManagedArtifact {
            group_id: resolve(&dep.group_id),
            artifact_id: resolve(&dep.artifact_id),
            version: dep.version.as_deref().map(resolve),
            classifier: dep.classifier.as_deref().map(resolve),
            exclusions: dep
              .exclusions
              .iter()
              .map(|e| (resolve(&e.group_id), resolve(&e.artifact_id)))
              .collect(),
          };
          if index.keys.insert((artifact.group_id.clone(), artifact.artifact_id.clone())) {
            index.artifacts.push(artifact);
          }
        }
      }
      Err(e) if e.is_not_found() => {
        debug!(
          manifest = %self.dependency_management.display(),
          "no dependency-management manifest, third-party index is empty"
        );
      }
      Err(e) => return Err(e.into()),
    }
    debug!(count = index.artifacts.len(), "built third-party index");

    Ok(self.third_party.get_or_init(|| index))
  }
}
