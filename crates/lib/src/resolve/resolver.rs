use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::consts::MANIFEST_FILE;
use crate::manifest::{DependencyRecord, Exclusion, ManifestRecord};
use crate::placeholder::substitute;
use crate::template::jar;
use crate::util::fs::{normalize, slash_path};

use super::context::{MAIN_JAVA_TARGET, MAIN_PROTO_TARGET, RunContext, TEST_JAVA_TARGET};
use super::{DepRef, ResolveError};

const DEFAULT_PARENT_PATH: &str = "../pom.xml";

/// Dependency reference lists of one project.
///
/// The resolver fills `lib`, `test` and the jar lists; pipeline components
/// append references to the targets they generate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyLists {
  pub lib: Vec<DepRef>,
  pub test: Vec<DepRef>,
  /// Inline `jar(...)` declarations needed by the main library.
  pub lib_jars: Vec<DepRef>,
  /// Inline `jar(...)` declarations needed by the tests.
  pub test_jars: Vec<DepRef>,
  pub resources: Vec<DepRef>,
  pub test_resources: Vec<DepRef>,
}

/// A module ready for target generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDescriptor {
  /// Repository-relative manifest path.
  pub manifest_path: PathBuf,
  /// Repository-relative module directory.
  pub directory: PathBuf,
  pub group_id: String,
  pub artifact_id: String,
  pub version: Option<String>,
  /// Properties merged from the root of the parent chain down to this module.
  pub properties: BTreeMap<String, String>,
  pub deps: DependencyLists,
  /// Addresses of targets registered so far. Never holds duplicates.
  pub registered_targets: BTreeSet<String>,
  /// Parent manifests, nearest first.
  pub parent_chain: Vec<PathBuf>,
  /// Coordinates of local dependencies that matched no generated target.
  pub dropped: Vec<String>,
}

impl ProjectDescriptor {
  pub fn property(&self, name: &str) -> Option<&str> {
    self.properties.get(name).map(String::as_str)
  }

  /// Repository-relative path of `relative` inside the module.
  pub fn path(&self, relative: &str) -> PathBuf {
    self.directory.join(relative)
  }
}

/// Address of `suffix` (`src/main/java:lib`, ...) inside `directory`.
fn local_address(directory: &Path, suffix: &str) -> String {
  let dir = slash_path(directory);
  if dir.is_empty() {
    suffix.to_string()
  } else {
    format!("{dir}/{suffix}")
  }
}

fn is_proto_module(directory: &Path) -> bool {
  directory
    .file_name()
    .and_then(|name| name.to_str())
    .is_some_and(|name| name.ends_with("proto") || name.ends_with("protos"))
}

/// Resolves modules against one run's [`RunContext`].
pub struct Resolver<'a> {
  ctx: &'a RunContext,
}

impl<'a> Resolver<'a> {
  pub fn new(ctx: &'a RunContext) -> Self {
    Self { ctx }
  }

  /// Build the descriptor for the module whose manifest is at the
  /// repository-relative `manifest_path`.
  pub fn resolve(&self, manifest_path: &Path) -> Result<ProjectDescriptor, ResolveError> {
    let record = self.ctx.manifest(manifest_path)?;
    let chain = self.parent_chain(&record)?;
    let properties = merge_properties(&record, &chain);

    let group_id = record
      .effective_group_id()
      .map(|g| substitute(g, &properties))
      .unwrap_or_default();
    let version = record.effective_version().map(|v| substitute(v, &properties));

    let mut project = ProjectDescriptor {
      manifest_path: record.path.clone(),
      directory: record.directory().to_path_buf(),
      group_id,
      artifact_id: record.artifact_id.clone(),
      version,
      properties,
      deps: DependencyLists::default(),
      registered_targets: BTreeSet::new(),
      parent_chain: chain.iter().map(|p| p.path.clone()).collect(),
      dropped: Vec::new(),
    };

    for dep in &record.dependencies {
      let dep = resolve_dependency(dep, &project.properties);
      let Some(reference) = self.classify(&dep, &mut project)? else {
        continue;
      };

      let list = match (dep.is_test_scope(), reference.is_inline()) {
        (false, false) => &mut project.deps.lib,
        (false, true) => &mut project.deps.lib_jars,
        (true, false) => &mut project.deps.test,
        (true, true) => &mut project.deps.test_jars,
      };
      list.push(reference);
    }

    debug!(
      manifest = %project.manifest_path.display(),
      lib = project.deps.lib.len() + project.deps.lib_jars.len(),
      test = project.deps.test.len() + project.deps.test_jars.len(),
      "resolved project"
    );
    Ok(project)
  }

  /// Parent manifests of `record`, nearest first.
  ///
  /// The walk ends at a manifest without a parent, or at a parent that is not
  /// part of this repository.
  fn parent_chain(&self, record: &ManifestRecord) -> Result<Vec<Arc<ManifestRecord>>, ResolveError> {
    let mut chain: Vec<Arc<ManifestRecord>> = Vec::new();
    let mut seen = HashSet::from([record.path.clone()]);
    let mut current_dir = record.directory().to_path_buf();
    let mut parent_ref = record.parent.clone();

    while let Some(parent) = parent_ref {
      let mut location = current_dir.join(parent.relative_path.as_deref().unwrap_or(DEFAULT_PARENT_PATH));
      if location.file_name().is_some_and(|name| name == MANIFEST_FILE) {
        location.pop();
      }
      let path = normalize(&location.join(MANIFEST_FILE));

      if matches!(path.components().next(), Some(Component::ParentDir)) {
        debug!(parent = %path.display(), "parent lies outside the repository");
        break;
      }
      if !seen.insert(path.clone()) {
        return Err(ResolveError::ParentCycle {
          manifest: record.path.clone(),
          parent: path,
        });
      }

      let parent_record = match self.ctx.manifest(&path) {
        Ok(parent_record) => parent_record,
        Err(e) if e.is_not_found() => {
          debug!(parent = %path.display(), "parent manifest not found locally");
          break;
        }
        Err(e) => return Err(e.into()),
      };

      let expected = parent.artifact_id.as_deref();
      if expected.is_some_and(|expected| expected != parent_record.artifact_id) {
        debug!(
          parent = %path.display(),
          expected = ?expected,
          found = %parent_record.artifact_id,
          "manifest at parent path is a different artifact"
        );
        break;
      }

      current_dir = parent_record.directory().to_path_buf();
      parent_ref = parent_record.parent.clone();
      chain.push(parent_record);
    }

    Ok(chain)
  }

  /// Classify one resolved dependency.
  ///
  /// Returns `None` for a local dependency whose module produces no matching
  /// target; the coordinate is recorded in `project.dropped`.
  fn classify(&self, dep: &DependencyRecord, project: &mut ProjectDescriptor) -> Result<Option<DepRef>, ResolveError> {
    if let Some(module) = self.ctx.local_targets()?.get(&dep.group_id, &dep.artifact_id) {
      let wanted = if dep.is_test_jar() {
        TEST_JAVA_TARGET
      } else {
        MAIN_JAVA_TARGET
      };

      if module.targets.contains(wanted) {
        return Ok(Some(DepRef::Local(local_address(&module.directory, wanted))));
      }
      if is_proto_module(&module.directory) && module.targets.contains(MAIN_PROTO_TARGET) {
        return Ok(Some(DepRef::Local(local_address(&module.directory, MAIN_PROTO_TARGET))));
      }

      warn!(
        dependency = %dep.coordinate(),
        manifest = %project.manifest_path.display(),
        module = %module.directory.display(),
        "local module produces no target for this dependency, dropping it"
      );
      project.dropped.push(dep.coordinate());
      return Ok(None);
    }

    if self.ctx.third_party()?.contains(&dep.group_id, &dep.artifact_id) {
      return Ok(Some(DepRef::ThirdParty(format!(
        "3rdparty:{}.{}",
        dep.group_id, dep.artifact_id
      ))));
    }

    let Some(version) = dep.version.as_deref() else {
      return Err(ResolveError::MissingVersion {
        artifact: dep.coordinate(),
        manifest: project.manifest_path.clone(),
      });
    };

    let excludes: Vec<(String, String)> = dep
      .exclusions
      .iter()
      .map(|e| (e.group_id.clone(), e.artifact_id.clone()))
      .collect();
    let declaration = jar(
      &dep.group_id,
      &dep.artifact_id,
      version,
      dep.classifier.as_deref(),
      &excludes,
    )
    .map_err(|source| ResolveError::Template {
      manifest: project.manifest_path.clone(),
      source,
    })?;
    Ok(Some(DepRef::External(declaration)))
  }
}

/// Merge properties root-first so nearer manifests win, then add the implicit
/// `project.*` properties, then the module's own properties.
fn merge_properties(record: &ManifestRecord, chain: &[Arc<ManifestRecord>]) -> BTreeMap<String, String> {
  let mut merged = BTreeMap::new();
  for parent in chain.iter().rev() {
    merged.extend(parent.properties.clone());
  }

  if let Some(group_id) = record.effective_group_id() {
    merged.insert("project.groupId".to_string(), group_id.to_string());
  }
  merged.insert("project.artifactId".to_string(), record.artifact_id.clone());
  if let Some(version) = record.effective_version() {
    merged.insert("project.version".to_string(), version.to_string());
  }
  if let Some(version) = record.parent.as_ref().and_then(|p| p.version.as_ref()) {
    merged.insert("project.parent.version".to_string(), version.clone());
  }

  merged.extend(record.properties.clone());
  merged
}

fn resolve_dependency(dep: &DependencyRecord, properties: &BTreeMap<String, String>) -> DependencyRecord {
  let resolve = |value: &str| substitute(value, properties);
  DependencyRecord {
    group_id: resolve(&dep.group_id),
    artifact_id: resolve(&dep.artifact_id),
    version: dep.version.as_deref().map(resolve),
    scope: dep.scope.clone(),
    type_: dep.type_.clone(),
    classifier: dep.classifier.as_deref().map(resolve),
    exclusions: dep
      .exclusions
      .iter()
      .map(|e| Exclusion {
        group_id: resolve(&e.group_id),
        artifact_id: resolve(&e.artifact_id),
      })
      .collect(),
  }
}
