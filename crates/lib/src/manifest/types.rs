use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::placeholder::{OnUnresolved, expand};

/// Dependency scope as declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
  Compile,
  Test,
  System,
  Provided,
  Runtime,
  Other(String),
}

impl Scope {
  pub fn parse(value: &str) -> Self {
    match value {
      "compile" => Scope::Compile,
      "test" => Scope::Test,
      "system" => Scope::System,
      "provided" => Scope::Provided,
      "runtime" => Scope::Runtime,
      other => Scope::Other(other.to_string()),
    }
  }
}

/// Dependency packaging type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
  Jar,
  TestJar,
  Other(String),
}

impl DependencyType {
  pub fn parse(value: &str) -> Self {
    match value {
      "jar" => DependencyType::Jar,
      "test-jar" => DependencyType::TestJar,
      other => DependencyType::Other(other.to_string()),
    }
  }
}

/// An excluded transitive artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Exclusion {
  pub group_id: String,
  pub artifact_id: String,
}

/// One `<dependency>` element.
///
/// String fields may still contain `${name}` placeholders; the resolver
/// substitutes them against the fully merged property map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
  pub group_id: String,
  pub artifact_id: String,
  pub version: Option<String>,
  pub scope: Option<Scope>,
  #[serde(rename = "type")]
  pub type_: Option<DependencyType>,
  pub classifier: Option<String>,
  pub exclusions: BTreeSet<Exclusion>,
}

impl DependencyRecord {
  /// `groupId:artifactId`, used in diagnostics.
  pub fn coordinate(&self) -> String {
    format!("{}:{}", self.group_id, self.artifact_id)
  }

  pub fn key(&self) -> (String, String) {
    (self.group_id.clone(), self.artifact_id.clone())
  }

  pub fn is_test_scope(&self) -> bool {
    self.scope == Some(Scope::Test)
  }

  pub fn is_test_jar(&self) -> bool {
    self.type_ == Some(DependencyType::TestJar)
  }
}

/// The `<parent>` pointer of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
  pub group_id: Option<String>,
  pub artifact_id: Option<String>,
  pub version: Option<String>,
  pub relative_path: Option<String>,
}

/// Everything pomgen reads from one manifest file. Immutable after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
  pub path: PathBuf,
  pub group_id: Option<String>,
  pub artifact_id: String,
  pub version: Option<String>,
  pub packaging: Option<String>,
  pub parent: Option<ParentRef>,
  pub properties: BTreeMap<String, String>,
  pub dependencies: Vec<DependencyRecord>,
  pub managed_dependencies: Vec<DependencyRecord>,
  pub modules: Vec<String>,
}

impl ManifestRecord {
  /// Directory containing the manifest.
  pub fn directory(&self) -> &Path {
    self.path.parent().unwrap_or_else(|| Path::new(""))
  }

  /// The module's groupId, inherited from the parent when not declared.
  pub fn effective_group_id(&self) -> Option<&str> {
    self
      .group_id
      .as_deref()
      .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
  }

  /// The module's version, inherited from the parent when not declared.
  pub fn effective_version(&self) -> Option<&str> {
    self
      .version
      .as_deref()
      .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
  }

  /// Resolve `${name}` against this manifest's own properties only.
  ///
  /// Best effort: stops silently at the first unknown name and returns the
  /// partially resolved text. Cross-file resolution belongs to the resolver.
  pub fn resolve_properties(&self, value: &str) -> String {
    expand(value, &self.properties, OnUnresolved::Stop).text
  }
}
