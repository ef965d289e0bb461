//! The per-project generation pipeline.
//!
//! Components run in a fixed order. Earlier components append references to
//! the targets they create onto the project's dependency lists, which later
//! components render into their own targets: the fingerprint created for a
//! main class ends up in the main library's dependencies, resources and
//! protobuf targets in the libraries that consume them.

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::resolve::{DepRef, EXTERNAL_PROTOS_PROPERTY, ProjectDescriptor, RunContext, format_references};
use crate::template::{Params, TargetKind, TemplateValue, artifact};
use crate::util::fs::is_non_empty_dir;

use super::{ComponentError, TargetSet};

/// Property naming the main class of an application module.
pub const MAIN_CLASS_PROPERTY: &str = "project.mainclass";
/// Property naming an archive that supplies a module's test protobuf sources.
pub const EXTERNAL_TEST_PROTOS_PROPERTY: &str = "protos.external.test.artifact";
pub const CODEGEN_EXECUTABLE_PROPERTY: &str = "codegen.executable";
pub const CODEGEN_ARGS_PROPERTY: &str = "codegen.args";
/// Prefix of properties exported to the code generator's environment.
pub const CODEGEN_ENV_PREFIX: &str = "codegen.env.";

/// Main or test half of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSet {
  Main,
  Test,
}

impl SourceSet {
  fn dir(self, kind: &str) -> String {
    match self {
      SourceSet::Main => format!("src/main/{kind}"),
      SourceSet::Test => format!("src/test/{kind}"),
    }
  }

  fn external_protos_property(self) -> &'static str {
    match self {
      SourceSet::Main => EXTERNAL_PROTOS_PROPERTY,
      SourceSet::Test => EXTERNAL_TEST_PROTOS_PROPERTY,
    }
  }
}

/// Where a component's sources come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStrategy {
  /// Checked into the module's source directory.
  Normal,
  /// Unpacked from an external archive named by a manifest property.
  ExternallySourced,
}

/// One pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
  MainClass,
  Resources(SourceSet),
  Protobuf(SourceSet, SourceStrategy),
  JavaLibrary,
  PlaceholderLibrary,
  TestJavaLibrary,
  PlaceholderTest,
  CodegenSetup,
}

impl Component {
  pub fn name(self) -> &'static str {
    use SourceSet::*;
    use SourceStrategy::*;
    match self {
      Component::MainClass => "main-class",
      Component::Resources(Main) => "main-resources",
      Component::Resources(Test) => "test-resources",
      Component::Protobuf(Main, Normal) => "main-protobuf",
      Component::Protobuf(Main, ExternallySourced) => "main-external-protobuf",
      Component::Protobuf(Test, Normal) => "test-protobuf",
      Component::Protobuf(Test, ExternallySourced) => "test-external-protobuf",
      Component::JavaLibrary => "main-java-library",
      Component::PlaceholderLibrary => "placeholder-library",
      Component::TestJavaLibrary => "test-java-library",
      Component::PlaceholderTest => "placeholder-test",
      Component::CodegenSetup => "codegen-setup",
    }
  }

  /// Whether this component applies to `project`.
  pub fn exists(self, project: &ProjectDescriptor, ctx: &RunContext) -> bool {
    let non_empty = |relative: &str| is_non_empty_dir(&ctx.repo_root().join(project.path(relative)));

    match self {
      Component::MainClass => project.property(MAIN_CLASS_PROPERTY).is_some(),
      Component::Resources(set) => non_empty(set.dir("resources").as_str()),
      Component::Protobuf(set, SourceStrategy::Normal) => non_empty(set.dir("proto").as_str()),
      Component::Protobuf(set, SourceStrategy::ExternallySourced) => {
        project.property(set.external_protos_property()).is_some() && !non_empty(set.dir("proto").as_str())
      }
      Component::JavaLibrary => non_empty("src/main/java"),
      Component::PlaceholderLibrary => {
        !non_empty("src/main/java") && !(project.deps.lib.is_empty() && project.deps.lib_jars.is_empty())
      }
      Component::TestJavaLibrary => non_empty("src/test/java"),
      Component::PlaceholderTest => {
        !non_empty("src/test/java") && !(project.deps.test.is_empty() && project.deps.test_jars.is_empty())
      }
      Component::CodegenSetup => project.property(CODEGEN_EXECUTABLE_PROPERTY).is_some(),
    }
  }

  /// Emit this component's targets for `project`.
  pub fn generate(self, project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<(), ComponentError> {
    match self {
      Component::MainClass => main_class(project, targets),
      Component::Resources(set) => resources(set, project, targets),
      Component::Protobuf(set, SourceStrategy::Normal) => protobuf(set, project, targets, Vec::new()),
      Component::Protobuf(set, SourceStrategy::ExternallySourced) => {
        let unpack = unpack_protos(set, project, targets)?;
        protobuf(set, project, targets, vec![DepRef::Generated(unpack)])
      }
      Component::JavaLibrary => java_library(project, targets),
      Component::PlaceholderLibrary => placeholder(SourceSet::Main, project, targets),
      Component::TestJavaLibrary => test_java_library(project, targets),
      Component::PlaceholderTest => placeholder(SourceSet::Test, project, targets),
      Component::CodegenSetup => codegen(project, targets),
    }
  }
}

impl fmt::Display for Component {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// The fixed pipeline, in execution order.
pub const PIPELINE: [Component; 12] = [
  Component::MainClass,
  Component::Resources(SourceSet::Main),
  Component::Resources(SourceSet::Test),
  Component::Protobuf(SourceSet::Main, SourceStrategy::Normal),
  Component::Protobuf(SourceSet::Main, SourceStrategy::ExternallySourced),
  Component::Protobuf(SourceSet::Test, SourceStrategy::Normal),
  Component::Protobuf(SourceSet::Test, SourceStrategy::ExternallySourced),
  Component::JavaLibrary,
  Component::PlaceholderLibrary,
  Component::TestJavaLibrary,
  Component::PlaceholderTest,
  Component::CodegenSetup,
];

/// Runs the component pipeline over projects.
#[derive(Debug, Clone)]
pub struct BuildComponentRegistry {
  components: Vec<Component>,
}

impl Default for BuildComponentRegistry {
  fn default() -> Self {
    Self {
      components: PIPELINE.to_vec(),
    }
  }
}

impl BuildComponentRegistry {
  pub fn components(&self) -> &[Component] {
    &self.components
  }

  /// Run every applicable component over `project`, in order.
  ///
  /// Returns the names of the components that applied.
  pub fn generate(
    &self,
    project: &mut ProjectDescriptor,
    ctx: &RunContext,
    targets: &mut TargetSet,
  ) -> Result<Vec<&'static str>, ComponentError> {
    let mut applied = Vec::new();
    for component in &self.components {
      if !component.exists(project, ctx) {
        continue;
      }
      debug!(project = %project.directory.display(), component = %component, "generating");
      component.generate(project, targets)?;
      applied.push(component.name());
    }
    Ok(applied)
  }
}

fn sources(glob: &str) -> TemplateValue {
  TemplateValue::raw(format!("rglobs('{glob}')"))
}

fn references<'a>(refs: impl IntoIterator<Item = &'a DepRef>) -> TemplateValue {
  TemplateValue::strings(format_references(refs))
}

fn provides(project: &ProjectDescriptor) -> Result<TemplateValue, ComponentError> {
  artifact(&project.group_id, &project.artifact_id)
    .map(TemplateValue::Raw)
    .map_err(|source| ComponentError::Template {
      target: project.manifest_path.display().to_string(),
      source,
    })
}

/// Create a `jar_library` holding `jars` in `directory`, if there are any.
fn jar_library(
  project: &mut ProjectDescriptor,
  targets: &mut TargetSet,
  directory: &Path,
  jars: &[DepRef],
) -> Result<Option<String>, ComponentError> {
  if jars.is_empty() {
    return Ok(None);
  }
  let jars = TemplateValue::List(jars.iter().map(|j| TemplateValue::raw(j.as_str())).collect());
  let address = targets.create_project_target(
    project,
    directory,
    "jar_library",
    TargetKind::JarLibrary,
    Params::new().set("jars", jars),
  )?;
  Ok(Some(address))
}

fn main_class(project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<(), ComponentError> {
  let root = project.directory.clone();
  let main = project.property(MAIN_CLASS_PROPERTY).unwrap_or_default().to_string();

  let params = Params::new()
    .set("sources", TemplateValue::raw("globs('pom.xml')"))
    .set_opt("version", project.version.clone());
  let fingerprint = targets.create_project_target(project, &root, "fingerprint", TargetKind::Fingerprint, params)?;
  project.deps.lib.push(DepRef::Generated(fingerprint));

  let java_dir = project.path("src/main/java");
  let dependencies = if is_non_empty_dir(&targets.repo_root().join(&java_dir)) {
    TemplateValue::strings([targets.address_of(&java_dir, "lib")])
  } else {
    references(&project.deps.lib)
  };

  let params = Params::new()
    .set("main", main)
    .set("basename", project.artifact_id.clone())
    .set("dependencies", dependencies);
  targets.create_project_target(project, &root, "app", TargetKind::Binary, params)?;
  Ok(())
}

fn resources(set: SourceSet, project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<(), ComponentError> {
  let dir = project.path(&set.dir("resources"));
  let address = targets.create_project_target(
    project,
    &dir,
    "resources",
    TargetKind::Resources,
    Params::new().set("sources", sources("*")),
  )?;

  let list = match set {
    SourceSet::Main => &mut project.deps.resources,
    SourceSet::Test => &mut project.deps.test_resources,
  };
  list.push(DepRef::Generated(address));
  Ok(())
}

/// Parse a `groupId:artifactId:version` property value.
fn archive_coordinates<'v>(
  project: &ProjectDescriptor,
  property: &str,
  value: &'v str,
) -> Result<(&'v str, &'v str, &'v str), ComponentError> {
  let parts: Vec<&str> = value.split(':').collect();
  match parts.as_slice() {
    [group, artifact, version] if !group.is_empty() && !artifact.is_empty() && !version.is_empty() => {
      Ok((*group, *artifact, *version))
    }
    _ => Err(ComponentError::InvalidProperty {
      property: property.to_string(),
      value: value.to_string(),
      manifest: project.manifest_path.clone(),
    }),
  }
}

/// Synthesize the command that unpacks an external proto archive into the
/// module's (locally absent) proto directory.
fn unpack_protos(set: SourceSet, project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<String, ComponentError> {
  let property = set.external_protos_property();
  let value = project.property(property).unwrap_or_default().to_string();
  let (group_id, artifact_id, version) = archive_coordinates(project, property, &value)?;

  let proto_dir = set.dir("proto");
  let args = vec![
    "dependency:unpack".to_string(),
    format!("-Dartifact={group_id}:{artifact_id}:{version}"),
    format!("-DoutputDirectory={proto_dir}"),
    "-Dmdep.unpack.includes=**/*.proto".to_string(),
  ];
  let dir = project.path(&proto_dir);
  targets.create_project_target(
    project,
    &dir,
    "unpack-protos",
    TargetKind::PrepCommand,
    Params::new()
      .set("prep_executable", "mvn")
      .set("prep_args", TemplateValue::strings(args))
      .set("goal", "gen"),
  )
}

fn protobuf(
  set: SourceSet,
  project: &mut ProjectDescriptor,
  targets: &mut TargetSet,
  extra: Vec<DepRef>,
) -> Result<(), ComponentError> {
  let dir = project.path(&set.dir("proto"));
  let consumed = match set {
    SourceSet::Main => &project.deps.lib,
    SourceSet::Test => &project.deps.test,
  };
  let dependencies = references(consumed.iter().chain(&extra));

  let mut params = Params::new()
    .set("sources", sources("*.proto"))
    .set("dependencies", dependencies);
  if set == SourceSet::Main {
    params = params.set("provides", provides(project)?);
  }

  let address = targets.create_project_target(project, &dir, "proto", TargetKind::ProtobufLibrary, params)?;
  let list = match set {
    SourceSet::Main => &mut project.deps.lib,
    SourceSet::Test => &mut project.deps.test,
  };
  list.push(DepRef::Generated(address));
  Ok(())
}

fn java_library(project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<(), ComponentError> {
  let dir = project.path("src/main/java");
  let jars = project.deps.lib_jars.clone();
  let jars_target = jar_library(project, targets, &dir, &jars)?;

  let mut refs: Vec<DepRef> = project.deps.lib.iter().chain(&project.deps.resources).cloned().collect();
  refs.extend(jars_target.map(DepRef::Generated));

  let params = Params::new()
    .set("sources", sources("*.java"))
    .set("dependencies", references(&refs))
    .set("provides", provides(project)?);
  targets.create_project_target(project, &dir, "lib", TargetKind::Library, params)?;
  Ok(())
}

/// The address of this project's main library, whichever component made it.
fn own_library(project: &ProjectDescriptor, targets: &TargetSet) -> Option<String> {
  let candidates = [
    targets.address_of(&project.path("src/main/java"), "lib"),
    targets.address_of(&project.directory, "lib"),
  ];
  candidates
    .into_iter()
    .find(|address| project.registered_targets.contains(address))
}

fn test_java_library(project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<(), ComponentError> {
  let dir = project.path("src/test/java");
  let jars = project.deps.test_jars.clone();
  let jars_target = jar_library(project, targets, &dir, &jars)?;

  let mut refs: Vec<DepRef> = project.deps.test.iter().chain(&project.deps.test_resources).cloned().collect();
  refs.extend(own_library(project, targets).map(DepRef::Generated));
  refs.extend(jars_target.map(DepRef::Generated));

  let library = targets.create_project_target(
    project,
    &dir,
    "lib",
    TargetKind::Library,
    Params::new()
      .set("sources", sources("*.java"))
      .set("dependencies", references(&refs)),
  )?;

  targets.create_project_target(
    project,
    &dir,
    "test",
    TargetKind::Tests,
    Params::new()
      .set("sources", sources("*Test.java"))
      .set("dependencies", TemplateValue::strings([library])),
  )?;
  Ok(())
}

/// A dependency-only alias for a module without sources of its own.
fn placeholder(set: SourceSet, project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<(), ComponentError> {
  let root = project.directory.clone();
  let (jars, name, jar_name) = match set {
    SourceSet::Main => (project.deps.lib_jars.clone(), "lib", "jar_library"),
    SourceSet::Test => (project.deps.test_jars.clone(), "test-lib", "test_jar_library"),
  };

  let mut refs: Vec<DepRef> = match set {
    SourceSet::Main => project.deps.lib.iter().chain(&project.deps.resources).cloned().collect(),
    SourceSet::Test => project.deps.test.iter().chain(&project.deps.test_resources).cloned().collect(),
  };
  if set == SourceSet::Test {
    refs.extend(own_library(project, targets).map(DepRef::Generated));
  }

  if !jars.is_empty() {
    let jars = TemplateValue::List(jars.iter().map(|j| TemplateValue::raw(j.as_str())).collect());
    let address = targets.create_project_target(
      project,
      &root,
      jar_name,
      TargetKind::JarLibrary,
      Params::new().set("jars", jars),
    )?;
    refs.push(DepRef::Generated(address));
  }

  targets.create_project_target(
    project,
    &root,
    name,
    TargetKind::DependencyAlias,
    Params::new().set("dependencies", references(&refs)),
  )?;
  Ok(())
}

fn codegen(project: &mut ProjectDescriptor, targets: &mut TargetSet) -> Result<(), ComponentError> {
  let root = project.directory.clone();
  let executable = project.property(CODEGEN_EXECUTABLE_PROPERTY).unwrap_or_default().to_string();
  let args: Vec<String> = project
    .property(CODEGEN_ARGS_PROPERTY)
    .map(|args| args.split_whitespace().map(str::to_string).collect())
    .unwrap_or_default();
  let environ: Vec<(String, TemplateValue)> = project
    .properties
    .iter()
    .filter_map(|(key, value)| {
      key
        .strip_prefix(CODEGEN_ENV_PREFIX)
        .map(|name| (name.to_string(), TemplateValue::str(value.clone())))
    })
    .collect();

  targets.create_project_target(
    project,
    &root,
    "codegen",
    TargetKind::PrepCommand,
    Params::new()
      .set("prep_executable", executable)
      .set("prep_args", TemplateValue::strings(args))
      .set("prep_environ", TemplateValue::Dict(environ))
      .set("goal", "gen"),
  )?;
  Ok(())
}
