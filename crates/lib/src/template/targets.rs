//! The target kinds pomgen emits and their templates.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::placeholder::SymbolTable;
use crate::util::fs::slash_path;

use super::render::TargetTemplate;
use super::types::{Layout, Param, Params, TemplateError, TemplateValue};

/// The closed set of top-level targets a descriptor file can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
  Library,
  Resources,
  ProtobufLibrary,
  Binary,
  Tests,
  DependencyAlias,
  PrepCommand,
  JarLibrary,
  Fingerprint,
}

impl TargetKind {
  pub fn template(self) -> TargetTemplate {
    match self {
      TargetKind::Library => TargetTemplate::new(
        "java_library",
        Layout::Block,
        vec![
          Param::string("name"),
          Param::raw("sources"),
          Param::list("dependencies").optional(),
          Param::raw("provides").optional(),
          Param::list("tags").optional().sorted().collapsible(),
        ],
      ),
      TargetKind::Resources => TargetTemplate::new(
        "resources",
        Layout::Block,
        vec![Param::string("name"), Param::raw("sources")],
      ),
      TargetKind::ProtobufLibrary => TargetTemplate::new(
        "java_protobuf_library",
        Layout::Block,
        vec![
          Param::string("name"),
          Param::raw("sources"),
          Param::list("dependencies").optional(),
          Param::raw("provides").optional(),
        ],
      ),
      TargetKind::Binary => TargetTemplate::new(
        "jvm_binary",
        Layout::Block,
        vec![
          Param::string("name"),
          Param::string("main"),
          Param::string("basename").optional(),
          Param::list("dependencies").collapsible(),
        ],
      ),
      TargetKind::Tests => TargetTemplate::new(
        "junit_tests",
        Layout::Block,
        vec![
          Param::string("name"),
          Param::raw("sources"),
          Param::list("dependencies").optional(),
          Param::list("tags").optional().sorted().collapsible(),
        ],
      ),
      TargetKind::DependencyAlias => TargetTemplate::new(
        "target",
        Layout::Block,
        vec![Param::string("name"), Param::list("dependencies")],
      ),
      TargetKind::PrepCommand => TargetTemplate::new(
        "prep_command",
        Layout::Block,
        vec![
          Param::string("name"),
          Param::string("prep_executable"),
          Param::list("prep_args").optional().collapsible(),
          Param::dict("prep_environ").optional().sorted(),
          Param::string("goal").optional(),
        ],
      ),
      TargetKind::JarLibrary => TargetTemplate::new(
        "jar_library",
        Layout::Block,
        vec![Param::string("name"), Param::list("jars").collapsible()],
      ),
      TargetKind::Fingerprint => TargetTemplate::new(
        "fingerprint",
        Layout::Block,
        vec![
          Param::string("name"),
          Param::raw("sources"),
          Param::string("version").optional(),
        ],
      ),
    }
  }
}

impl fmt::Display for TargetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.template().type_name)
  }
}

fn jar_template() -> TargetTemplate {
  TargetTemplate::new(
    "jar",
    Layout::Inline,
    vec![
      Param::string("org"),
      Param::string("name"),
      Param::string("rev"),
      Param::string("classifier").optional(),
      Param::list("excludes").optional().sorted(),
    ],
  )
}

fn exclude_template() -> TargetTemplate {
  TargetTemplate::new(
    "exclude",
    Layout::Inline,
    vec![Param::string("org"), Param::string("name")],
  )
}

fn artifact_template() -> TargetTemplate {
  TargetTemplate::new(
    "artifact",
    Layout::Inline,
    vec![Param::string("org"), Param::string("name"), Param::raw("repo")],
  )
}

/// Inline `exclude(org=..., name=...)` value.
pub fn exclude(org: &str, name: &str) -> Result<String, TemplateError> {
  exclude_template().format(&Params::new().set("org", org).set("name", name), None)
}

/// Inline `jar(...)` declaration for an artifact fetched by coordinates.
pub fn jar(
  org: &str,
  name: &str,
  rev: &str,
  classifier: Option<&str>,
  excludes: &[(String, String)],
) -> Result<String, TemplateError> {
  let excludes = excludes
    .iter()
    .map(|(org, name)| exclude(org, name).map(TemplateValue::Raw))
    .collect::<Result<Vec<_>, _>>()?;

  let params = Params::new()
    .set("org", org)
    .set("name", name)
    .set("rev", rev)
    .set_opt("classifier", classifier)
    .set("excludes", TemplateValue::List(excludes));
  jar_template().format(&params, None)
}

/// Inline `artifact(...)` publication value for `provides=`.
pub fn artifact(org: &str, name: &str) -> Result<String, TemplateError> {
  let params = Params::new()
    .set("org", org)
    .set("name", name)
    .set("repo", TemplateValue::raw("public"));
  artifact_template().format(&params, None)
}

/// Address of a target, as referenced from other targets: `dir/path:name`.
///
/// Targets in the repository root are addressed as `:name`.
pub fn address(directory: &Path, name: &str) -> String {
  format!("{}:{name}", slash_path(directory))
}

/// One rendered target. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
  pub name: String,
  pub kind: TargetKind,
  /// Repository-relative directory of the descriptor file.
  pub directory: PathBuf,
  pub params: Params,
  pub text: String,
}

impl TargetDescriptor {
  /// Render a target of `kind`. `name` is written into the `name` parameter.
  pub fn render(
    directory: impl Into<PathBuf>,
    name: &str,
    kind: TargetKind,
    params: Params,
    symbols: Option<&dyn SymbolTable>,
  ) -> Result<Self, TemplateError> {
    let params = params.set("name", name);
    let text = kind.template().format(&params, symbols)?;
    Ok(Self {
      name: name.to_string(),
      kind,
      directory: directory.into(),
      params,
      text,
    })
  }

  pub fn address(&self) -> String {
    address(&self.directory, &self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  #[test]
  fn jar_with_excludes_and_classifier() {
    let text = jar(
      "com.google.guava",
      "guava",
      "31.1-jre",
      Some("tests"),
      &[("org.checkerframework".to_string(), "checker-qual".to_string())],
    )
    .unwrap();
    assert_eq!(
      text,
      "jar(org='com.google.guava', name='guava', rev='31.1-jre', classifier='tests', excludes=[exclude(org='org.checkerframework', name='checker-qual')])"
    );
  }

  #[test]
  fn jar_without_optional_parts() {
    let text = jar("org.slf4j", "slf4j-api", "2.0.9", None, &[]).unwrap();
    assert_eq!(text, "jar(org='org.slf4j', name='slf4j-api', rev='2.0.9')");
  }

  #[test]
  fn artifact_value() {
    assert_eq!(
      artifact("com.example", "core").unwrap(),
      "artifact(org='com.example', name='core', repo=public)"
    );
  }

  #[test]
  fn addresses_use_forward_slashes() {
    assert_eq!(address(Path::new("core/src/main/java"), "lib"), "core/src/main/java:lib");
    assert_eq!(address(Path::new(""), "app"), ":app");
  }

  #[test]
  fn render_fills_in_the_name() {
    let target = TargetDescriptor::render(
      "core/src/main/resources",
      "resources",
      TargetKind::Resources,
      Params::new().set("sources", TemplateValue::raw("rglobs('*')")),
      None,
    )
    .unwrap();
    assert_eq!(target.text, "resources(\n  name='resources',\n  sources=rglobs('*'),\n)\n");
    assert_eq!(target.address(), "core/src/main/resources:resources");
  }

  #[test]
  fn render_substitutes_project_properties() {
    let symbols: BTreeMap<String, String> = [("project.version".to_string(), "2.1".to_string())].into();
    let target = TargetDescriptor::render(
      "app",
      "fingerprint",
      TargetKind::Fingerprint,
      Params::new()
        .set("sources", TemplateValue::raw("globs('pom.xml')"))
        .set("version", "${project.version}"),
      Some(&symbols),
    )
    .unwrap();
    assert!(target.text.contains("version='2.1'"));
  }

  #[test]
  fn prep_command_renders_environment_dict() {
    let target = TargetDescriptor::render(
      "gen",
      "codegen",
      TargetKind::PrepCommand,
      Params::new()
        .set("prep_executable", "bin/gen.sh")
        .set("prep_args", TemplateValue::strings(["--out", "target"]))
        .set(
          "prep_environ",
          TemplateValue::Dict(vec![("Z".to_string(), "1".into()), ("A".to_string(), "2".into())]),
        ),
      None,
    )
    .unwrap();
    assert!(target.text.contains("prep_environ={\n    'A': '2',\n    'Z': '1',\n  },"));
  }

  #[test]
  fn kind_displays_as_its_function_name() {
    assert_eq!(TargetKind::ProtobufLibrary.to_string(), "java_protobuf_library");
    assert_eq!(TargetKind::DependencyAlias.to_string(), "target");
  }
}
