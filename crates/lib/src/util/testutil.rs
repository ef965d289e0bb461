//! Test utilities for pomgen-lib.
//!
//! Helpers for laying out small multi-module repositories on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway repository rooted in a temp directory.
pub struct TestRepo {
  pub temp: TempDir,
}

impl TestRepo {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.temp.path().join(relative)
  }

  /// Write a file relative to the repository root, creating parents.
  pub fn write(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.path(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
  }

  /// Create a source file so the containing source root counts as non-empty.
  pub fn source(&self, relative_dir: &str, file: &str) {
    self.write(&format!("{relative_dir}/{file}"), "// source\n");
  }
}

/// Minimal module manifest with a parent pointing at the root aggregator.
pub fn module_pom(artifact_id: &str, dependencies: &str) -> String {
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <parent>
    <groupId>com.example</groupId>
    <artifactId>root</artifactId>
    <version>1.0</version>
    <relativePath>../pom.xml</relativePath>
  </parent>
  <artifactId>{artifact_id}</artifactId>
  <dependencies>
{dependencies}
  </dependencies>
</project>
"#
  )
}

/// Root aggregator manifest listing `modules`.
pub fn root_pom(modules: &[&str], properties: &str) -> String {
  let modules: String = modules.iter().map(|m| format!("    <module>{m}</module>\n")).collect();
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <groupId>com.example</groupId>
  <artifactId>root</artifactId>
  <version>1.0</version>
  <packaging>pom</packaging>
  <properties>
{properties}
  </properties>
  <modules>
{modules}  </modules>
</project>
"#
  )
}

/// A `<dependency>` element.
pub fn dependency(group_id: &str, artifact_id: &str, extra: &str) -> String {
  format!(
    "    <dependency>\n      <groupId>{group_id}</groupId>\n      <artifactId>{artifact_id}</artifactId>\n{extra}    </dependency>\n"
  )
}

/// Dependency-management manifest pinning `entries` of `(groupId, artifactId, version)`.
pub fn external_deps_pom(entries: &[(&str, &str, &str)]) -> String {
  let deps: String = entries.iter().map(|(g, a, v)| dependency(g, a, &format!("      <version>{v}</version>\n"))).collect();
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <groupId>com.example</groupId>
  <artifactId>external-deps</artifactId>
  <version>1.0</version>
  <dependencyManagement>
    <dependencies>
{deps}    </dependencies>
  </dependencyManagement>
</project>
"#
  )
}
