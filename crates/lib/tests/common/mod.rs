//! Shared helpers for pomgen-lib integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct Repo {
  pub temp: TempDir,
}

impl Repo {
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

  pub fn write(&self, relative: &str, content: &str) {
    let path = self.path(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  pub fn read(&self, relative: &str) -> String {
    fs::read_to_string(self.path(relative)).unwrap()
  }
}

pub fn root_pom(modules: &[&str]) -> String {
  let modules: String = modules.iter().map(|m| format!("    <module>{m}</module>\n")).collect();
  format!(
    "<project>\n  <groupId>com.example</groupId>\n  <artifactId>root</artifactId>\n  <version>1.0</version>\n  <packaging>pom</packaging>\n  <modules>\n{modules}  </modules>\n</project>\n"
  )
}

pub fn module_pom(artifact_id: &str, dependencies: &[(&str, &str, Option<&str>)]) -> String {
  let deps: String = dependencies
    .iter()
    .map(|(g, a, v)| {
      let version = v.map(|v| format!("<version>{v}</version>")).unwrap_or_default();
      format!("    <dependency><groupId>{g}</groupId><artifactId>{a}</artifactId>{version}</dependency>\n")
    })
    .collect();
  format!(
    "<project>\n  <parent>\n    <groupId>com.example</groupId>\n    <artifactId>root</artifactId>\n    <version>1.0</version>\n  </parent>\n  <artifactId>{artifact_id}</artifactId>\n  <dependencies>\n{deps}  </dependencies>\n</project>\n"
  )
}

pub fn external_deps_pom(artifacts: &[(&str, &str, &str)]) -> String {
  let deps: String = artifacts
    .iter()
    .map(|(g, a, v)| {
      format!("      <dependency><groupId>{g}</groupId><artifactId>{a}</artifactId><version>{v}</version></dependency>\n")
    })
    .collect();
  format!(
    "<project>\n  <groupId>com.example</groupId>\n  <artifactId>external-deps</artifactId>\n  <version>1.0</version>\n  <dependencyManagement>\n    <dependencies>\n{deps}    </dependencies>\n  </dependencyManagement>\n</project>\n"
  )
}

/// `core` (guava + slf4j) and `app` (depends on core and on guava).
pub fn sample_repo() -> Repo {
  let repo = Repo::new();
  repo.write("pom.xml", &root_pom(&["core", "app"]));
  repo.write(
    "parents/external-deps/pom.xml",
    &external_deps_pom(&[
      ("org.slf4j", "slf4j-api", "2.0.9"),
      ("com.google.guava", "guava", "32.1"),
    ]),
  );
  repo.write(
    "core/pom.xml",
    &module_pom(
      "core",
      &[("org.slf4j", "slf4j-api", None), ("com.google.guava", "guava", None)],
    ),
  );
  repo.write("core/src/main/java/Core.java", "class Core {}\n");
  repo.write(
    "app/pom.xml",
    &module_pom(
      "app",
      &[("com.google.guava", "guava", None), ("com.example", "core", None)],
    ),
  );
  repo.write("app/src/main/java/App.java", "class App {}\n");
  repo
}

pub fn find_available() -> bool {
  std::process::Command::new("find").arg(".").arg("-maxdepth").arg("0").output().is_ok()
}
