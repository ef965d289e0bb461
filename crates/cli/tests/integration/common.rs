//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const ROOT_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <groupId>com.example</groupId>
  <artifactId>root</artifactId>
  <version>1.0</version>
  <packaging>pom</packaging>
  <modules>
    <module>core</module>
    <module>app</module>
  </modules>
</project>
"#;

pub const EXTERNAL_DEPS_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <groupId>com.example</groupId>
  <artifactId>external-deps</artifactId>
  <version>1.0</version>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.google.guava</groupId>
        <artifactId>guava</artifactId>
        <version>32.1</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>
"#;

pub const CORE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <parent>
    <groupId>com.example</groupId>
    <artifactId>root</artifactId>
    <version>1.0</version>
  </parent>
  <artifactId>core</artifactId>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
    </dependency>
  </dependencies>
</project>
"#;

pub const APP_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <parent>
    <groupId>com.example</groupId>
    <artifactId>root</artifactId>
    <version>1.0</version>
  </parent>
  <artifactId>app</artifactId>
  <properties>
    <project.mainclass>com.example.app.Main</project.mainclass>
  </properties>
  <dependencies>
    <dependency>
      <groupId>com.example</groupId>
      <artifactId>core</artifactId>
    </dependency>
  </dependencies>
</project>
"#;

/// Get a Command for the pomgen binary.
pub fn pomgen_cmd() -> Command {
  cargo_bin_cmd!("pomgen")
}

/// Isolated test environment.
///
/// Each test gets its own repository and its own cache directory.
pub struct TestEnv {
  pub repo: TempDir,
  pub cache: TempDir,
}

impl TestEnv {
  /// A two-module repository: `app` depends on `core`, `core` on guava.
  pub fn sample() -> Self {
    let env = Self::empty();
    env.write_file("pom.xml", ROOT_POM);
    env.write_file("parents/external-deps/pom.xml", EXTERNAL_DEPS_POM);
    env.write_file("core/pom.xml", CORE_POM);
    env.write_file("core/src/main/java/com/example/core/Core.java", "package com.example.core;\n");
    env.write_file("app/pom.xml", APP_POM);
    env.write_file("app/src/main/java/com/example/app/Main.java", "package com.example.app;\n");
    env.write_file("app/src/test/java/com/example/app/MainTest.java", "package com.example.app;\n");
    env
  }

  pub fn empty() -> Self {
    Self {
      repo: TempDir::new().unwrap(),
      cache: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.repo.path().join(relative)
  }

  /// Write a file relative to the repository root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn read_file(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.path(relative_path))
      .unwrap_or_else(|e| panic!("Failed to read {}: {}", relative_path, e))
  }

  pub fn cache_path(&self) -> &Path {
    self.cache.path()
  }

  /// A pomgen command for this repository with an isolated cache.
  pub fn cmd(&self) -> Command {
    let mut cmd = pomgen_cmd();
    cmd
      .arg(self.repo.path())
      .arg("--cache-dir")
      .arg(self.cache.path())
      .env_remove("RUST_LOG");
    cmd
  }
}
