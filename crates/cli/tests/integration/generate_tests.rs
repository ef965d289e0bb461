//! End-to-end runs of the pomgen binary against small repositories.

use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn first_run_generates_every_descriptor() {
  let env = TestEnv::sample();

  env
    .cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("in 5 file(s) for 2 project(s)"));

  for path in [
    "3rdparty/BUILD.gen",
    "app/BUILD.gen",
    "app/src/main/java/BUILD.gen",
    "app/src/test/java/BUILD.gen",
    "core/src/main/java/BUILD.gen",
  ] {
    assert!(env.path(path).is_file(), "{path} was not generated");
  }

  let binary = env.read_file("app/BUILD.gen");
  assert!(binary.contains("jvm_binary("));
  assert!(binary.contains("main='com.example.app.Main',"));

  let core = env.read_file("core/src/main/java/BUILD.gen");
  assert!(core.contains("'3rdparty:com.google.guava.guava'"));
}

#[test]
fn unchanged_repository_is_a_no_op() {
  let env = TestEnv::sample();
  env.cmd().assert().success();
  let before = env.read_file("app/src/main/java/BUILD.gen");

  env
    .cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Up to date"));
  assert_eq!(env.read_file("app/src/main/java/BUILD.gen"), before);
}

#[test]
fn json_output_reports_the_decision() {
  let env = TestEnv::sample();

  env
    .cmd()
    .args(["--output", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"decision\": \"full-regenerate\""));

  env
    .cmd()
    .args(["-o", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"decision\": \"no-op\""));
}

#[test]
fn tampered_descriptor_is_restored() {
  let env = TestEnv::sample();
  env.cmd().assert().success();
  let original = env.read_file("core/src/main/java/BUILD.gen");

  env.write_file("core/src/main/java/BUILD.gen", "# edited by hand\n");
  env
    .cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Restored 1 descriptor(s)"));
  assert_eq!(env.read_file("core/src/main/java/BUILD.gen"), original);
}

#[test]
fn manifest_change_regenerates() {
  let env = TestEnv::sample();
  env.cmd().assert().success();

  env.write_file(
    "core/pom.xml",
    &crate::common::CORE_POM.replace(
      "<dependencies>",
      "<dependencies>\n    <dependency>\n      <groupId>com.acme</groupId>\n      <artifactId>widget</artifactId>\n      <version>2.0</version>\n    </dependency>",
    ),
  );
  env
    .cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Generated"));
  assert!(env.read_file("core/src/main/java/BUILD.gen").contains("jar(org='com.acme', name='widget', rev='2.0')"));
}

#[test]
fn no_cache_always_regenerates() {
  let env = TestEnv::sample();

  for _ in 0..2 {
    env
      .cmd()
      .arg("--no-cache")
      .assert()
      .success()
      .stdout(predicate::str::contains("Generated"));
  }
  assert!(std::fs::read_dir(env.cache_path()).unwrap().next().is_none());
}

#[test]
fn rebuild_flag_regenerates_unchanged_repository() {
  let env = TestEnv::sample();
  env.cmd().assert().success();

  env
    .cmd()
    .arg("--rebuild")
    .assert()
    .success()
    .stdout(predicate::str::contains("Generated"));
}

#[test]
fn clean_then_runs() {
  let env = TestEnv::sample();
  env.cmd().assert().success();

  env
    .cmd()
    .arg("--clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Generated"));
  env
    .cmd()
    .arg("--clean-all")
    .assert()
    .success()
    .stdout(predicate::str::contains("Generated"));
}

#[test]
fn hand_authored_descriptor_gets_aux_file() {
  let env = TestEnv::sample();
  env.write_file("core/src/main/java/BUILD", "java_library(name='lib', sources=globs('*.java'))\n");

  env.cmd().assert().success();
  assert!(env.path("core/src/main/java/BUILD.aux").is_file());
  assert!(!env.path("core/src/main/java/BUILD.gen").exists());
  assert!(env.read_file("core/src/main/java/BUILD.aux").contains("name='aux-lib',"));
  assert!(env.read_file("app/src/main/java/BUILD.gen").contains("'core/src/main/java:lib'"));
}

#[test]
fn missing_root_manifest_fails() {
  let env = TestEnv::empty();
  env.write_file("core/pom.xml", crate::common::CORE_POM);

  env
    .cmd()
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("Generation failed"));
}

#[test]
fn unknown_third_party_dependency_fails() {
  let env = TestEnv::sample();
  env.write_file(
    "core/pom.xml",
    &crate::common::CORE_POM.replace("com.google.guava", "org.unknown"),
  );

  env
    .cmd()
    .assert()
    .failure()
    .stderr(predicate::str::contains("org.unknown"));
  assert!(!env.path("core/src/main/java/BUILD.gen").exists());
}
