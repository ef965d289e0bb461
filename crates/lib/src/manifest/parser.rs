//! Streaming manifest parser.
//!
//! Walks the XML event stream once, keeping a stack of open element names.
//! Values are assigned when their element closes, based on the stack at that
//! point. Exclusions are nested two levels below their owning dependency
//! (`dependency/exclusions/exclusion`), so the depth at which the current
//! dependency opened is remembered and exclusions are flushed into it before
//! the dependency itself is flushed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::trace;

use super::types::{DependencyRecord, DependencyType, Exclusion, ManifestRecord, ParentRef, Scope};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("malformed manifest {path} at byte {position}: {message}")]
  Xml {
    path: PathBuf,
    position: u64,
    message: String,
  },

  #[error("manifest {path} declares no artifactId")]
  MissingArtifactId { path: PathBuf },
}

impl ManifestError {
  /// True when the manifest file does not exist, which callers usually treat
  /// as a removed module rather than a failure.
  pub fn is_not_found(&self) -> bool {
    matches!(self, ManifestError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
  }
}

/// A dependency being assembled while its element is open.
struct OpenDependency {
  /// Stack depth at which `<dependency>` opened.
  depth: usize,
  managed: bool,
  record: DependencyRecord,
  exclusion: Option<Exclusion>,
}

#[derive(Default)]
struct ParentBuilder {
  group_id: Option<String>,
  artifact_id: Option<String>,
  version: Option<String>,
  relative_path: Option<String>,
}

/// Parse the manifest at `path`.
pub fn parse(path: &Path) -> Result<ManifestRecord, ManifestError> {
  let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  parse_str(&content, path)
}

/// Parse manifest text; `path` is recorded on the result and used in errors.
pub fn parse_str(content: &str, path: &Path) -> Result<ManifestRecord, ManifestError> {
  let mut reader = Reader::from_str(content);
  let mut buf = Vec::new();

  let mut stack: Vec<String> = Vec::new();
  let mut text = String::new();

  let mut record = ManifestRecord {
    path: path.to_path_buf(),
    ..Default::default()
  };
  let mut artifact_id: Option<String> = None;
  let mut parent: Option<ParentBuilder> = None;
  let mut dependency: Option<OpenDependency> = None;

  let xml_error = |reader: &Reader<&[u8]>, message: String| ManifestError::Xml {
    path: path.to_path_buf(),
    position: reader.buffer_position() as u64,
    message,
  };

  loop {
    let event = reader
      .read_event_into(&mut buf)
      .map_err(|e| xml_error(&reader, e.to_string()))?;

    // Self-closing elements are treated as an open immediately followed by a close.
    let (opened, closed) = match &event {
      Event::Start(e) => (Some(String::from_utf8_lossy(e.local_name().as_ref()).to_string()), false),
      Event::Empty(e) => (Some(String::from_utf8_lossy(e.local_name().as_ref()).to_string()), true),
      Event::End(_) => (None, true),
      Event::Text(t) => {
        let unescaped = t.unescape().map_err(|e| xml_error(&reader, e.to_string()))?;
        text.push_str(&unescaped);
        (None, false)
      }
      Event::CData(c) => {
        text.push_str(&String::from_utf8_lossy(c));
        (None, false)
      }
      Event::Eof => break,
      _ => (None, false),
    };

    if let Some(name) = opened {
      stack.push(name);
      text.clear();
      on_open(&stack, &mut parent, &mut dependency);
    }

    if closed {
      if stack.is_empty() {
        return Err(xml_error(&reader, "unbalanced closing tag".to_string()));
      }
      let value = text.trim().to_string();
      text.clear();
      on_close(&stack, value, &mut record, &mut artifact_id, &mut parent, &mut dependency);
      stack.pop();
    }

    buf.clear();
  }

  record.artifact_id = artifact_id.ok_or_else(|| ManifestError::MissingArtifactId {
    path: path.to_path_buf(),
  })?;
  record.parent = parent.map(|p| ParentRef {
    group_id: p.group_id,
    artifact_id: p.artifact_id,
    version: p.version,
    relative_path: p.relative_path,
  });

  trace!(
    path = %path.display(),
    dependencies = record.dependencies.len(),
    modules = record.modules.len(),
    "parsed manifest"
  );

  Ok(record)
}

fn on_open(stack: &[String], parent: &mut Option<ParentBuilder>, dependency: &mut Option<OpenDependency>) {
  let path: Vec<&str> = stack.iter().map(String::as_str).collect();

  match path.as_slice() {
    ["project", "parent"] => *parent = Some(ParentBuilder::default()),
    ["project", "dependencies", "dependency"] => {
      *dependency = Some(OpenDependency {
        depth: stack.len(),
        managed: false,
        record: DependencyRecord::default(),
        exclusion: None,
      });
    }
    ["project", "dependencyManagement", "dependencies", "dependency"] => {
      *dependency = Some(OpenDependency {
        depth: stack.len(),
        managed: true,
        record: DependencyRecord::default(),
        exclusion: None,
      });
    }
    _ => {
      if let Some(open) = dependency.as_mut() {
        if stack.len() == open.depth + 2 && path[open.depth..] == ["exclusions", "exclusion"] {
          open.exclusion = Some(Exclusion {
            group_id: String::new(),
            artifact_id: String::new(),
          });
        }
      }
    }
  }
}

fn on_close(
  stack: &[String],
  value: String,
  record: &mut ManifestRecord,
  artifact_id: &mut Option<String>,
  parent: &mut Option<ParentBuilder>,
  dependency: &mut Option<OpenDependency>,
) {
  let path: Vec<&str> = stack.iter().map(String::as_str).collect();

  if let Some(open) = dependency.as_mut().filter(|open| stack.len() >= open.depth) {
    let relative = &path[open.depth..];
    match relative {
      [] => {
        if let Some(open) = dependency.take() {
          if open.managed {
            record.managed_dependencies.push(open.record);
          } else {
            record.dependencies.push(open.record);
          }
        }
      }
      [field] => set_dependency_field(&mut open.record, field, value),
      ["exclusions", "exclusion"] => {
        if let Some(exclusion) = open.exclusion.take().filter(|e| !e.artifact_id.is_empty()) {
          open.record.exclusions.insert(exclusion);
        }
      }
      ["exclusions", "exclusion", field] => {
        if let Some(exclusion) = open.exclusion.as_mut() {
          match *field {
            "groupId" => exclusion.group_id = value,
            "artifactId" => exclusion.artifact_id = value,
            _ => {}
          }
        }
      }
      _ => {}
    }
    return;
  }

  if value.is_empty() {
    return;
  }

  match path.as_slice() {
    ["project", "groupId"] => record.group_id = Some(value),
    ["project", "artifactId"] => *artifact_id = Some(value),
    ["project", "version"] => record.version = Some(value),
    ["project", "packaging"] => record.packaging = Some(value),
    ["project", "properties", name] => {
      record.properties.insert(name.to_string(), value);
    }
    ["project", "modules", "module"] => record.modules.push(value),
    ["project", "parent", field] => {
      if let Some(parent) = parent.as_mut() {
        match *field {
          "groupId" => parent.group_id = Some(value),
          "artifactId" => parent.artifact_id = Some(value),
          "version" => parent.version = Some(value),
          "relativePath" => parent.relative_path = Some(value),
          _ => {}
        }
      }
    }
    _ => {}
  }
}

fn set_dependency_field(dependency: &mut DependencyRecord, field: &str, value: String) {
  if value.is_empty() {
    return;
  }
  match field {
    "groupId" => dependency.group_id = value,
    "artifactId" => dependency.artifact_id = value,
    "version" => dependency.version = Some(value),
    "scope" => dependency.scope = Some(Scope::parse(&value)),
    "type" => dependency.type_ = Some(DependencyType::parse(&value)),
    "classifier" => dependency.classifier = Some(value),
    _ => {}
  }
}
