//! Small filesystem helpers.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Write `content` to `path` atomically: write a sibling temp file, then rename.
///
/// A crash mid-write leaves either the old file or no file, never a truncated one.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  let parent = path.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(parent)?;

  let mut temp = tempfile::NamedTempFile::new_in(parent)?;
  temp.write_all(content)?;
  temp.flush()?;
  temp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
  match fs::remove_file(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}

/// True when `path` is a directory containing at least one entry.
pub fn is_non_empty_dir(path: &Path) -> bool {
  fs::read_dir(path).map(|mut entries| entries.next().is_some()).unwrap_or(false)
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above the start of a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match out.components().next_back() {
        Some(Component::Normal(_)) => {
          out.pop();
        }
        Some(Component::RootDir | Component::Prefix(_)) => {}
        _ => out.push(".."),
      },
      other => out.push(other.as_os_str()),
    }
  }
  out
}

/// Render a relative path with `/` separators on every platform.
pub fn slash_path(path: &Path) -> String {
  path
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
