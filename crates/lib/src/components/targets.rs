//! Targets collected during one run, grouped by descriptor directory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::consts::{AUX_BUILD_FILE, AUX_TARGET_PREFIX, BUILD_FILE, GENERATED_BUILD_FILE};
use crate::resolve::ProjectDescriptor;
use crate::template::{Params, TargetDescriptor, TargetKind, address};

use super::ComponentError;

/// Every target generated in one run.
#[derive(Debug)]
pub struct TargetSet {
  repo_root: PathBuf,
  by_dir: BTreeMap<PathBuf, Vec<TargetDescriptor>>,
  names: BTreeSet<String>,
}

impl TargetSet {
  pub fn new(repo_root: impl Into<PathBuf>) -> Self {
    Self {
      repo_root: repo_root.into(),
      by_dir: BTreeMap::new(),
      names: BTreeSet::new(),
    }
  }

  pub fn repo_root(&self) -> &Path {
    &self.repo_root
  }

  /// True when `directory` holds a hand-authored descriptor.
  pub fn has_manual_descriptor(&self, directory: &Path) -> bool {
    self.repo_root.join(directory).join(BUILD_FILE).is_file()
  }

  /// Descriptor file name used for `directory`.
  pub fn file_name_for(&self, directory: &Path) -> &'static str {
    if self.has_manual_descriptor(directory) {
      AUX_BUILD_FILE
    } else {
      GENERATED_BUILD_FILE
    }
  }

  /// The name a target requested as `name` gets in `directory`.
  ///
  /// Targets written next to a hand-authored descriptor carry a prefix so they
  /// cannot clash with the hand-authored targets.
  pub fn target_name(&self, directory: &Path, name: &str) -> String {
    if self.has_manual_descriptor(directory) {
      format!("{AUX_TARGET_PREFIX}{name}")
    } else {
      name.to_string()
    }
  }

  /// Address other targets use to reference `name` in `directory`.
  pub fn address_of(&self, directory: &Path, name: &str) -> String {
    address(directory, &self.target_name(directory, name))
  }

  /// Register a target for `project` and return its address.
  ///
  /// Every generated target passes through here. A second target with the
  /// same name in the same descriptor file fails with
  /// [`ComponentError::DuplicateTarget`].
  pub fn create_project_target(
    &mut self,
    project: &mut ProjectDescriptor,
    directory: &Path,
    name: &str,
    kind: TargetKind,
    params: Params,
  ) -> Result<String, ComponentError> {
    let final_name = self.target_name(directory, name);
    let target_address = address(directory, &final_name);

    if project.registered_targets.contains(&target_address) || self.names.contains(&target_address) {
      return Err(ComponentError::DuplicateTarget {
        name: final_name,
        directory: directory.to_path_buf(),
        manifest: project.manifest_path.clone(),
      });
    }

    let target = TargetDescriptor::render(directory, &final_name, kind, params, Some(&project.properties)).map_err(
      |source| ComponentError::Template {
        target: target_address.clone(),
        source,
      },
    )?;

    trace!(target = %target_address, kind = %kind, "registered target");
    project.registered_targets.insert(target_address.clone());
    self.insert(target)?;
    Ok(target_address)
  }

  /// Add a target that belongs to no project, such as a third-party alias.
  pub fn insert(&mut self, target: TargetDescriptor) -> Result<(), ComponentError> {
    let target_address = target.address();
    if !self.names.insert(target_address) {
      return Err(ComponentError::DuplicateTarget {
        name: target.name,
        directory: target.directory,
        manifest: PathBuf::new(),
      });
    }
    self.by_dir.entry(target.directory.clone()).or_default().push(target);
    Ok(())
  }

  /// Directories with at least one target, and their targets in registration order.
  pub fn directories(&self) -> impl Iterator<Item = (&Path, &[TargetDescriptor])> {
    self.by_dir.iter().map(|(dir, targets)| (dir.as_path(), targets.as_slice()))
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
