use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// A classified dependency reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "address", rename_all = "kebab-case")]
pub enum DepRef {
  /// A pinned artifact from the dependency-management manifest: `3rdparty:g.a`.
  ThirdParty(String),
  /// A target generated for another module of this repository.
  Local(String),
  /// A target generated for this project by an earlier pipeline stage.
  Generated(String),
  /// An inline `jar(...)` declaration for an unmanaged artifact.
  External(String),
}

impl DepRef {
  pub fn as_str(&self) -> &str {
    match self {
      DepRef::ThirdParty(s) | DepRef::Local(s) | DepRef::Generated(s) | DepRef::External(s) => s,
    }
  }

  /// True when the reference is an inline artifact declaration rather than a target address.
  pub fn is_inline(&self) -> bool {
    matches!(self, DepRef::External(_))
  }
}

impl fmt::Display for DepRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Order references for output.
///
/// Third-party references come first in their original relative order, then
/// local references sorted, then every other reference sorted. Duplicates are
/// removed. The classpath of the generated targets follows this order, so it
/// must stay stable.
pub fn format_references<'a>(refs: impl IntoIterator<Item = &'a DepRef>) -> Vec<String> {
  let mut third_party: Vec<String> = Vec::new();
  let mut local = BTreeSet::new();
  let mut other = BTreeSet::new();

  for dep in refs {
    match dep {
      DepRef::ThirdParty(s) => {
        if !third_party.iter().any(|existing| existing == s) {
          third_party.push(s.clone());
        }
      }
      DepRef::Local(s) => {
        local.insert(s.clone());
      }
      DepRef::Generated(s) | DepRef::External(s) => {
        other.insert(s.clone());
      }
    }
  }

  let mut seen: BTreeSet<String> = third_party.iter().cloned().collect();
  let mut ordered = third_party;
  for s in local.into_iter().chain(other) {
    if seen.insert(s.clone()) {
      ordered.push(s);
    }
  }
  ordered
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn third_party_first_then_sorted_local_then_sorted_other() {
    let refs = vec![
      DepRef::Local("zeta/src/main/java:lib".to_string()),
      DepRef::ThirdParty("3rdparty:org.slf4j.slf4j-api".to_string()),
      DepRef::Generated(":fingerprint".to_string()),
      DepRef::Local("alpha/src/main/java:lib".to_string()),
      DepRef::ThirdParty("3rdparty:com.google.guava.guava".to_string()),
      DepRef::Generated("app/src/main/resources:resources".to_string()),
    ];

    assert_eq!(
      format_references(&refs),
      vec![
        "3rdparty:org.slf4j.slf4j-api",
        "3rdparty:com.google.guava.guava",
        "alpha/src/main/java:lib",
        "zeta/src/main/java:lib",
        ":fingerprint",
        "app/src/main/resources:resources",
      ]
    );
  }

  #[test]
  fn duplicates_are_removed() {
    let refs = vec![
      DepRef::ThirdParty("3rdparty:b".to_string()),
      DepRef::ThirdParty("3rdparty:a".to_string()),
      DepRef::ThirdParty("3rdparty:b".to_string()),
      DepRef::Local("x:lib".to_string()),
      DepRef::Local("x:lib".to_string()),
    ];
    assert_eq!(format_references(&refs), vec!["3rdparty:b", "3rdparty:a", "x:lib"]);
  }

  #[test]
  fn same_address_in_two_classes_appears_once() {
    let refs = vec![
      DepRef::Local("core/src/main/java:lib".to_string()),
      DepRef::Generated("core/src/main/java:lib".to_string()),
    ];
    assert_eq!(format_references(&refs), vec!["core/src/main/java:lib"]);
  }

  #[test]
  fn ordering_is_independent_of_local_input_order() {
    let forward = vec![
      DepRef::Local("a:lib".to_string()),
      DepRef::Local("b:lib".to_string()),
      DepRef::Local("c:lib".to_string()),
    ];
    let mut backward = forward.clone();
    backward.reverse();
    assert_eq!(format_references(&forward), format_references(&backward));
  }

  #[test]
  fn empty_input_formats_to_empty_list() {
    assert!(format_references(std::iter::empty()).is_empty());
  }
}
