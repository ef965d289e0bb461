//! Symbol substitution for `${name}` placeholders.
//!
//! Manifest values and template parameters reference properties with the
//! Maven `${name}` syntax. Substitution is iterative: a replacement value may
//! itself contain placeholders, which are expanded in turn.
//!
//! # Termination
//!
//! Expansion performs at most [`MAX_SUBSTITUTIONS`] replacements per value,
//! so cyclic definitions (`a = ${b}`, `b = ${a}`) stop instead of looping.
//!
//! # Unresolved names
//!
//! What happens when a name has no value depends on the [`OnUnresolved`]
//! policy: local manifest resolution stops silently at the first unknown
//! name, while template substitution warns, leaves that placeholder verbatim
//! and keeps expanding the rest of the value.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use pomgen_lib::placeholder::substitute;
//!
//! let mut symbols = HashMap::new();
//! symbols.insert("prop.foo".to_string(), "FOO".to_string());
//! symbols.insert("prop.baz".to_string(), "${prop.foo}-BAZ".to_string());
//!
//! assert_eq!(substitute("${prop.baz}", &symbols), "FOO-BAZ");
//! assert_eq!(substitute("${nope}", &symbols), "${nope}");
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

pub use crate::consts::MAX_SUBSTITUTIONS;

/// A source of symbol values.
pub trait SymbolTable {
  fn lookup(&self, name: &str) -> Option<&str>;
}

impl SymbolTable for HashMap<String, String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl SymbolTable for BTreeMap<String, String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

/// What to do when a placeholder names an unknown symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnUnresolved {
  /// Stop expanding the whole value, leaving the remainder as is.
  Stop,
  /// Leave this placeholder verbatim and continue with the next one.
  Skip,
}

/// Outcome of expanding one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
  pub text: String,
  /// Unknown names, in the order they were encountered.
  pub unresolved: Vec<String>,
  /// True when the substitution limit cut expansion short.
  pub truncated: bool,
}

/// Locate the first `${name}` at or after byte offset `from`.
///
/// Returns `(start, end, name)` where `start..end` spans the whole placeholder.
/// An unclosed `${` is not a placeholder.
fn find_placeholder(text: &str, from: usize) -> Option<(usize, usize, &str)> {
  let start = from + text.get(from..)?.find("${")?;
  let name_start = start + 2;
  let close = name_start + text[name_start..].find('}')?;
  Some((start, close + 1, &text[name_start..close]))
}

/// Expand placeholders in `input` using `symbols`.
pub fn expand<S: SymbolTable + ?Sized>(input: &str, symbols: &S, policy: OnUnresolved) -> Expansion {
  let mut text = input.to_string();
  let mut unresolved = Vec::new();
  let mut truncated = false;
  let mut cursor = 0;
  let mut replacements = 0;

  while let Some((start, end, name)) = find_placeholder(&text, cursor) {
    match symbols.lookup(name) {
      Some(value) => {
        if replacements == MAX_SUBSTITUTIONS {
          truncated = true;
          break;
        }
        let value = value.to_string();
        text.replace_range(start..end, &value);
        replacements += 1;
        // Rescan from the same position: the value may hold placeholders of its own.
        cursor = start;
      }
      None => {
        unresolved.push(name.to_string());
        match policy {
          OnUnresolved::Stop => break,
          OnUnresolved::Skip => cursor = end,
        }
      }
    }
  }

  Expansion {
    text,
    unresolved,
    truncated,
  }
}

/// Substitute every resolvable placeholder, warning about the rest.
///
/// Never fails: unknown names are left in place and logged.
pub fn substitute<S: SymbolTable + ?Sized>(input: &str, symbols: &S) -> String {
  let expansion = expand(input, symbols, OnUnresolved::Skip);

  for name in &expansion.unresolved {
    warn!(symbol = %name, value = %input, "unresolved symbol, leaving placeholder");
  }
  if expansion.truncated {
    warn!(value = %input, limit = MAX_SUBSTITUTIONS, "substitution limit reached, expansion stopped");
  }

  expansion.text
}
