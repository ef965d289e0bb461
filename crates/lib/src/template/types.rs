use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// How a parameter value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Inserted verbatim (function calls, globs).
  Raw,
  /// Quoted unless already quoted.
  String,
  /// Bracketed list of items.
  List,
  /// Brace block of `key: value` items.
  Dict,
}

/// One declared template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
  pub name: &'static str,
  pub ty: ParamType,
  /// Unset values drop the whole `name=value` slot.
  pub optional: bool,
  /// Sort list items (or dict pairs) before rendering.
  pub sorted: bool,
  /// A single-item list renders on one line.
  pub collapsible: bool,
  /// An empty list/dict renders as `[]`/`{}` instead of counting as unset.
  pub emptyable: bool,
}

impl Param {
  fn new(name: &'static str, ty: ParamType) -> Self {
    Self {
      name,
      ty,
      optional: false,
      sorted: false,
      collapsible: false,
      emptyable: false,
    }
  }

  pub fn raw(name: &'static str) -> Self {
    Self::new(name, ParamType::Raw)
  }

  pub fn string(name: &'static str) -> Self {
    Self::new(name, ParamType::String)
  }

  pub fn list(name: &'static str) -> Self {
    Self::new(name, ParamType::List)
  }

  pub fn dict(name: &'static str) -> Self {
    Self::new(name, ParamType::Dict)
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn sorted(mut self) -> Self {
    self.sorted = true;
    self
  }

  pub fn collapsible(mut self) -> Self {
    self.collapsible = true;
    self
  }

  pub fn emptyable(mut self) -> Self {
    self.emptyable = true;
    self
  }
}

/// Whether a template renders across lines or on a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
  /// One `name=value,` slot per line, used for top-level targets.
  Block,
  /// `type(a=1, b=2)`, used for values nested inside other targets.
  Inline,
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TemplateValue {
  Raw(String),
  Str(String),
  List(Vec<TemplateValue>),
  Dict(Vec<(String, TemplateValue)>),
}

impl TemplateValue {
  pub fn raw(value: impl Into<String>) -> Self {
    TemplateValue::Raw(value.into())
  }

  pub fn str(value: impl Into<String>) -> Self {
    TemplateValue::Str(value.into())
  }

  /// A list of string items.
  pub fn strings<I, S>(items: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    TemplateValue::List(items.into_iter().map(|s| TemplateValue::Str(s.into())).collect())
  }

  pub fn is_empty_collection(&self) -> bool {
    match self {
      TemplateValue::List(items) => items.is_empty(),
      TemplateValue::Dict(pairs) => pairs.is_empty(),
      _ => false,
    }
  }
}

impl From<&str> for TemplateValue {
  fn from(value: &str) -> Self {
    TemplateValue::Str(value.to_string())
  }
}

impl From<String> for TemplateValue {
  fn from(value: String) -> Self {
    TemplateValue::Str(value)
  }
}

/// Parameter values keyed by parameter name. A missing key means "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Params(BTreeMap<String, TemplateValue>);

impl Params {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(mut self, name: &str, value: impl Into<TemplateValue>) -> Self {
    self.0.insert(name.to_string(), value.into());
    self
  }

  /// Set `name` only when `value` is present.
  pub fn set_opt(mut self, name: &str, value: Option<impl Into<TemplateValue>>) -> Self {
    if let Some(value) = value {
      self.0.insert(name.to_string(), value.into());
    }
    self
  }

  pub fn get(&self, name: &str) -> Option<&TemplateValue> {
    self.0.get(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("template '{template}' is missing required parameter '{parameter}'")]
  MissingParameter { template: String, parameter: String },

  #[error("template '{template}' has no parameter named '{parameter}'")]
  UnknownParameter { template: String, parameter: String },

  #[error("parameter '{parameter}' of template '{template}' expects a {expected:?} value")]
  TypeMismatch {
    template: String,
    parameter: String,
    expected: ParamType,
  },
}
