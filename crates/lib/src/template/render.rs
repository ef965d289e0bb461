//! Rendering of templates into descriptor text.
//!
//! Rendering is structural: each declared parameter becomes a slot that is
//! either present (rendered as `name=value`) or absent (skipped entirely).
//! Slots are joined only after absent ones are dropped, so a value that
//! contains the separator can never be split apart.

use crate::placeholder::{SymbolTable, substitute};

use super::types::{Layout, Param, ParamType, Params, TemplateError, TemplateValue};

const INDENT: &str = "  ";

/// A declared target (or inline value) shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTemplate {
  /// The function name emitted in the descriptor, e.g. `java_library`.
  pub type_name: &'static str,
  pub layout: Layout,
  pub params: Vec<Param>,
}

impl TargetTemplate {
  pub fn new(type_name: &'static str, layout: Layout, params: Vec<Param>) -> Self {
    Self {
      type_name,
      layout,
      params,
    }
  }

  /// Render `params` into text.
  ///
  /// When `symbols` is given, string, list and dict values pass through
  /// symbol substitution first. Raw values never do.
  pub fn format(&self, params: &Params, symbols: Option<&dyn SymbolTable>) -> Result<String, TemplateError> {
    if let Some(unknown) = params.names().find(|name| !self.params.iter().any(|p| p.name == *name)) {
      return Err(TemplateError::UnknownParameter {
        template: self.type_name.to_string(),
        parameter: unknown.to_string(),
      });
    }

    let mut slots = Vec::with_capacity(self.params.len());
    for param in &self.params {
      let value = params.get(param.name).filter(|v| param.emptyable || !v.is_empty_collection());

      match value {
        Some(value) => {
          let rendered = self.render_param(param, value, symbols)?;
          slots.push(format!("{}={}", param.name, rendered));
        }
        None if param.optional => {}
        None => {
          return Err(TemplateError::MissingParameter {
            template: self.type_name.to_string(),
            parameter: param.name.to_string(),
          });
        }
      }
    }

    Ok(match self.layout {
      Layout::Inline => format!("{}({})", self.type_name, slots.join(", ")),
      Layout::Block => {
        let mut out = format!("{}(\n", self.type_name);
        for slot in slots {
          out.push_str(INDENT);
          out.push_str(&slot);
          out.push_str(",\n");
        }
        out.push_str(")\n");
        out
      }
    })
  }

  fn mismatch(&self, param: &Param) -> TemplateError {
    TemplateError::TypeMismatch {
      template: self.type_name.to_string(),
      parameter: param.name.to_string(),
      expected: param.ty,
    }
  }

  fn render_param(
    &self,
    param: &Param,
    value: &TemplateValue,
    symbols: Option<&dyn SymbolTable>,
  ) -> Result<String, TemplateError> {
    let subst = |text: &str| match symbols {
      Some(symbols) => substitute(text, symbols),
      None => text.to_string(),
    };

    match (param.ty, value) {
      (ParamType::Raw, TemplateValue::Raw(text) | TemplateValue::Str(text)) => Ok(text.clone()),
      (ParamType::String, TemplateValue::Str(text)) => Ok(quote(&subst(text))),
      (ParamType::List, TemplateValue::List(items)) => {
        let mut rendered = items
          .iter()
          .map(|item| self.render_item(param, item, &subst))
          .collect::<Result<Vec<_>, _>>()?;
        if param.sorted {
          rendered.sort();
        }
        Ok(self.wrap(param, '[', ']', rendered))
      }
      (ParamType::Dict, TemplateValue::Dict(pairs)) => {
        let mut pairs = pairs
          .iter()
          .map(|(key, item)| Ok((key.clone(), self.render_item(param, item, &subst)?)))
          .collect::<Result<Vec<_>, TemplateError>>()?;
        if param.sorted {
          pairs.sort_by(|a, b| a.0.cmp(&b.0));
        }
        let rendered = pairs
          .into_iter()
          .map(|(key, item)| format!("{}: {}", quote(&subst(&key)), item))
          .collect();
        Ok(self.wrap(param, '{', '}', rendered))
      }
      _ => Err(self.mismatch(param)),
    }
  }

  fn render_item(
    &self,
    param: &Param,
    item: &TemplateValue,
    subst: &dyn Fn(&str) -> String,
  ) -> Result<String, TemplateError> {
    match item {
      TemplateValue::Str(text) => Ok(quote(&subst(text))),
      TemplateValue::Raw(text) => Ok(subst(text)),
      _ => Err(self.mismatch(param)),
    }
  }

  /// Lay out rendered items between `open` and `close`.
  fn wrap(&self, param: &Param, open: char, close: char, items: Vec<String>) -> String {
    let single_line = self.layout == Layout::Inline || items.is_empty() || (param.collapsible && items.len() == 1);
    if single_line {
      return format!("{open}{}{close}", items.join(", "));
    }

    let mut out = format!("{open}\n");
    for item in items {
      out.push_str(INDENT);
      out.push_str(INDENT);
      out.push_str(&item);
      out.push_str(",\n");
    }
    out.push_str(INDENT);
    out.push(close);
    out
  }
}

/// Quote `text` unless it is already quoted.
pub fn quote(text: &str) -> String {
  let already_quoted = text.len() >= 2
    && ((text.starts_with('\'') && text.ends_with('\'')) || (text.starts_with('"') && text.ends_with('"')));
  if already_quoted {
    text.to_string()
  } else if text.contains('\'') {
    format!("\"{}\"", text.replace('"', "\\\""))
  } else {
    format!("'{text}'")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use tracing_test::traced_test;

  fn library() -> TargetTemplate {
    TargetTemplate::new(
      "java_library",
      Layout::Block,
      vec![
        Param::string("name"),
        Param::raw("sources"),
        Param::list("dependencies").optional(),
        Param::list("imports").optional().sorted().collapsible(),
        Param::dict("entries").optional().sorted(),
        Param::string("classifier").optional(),
      ],
    )
  }

  #[test]
  fn renders_block_layout() {
    let params = Params::new()
      .set("name", "lib")
      .set("sources", TemplateValue::raw("rglobs('*.java')"))
      .set("dependencies", TemplateValue::strings(["3rdparty:guava", "core/src/main/java:lib"]));

    let text = library().format(&params, None).unwrap();
    assert_eq!(
      text,
      "java_library(\n  name='lib',\n  sources=rglobs('*.java'),\n  dependencies=[\n    '3rdparty:guava',\n    'core/src/main/java:lib',\n  ],\n)\n"
    );
  }

  #[test]
  fn absent_optional_slots_are_omitted_whole() {
    let params = Params::new()
      .set("name", "lib")
      .set("sources", TemplateValue::raw("globs('*.java')"));

    let text = library().format(&params, None).unwrap();
    assert!(!text.contains("dependencies"));
    assert!(!text.contains("classifier"));
    assert_eq!(text.lines().count(), 4);
  }

  #[test]
  fn values_containing_commas_survive_optional_removal() {
    let params = Params::new()
      .set("name", "a, b")
      .set("sources", TemplateValue::raw("globs('x', 'y')"));

    let text = library().format(&params, None).unwrap();
    assert!(text.contains("name='a, b',"));
    assert!(text.contains("sources=globs('x', 'y'),"));
  }

  #[test]
  fn collapsible_single_item_lists_render_inline() {
    let params = Params::new()
      .set("name", "lib")
      .set("sources", TemplateValue::raw("globs()"))
      .set("imports", TemplateValue::strings(["only"]));

    let text = library().format(&params, None).unwrap();
    assert!(text.contains("  imports=['only'],\n"));
  }

  #[test]
  fn sorted_lists_and_dicts_are_ordered() {
    let params = Params::new()
      .set("name", "lib")
      .set("sources", TemplateValue::raw("globs()"))
      .set("imports", TemplateValue::strings(["b", "a"]))
      .set(
        "entries",
        TemplateValue::Dict(vec![("z".to_string(), "1".into()), ("a".to_string(), "2".into())]),
      );

    let text = library().format(&params, None).unwrap();
    assert!(text.contains("imports=[\n    'a',\n    'b',\n  ]"));
    assert!(text.contains("entries={\n    'a': '2',\n    'z': '1',\n  }"));
  }

  #[test]
  fn unsorted_lists_keep_given_order() {
    let params = Params::new()
      .set("name", "lib")
      .set("sources", TemplateValue::raw("globs()"))
      .set("dependencies", TemplateValue::strings(["b", "a"]));

    let text = library().format(&params, None).unwrap();
    let b = text.find("'b'").unwrap();
    let a = text.find("'a'").unwrap();
    assert!(b < a);
  }

  #[test]
  fn empty_lists_count_as_unset_unless_emptyable() {
    let template = TargetTemplate::new(
      "target",
      Layout::Block,
      vec![
        Param::string("name"),
        Param::list("dependencies").optional(),
        Param::list("sources").emptyable(),
      ],
    );
    let params = Params::new()
      .set("name", "alias")
      .set("dependencies", TemplateValue::List(vec![]))
      .set("sources", TemplateValue::List(vec![]));

    let text = template.format(&params, None).unwrap();
    assert!(!text.contains("dependencies"));
    assert!(text.contains("sources=[],"));
  }

  #[test]
  fn missing_required_parameter_names_template_and_parameter() {
    let err = library().format(&Params::new().set("name", "lib"), None).unwrap_err();
    assert_eq!(
      err,
      TemplateError::MissingParameter {
        template: "java_library".to_string(),
        parameter: "sources".to_string(),
      }
    );
    assert!(err.to_string().contains("java_library"));
    assert!(err.to_string().contains("sources"));
  }

  #[test]
  fn unknown_parameter_is_rejected() {
    let params = Params::new()
      .set("name", "lib")
      .set("sources", TemplateValue::raw("globs()"))
      .set("bogus", "x");
    let err = library().format(&params, None).unwrap_err();
    assert!(matches!(err, TemplateError::UnknownParameter { .. }));
  }

  #[test]
  fn shape_mismatch_is_rejected() {
    let params = Params::new()
      .set("name", TemplateValue::strings(["lib"]))
      .set("sources", TemplateValue::raw("globs()"));
    let err = library().format(&params, None).unwrap_err();
    assert!(matches!(err, TemplateError::TypeMismatch { .. }));
  }

  #[test]
  fn inline_layout_renders_on_one_line() {
    let jar = TargetTemplate::new(
      "jar",
      Layout::Inline,
      vec![
        Param::string("org"),
        Param::string("name"),
        Param::string("rev"),
        Param::string("classifier").optional(),
        Param::list("excludes").optional().sorted(),
      ],
    );
    let params = Params::new()
      .set("org", "com.google.guava")
      .set("name", "guava")
      .set("rev", "31.1")
      .set(
        "excludes",
        TemplateValue::List(vec![
          TemplateValue::raw("exclude(org='b', name='y')"),
          TemplateValue::raw("exclude(org='a', name='x')"),
        ]),
      );

    assert_eq!(
      jar.format(&params, None).unwrap(),
      "jar(org='com.google.guava', name='guava', rev='31.1', excludes=[exclude(org='a', name='x'), exclude(org='b', name='y')])"
    );
  }

  #[test]
  fn symbols_substitute_into_strings_and_lists_but_not_raw() {
    let symbols: HashMap<String, String> = [("v".to_string(), "1.2".to_string())].into_iter().collect();
    let params = Params::new()
      .set("name", "lib-${v}")
      .set("sources", TemplateValue::raw("globs('${v}')"))
      .set("dependencies", TemplateValue::strings(["dep:${v}"]));

    let text = library().format(&params, Some(&symbols)).unwrap();
    assert!(text.contains("name='lib-1.2'"));
    assert!(text.contains("'dep:1.2'"));
    assert!(text.contains("globs('${v}')"));
  }

  #[test]
  #[traced_test]
  fn unresolved_symbols_are_left_with_a_warning() {
    let symbols: HashMap<String, String> = HashMap::new();
    let params = Params::new()
      .set("name", "${missing}")
      .set("sources", TemplateValue::raw("globs()"));

    let text = library().format(&params, Some(&symbols)).unwrap();
    assert!(text.contains("name='${missing}'"));
    assert!(logs_contain("unresolved symbol"));
  }

  #[test]
  fn quoting_rules() {
    assert_eq!(quote("lib"), "'lib'");
    assert_eq!(quote("'lib'"), "'lib'");
    assert_eq!(quote("\"lib\""), "\"lib\"");
    assert_eq!(quote("it's"), "\"it's\"");
  }
}
