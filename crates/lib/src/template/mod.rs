//! Typed descriptor templates.
//!
//! A template declares the parameters of one target type. Formatting checks
//! the supplied values against those declarations and renders the target,
//! omitting unset optional slots.

mod render;
mod targets;
mod types;

pub use render::{TargetTemplate, quote};
pub use targets::{TargetDescriptor, TargetKind, address, artifact, exclude, jar};
pub use types::{Layout, Param, ParamType, Params, TemplateError, TemplateValue};
