//! pomgen-lib: BUILD descriptor generation for Maven-style repositories
//!
//! This crate turns a tree of `pom.xml` module manifests into generated build
//! descriptors:
//! - `manifest`: parsing `pom.xml` files into records
//! - `resolve`: parent chains, properties and dependency classification
//! - `template` / `components`: the target pipeline and its rendering
//! - `generate`: whole-repository generation and descriptor files
//! - `cache`: skipping, restoring or redoing generation between runs

pub mod cache;
pub mod components;
pub mod config;
pub mod consts;
pub mod generate;
pub mod manifest;
pub mod placeholder;
pub mod platform;
pub mod resolve;
pub mod template;
pub mod util;
