//! Podsmith Engine - StatefulSet composition for Redpanda
//!
//! This crate turns a [`podsmith_core::RenderContext`] into an `apps/v1`
//! StatefulSet:
//! - Labels and selectors, preserved from the deployed object on upgrade
//! - Environment, volumes and mounts of the primary container
//! - The ordered init container pipeline
//! - Mount/volume binding validation

pub mod engine;
pub mod env;
pub mod error;
pub mod init;
pub mod labels;
pub mod lookup;
pub mod merge;
pub mod naming;
pub mod security;
pub mod statefulset;
pub mod storage;
pub mod volumes;

#[cfg(test)]
mod testutil;

pub use engine::{Engine, EngineBuilder, RenderResult};
pub use error::{EngineError, Result, SecurityField};
pub use lookup::{ExistingWorkload, LookupError, NoLookup, ResourceLookup, StaticLookup, STATEFULSET_KIND};
pub use security::Ownership;
