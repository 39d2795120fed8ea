//! Podsmith Kube - deployed state for upgrade renders
//!
//! Upgrades must reuse the selector of the deployed StatefulSet. This crate
//! reads it either from the cluster ([`ClusterLookup`]) or from an exported
//! manifest ([`lookup_from_manifest`]) and hands it to the engine as a
//! [`podsmith_engine::StaticLookup`].

pub mod client;
pub mod error;
pub mod manifest;

pub use client::ClusterLookup;
pub use error::{KubeError, Result};
pub use manifest::{load_statefulsets, lookup_from_manifest, parse_statefulsets};
