//! Podsmith Core - Core types for rendering a Redpanda StatefulSet
//!
//! This crate provides the foundational types used throughout podsmith:
//! - `Values`: Layered configuration with deep merge support
//! - `RenderValues`: The typed, read-only configuration snapshot
//! - `ReleaseInfo` / `ChartInfo`: Release and chart identity
//! - `RenderContext`: Everything one render reads

pub mod config;
pub mod context;
pub mod error;
pub mod release;
pub mod values;

pub use config::{
    DEFAULT_TIERED_CACHE_DIRECTORY, DEFAULT_VALUES, LabelMap, RenderValues, TieredMountType,
    TrustStore,
};
pub use context::RenderContext;
pub use error::{CoreError, Result};
pub use release::{ChartInfo, ReleaseInfo, RenderMode};
pub use values::{Values, parse_set_values};
