//! Render context

use serde::{Deserialize, Serialize};

use crate::config::RenderValues;
use crate::release::{ChartInfo, ReleaseInfo};

/// Everything a single render reads, besides the existing-state lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    /// Typed configuration snapshot
    pub values: RenderValues,

    /// Release information
    pub release: ReleaseInfo,

    /// Chart identity
    pub chart: ChartInfo,

    /// Checksum of the rendered cluster configuration, stamped on the pod
    /// template so config changes roll the pods
    pub config_checksum: String,
}

impl RenderContext {
    /// Create a new render context
    pub fn new(values: RenderValues, release: ReleaseInfo, chart: ChartInfo) -> Self {
        Self {
            values,
            release,
            chart,
            config_checksum: String::new(),
        }
    }

    /// Set the config checksum
    pub fn with_config_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.config_checksum = checksum.into();
        self
    }
}
