//! Shared fixtures for unit tests

use podsmith_core::{ChartInfo, ReleaseInfo, RenderContext, RenderValues, Values};

pub const RELEASE: &str = "redpanda";
pub const NAMESPACE: &str = "data";

/// Snapshot from the built-in defaults plus `yaml`
pub fn values(yaml: &str) -> RenderValues {
    RenderValues::layered(vec![Values::from_yaml(yaml).unwrap()]).unwrap()
}

/// Fresh-install context for `yaml`
pub fn install(yaml: &str) -> RenderContext {
    RenderContext::new(
        values(yaml),
        ReleaseInfo::for_install(RELEASE, NAMESPACE),
        ChartInfo::default(),
    )
    .with_config_checksum("abc123")
}

/// Upgrade context for `yaml`
pub fn upgrade(yaml: &str) -> RenderContext {
    RenderContext::new(
        values(yaml),
        ReleaseInfo::for_upgrade(RELEASE, NAMESPACE, 2),
        ChartInfo::default(),
    )
    .with_config_checksum("abc123")
}
