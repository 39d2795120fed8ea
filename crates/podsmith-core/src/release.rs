//! Release and chart identity

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which kind of render this is
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// No instance exists yet, everything is computed from values
    #[default]
    FreshInstall,
    /// An instance may exist; immutable fields are read back from it
    Upgrade,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FreshInstall => "fresh-install",
            Self::Upgrade => "upgrade",
        };
        write!(f, "{}", s)
    }
}

/// Release information for a render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Revision number
    pub revision: u32,

    /// Install or upgrade
    pub mode: RenderMode,

    /// Value of `app.kubernetes.io/managed-by`
    pub service: String,
}

impl ReleaseInfo {
    /// Create release info for a new install
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision: 1,
            mode: RenderMode::FreshInstall,
            service: "Helm".to_string(),
        }
    }

    /// Create release info for an upgrade
    pub fn for_upgrade(name: &str, namespace: &str, revision: u32) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision,
            mode: RenderMode::Upgrade,
            service: "Helm".to_string(),
        }
    }

    pub fn is_upgrade(&self) -> bool {
        self.mode == RenderMode::Upgrade
    }
}

/// Chart identity the workload is rendered for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    /// Chart name, the default for the instance name
    pub name: String,

    /// Chart version
    pub version: Version,

    /// App version, the default image tag
    pub app_version: String,
}

impl ChartInfo {
    pub fn new(name: &str, version: &str, app_version: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            version: Version::parse(version.trim_start_matches('v'))?,
            app_version: app_version.to_string(),
        })
    }

    /// Value for the `helm.sh/chart` label: `<name>-<version>`, `+` replaced by `_`
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.version).replace('+', "_")
    }
}

impl Default for ChartInfo {
    fn default() -> Self {
        Self {
            name: "redpanda".to_string(),
            version: Version::new(5, 9, 0),
            app_version: "v24.2.4".to_string(),
        }
    }
}
