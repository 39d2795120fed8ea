//! Typed configuration snapshot
//!
//! [`RenderValues`] is the read-only view every composer works from. It is
//! decoded once from the merged [`Values`] tree; unknown keys are ignored and
//! missing keys fall back to the built-in defaults in `values.yaml`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, PodSecurityContext, ResourceRequirements, Volume, VolumeMount,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::values::Values;

/// Built-in defaults, the lowest-priority layer of every render
pub const DEFAULT_VALUES: &str = include_str!("../values.yaml");

/// Where tiered storage keeps its cache when nothing else is configured
pub const DEFAULT_TIERED_CACHE_DIRECTORY: &str = "/var/lib/redpanda/data/cloud_storage_cache";

/// String map used for labels, selectors and annotations
pub type LabelMap = BTreeMap<String, String>;

/// The complete configuration snapshot for one render
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderValues {
    pub name_override: String,
    pub fullname_override: String,
    pub common_labels: LabelMap,
    pub image: ImageSettings,
    pub tuning: TuningSettings,
    pub tls: TlsSettings,
    pub auth: AuthSettings,
    pub listeners: Listeners,
    pub storage: StorageSettings,
    pub statefulset: StatefulSetSettings,
    /// Cluster configuration, opaque here; only its checksum is used
    pub config: JsonValue,
}

impl RenderValues {
    /// The built-in defaults as an untyped layer
    pub fn default_layer() -> Result<Values> {
        Values::from_yaml(DEFAULT_VALUES)
    }

    /// Build a snapshot from the defaults with `layers` merged on top, in order
    pub fn layered(layers: Vec<Values>) -> Result<Self> {
        let mut stack = vec![Self::default_layer()?];
        stack.extend(layers);
        Values::merge_all(stack).decode()
    }

    /// Decode a snapshot from an already merged tree
    pub fn from_values(values: &Values) -> Result<Self> {
        values.decode()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageSettings {
    pub repository: String,
    /// Falls back to the chart's app version when empty
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningSettings {
    pub tune_aio_events: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TlsSettings {
    pub enabled: bool,
    pub certs: BTreeMap<String, CertSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertSettings {
    pub secret_ref: Option<SecretRef>,
    pub ca_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub sasl: SaslSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaslSettings {
    pub enabled: bool,
    pub secret_ref: String,
}

/// All listeners of the workload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listeners {
    pub admin: Listener,
    pub kafka: Listener,
    pub http: Listener,
    pub schema_registry: Listener,
    pub rpc: Listener,
}

impl Listeners {
    /// Trust stores declared by every TLS-enabled listener, internal first,
    /// then external listeners sorted by name. Duplicates are dropped.
    pub fn trust_stores(&self, tls: &TlsSettings) -> Vec<&TrustStore> {
        let mut stores: Vec<&TrustStore> = Vec::new();

        for listener in [
            &self.admin,
            &self.kafka,
            &self.http,
            &self.schema_registry,
            &self.rpc,
        ] {
            if listener.tls.is_enabled(tls) {
                if let Some(store) = &listener.tls.trust_store {
                    push_unique(&mut stores, store);
                }
            }

            for external in listener.external.values() {
                if let Some(store) = external.trust_store(&listener.tls, tls) {
                    push_unique(&mut stores, store);
                }
            }
        }

        stores
    }
}

fn push_unique<'a>(stores: &mut Vec<&'a TrustStore>, store: &'a TrustStore) {
    if !stores.iter().any(|s| s.relative_path() == store.relative_path()) {
        stores.push(store);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Listener {
    pub tls: ListenerTls,
    pub external: BTreeMap<String, ExternalListener>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListenerTls {
    /// Falls back to the global `tls.enabled`
    pub enabled: Option<bool>,
    pub cert: String,
    pub trust_store: Option<TrustStore>,
}

impl ListenerTls {
    pub fn is_enabled(&self, tls: &TlsSettings) -> bool {
        self.enabled.unwrap_or(tls.enabled) && !self.cert.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalListener {
    pub enabled: Option<bool>,
    pub tls: Option<ExternalListenerTls>,
}

impl ExternalListener {
    /// The trust store this external listener contributes, if any
    fn trust_store<'a>(&'a self, internal: &ListenerTls, tls: &TlsSettings) -> Option<&'a TrustStore> {
        if !self.enabled.unwrap_or(true) {
            return None;
        }
        let external_tls = self.tls.as_ref()?;
        let cert = external_tls.cert.as_deref().unwrap_or(&internal.cert);
        let enabled = external_tls
            .enabled
            .unwrap_or_else(|| internal.is_enabled(tls));

        if enabled && !cert.is_empty() {
            external_tls.trust_store.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalListenerTls {
    pub enabled: Option<bool>,
    /// Falls back to the internal listener's cert
    pub cert: Option<String>,
    pub trust_store: Option<TrustStore>,
}

/// A CA bundle referenced by key from a ConfigMap or a Secret
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustStore {
    pub config_map_key_ref: Option<KeyRef>,
    pub secret_key_ref: Option<KeyRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRef {
    pub name: String,
    pub key: String,
}

impl TrustStore {
    /// Path of this trust store relative to the trust store mount
    pub fn relative_path(&self) -> String {
        match (&self.config_map_key_ref, &self.secret_key_ref) {
            (Some(cm), _) => format!("configmaps/{}-{}", cm.name, cm.key),
            (None, Some(secret)) => format!("secrets/{}-{}", secret.name, secret.key),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub host_path: String,
    pub persistent_volume: PersistentVolumeSettings,
    pub tiered: TieredSettings,
    /// Legacy location of the tiered storage config
    pub tiered_config: Map<String, JsonValue>,
    /// Legacy tiered host path; any non-empty value selects `hostPath`
    pub tiered_storage_host_path: String,
    /// Legacy tiered persistent volume
    pub tiered_storage_persistent_volume: Option<PersistentVolumeSettings>,
}

/// How the tiered storage cache directory is backed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieredMountType {
    None,
    HostPath,
    EmptyDir,
    PersistentVolume,
}

impl TieredMountType {
    fn parse(raw: &str) -> Self {
        match raw {
            "hostPath" => Self::HostPath,
            "emptyDir" => Self::EmptyDir,
            "persistentVolume" => Self::PersistentVolume,
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for TieredMountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::HostPath => "hostPath",
            Self::EmptyDir => "emptyDir",
            Self::PersistentVolume => "persistentVolume",
        };
        write!(f, "{}", s)
    }
}

impl StorageSettings {
    /// The tiered storage config, preferring the legacy `tieredConfig` when set
    pub fn tiered_config(&self) -> &Map<String, JsonValue> {
        if self.tiered_config.is_empty() {
            &self.tiered.config
        } else {
            &self.tiered_config
        }
    }

    pub fn is_tiered_storage_enabled(&self) -> bool {
        self.tiered_config()
            .get("cloud_storage_enabled")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Cache directory from `cloud_storage_cache_directory`, or the default
    pub fn tiered_cache_directory(&self) -> &str {
        match self
            .tiered_config()
            .get("cloud_storage_cache_directory")
            .and_then(JsonValue::as_str)
        {
            Some(dir) if !dir.is_empty() => dir,
            _ => DEFAULT_TIERED_CACHE_DIRECTORY,
        }
    }

    /// Effective mount type of the tiered storage directory.
    ///
    /// The legacy host path is a string but acts as a flag: any non-empty
    /// value selects `hostPath`, whatever it contains.
    pub fn tiered_mount_type(&self) -> TieredMountType {
        if self
            .tiered_storage_persistent_volume
            .as_ref()
            .is_some_and(|pv| pv.enabled)
        {
            return TieredMountType::PersistentVolume;
        }
        if !self.tiered_storage_host_path.is_empty() {
            return TieredMountType::HostPath;
        }
        TieredMountType::parse(&self.tiered.mount_type)
    }

    /// Host path backing the tiered directory, legacy field first
    pub fn tiered_host_path(&self) -> &str {
        if self.tiered_storage_host_path.is_empty() {
            &self.tiered.host_path
        } else {
            &self.tiered_storage_host_path
        }
    }

    /// Persistent volume settings backing the tiered directory, legacy first
    pub fn tiered_persistent_volume(&self) -> Option<&PersistentVolumeSettings> {
        self.tiered_storage_persistent_volume
            .as_ref()
            .or(self.tiered.persistent_volume.as_ref())
    }

    /// Volume name of the tiered storage directory
    pub fn tiered_volume_name(&self) -> &str {
        if self.persistent_volume.name_overwrite.is_empty() {
            "tiered-storage-dir"
        } else {
            &self.persistent_volume.name_overwrite
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistentVolumeSettings {
    pub enabled: bool,
    pub size: String,
    pub storage_class: String,
    pub name_overwrite: String,
    pub labels: LabelMap,
    pub annotations: LabelMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TieredSettings {
    pub mount_type: String,
    pub host_path: String,
    pub persistent_volume: Option<PersistentVolumeSettings>,
    pub config: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatefulSetSettings {
    pub replicas: i32,
    pub annotations: LabelMap,
    pub additional_selector_labels: Option<LabelMap>,
    pub pod_template: PodTemplateSettings,
    /// Top-level defaults for uid/gid and container hardening
    pub security_context: SecurityContextSettings,
    /// Pod-level overrides, consulted before `security_context`
    pub pod_security_context: Option<PodSecurityContext>,
    pub init_container_image: ImageRef,
    pub init_containers: InitContainersSettings,
    pub extra_volumes: Vec<Volume>,
    pub extra_volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PodTemplateSettings {
    pub labels: Option<LabelMap>,
    pub annotations: Option<LabelMap>,
    pub spec: PodSpecOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PodSpecOverrides {
    /// Partial containers, matched to managed containers by name
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityContextSettings {
    pub run_as_user: Option<i64>,
    pub fs_group: Option<i64>,
    pub fs_group_change_policy: Option<String>,
    pub allow_privilege_escalation: Option<bool>,
    pub run_as_non_root: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitContainersSettings {
    pub tuning: InitContainerSettings,
    pub set_data_dir_ownership: InitContainerSettings,
    pub fs_validator: FsValidatorSettings,
    pub set_tiered_storage_cache_dir_ownership: InitContainerSettings,
    pub configurator: InitContainerSettings,
    pub extra_init_containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitContainerSettings {
    /// Only consulted by containers that are opt-in
    pub enabled: bool,
    pub resources: Option<ResourceRequirements>,
    pub extra_volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FsValidatorSettings {
    pub enabled: bool,
    #[serde(rename = "expectedFS")]
    pub expected_fs: String,
    pub resources: Option<ResourceRequirements>,
    pub extra_volume_mounts: Vec<VolumeMount>,
}
