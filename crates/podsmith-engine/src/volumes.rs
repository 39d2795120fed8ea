//! Volumes and mounts of the StatefulSet
//!
//! Mounts reference volumes by name. [`validate_mounts`] checks that binding
//! explicitly once the pod is assembled.

use std::collections::BTreeSet;

use k8s_openapi::api::core::v1::{
    ConfigMapProjection, ConfigMapVolumeSource, EmptyDirVolumeSource, KeyToPath,
    ProjectedVolumeSource, SecretProjection, SecretVolumeSource, Volume, VolumeMount,
    VolumeProjection,
};
use podsmith_core::{RenderContext, RenderValues, TrustStore};

use crate::error::{EngineError, Result};
use crate::naming;

pub const DATADIR: &str = "datadir";
pub const DATADIR_PATH: &str = "/var/lib/redpanda/data";
pub const TRUSTSTORES: &str = "truststores";
pub const TRUSTSTORE_MOUNT_PATH: &str = "/etc/truststores";
pub const CERT_MOUNT_ROOT: &str = "/etc/tls/certs";

/// Mode for script bundles: owner and group may execute
const SCRIPT_MODE: i32 = 0o775;
const CERT_MODE: i32 = 0o440;
const TRUSTSTORE_MODE: i32 = 0o444;

pub fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

pub fn read_only_mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        read_only: Some(true),
        ..mount(name, path)
    }
}

fn secret_volume(name: &str, secret: &str, mode: i32) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            default_mode: Some(mode),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn cert_volume_name(cert: &str) -> String {
    format!("redpanda-{}-cert", cert)
}

/// Volumes shared by every container of the pod: TLS certificates and SASL users
pub fn common_volumes(ctx: &RenderContext) -> Vec<Volume> {
    let values = &ctx.values;
    let mut volumes = Vec::new();

    if values.tls.enabled {
        let fullname = naming::fullname(ctx);
        for (name, cert) in &values.tls.certs {
            let secret = match &cert.secret_ref {
                Some(secret_ref) => secret_ref.name.clone(),
                None => format!("{}-{}-cert", fullname, name),
            };
            volumes.push(secret_volume(&cert_volume_name(name), &secret, CERT_MODE));
        }
    }

    let sasl = &values.auth.sasl;
    if sasl.enabled && !sasl.secret_ref.is_empty() {
        volumes.push(secret_volume("users", &sasl.secret_ref, SCRIPT_MODE));
    }

    volumes
}

/// Mounts matching [`common_volumes`]
pub fn common_mounts(values: &RenderValues) -> Vec<VolumeMount> {
    let mut mounts = Vec::new();

    if values.tls.enabled {
        for name in values.tls.certs.keys() {
            mounts.push(read_only_mount(
                &cert_volume_name(name),
                &format!("{}/{}", CERT_MOUNT_ROOT, name),
            ));
        }
    }

    let sasl = &values.auth.sasl;
    if sasl.enabled && !sasl.secret_ref.is_empty() {
        mounts.push(read_only_mount("users", "/etc/secrets/users"));
    }

    mounts
}

fn projection(store: &TrustStore) -> Option<VolumeProjection> {
    let item = |key: &str| {
        Some(vec![KeyToPath {
            key: key.to_string(),
            path: store.relative_path(),
            mode: None,
        }])
    };

    if let Some(cm) = &store.config_map_key_ref {
        return Some(VolumeProjection {
            config_map: Some(ConfigMapProjection {
                name: cm.name.clone(),
                items: item(&cm.key),
                optional: None,
            }),
            ..Default::default()
        });
    }

    store.secret_key_ref.as_ref().map(|secret| VolumeProjection {
        secret: Some(SecretProjection {
            name: secret.name.clone(),
            items: item(&secret.key),
            optional: None,
        }),
        ..Default::default()
    })
}

/// Projected volume collecting every listener trust store, if any is declared
pub fn trust_store_volume(values: &RenderValues) -> Option<Volume> {
    let sources: Vec<_> = values
        .listeners
        .trust_stores(&values.tls)
        .into_iter()
        .filter_map(projection)
        .collect();

    if sources.is_empty() {
        return None;
    }

    Some(Volume {
        name: TRUSTSTORES.to_string(),
        projected: Some(ProjectedVolumeSource {
            default_mode: Some(TRUSTSTORE_MODE),
            sources: Some(sources),
        }),
        ..Default::default()
    })
}

/// Pod volumes, apart from data directories and user extras
pub fn statefulset_volumes(ctx: &RenderContext) -> Vec<Volume> {
    let fullname = naming::fullname(ctx);
    let configurator = naming::configurator_secret(ctx);
    let config_watcher = naming::config_watcher_secret(ctx);
    let fs_validator = naming::fs_validator_secret(ctx);

    let mut volumes = common_volumes(ctx);
    volumes.extend([
        secret_volume("lifecycle-scripts", &naming::lifecycle_secret(ctx), SCRIPT_MODE),
        Volume {
            name: fullname.clone(),
            config_map: Some(ConfigMapVolumeSource {
                name: fullname,
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: "config".to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        },
        secret_volume(&configurator, &configurator, SCRIPT_MODE),
        secret_volume(&config_watcher, &config_watcher, SCRIPT_MODE),
        secret_volume(&fs_validator, &fs_validator, SCRIPT_MODE),
    ]);

    if let Some(trust_stores) = trust_store_volume(&ctx.values) {
        volumes.push(trust_stores);
    }

    volumes
}

/// Mounts of the primary container, apart from tiered storage and user extras
pub fn statefulset_mounts(ctx: &RenderContext) -> Vec<VolumeMount> {
    let values = &ctx.values;

    let mut mounts = common_mounts(values);
    mounts.extend([
        mount("config", "/etc/redpanda"),
        mount(&naming::fullname(ctx), "/tmp/base-config"),
        mount("lifecycle-scripts", "/var/lifecycle"),
        mount(DATADIR, DATADIR_PATH),
    ]);

    if trust_store_volume(values).is_some() {
        mounts.push(read_only_mount(TRUSTSTORES, TRUSTSTORE_MOUNT_PATH));
    }

    mounts
}

/// Check that every mount of `container` names a declared volume
pub fn validate_mounts(
    container: &str,
    mounts: &[VolumeMount],
    declared: &BTreeSet<&str>,
) -> Result<()> {
    match mounts.iter().find(|m| !declared.contains(m.name.as_str())) {
        Some(missing) => Err(EngineError::UnknownVolumeMount {
            container: container.to_string(),
            mount: missing.name.clone(),
        }),
        None => Ok(()),
    }
}
