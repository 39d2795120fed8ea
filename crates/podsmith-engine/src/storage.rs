//! Data directory and tiered storage backing
//!
//! The data directory is a claim template when persistence is enabled and a
//! pod volume otherwise. The tiered storage cache directory only gets its own
//! backing when tiered storage is on and its mount type is not `none`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    EmptyDirVolumeSource, HostPathVolumeSource, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use podsmith_core::{LabelMap, RenderContext, TieredMountType};
use podsmith_core::config::PersistentVolumeSettings;

use crate::error::{EngineError, Result};
use crate::merge::{labels, merge};
use crate::naming;
use crate::volumes::{DATADIR, mount};

/// Mount type of the tiered cache directory, `None` unless tiered storage is on
pub fn tiered_mount_type(ctx: &RenderContext) -> TieredMountType {
    let storage = &ctx.values.storage;
    if storage.is_tiered_storage_enabled() {
        storage.tiered_mount_type()
    } else {
        TieredMountType::None
    }
}

/// Mount of the tiered cache directory, if it has a dedicated volume
pub fn tiered_mount(ctx: &RenderContext) -> Option<VolumeMount> {
    match tiered_mount_type(ctx) {
        TieredMountType::None => None,
        _ => {
            let storage = &ctx.values.storage;
            Some(mount(
                storage.tiered_volume_name(),
                storage.tiered_cache_directory(),
            ))
        }
    }
}

fn host_path_volume(name: &str, path: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: None,
        }),
        ..Default::default()
    }
}

fn empty_dir_volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

/// Pod volumes backing storage that is not claimed through a template
pub fn data_volumes(ctx: &RenderContext) -> Result<Vec<Volume>> {
    let storage = &ctx.values.storage;
    let mut volumes = Vec::new();

    if !storage.persistent_volume.enabled {
        if storage.host_path.is_empty() {
            volumes.push(empty_dir_volume(DATADIR));
        } else {
            volumes.push(host_path_volume(DATADIR, &storage.host_path));
        }
    }

    let tiered_name = storage.tiered_volume_name();
    match tiered_mount_type(ctx) {
        TieredMountType::HostPath => {
            let path = storage.tiered_host_path();
            if path.is_empty() {
                return Err(EngineError::MissingHostPath {
                    volume: tiered_name.to_string(),
                });
            }
            volumes.push(host_path_volume(tiered_name, path))
        }
        TieredMountType::EmptyDir => volumes.push(empty_dir_volume(tiered_name)),
        TieredMountType::None | TieredMountType::PersistentVolume => {}
    }

    Ok(volumes)
}

fn claim_template(
    ctx: &RenderContext,
    name: &str,
    settings: &PersistentVolumeSettings,
) -> PersistentVolumeClaim {
    let defaults = labels([
        ("app.kubernetes.io/name", naming::name(ctx)),
        ("app.kubernetes.io/instance", ctx.release.name.clone()),
        ("app.kubernetes.io/component", naming::name(ctx)),
    ]);
    let claim_labels = merge([
        Some(&defaults),
        Some(&settings.labels),
        Some(&ctx.values.common_labels),
    ]);

    // "-" disables dynamic provisioning
    let storage_class_name = match settings.storage_class.as_str() {
        "" => None,
        "-" => Some(String::new()),
        class => Some(class.to_string()),
    };

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(claim_labels),
            annotations: non_empty(&settings.annotations),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name,
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(settings.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn non_empty(map: &LabelMap) -> Option<LabelMap> {
    (!map.is_empty()).then(|| map.clone())
}

/// Volume claim templates of the StatefulSet
pub fn claim_templates(ctx: &RenderContext) -> Vec<PersistentVolumeClaim> {
    let storage = &ctx.values.storage;
    let mut claims = Vec::new();

    if storage.persistent_volume.enabled {
        claims.push(claim_template(ctx, DATADIR, &storage.persistent_volume));
    }

    if tiered_mount_type(ctx) == TieredMountType::PersistentVolume {
        match storage.tiered_persistent_volume() {
            Some(settings) => {
                claims.push(claim_template(ctx, storage.tiered_volume_name(), settings))
            }
            None => tracing::warn!(
                "tiered storage mount type is persistentVolume but no persistent volume is configured"
            ),
        }
    }

    claims
}
