//! Init containers of the StatefulSet
//!
//! Init containers come from a fixed sequence of generators. Each generator
//! decides on its own whether its container is present; the configurator is
//! always present and user supplied containers always come last. Generators
//! that chown need a resolved uid/gid and abort the render without one.

use k8s_openapi::api::core::v1::{Capabilities, Container, SecurityContext, VolumeMount};
use podsmith_core::RenderContext;

use crate::env::{field_ref, field_ref_versioned, literal};
use crate::error::Result;
use crate::naming;
use crate::security;
use crate::storage;
use crate::volumes::{DATADIR, DATADIR_PATH, common_mounts, mount};

pub const TUNING: &str = "tuning";
pub const SET_DATADIR_OWNERSHIP: &str = "set-datadir-ownership";
pub const FS_VALIDATOR: &str = "fs-validator";
pub const SET_TIERED_STORAGE_CACHE_DIR_OWNERSHIP: &str = "set-tiered-storage-cache-dir-ownership";

const CONFIGURATOR_SCRIPT: &str = "/etc/secrets/configurator/scripts/configurator.sh";

/// A conditional init container generator
type Generator = fn(&RenderContext) -> Result<Option<Container>>;

/// Optional generators, in the order their containers run
const GENERATORS: [(&str, Generator); 4] = [
    (TUNING, tuning),
    (SET_DATADIR_OWNERSHIP, set_datadir_ownership),
    (FS_VALIDATOR, fs_validator),
    (SET_TIERED_STORAGE_CACHE_DIR_OWNERSHIP, set_tiered_storage_cache_dir_ownership),
];

/// All init containers, in execution order
pub fn init_containers(ctx: &RenderContext) -> Result<Vec<Container>> {
    let mut containers = Vec::new();

    for (name, generate) in GENERATORS {
        match generate(ctx)? {
            Some(container) => {
                tracing::debug!(container = name, "init container enabled");
                containers.push(container);
            }
            None => tracing::debug!(container = name, "init container disabled"),
        }
    }

    containers.push(configurator(ctx));

    let extra = &ctx.values.statefulset.init_containers.extra_init_containers;
    if !extra.is_empty() {
        tracing::debug!(count = extra.len(), "appending extra init containers");
    }
    containers.extend(extra.iter().cloned());

    Ok(containers)
}

fn shell(interpreter: &str, script: String) -> Option<Vec<String>> {
    Some(vec![interpreter.to_string(), "-c".to_string(), script])
}

/// Common mounts, then the container's extra mounts, then its own
fn mounts_with(
    ctx: &RenderContext,
    extra: &[VolumeMount],
    own: impl IntoIterator<Item = VolumeMount>,
) -> Option<Vec<VolumeMount>> {
    let mut mounts = common_mounts(&ctx.values);
    mounts.extend(extra.iter().cloned());
    mounts.extend(own);
    Some(mounts)
}

fn init_image(ctx: &RenderContext) -> String {
    ctx.values.statefulset.init_container_image.to_string()
}

fn tuning(ctx: &RenderContext) -> Result<Option<Container>> {
    if !ctx.values.tuning.tune_aio_events {
        return Ok(None);
    }
    let settings = &ctx.values.statefulset.init_containers.tuning;

    Ok(Some(Container {
        name: TUNING.to_string(),
        image: Some(naming::image(ctx)),
        command: shell("/bin/bash", "rpk redpanda tune all".to_string()),
        security_context: Some(SecurityContext {
            capabilities: Some(Capabilities {
                add: Some(vec!["SYS_RESOURCE".to_string()]),
                drop: None,
            }),
            privileged: Some(true),
            run_as_user: Some(0),
            run_as_group: Some(0),
            ..Default::default()
        }),
        volume_mounts: mounts_with(
            ctx,
            &settings.extra_volume_mounts,
            [mount(&naming::fullname(ctx), "/etc/redpanda")],
        ),
        resources: settings.resources.clone(),
        ..Default::default()
    }))
}

fn set_datadir_ownership(ctx: &RenderContext) -> Result<Option<Container>> {
    let settings = &ctx.values.statefulset.init_containers.set_data_dir_ownership;
    if !settings.enabled {
        return Ok(None);
    }

    let owner = security::resolve(SET_DATADIR_OWNERSHIP, &ctx.values)?;

    Ok(Some(Container {
        name: SET_DATADIR_OWNERSHIP.to_string(),
        image: Some(init_image(ctx)),
        command: shell(
            "/bin/sh",
            format!("chown {}:{} -R {}", owner.uid, owner.gid, DATADIR_PATH),
        ),
        volume_mounts: mounts_with(
            ctx,
            &settings.extra_volume_mounts,
            [mount(DATADIR, DATADIR_PATH)],
        ),
        resources: settings.resources.clone(),
        ..Default::default()
    }))
}

fn fs_validator(ctx: &RenderContext) -> Result<Option<Container>> {
    let settings = &ctx.values.statefulset.init_containers.fs_validator;
    if !settings.enabled {
        return Ok(None);
    }

    Ok(Some(Container {
        name: FS_VALIDATOR.to_string(),
        image: Some(naming::image(ctx)),
        command: Some(vec!["/bin/sh".to_string()]),
        args: Some(vec![
            "-c".to_string(),
            format!(
                r#"trap "exit 0" TERM; exec /etc/secrets/fs-validator/scripts/fsValidator.sh {} & wait $!"#,
                settings.expected_fs
            ),
        ]),
        security_context: Some(security::container_security_context(&ctx.values)),
        volume_mounts: mounts_with(
            ctx,
            &settings.extra_volume_mounts,
            [
                mount(
                    &naming::fs_validator_secret(ctx),
                    "/etc/secrets/fs-validator/scripts/",
                ),
                mount(DATADIR, DATADIR_PATH),
            ],
        ),
        resources: settings.resources.clone(),
        ..Default::default()
    }))
}

fn set_tiered_storage_cache_dir_ownership(ctx: &RenderContext) -> Result<Option<Container>> {
    let storage_settings = &ctx.values.storage;
    if !storage_settings.is_tiered_storage_enabled() {
        return Ok(None);
    }
    let settings = &ctx
        .values
        .statefulset
        .init_containers
        .set_tiered_storage_cache_dir_ownership;

    let owner = security::resolve(SET_TIERED_STORAGE_CACHE_DIR_OWNERSHIP, &ctx.values)?;
    let cache_dir = storage_settings.tiered_cache_directory();

    // the dedicated cache mount goes before the user's extra mounts here
    let mut mounts = common_mounts(&ctx.values);
    mounts.push(mount(DATADIR, DATADIR_PATH));
    mounts.extend(storage::tiered_mount(ctx));
    mounts.extend(settings.extra_volume_mounts.iter().cloned());

    Ok(Some(Container {
        name: SET_TIERED_STORAGE_CACHE_DIR_OWNERSHIP.to_string(),
        image: Some(init_image(ctx)),
        command: shell(
            "/bin/sh",
            format!(
                "mkdir -p {dir}; chown {}:{} -R {dir}",
                owner.uid,
                owner.gid,
                dir = cache_dir
            ),
        ),
        volume_mounts: Some(mounts),
        resources: settings.resources.clone(),
        ..Default::default()
    }))
}

fn configurator(ctx: &RenderContext) -> Container {
    let settings = &ctx.values.statefulset.init_containers.configurator;

    Container {
        name: naming::configurator_container(ctx),
        image: Some(naming::image(ctx)),
        command: shell(
            "/bin/bash",
            r#"trap "exit 0" TERM; exec $CONFIGURATOR_SCRIPT "${SERVICE_NAME}" "${KUBERNETES_NODE_NAME}" & wait $!"#
                .to_string(),
        ),
        env: Some(vec![
            literal("CONFIGURATOR_SCRIPT", CONFIGURATOR_SCRIPT),
            field_ref("SERVICE_NAME", "metadata.name"),
            field_ref("KUBERNETES_NODE_NAME", "spec.nodeName"),
            field_ref_versioned("HOST_IP_ADDRESS", "status.hostIP", Some("v1")),
        ]),
        security_context: Some(security::container_security_context(&ctx.values)),
        volume_mounts: mounts_with(
            ctx,
            &settings.extra_volume_mounts,
            [
                mount("config", "/etc/redpanda"),
                mount(&naming::fullname(ctx), "/tmp/base-config"),
                mount(
                    &naming::configurator_secret(ctx),
                    "/etc/secrets/configurator/scripts/",
                ),
            ],
        ),
        resources: settings.resources.clone(),
        ..Default::default()
    }
}
