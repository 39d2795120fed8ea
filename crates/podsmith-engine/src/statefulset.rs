//! StatefulSet assembly
//!
//! Puts the composed fragments together into one `apps/v1` StatefulSet and
//! checks the mount/volume binding of every container podsmith manages.

use std::collections::BTreeSet;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec, StatefulSetUpdateStrategy};
use k8s_openapi::api::core::v1::{
    Container, PodSecurityContext, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use podsmith_core::{RenderContext, RenderValues};

use crate::env::{PRIMARY_CONTAINER, primary_env};
use crate::error::Result;
use crate::init::init_containers;
use crate::labels::{full_labels, pod_annotations, pod_labels, selector};
use crate::lookup::ExistingWorkload;
use crate::naming;
use crate::security;
use crate::storage::{claim_templates, data_volumes, tiered_mount};
use crate::volumes::{statefulset_mounts, statefulset_volumes, validate_mounts};

/// The long running `redpanda` container
pub fn primary_container(ctx: &RenderContext) -> Container {
    let values = &ctx.values;

    let mut mounts = statefulset_mounts(ctx);
    mounts.extend(tiered_mount(ctx));
    mounts.extend(values.statefulset.extra_volume_mounts.iter().cloned());

    let resources = values
        .statefulset
        .pod_template
        .spec
        .containers
        .iter()
        .rev()
        .find(|c| c.name == PRIMARY_CONTAINER)
        .and_then(|c| c.resources.clone());

    Container {
        name: PRIMARY_CONTAINER.to_string(),
        image: Some(naming::image(ctx)),
        env: Some(primary_env(values)),
        security_context: Some(security::container_security_context(values)),
        volume_mounts: Some(mounts),
        resources,
        ..Default::default()
    }
}

/// Pod level security context: the pod override, completed from the defaults
pub fn pod_security_context(values: &RenderValues) -> PodSecurityContext {
    let defaults = &values.statefulset.security_context;
    let mut pod = values
        .statefulset
        .pod_security_context
        .clone()
        .unwrap_or_default();

    pod.run_as_user = pod.run_as_user.or(defaults.run_as_user);
    pod.fs_group = pod.fs_group.or(defaults.fs_group);
    if pod.fs_group_change_policy.is_none() {
        pod.fs_group_change_policy = defaults.fs_group_change_policy.clone();
    }
    pod
}

/// Every volume of the pod, in declaration order
pub fn pod_volumes(ctx: &RenderContext) -> Result<Vec<Volume>> {
    let mut volumes = statefulset_volumes(ctx);
    volumes.extend(data_volumes(ctx)?);
    volumes.extend(ctx.values.statefulset.extra_volumes.iter().cloned());
    Ok(volumes)
}

fn mounts_of(container: &Container) -> &[VolumeMount] {
    container.volume_mounts.as_deref().unwrap_or_default()
}

/// Assemble the StatefulSet; `existing` is the deployed object on upgrade
pub fn render_statefulset(
    ctx: &RenderContext,
    existing: Option<&ExistingWorkload>,
) -> Result<StatefulSet> {
    let fullname = naming::fullname(ctx);
    let values = &ctx.values;

    let init = init_containers(ctx)?;
    let primary = primary_container(ctx);
    let volumes = pod_volumes(ctx)?;
    let claims = claim_templates(ctx);

    Ok(StatefulSet {
        metadata: ObjectMeta {
            name: Some(fullname.clone()),
            namespace: Some(ctx.release.namespace.clone()),
            labels: Some(full_labels(ctx)),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(values.statefulset.replicas),
            service_name: fullname,
            pod_management_policy: Some("Parallel".to_string()),
            update_strategy: Some(StatefulSetUpdateStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: None,
            }),
            selector: LabelSelector {
                match_labels: Some(selector(ctx, existing)),
                match_expressions: None,
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(pod_labels(ctx, existing)),
                    annotations: Some(pod_annotations(ctx)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    init_containers: Some(init),
                    containers: vec![primary],
                    volumes: Some(volumes),
                    security_context: Some(pod_security_context(values)),
                    ..Default::default()
                }),
            },
            volume_claim_templates: (!claims.is_empty()).then_some(claims),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Check that every managed container only mounts declared volumes.
///
/// User supplied extra init containers are passed through untouched and are
/// not checked.
pub fn validate(ctx: &RenderContext, sts: &StatefulSet) -> Result<()> {
    let Some(spec) = sts.spec.as_ref() else {
        return Ok(());
    };
    let Some(pod) = spec.template.spec.as_ref() else {
        return Ok(());
    };

    let mut declared: BTreeSet<&str> = pod
        .volumes
        .iter()
        .flatten()
        .map(|v| v.name.as_str())
        .collect();
    declared.extend(
        spec.volume_claim_templates
            .iter()
            .flatten()
            .filter_map(|c| c.metadata.name.as_deref()),
    );

    let init = pod.init_containers.as_deref().unwrap_or_default();
    let extra = ctx.values.statefulset.init_containers.extra_init_containers.len();
    let managed = &init[..init.len().saturating_sub(extra)];

    for container in managed.iter().chain(&pod.containers) {
        validate_mounts(&container.name, mounts_of(container), &declared)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::testutil::{RELEASE, install};

    fn render(yaml: &str) -> Result<StatefulSet> {
        let ctx = install(yaml);
        let sts = render_statefulset(&ctx, None)?;
        validate(&ctx, &sts)?;
        Ok(sts)
    }

    fn pod(sts: &StatefulSet) -> &PodSpec {
        sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap()
    }

    #[test]
    fn test_default_render() {
        let sts = render("{}").unwrap();
        let spec = sts.spec.as_ref().unwrap();

        assert_eq!(sts.metadata.name.as_deref(), Some(RELEASE));
        assert_eq!(sts.metadata.namespace.as_deref(), Some("data"));
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.service_name, RELEASE);

        let selector = spec.selector.match_labels.as_ref().unwrap();
        let template_labels = spec.template.metadata.as_ref().unwrap().labels.as_ref().unwrap();
        for (key, value) in selector {
            assert_eq!(template_labels.get(key), Some(value));
        }

        let pod = pod(&sts);
        assert_eq!(pod.containers.len(), 1);
        assert_eq!(pod.containers[0].name, "redpanda");
        assert_eq!(
            pod.containers[0].image.as_deref(),
            Some("docker.redpanda.com/redpandadata/redpanda:v24.2.4")
        );
        assert_eq!(pod.init_containers.as_ref().unwrap().len(), 1);

        let security = pod.security_context.as_ref().unwrap();
        assert_eq!(security.fs_group, Some(101));
        assert_eq!(security.fs_group_change_policy.as_deref(), Some("OnRootMismatch"));
    }

    #[test]
    fn test_extra_volumes_and_mounts() {
        let sts = render(
            r#"
statefulset:
  extraVolumes:
    - name: scratch
      emptyDir: {}
  extraVolumeMounts:
    - name: scratch
      mountPath: /scratch
"#,
        )
        .unwrap();

        let pod = pod(&sts);
        assert_eq!(pod.volumes.as_ref().unwrap().last().unwrap().name, "scratch");
        let mount = pod.containers[0].volume_mounts.as_ref().unwrap().last().unwrap();
        assert_eq!(mount.mount_path, "/scratch");
    }

    #[test]
    fn test_mount_without_volume_is_rejected() {
        let err = render(
            r#"
statefulset:
  extraVolumeMounts:
    - name: ghost
      mountPath: /ghost
"#,
        )
        .unwrap_err();

        match err {
            EngineError::UnknownVolumeMount { container, mount } => {
                assert_eq!(container, "redpanda");
                assert_eq!(mount, "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_user_init_containers_are_not_validated() {
        let sts = render(
            r#"
statefulset:
  initContainers:
    extraInitContainers:
      - name: mine
        image: alpine
        volumeMounts:
          - name: not-declared
            mountPath: /x
"#,
        )
        .unwrap();

        assert_eq!(pod(&sts).init_containers.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_tiered_host_path_render() {
        let sts = render(
            r#"
storage:
  tiered:
    mountType: hostPath
    hostPath: /mnt/tiered
    config:
      cloud_storage_enabled: true
"#,
        )
        .unwrap();

        let pod = pod(&sts);
        assert!(
            pod.volumes
                .as_ref()
                .unwrap()
                .iter()
                .any(|v| v.name == "tiered-storage-dir" && v.host_path.is_some())
        );
        let init = pod.init_containers.as_ref().unwrap();
        assert_eq!(init[0].name, "set-tiered-storage-cache-dir-ownership");
    }

    #[test]
    fn test_tiered_persistent_volume_without_settings_fails_validation() {
        let err = render(
            r#"
storage:
  tiered:
    mountType: persistentVolume
    config:
      cloud_storage_enabled: true
"#,
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::UnknownVolumeMount { .. }));
    }

    #[test]
    fn test_pod_security_context_override() {
        let ctx = install(
            r#"
statefulset:
  podSecurityContext:
    runAsUser: 1000
"#,
        );

        let pod = pod_security_context(&ctx.values);
        assert_eq!(pod.run_as_user, Some(1000));
        assert_eq!(pod.fs_group, Some(101));
    }

    #[test]
    fn test_primary_resources_from_user_container() {
        let ctx = install(
            r#"
statefulset:
  podTemplate:
    spec:
      containers:
        - name: redpanda
          resources:
            limits:
              memory: 4Gi
"#,
        );

        let container = primary_container(&ctx);
        let limits = container.resources.unwrap().limits.unwrap();
        assert_eq!(limits["memory"].0, "4Gi");
    }
}
