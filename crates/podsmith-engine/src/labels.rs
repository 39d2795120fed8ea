//! Labels, selectors and pod annotations
//!
//! A StatefulSet selector is immutable once created. On upgrade the selector
//! and pod template labels of the live object are reused verbatim when they
//! exist; only fresh installs (or upgrades where nothing is deployed yet) get
//! freshly computed labels.

use podsmith_core::{LabelMap, RenderContext};

use crate::lookup::{ExistingWorkload, ResourceLookup, STATEFULSET_KIND};
use crate::merge::{labels, merge};
use crate::naming;

/// Annotation that rolls the pods whenever the cluster config changes
pub const CONFIG_CHECKSUM_ANNOTATION: &str = "config.redpanda.com/checksum";

/// Label pointing the pod disruption budget at the pods of this instance
pub const PDB_LABEL: &str = "redpanda.com/poddisruptionbudget";

/// Read the deployed StatefulSet for this instance.
///
/// Only upgrades consult `lookup`. A failed lookup is treated like a miss so
/// the render degrades to fresh-install labels instead of aborting.
pub fn existing_workload(
    ctx: &RenderContext,
    lookup: &dyn ResourceLookup,
) -> Option<ExistingWorkload> {
    if !ctx.release.is_upgrade() {
        return None;
    }

    let name = naming::fullname(ctx);
    match lookup.lookup(STATEFULSET_KIND, &ctx.release.namespace, &name) {
        Ok(Some(existing)) => {
            tracing::debug!(namespace = %ctx.release.namespace, %name, "found deployed statefulset");
            Some(existing)
        }
        Ok(None) => {
            tracing::debug!(
                namespace = %ctx.release.namespace,
                %name,
                "no deployed statefulset, computing labels as for a fresh install"
            );
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "lookup failed, computing labels as for a fresh install");
            None
        }
    }
}

/// Standard labels carried by every object of the instance
pub fn full_labels(ctx: &RenderContext) -> LabelMap {
    let defaults = labels([
        ("helm.sh/chart", ctx.chart.label()),
        ("app.kubernetes.io/name", naming::name(ctx)),
        ("app.kubernetes.io/instance", ctx.release.name.clone()),
        ("app.kubernetes.io/managed-by", ctx.release.service.clone()),
    ]);

    merge([Some(&ctx.values.common_labels), Some(&defaults)])
}

/// Selector labels of the StatefulSet
pub fn selector(ctx: &RenderContext, existing: Option<&ExistingWorkload>) -> LabelMap {
    if let Some(existing) = existing.filter(|e| !e.selector_labels.is_empty()) {
        tracing::info!("reusing selector of the deployed statefulset");
        return existing.selector_labels.clone();
    }

    let defaults = labels([
        ("app.kubernetes.io/component", naming::statefulset_component(ctx)),
        ("app.kubernetes.io/instance", ctx.release.name.clone()),
        ("app.kubernetes.io/name", naming::name(ctx)),
    ]);

    merge([
        ctx.values.statefulset.additional_selector_labels.as_ref(),
        Some(&defaults),
    ])
}

/// Labels of the pod template
pub fn pod_labels(ctx: &RenderContext, existing: Option<&ExistingWorkload>) -> LabelMap {
    if let Some(existing) = existing.filter(|e| !e.template_labels.is_empty()) {
        tracing::info!("reusing pod template labels of the deployed statefulset");
        return existing.template_labels.clone();
    }

    let pdb = labels([(PDB_LABEL, naming::fullname(ctx))]);

    merge([
        ctx.values.statefulset.pod_template.labels.as_ref(),
        Some(&selector(ctx, existing)),
        Some(&pdb),
        Some(&full_labels(ctx)),
    ])
}

/// Annotations of the pod template
pub fn pod_annotations(ctx: &RenderContext) -> LabelMap {
    let statefulset = &ctx.values.statefulset;
    let base = statefulset
        .pod_template
        .annotations
        .as_ref()
        .unwrap_or(&statefulset.annotations);
    let checksum = labels([(CONFIG_CHECKSUM_ANNOTATION, ctx.config_checksum.clone())]);

    merge([Some(base), Some(&checksum)])
}
