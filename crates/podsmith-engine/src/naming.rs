//! Resource naming helpers
//!
//! Kubernetes names are bounded, so derived names are truncated to a fixed
//! prefix length and never end in a separator.

use podsmith_core::RenderContext;

/// Longest name Kubernetes accepts for most objects
const MAX_NAME_LENGTH: usize = 63;

/// Truncate to at most `length` characters
pub fn trunc(value: &str, length: usize) -> String {
    value.chars().take(length).collect()
}

/// Truncate to 63 characters and strip trailing separators
pub fn clean_for_k8s(value: &str) -> String {
    trunc(value, MAX_NAME_LENGTH)
        .trim_end_matches('-')
        .to_string()
}

/// Instance name: `nameOverride` or the chart name
pub fn name(ctx: &RenderContext) -> String {
    if ctx.values.name_override.is_empty() {
        clean_for_k8s(&ctx.chart.name)
    } else {
        clean_for_k8s(&ctx.values.name_override)
    }
}

/// Full name: `fullnameOverride` or the release name
pub fn fullname(ctx: &RenderContext) -> String {
    if ctx.values.fullname_override.is_empty() {
        clean_for_k8s(&ctx.release.name)
    } else {
        clean_for_k8s(&ctx.values.fullname_override)
    }
}

/// Image tag: `image.tag` or the chart's app version
pub fn tag(ctx: &RenderContext) -> String {
    if ctx.values.image.tag.is_empty() {
        ctx.chart.app_version.clone()
    } else {
        ctx.values.image.tag.clone()
    }
}

/// Primary workload image reference
pub fn image(ctx: &RenderContext) -> String {
    format!("{}:{}", ctx.values.image.repository, tag(ctx))
}

/// Selector component label: `<name:.51>-statefulset`
pub fn statefulset_component(ctx: &RenderContext) -> String {
    format!("{}-statefulset", trunc(&name(ctx), 51).trim_end_matches('-'))
}

pub fn lifecycle_secret(ctx: &RenderContext) -> String {
    format!("{}-sts-lifecycle", trunc(&fullname(ctx), 50))
}

pub fn configurator_secret(ctx: &RenderContext) -> String {
    format!("{}-configurator", trunc(&fullname(ctx), 51))
}

pub fn config_watcher_secret(ctx: &RenderContext) -> String {
    format!("{}-config-watcher", fullname(ctx))
}

pub fn fs_validator_secret(ctx: &RenderContext) -> String {
    format!("{}-fs-validator", trunc(&fullname(ctx), 49))
}

/// Name of the configurator init container: `<name:.51>-configurator`
pub fn configurator_container(ctx: &RenderContext) -> String {
    format!("{}-configurator", trunc(&name(ctx), 51))
}
