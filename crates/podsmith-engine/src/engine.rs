//! Render engine

use std::sync::Arc;

use k8s_openapi::api::apps::v1::StatefulSet;
use podsmith_core::RenderContext;

use crate::error::Result;
use crate::labels::existing_workload;
use crate::lookup::{NoLookup, ResourceLookup};
use crate::statefulset::{render_statefulset, validate};

/// Result of rendering a workload
#[derive(Debug)]
pub struct RenderResult {
    /// The assembled StatefulSet
    pub statefulset: StatefulSet,

    /// Whether the selector was carried over from the deployed StatefulSet
    pub selector_preserved: bool,
}

/// Engine builder
pub struct EngineBuilder {
    lookup: Arc<dyn ResourceLookup>,
    validate: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            lookup: Arc::new(NoLookup),
            validate: true,
        }
    }

    /// Source of the deployed state consulted on upgrade
    pub fn lookup(mut self, lookup: Arc<dyn ResourceLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Check mount/volume binding before returning (default: on)
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine {
            lookup: self.lookup,
            validate: self.validate,
        }
    }
}

/// The render engine
///
/// Rendering is a pure function of the context and whatever the lookup
/// returns; an engine can be shared between renders.
pub struct Engine {
    lookup: Arc<dyn ResourceLookup>,
    validate: bool,
}

impl Default for Engine {
    fn default() -> Self {
        EngineBuilder::new().build()
    }
}

impl Engine {
    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Render the StatefulSet for `ctx`
    pub fn render(&self, ctx: &RenderContext) -> Result<RenderResult> {
        tracing::debug!(
            release = %ctx.release.name,
            namespace = %ctx.release.namespace,
            mode = %ctx.release.mode,
            "rendering statefulset"
        );

        let existing = existing_workload(ctx, self.lookup.as_ref());
        let selector_preserved = existing
            .as_ref()
            .is_some_and(|e| !e.selector_labels.is_empty());

        let statefulset = render_statefulset(ctx, existing.as_ref())?;
        if self.validate {
            validate(ctx, &statefulset)?;
        }

        Ok(RenderResult {
            statefulset,
            selector_preserved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{ExistingWorkload, STATEFULSET_KIND, StaticLookup};
    use crate::merge::labels;
    use crate::testutil::{NAMESPACE, RELEASE, install, upgrade};

    fn selector_of(result: &RenderResult) -> podsmith_core::LabelMap {
        result
            .statefulset
            .spec
            .as_ref()
            .unwrap()
            .selector
            .match_labels
            .clone()
            .unwrap()
    }

    #[test]
    fn test_render_fresh_install() {
        let engine = Engine::default();
        let result = engine.render(&install("{}")).unwrap();

        assert!(!result.selector_preserved);
        assert_eq!(
            selector_of(&result)["app.kubernetes.io/component"],
            "redpanda-statefulset"
        );
    }

    #[test]
    fn test_render_upgrade_preserves_selector() {
        let lookup = StaticLookup::new().with_resource(
            STATEFULSET_KIND,
            NAMESPACE,
            RELEASE,
            ExistingWorkload {
                selector_labels: labels([("app", "x".to_string())]),
                template_labels: labels([("app", "x".to_string())]),
            },
        );
        let engine = Engine::builder().lookup(Arc::new(lookup.clone())).build();

        let result = engine
            .render(&upgrade(
                "statefulset:\n  additionalSelectorLabels:\n    team: core\n",
            ))
            .unwrap();

        assert!(result.selector_preserved);
        assert_eq!(selector_of(&result), labels([("app", "x".to_string())]));
        // one read per render, shared by selector and pod labels
        assert_eq!(lookup.calls(), 1);
    }

    #[test]
    fn test_render_upgrade_lookup_failure_falls_back() {
        let engine = Engine::builder()
            .lookup(Arc::new(StaticLookup::failing("timeout")))
            .build();

        let result = engine.render(&upgrade("{}")).unwrap();

        assert!(!result.selector_preserved);
        assert_eq!(selector_of(&result)["app.kubernetes.io/instance"], RELEASE);
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let yaml = "statefulset:\n  extraVolumeMounts:\n    - name: ghost\n      mountPath: /ghost\n";

        assert!(Engine::default().render(&install(yaml)).is_err());

        let engine = Engine::builder().validate(false).build();
        assert!(engine.render(&install(yaml)).is_ok());
    }
}
