//! Read access to previously deployed state
//!
//! Upgrades must reuse the selector of the live StatefulSet because
//! Kubernetes refuses to change it. The engine only ever reads through the
//! [`ResourceLookup`] seam; where the data comes from (the cluster, a
//! manifest on disk, a test fixture) is up to the implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use k8s_openapi::api::apps::v1::StatefulSet;
use podsmith_core::LabelMap;
use thiserror::Error;

/// Kind name used for StatefulSet lookups
pub const STATEFULSET_KIND: &str = "StatefulSet";

/// The immutable parts of a live workload that a render may need to preserve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingWorkload {
    /// `spec.selector.matchLabels`
    pub selector_labels: LabelMap,
    /// `spec.template.metadata.labels`
    pub template_labels: LabelMap,
}

impl ExistingWorkload {
    pub fn from_statefulset(sts: &StatefulSet) -> Self {
        let spec = sts.spec.as_ref();
        let selector_labels = spec
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default();
        let template_labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();

        Self {
            selector_labels,
            template_labels,
        }
    }
}

/// A lookup that could not be answered
#[derive(Debug, Clone, Error)]
#[error("lookup of {kind} {namespace}/{name} failed: {message}")]
pub struct LookupError {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub message: String,
}

/// Read-only, idempotent access to deployed resources
pub trait ResourceLookup: Send + Sync {
    /// Fetch a resource; `Ok(None)` means it does not exist
    fn lookup(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ExistingWorkload>, LookupError>;
}

/// Lookup that never finds anything, as in offline template mode
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl ResourceLookup for NoLookup {
    fn lookup(
        &self,
        _kind: &str,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<ExistingWorkload>, LookupError> {
        Ok(None)
    }
}

type LookupKey = (String, String, String);

/// In-memory lookup backed by a fixed set of resources
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    resources: Arc<RwLock<HashMap<LookupKey, ExistingWorkload>>>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// A lookup whose every call fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Register a resource
    pub fn with_resource(
        self,
        kind: &str,
        namespace: &str,
        name: &str,
        workload: ExistingWorkload,
    ) -> Self {
        if let Ok(mut resources) = self.resources.write() {
            resources.insert(
                (kind.to_string(), namespace.to_string(), name.to_string()),
                workload,
            );
        }
        self
    }

    /// Register a StatefulSet under its own namespace and name
    pub fn with_statefulset(self, sts: &StatefulSet, default_namespace: &str) -> Self {
        let namespace = sts
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.to_string());
        let name = sts.metadata.name.clone().unwrap_or_default();
        self.with_resource(
            STATEFULSET_KIND,
            &namespace,
            &name,
            ExistingWorkload::from_statefulset(sts),
        )
    }

    /// Number of lookups served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResourceLookup for StaticLookup {
    fn lookup(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ExistingWorkload>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(LookupError {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: message.clone(),
            });
        }

        let resources = self.resources.read().map_err(|e| LookupError {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: e.to_string(),
        })?;

        Ok(resources
            .get(&(kind.to_string(), namespace.to_string(), name.to_string()))
            .cloned())
    }
}
