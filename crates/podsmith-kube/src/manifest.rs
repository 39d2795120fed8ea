//! Offline lookup from a manifest on disk
//!
//! Lets an upgrade be rendered against a StatefulSet exported with
//! `kubectl get sts -o yaml` without cluster access.

use std::path::Path;

use k8s_openapi::api::apps::v1::StatefulSet;
use podsmith_engine::StaticLookup;
use serde::Deserialize;

use crate::error::{KubeError, Result};

/// Parse every StatefulSet in a (possibly multi-document) YAML string
pub fn parse_statefulsets(content: &str) -> Result<Vec<StatefulSet>> {
    let mut found = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        let is_statefulset = value
            .get("kind")
            .and_then(serde_yaml::Value::as_str)
            .is_some_and(|kind| kind == "StatefulSet");
        if is_statefulset {
            found.push(serde_yaml::from_value(value)?);
        }
    }

    Ok(found)
}

/// Load the StatefulSets of a manifest file
pub fn load_statefulsets(path: &Path) -> Result<Vec<StatefulSet>> {
    let content = std::fs::read_to_string(path)?;
    let found = parse_statefulsets(&content)?;
    if found.is_empty() {
        return Err(KubeError::NoStatefulSet {
            path: path.display().to_string(),
        });
    }
    Ok(found)
}

/// Lookup serving the StatefulSets of a manifest file.
///
/// Objects without a namespace are registered under `default_namespace`.
pub fn lookup_from_manifest(path: &Path, default_namespace: &str) -> Result<StaticLookup> {
    let lookup = load_statefulsets(path)?
        .iter()
        .fold(StaticLookup::new(), |lookup, sts| {
            lookup.with_statefulset(sts, default_namespace)
        });
    tracing::debug!(path = %path.display(), "loaded deployed state from manifest");
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podsmith_engine::{ResourceLookup, STATEFULSET_KIND};

    const MANIFEST: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: redpanda
---
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: redpanda
spec:
  serviceName: redpanda
  selector:
    matchLabels:
      app.kubernetes.io/name: redpanda
  template:
    metadata:
      labels:
        app.kubernetes.io/name: redpanda
    spec:
      containers: []
"#;

    #[test]
    fn test_parse_skips_other_kinds() {
        let found = parse_statefulsets(MANIFEST).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.name.as_deref(), Some("redpanda"));
    }

    #[test]
    fn test_lookup_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sts.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let lookup = lookup_from_manifest(&path, "data").unwrap();
        let existing = lookup
            .lookup(STATEFULSET_KIND, "data", "redpanda")
            .unwrap()
            .unwrap();
        assert_eq!(existing.selector_labels["app.kubernetes.io/name"], "redpanda");
    }

    #[test]
    fn test_manifest_without_statefulset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.yaml");
        std::fs::write(&path, "apiVersion: v1\nkind: Service\nmetadata:\n  name: x\n").unwrap();

        let err = lookup_from_manifest(&path, "data").unwrap_err();
        assert!(matches!(err, KubeError::NoStatefulSet { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = parse_statefulsets("kind: StatefulSet\nspec: [").unwrap_err();
        assert!(matches!(err, KubeError::InvalidManifest(_)));
    }
}
