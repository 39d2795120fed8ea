//! Layered values tree with deep merge support
//!
//! A render sees exactly one configuration snapshot. It is built by stacking
//! layers on top of each other, lowest priority first:
//!
//! 1. the embedded `values.yaml` ([`DEFAULT_VALUES`](crate::DEFAULT_VALUES))
//! 2. every `-f/--values` file, in the order given
//! 3. `--set key=value` overrides
//!
//! Layers are merged with [`Values::merge`] and the result is decoded once
//! into the typed snapshot with [`Values::decode`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Untyped values tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from a YAML string
    ///
    /// An empty document yields empty values rather than `null`.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        match value {
            JsonValue::Null => Ok(Self::new()),
            other => Ok(Self(other)),
        }
    }

    /// Deep merge another layer on top of this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (containers, volumes and mounts are
    ///   never concatenated across layers)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Merge layers in order, the last one has the highest priority
    pub fn merge_all(layers: Vec<Values>) -> Self {
        let mut result = Values::new();
        for layer in layers {
            result.merge(&layer);
        }
        result
    }

    /// Set a value by dotted path (e.g., "statefulset.replicas")
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::ValuesMerge {
                message: format!("Invalid values path: '{}'", path),
            });
        }
        set_nested(&mut self.0, &parts, value);
        Ok(())
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }


    /// Decode the merged tree into a typed snapshot
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}

fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        if remaining.is_empty() {
            map.insert((*key).to_string(), new_value);
        } else {
            let entry = map
                .entry((*key).to_string())
                .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
            set_nested(entry, remaining, new_value);
        }
    }
}

fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

/// Parse --set arguments (key=value format)
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;

        values.set(key, parse_scalar(val))?;
    }

    Ok(values)
}

/// Interpret a `--set` right-hand side the way YAML would
fn parse_scalar(val: &str) -> JsonValue {
    match val {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        "null" => JsonValue::Null,
        _ => {
            if let Ok(num) = val.parse::<i64>() {
                JsonValue::Number(num.into())
            } else if let Some(num) = val
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
            {
                JsonValue::Number(num)
            } else if val.starts_with('[') || val.starts_with('{') {
                serde_json::from_str(val).unwrap_or_else(|_| JsonValue::String(val.to_string()))
            } else {
                JsonValue::String(val.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_merge_layers() {
        let mut base = Values::from_yaml(
            r#"
image:
  repository: docker.redpanda.com/redpandadata/redpanda
  tag: v24.1.1
statefulset:
  replicas: 3
  additionalSelectorLabels:
    team: core
"#,
        )
        .unwrap();

        let overlay = Values::from_yaml(
            r#"
image:
  tag: v24.2.0
statefulset:
  additionalSelectorLabels:
    tier: data
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(
            base.get("image.repository").unwrap(),
            "docker.redpanda.com/redpandadata/redpanda"
        );
        assert_eq!(base.get("image.tag").unwrap(), "v24.2.0");
        assert_eq!(base.get("statefulset.replicas").unwrap(), 3);
        assert_eq!(
            base.get("statefulset.additionalSelectorLabels.team").unwrap(),
            "core"
        );
        assert_eq!(
            base.get("statefulset.additionalSelectorLabels.tier").unwrap(),
            "data"
        );
    }

    #[test]
    fn test_arrays_are_replaced_not_appended() {
        let mut base = Values::from_yaml(
            r#"
statefulset:
  extraVolumes:
    - name: a
    - name: b
"#,
        )
        .unwrap();
        let overlay = Values::from_yaml(
            r#"
statefulset:
  extraVolumes:
    - name: c
"#,
        )
        .unwrap();

        base.merge(&overlay);

        let volumes = base.get("statefulset.extraVolumes").unwrap();
        assert_eq!(volumes.as_array().unwrap().len(), 1);
        assert_eq!(volumes[0]["name"], "c");
    }

    #[test]
    fn test_merge_all_last_layer_wins() {
        let layers = vec![
            Values::from_yaml("tuning:\n  tune_aio_events: false").unwrap(),
            Values::from_yaml("tuning:\n  tune_aio_events: true").unwrap(),
        ];

        let merged = Values::merge_all(layers);
        assert_eq!(merged.get("tuning.tune_aio_events").unwrap(), true);
    }

    #[test]
    fn test_set_nested() {
        let mut values = Values::new();
        values
            .set("statefulset.securityContext.runAsUser", JsonValue::from(101))
            .unwrap();

        assert_eq!(
            values.get("statefulset.securityContext.runAsUser").unwrap(),
            101
        );
    }

    #[test]
    fn test_set_rejects_empty_segment() {
        let mut values = Values::new();
        assert!(values.set("statefulset..replicas", JsonValue::from(1)).is_err());
    }

    #[test]
    fn test_parse_set_values() {
        let args = vec![
            "image.tag=v24.2.0".to_string(),
            "statefulset.replicas=5".to_string(),
            "tuning.tune_aio_events=true".to_string(),
            "statefulset.podTemplate.labels={\"team\":\"core\"}".to_string(),
        ];

        let values = parse_set_values(&args).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v24.2.0");
        assert_eq!(values.get("statefulset.replicas").unwrap(), 5);
        assert_eq!(values.get("tuning.tune_aio_events").unwrap(), true);
        assert_eq!(
            values.get("statefulset.podTemplate.labels.team").unwrap(),
            "core"
        );
    }

    #[test]
    fn test_parse_set_values_missing_equals() {
        let err = parse_set_values(&["image.tag".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Expected key=value"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("values.yaml");
        std::fs::write(&path, "statefulset:\n  replicas: 1\n").unwrap();

        let values = Values::from_file(&path).unwrap();
        assert_eq!(values.get("statefulset.replicas").unwrap(), 1);

        assert!(Values::from_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_decode_typed() {
        #[derive(Deserialize)]
        struct Image {
            repository: String,
        }

        let values = Values::from_yaml("repository: busybox").unwrap();
        let image: Image = values.decode().unwrap();
        assert_eq!(image.repository, "busybox");
    }
}
