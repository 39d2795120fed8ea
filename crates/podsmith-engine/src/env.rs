//! Environment of the primary container

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};
use podsmith_core::RenderValues;

/// Name of the primary container, also the key for user overrides
pub const PRIMARY_CONTAINER: &str = "redpanda";

/// Variable with a literal value
pub fn literal(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

/// Variable resolved by the kubelet from a field of the running pod
pub fn field_ref(name: &str, field_path: &str) -> EnvVar {
    field_ref_versioned(name, field_path, None)
}

pub fn field_ref_versioned(name: &str, field_path: &str, api_version: Option<&str>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: api_version.map(str::to_string),
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
    }
}

/// Environment of the primary container.
///
/// The pod identity variables come first, then whatever the user declared on
/// the `redpanda` entry of `statefulset.podTemplate.spec.containers`.
/// Duplicate names are kept: the kubelet applies the last one, so user
/// entries can shadow the built-ins.
pub fn primary_env(values: &RenderValues) -> Vec<EnvVar> {
    let mut env = vec![
        field_ref("SERVICE_NAME", "metadata.name"),
        field_ref("POD_IP", "status.podIP"),
        field_ref("HOST_IP", "status.hostIP"),
    ];

    let user = values
        .statefulset
        .pod_template
        .spec
        .containers
        .iter()
        .rev()
        .find(|c| c.name == PRIMARY_CONTAINER)
        .and_then(|c| c.env.as_ref());

    if let Some(user) = user {
        env.extend(user.iter().cloned());
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::values;

    /// The value the kubelet would apply for `name`
    fn effective<'a>(env: &'a [EnvVar], name: &str) -> Option<&'a EnvVar> {
        env.iter().rev().find(|e| e.name == name)
    }

    #[test]
    fn test_builtins_come_first() {
        let env = primary_env(&values("{}"));

        let names: Vec<_> = env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["SERVICE_NAME", "POD_IP", "HOST_IP"]);

        let path = env[1]
            .value_from
            .as_ref()
            .and_then(|v| v.field_ref.as_ref())
            .map(|f| f.field_path.as_str());
        assert_eq!(path, Some("status.podIP"));
    }

    #[test]
    fn test_user_entries_shadow_builtins() {
        let env = primary_env(&values(
            r#"
statefulset:
  podTemplate:
    spec:
      containers:
        - name: sidecar
          env:
            - name: IGNORED
              value: "1"
        - name: redpanda
          env:
            - name: POD_IP
              value: 10.0.0.1
            - name: EXTRA
              value: x
"#,
        ));

        assert_eq!(env.len(), 5);
        assert_eq!(env[3].name, "POD_IP");
        assert_eq!(
            effective(&env, "POD_IP").and_then(|e| e.value.as_deref()),
            Some("10.0.0.1")
        );
        assert!(effective(&env, "IGNORED").is_none());
    }

    #[test]
    fn test_no_primary_override_is_not_an_error() {
        let env = primary_env(&values(
            r#"
statefulset:
  podTemplate:
    spec:
      containers:
        - name: other
"#,
        ));
        assert_eq!(env.len(), 3);
    }
}
