//! Security context resolution
//!
//! uid and gid are resolved per field through a fixed chain: the pod-level
//! override (`statefulset.podSecurityContext`) first, then the top-level
//! default (`statefulset.securityContext`). The first value present wins.

use k8s_openapi::api::core::v1::SecurityContext;
use podsmith_core::RenderValues;

use crate::error::{EngineError, Result, SecurityField};

/// Resolved owner of files a container creates or chowns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: i64,
    pub gid: i64,
}

fn run_as_user(values: &RenderValues) -> Option<i64> {
    values
        .statefulset
        .pod_security_context
        .as_ref()
        .and_then(|pod| pod.run_as_user)
        .or(values.statefulset.security_context.run_as_user)
}

fn fs_group(values: &RenderValues) -> Option<i64> {
    values
        .statefulset
        .pod_security_context
        .as_ref()
        .and_then(|pod| pod.fs_group)
        .or(values.statefulset.security_context.fs_group)
}

/// Resolve uid/gid for `container`, failing if either cannot be resolved.
pub fn resolve(container: &str, values: &RenderValues) -> Result<Ownership> {
    let uid = run_as_user(values)
        .ok_or_else(|| EngineError::missing_security_context(container, SecurityField::RunAsUser))?;
    let gid = fs_group(values)
        .ok_or_else(|| EngineError::missing_security_context(container, SecurityField::FsGroup))?;

    tracing::debug!(container, uid, gid, "resolved security context");
    Ok(Ownership { uid, gid })
}

/// Security context for the non-root managed containers.
///
/// Unlike [`resolve`] this never fails; unresolved fields are left unset.
pub fn container_security_context(values: &RenderValues) -> SecurityContext {
    let defaults = &values.statefulset.security_context;
    SecurityContext {
        run_as_user: run_as_user(values),
        run_as_group: fs_group(values),
        allow_privilege_escalation: defaults.allow_privilege_escalation,
        run_as_non_root: defaults.run_as_non_root,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podsmith_core::Values;

    fn values(yaml: &str) -> RenderValues {
        // Bare snapshot without built-in defaults so every field is explicit.
        Values::from_yaml(yaml).unwrap().decode().unwrap()
    }

    #[test]
    fn test_falls_back_to_top_level_default() {
        let values = values(
            r#"
statefulset:
  securityContext:
    runAsUser: 101
    fsGroup: 101
"#,
        );

        let owner = resolve("set-datadir-ownership", &values).unwrap();
        assert_eq!(owner, Ownership { uid: 101, gid: 101 });
    }

    #[test]
    fn test_pod_level_override_wins() {
        let values = values(
            r#"
statefulset:
  podSecurityContext:
    runAsUser: 1000
  securityContext:
    runAsUser: 101
    fsGroup: 102
"#,
        );

        let owner = resolve("set-datadir-ownership", &values).unwrap();
        assert_eq!(owner.uid, 1000);
        assert_eq!(owner.gid, 102);
    }

    #[test]
    fn test_missing_uid_names_container() {
        let values = values(
            r#"
statefulset:
  securityContext:
    fsGroup: 101
"#,
        );

        let err = resolve("set-datadir-ownership", &values).unwrap_err();
        match err {
            EngineError::MissingSecurityContext { container, field } => {
                assert_eq!(container, "set-datadir-ownership");
                assert_eq!(field, SecurityField::RunAsUser);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_gid() {
        let values = values(
            r#"
statefulset:
  podSecurityContext:
    runAsUser: 101
"#,
        );

        let err = resolve("set-tiered-storage-cache-dir-ownership", &values).unwrap_err();
        assert_eq!(
            err.to_string(),
            "set-tiered-storage-cache-dir-ownership container requires fsGroup to be specified"
        );
    }

    #[test]
    fn test_container_security_context_is_lenient() {
        let sc = container_security_context(&values("{}"));
        assert_eq!(sc.run_as_user, None);
        assert_eq!(sc.run_as_group, None);

        let sc = container_security_context(&values(
            r#"
statefulset:
  securityContext:
    runAsUser: 101
    fsGroup: 101
    allowPrivilegeEscalation: false
    runAsNonRoot: true
"#,
        ));
        assert_eq!(sc.run_as_user, Some(101));
        assert_eq!(sc.run_as_group, Some(101));
        assert_eq!(sc.allow_privilege_escalation, Some(false));
        assert_eq!(sc.run_as_non_root, Some(true));
    }
}
