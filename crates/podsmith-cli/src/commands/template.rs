//! Template command - render the StatefulSet locally

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use podsmith_core::{ChartInfo, ReleaseInfo, RenderContext, RenderValues, Values, parse_set_values};
use podsmith_engine::{Engine, NoLookup, ResourceLookup, naming};
use podsmith_kube::{ClusterLookup, lookup_from_manifest};
use sha2::{Digest, Sha256};

use crate::error::{CliError, Result};

/// Where the deployed state of an upgrade comes from
#[derive(Debug, Clone, Default)]
pub enum ExistingSource {
    /// Nothing is deployed as far as this render knows
    #[default]
    None,
    /// A manifest exported from the cluster
    Manifest(PathBuf),
    /// The cluster of the current kube context
    Cluster,
}

/// Options of `podsmith template`
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub release: String,
    pub namespace: String,
    pub values_files: Vec<PathBuf>,
    pub set_values: Vec<String>,
    pub upgrade: bool,
    pub revision: Option<u32>,
    pub existing: ExistingSource,
    pub chart_name: String,
    pub chart_version: String,
    pub app_version: String,
    pub show_values: bool,
}

/// Merge the defaults, `-f` files and `--set` overrides, in that order
pub fn load_values(values_files: &[PathBuf], set_values: &[String]) -> Result<Values> {
    let mut values = RenderValues::default_layer()?;

    for values_file in values_files {
        let file_values = Values::from_file(values_file).map_err(|e| {
            CliError::validation_with_help(
                format!("{}: {}", values_file.display(), e),
                "check that the file exists and is valid YAML",
            )
        })?;
        values.merge(&file_values);
        tracing::debug!(file = %values_file.display(), "merged values file");
    }

    if !set_values.is_empty() {
        let overrides = parse_set_values(set_values).map_err(|e| {
            CliError::validation_with_help(e.to_string(), "use --set key.path=value")
        })?;
        values.merge(&overrides);
        tracing::debug!(count = set_values.len(), "applied --set values");
    }

    Ok(values)
}

/// sha256 of the cluster config, stamped on the pod template
pub fn config_checksum(values: &RenderValues) -> Result<String> {
    let config = serde_json::to_string(&values.config)
        .map_err(|e| CliError::other(format!("Failed to serialize config: {}", e)))?;
    Ok(hex::encode(Sha256::digest(config.as_bytes())))
}

async fn resolve_lookup(
    existing: &ExistingSource,
    ctx: &RenderContext,
) -> Result<Arc<dyn ResourceLookup>> {
    let namespace = &ctx.release.namespace;

    let lookup: Arc<dyn ResourceLookup> = match existing {
        ExistingSource::None => Arc::new(NoLookup),
        ExistingSource::Manifest(path) => Arc::new(lookup_from_manifest(path, namespace)?),
        ExistingSource::Cluster => match ClusterLookup::try_default().await {
            Ok(cluster) => Arc::new(cluster.prefetch(namespace, &naming::fullname(ctx)).await),
            Err(e) => {
                tracing::warn!(error = %e, "cannot reach the cluster, rendering as a fresh install");
                Arc::new(NoLookup)
            }
        },
    };
    Ok(lookup)
}

/// Run the template command
pub async fn run(options: TemplateOptions) -> Result<()> {
    let values = load_values(&options.values_files, &options.set_values)?;

    if options.show_values {
        println!("{}", style("# Computed Values").cyan().bold());
        println!("---");
        let yaml = serde_yaml::to_string(values.inner())
            .map_err(|e| CliError::other(format!("Failed to serialize values: {}", e)))?;
        println!("{}", yaml);
    }

    let render_values = RenderValues::from_values(&values)?;
    let checksum = config_checksum(&render_values)?;

    let release = if options.upgrade {
        ReleaseInfo::for_upgrade(
            &options.release,
            &options.namespace,
            options.revision.unwrap_or(2),
        )
    } else {
        ReleaseInfo::for_install(&options.release, &options.namespace)
    };
    let chart = ChartInfo::new(
        &options.chart_name,
        &options.chart_version,
        &options.app_version,
    )?;
    let ctx = RenderContext::new(render_values, release, chart).with_config_checksum(checksum);

    let lookup = resolve_lookup(&options.existing, &ctx).await?;
    let engine = Engine::builder().lookup(lookup).build();
    let result = engine.render(&ctx)?;

    if result.selector_preserved {
        tracing::info!(release = %ctx.release.name, "selector preserved from the deployed statefulset");
    }

    let yaml = serde_yaml::to_string(&result.statefulset)
        .map_err(|e| CliError::other(format!("Failed to serialize statefulset: {}", e)))?;
    println!("---");
    print!("{}", yaml);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_values_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("values.yaml");
        std::fs::write(&file, "statefulset:\n  replicas: 5\nnameOverride: fromfile\n").unwrap();

        let values = load_values(
            std::slice::from_ref(&file),
            &["statefulset.replicas=7".to_string()],
        )
        .unwrap();
        let typed = RenderValues::from_values(&values).unwrap();

        assert_eq!(typed.statefulset.replicas, 7);
        assert_eq!(typed.name_override, "fromfile");
        // untouched defaults survive
        assert_eq!(typed.statefulset.security_context.run_as_user, Some(101));
    }

    #[test]
    fn test_missing_values_file() {
        let err = load_values(&[PathBuf::from("/nonexistent/values.yaml")], &[]).unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::VALIDATION_ERROR);
    }

    #[test]
    fn test_checksum_tracks_config_only() {
        let a = RenderValues::layered(vec![Values::from_yaml("config:\n  cluster:\n    x: 1\n").unwrap()]).unwrap();
        let b = RenderValues::layered(vec![
            Values::from_yaml("config:\n  cluster:\n    x: 1\nstatefulset:\n  replicas: 9\n").unwrap(),
        ])
        .unwrap();
        let c = RenderValues::layered(vec![Values::from_yaml("config:\n  cluster:\n    x: 2\n").unwrap()]).unwrap();

        let checksum = config_checksum(&a).unwrap();
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, config_checksum(&b).unwrap());
        assert_ne!(checksum, config_checksum(&c).unwrap());
    }
}
