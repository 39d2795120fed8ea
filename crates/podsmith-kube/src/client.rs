//! Cluster-backed lookup of the deployed StatefulSet
//!
//! The render itself is synchronous, so the deployed object is read once up
//! front and handed to the engine as a [`StaticLookup`].

use k8s_openapi::api::apps::v1::StatefulSet;
use kube::Api;
use podsmith_engine::StaticLookup;

use crate::error::{KubeError, Result};

/// Reads StatefulSets from the cluster of the current kube context
pub struct ClusterLookup {
    client: kube::Client,
}

impl ClusterLookup {
    /// Connect using the default kubeconfig / in-cluster config
    pub async fn try_default() -> Result<Self> {
        let client = kube::Client::try_default().await?;
        Ok(Self { client })
    }

    /// Fetch a StatefulSet, `None` if it does not exist
    pub async fn fetch(&self, namespace: &str, name: &str) -> Result<Option<StatefulSet>> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await.map_err(KubeError::Api)
    }

    /// Read the StatefulSet once and wrap it for the engine.
    ///
    /// Never fails: an API error becomes a lookup that reports the error, so
    /// the render falls back to fresh-install labels.
    pub async fn prefetch(&self, namespace: &str, name: &str) -> StaticLookup {
        match self.fetch(namespace, name).await {
            Ok(Some(sts)) => {
                tracing::debug!(namespace, name, "fetched deployed statefulset");
                StaticLookup::new().with_statefulset(&sts, namespace)
            }
            Ok(None) => StaticLookup::new(),
            Err(e) if e.is_not_found() => StaticLookup::new(),
            Err(e) => {
                tracing::debug!(error = %e, namespace, name, "could not read deployed statefulset");
                StaticLookup::failing(e.to_string())
            }
        }
    }
}
