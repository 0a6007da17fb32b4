//! Live-state sources for the export pipeline
//!
//! A source hands the exporter a service and the revisions labeled as
//! belonging to it. `ClusterSource` reads them from the Kubernetes API,
//! `SnapshotSource` from a file previously dumped with kubectl.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use export_lib::normalize::keys::labels;
use export_lib::{Revision, Service, LIST_KIND, REVISION_KIND, SERVICE_KIND, SERVING_API_VERSION};
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::GroupVersionKind;
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::output::print_warning;

/// Where live service state is read from
#[async_trait]
pub trait LiveStateSource: Send + Sync {
    /// Fetch the service named `name`
    async fn fetch_service(&self, name: &str) -> Result<Service>;

    /// Fetch every revision labeled as belonging to `service`
    async fn fetch_revisions(&self, service: &str) -> Result<Vec<Revision>>;
}

/// Pick a snapshot file when given, else connect to the cluster
pub async fn create_source(
    from_file: Option<&Path>,
    kubeconfig: Option<&Path>,
    namespace: Option<&str>,
) -> Result<Box<dyn LiveStateSource>> {
    match from_file {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Reading live state from snapshot");
            Ok(Box::new(SnapshotSource::open(path)?))
        }
        None => Ok(Box::new(ClusterSource::connect(kubeconfig, namespace).await?)),
    }
}

/// Reads services and revisions from the Kubernetes API
pub struct ClusterSource {
    services: Api<DynamicObject>,
    revisions: Api<DynamicObject>,
    namespace: String,
}

impl ClusterSource {
    /// Connect using `kubeconfig`, or the inferred configuration when absent
    pub async fn connect(kubeconfig: Option<&Path>, namespace: Option<&str>) -> Result<Self> {
        let client = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
                let config =
                    kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await
                        .context("Failed to load kubeconfig")?;
                Client::try_from(config).context("Failed to create Kubernetes client")?
            }
            None => Client::try_default()
                .await
                .context("Failed to create Kubernetes client")?,
        };

        let namespace = namespace
            .map(str::to_string)
            .unwrap_or_else(|| client.default_namespace().to_string());
        tracing::debug!(namespace = %namespace, "Connected to cluster");

        let services = serving_resource(SERVICE_KIND, "services");
        let revisions = serving_resource(REVISION_KIND, "revisions");
        Ok(Self {
            services: Api::namespaced_with(client.clone(), &namespace, &services),
            revisions: Api::namespaced_with(client, &namespace, &revisions),
            namespace,
        })
    }
}

fn serving_resource(kind: &str, plural: &str) -> ApiResource {
    let (group, version) = SERVING_API_VERSION
        .split_once('/')
        .unwrap_or((SERVING_API_VERSION, ""));
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(group, version, kind), plural)
}

fn from_dynamic<T: DeserializeOwned>(object: DynamicObject) -> Result<T> {
    let name = object.metadata.name.clone().unwrap_or_default();
    let value = serde_json::to_value(object)
        .with_context(|| format!("Failed to encode object '{}'", name))?;
    serde_json::from_value(value).with_context(|| format!("Failed to decode object '{}'", name))
}

#[async_trait]
impl LiveStateSource for ClusterSource {
    async fn fetch_service(&self, name: &str) -> Result<Service> {
        let object = self.services.get(name).await.with_context(|| {
            format!("Failed to get service '{}' in namespace '{}'", name, self.namespace)
        })?;
        from_dynamic(object)
    }

    async fn fetch_revisions(&self, service: &str) -> Result<Vec<Revision>> {
        let params = ListParams::default().labels(&format!("{}={}", labels::SERVICE, service));
        let list = self.revisions.list(&params).await.with_context(|| {
            format!(
                "Failed to list revisions of service '{}' in namespace '{}'",
                service, self.namespace
            )
        })?;
        tracing::debug!(service = %service, revisions = list.items.len(), "Fetched revisions");
        list.items.into_iter().map(from_dynamic).collect()
    }
}

/// Minimal view of an object used to route it by kind
#[derive(Deserialize)]
struct TypeMeta {
    #[serde(default)]
    kind: String,
}

/// Reads services and revisions from a JSON or YAML file
///
/// The file may hold a single object, a `List`, or a stream of YAML
/// documents mixing both.
#[derive(Debug)]
pub struct SnapshotSource {
    path: PathBuf,
    services: Vec<Service>,
    revisions: Vec<Revision>,
}

impl SnapshotSource {
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let mut objects = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            let value = serde_json::Value::deserialize(document)
                .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
            flatten_lists(value, &mut objects);
        }

        let mut source = Self {
            path: path.to_path_buf(),
            services: Vec::new(),
            revisions: Vec::new(),
        };
        let mut skipped = 0;
        for object in objects {
            let meta: TypeMeta = serde_json::from_value(object.clone())
                .with_context(|| format!("Malformed object in snapshot {}", path.display()))?;
            match meta.kind.as_str() {
                SERVICE_KIND => source.services.push(decode(object, "service", path)?),
                REVISION_KIND => source.revisions.push(decode(object, "revision", path)?),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            print_warning(&format!(
                "Ignored {} object(s) that are neither services nor revisions in {}",
                skipped,
                path.display()
            ));
        }
        Ok(source)
    }
}

fn decode<T: DeserializeOwned>(object: serde_json::Value, what: &str, path: &Path) -> Result<T> {
    serde_json::from_value(object)
        .with_context(|| format!("Malformed {} in snapshot {}", what, path.display()))
}

fn flatten_lists(value: serde_json::Value, out: &mut Vec<serde_json::Value>) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Object(mut map)
            if map.get("kind").and_then(|k| k.as_str()) == Some(LIST_KIND) =>
        {
            if let Some(serde_json::Value::Array(items)) = map.remove("items") {
                for item in items {
                    flatten_lists(item, out);
                }
            }
        }
        other => out.push(other),
    }
}

#[async_trait]
impl LiveStateSource for SnapshotSource {
    async fn fetch_service(&self, name: &str) -> Result<Service> {
        match self.services.iter().find(|s| s.name() == name) {
            Some(service) => Ok(service.clone()),
            None => bail!("Service '{}' not found in snapshot {}", name, self.path.display()),
        }
    }

    async fn fetch_revisions(&self, service: &str) -> Result<Vec<Revision>> {
        Ok(self
            .revisions
            .iter()
            .filter(|r| r.service_name() == Some(service))
            .cloned()
            .collect())
    }
}
