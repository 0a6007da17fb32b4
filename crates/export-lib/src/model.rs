//! Knative serving data models
//!
//! Wire-compatible renditions of the `serving.knative.dev/v1` objects the
//! exporter reads and writes. Field names follow the Kubernetes JSON
//! conventions so objects can be read straight from `kubectl -o json|yaml`.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::normalize::keys;

/// API version of Knative serving resources
pub const SERVING_API_VERSION: &str = "serving.knative.dev/v1";

/// API version of the generic list container
pub const LIST_API_VERSION: &str = "v1";

pub const SERVICE_KIND: &str = "Service";
pub const REVISION_KIND: &str = "Revision";
pub const LIST_KIND: &str = "List";

/// Knative Service: a revision template plus the traffic routing across revisions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
}

impl Service {
    /// Create a service with the given name and template, and no route
    pub fn new(name: impl Into<String>, template: RevisionTemplateSpec) -> Self {
        Self {
            api_version: SERVING_API_VERSION.to_string(),
            kind: SERVICE_KIND.to_string(),
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            spec: ServiceSpec {
                template,
                traffic: None,
            },
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Name of the newest revision that became ready, as reported by the cluster
    pub fn latest_ready_revision(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.latest_ready_revision_name.as_deref())
    }

    /// Revision the template currently rolls out to: latest ready, else latest created
    pub fn current_revision(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| {
            s.latest_ready_revision_name
                .as_deref()
                .or(s.latest_created_revision_name.as_deref())
        })
    }
}

/// Desired state of a service (inlined configuration and route specs)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(default)]
    pub template: RevisionTemplateSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<Vec<TrafficTarget>>,
}

/// Observed state of a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_ready_revision_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_created_revision_name: Option<String>,
    /// Traffic as resolved by the cluster; every entry carries a revision name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<Vec<TrafficTarget>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<serde_json::Value>>,
}

/// Template from which the service's revisions are stamped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevisionTemplateSpec {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RevisionSpec,
}

impl RevisionTemplateSpec {
    pub fn new(spec: RevisionSpec) -> Self {
        Self {
            metadata: ObjectMeta::default(),
            spec,
        }
    }

    /// Pin the name of the revision this template produces
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }
}

/// Revision spec: a pod spec plus the serving knobs layered on top of it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    #[serde(flatten)]
    pub pod_spec: PodSpec,
    /// Maximum in-flight requests per container; 0 means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_concurrency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_start_timeout_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_seconds: Option<i64>,
}

impl RevisionSpec {
    pub fn new(pod_spec: PodSpec) -> Self {
        Self {
            pod_spec,
            ..Default::default()
        }
    }
}

/// Immutable snapshot of a service template at one point of its history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RevisionSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
}

impl Revision {
    pub fn new(name: impl Into<String>, spec: RevisionSpec) -> Self {
        Self {
            api_version: SERVING_API_VERSION.to_string(),
            kind: REVISION_KIND.to_string(),
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            spec,
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// Name of the service this revision was stamped from, if labeled
    pub fn service_name(&self) -> Option<&str> {
        self.label(keys::labels::SERVICE)
    }

    /// Configuration generation that produced this revision
    pub fn configuration_generation(&self) -> Option<i64> {
        self.label(keys::labels::CONFIGURATION_GENERATION)
            .and_then(|g| g.parse().ok())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.creation_timestamp.as_ref().map(|t| t.0)
    }
}

/// A single routing rule of a service's route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_name: Option<String>,
    /// Legacy selector routing to the latest ready revision of a configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_revision: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl TrafficTarget {
    /// Route `percent` of traffic to whatever revision is latest ready
    pub fn latest(percent: i64) -> Self {
        Self {
            latest_revision: Some(true),
            percent: Some(percent),
            ..Default::default()
        }
    }

    /// Route `percent` of traffic to a fixed revision
    pub fn revision(name: impl Into<String>, percent: i64) -> Self {
        Self {
            revision_name: Some(name.into()),
            latest_revision: Some(false),
            percent: Some(percent),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_latest(&self) -> bool {
        self.latest_revision == Some(true)
    }

    /// Revision name, treating an empty string as unset
    pub fn named_revision(&self) -> Option<&str> {
        self.revision_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Generic `v1/List` container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List<T> {
    pub api_version: String,
    pub kind: String,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> List<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            api_version: LIST_API_VERSION.to_string(),
            kind: LIST_KIND.to_string(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
