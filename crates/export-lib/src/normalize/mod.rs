//! Field normalization
//!
//! Strips cluster-assigned and volatile fields from live objects and fills
//! in serving defaults, so two exports of the same logical service produce
//! identical manifests. Every function here is pure and idempotent.

pub mod keys;

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::error::{ExportError, Result};
use crate::model::{
    Revision, RevisionSpec, RevisionTemplateSpec, Service, ServiceSpec, TrafficTarget,
    REVISION_KIND, SERVICE_KIND, SERVING_API_VERSION,
};

/// Container concurrency applied when unset (0 = unlimited)
pub const DEFAULT_CONTAINER_CONCURRENCY: i64 = 0;

/// Request timeout in seconds applied when unset
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 300;

/// Check the invariants of a live service the exporter depends on
///
/// The declared route must select each target either by the latest flag or
/// by name, never both, and percentages must lie within 0..=100.
pub fn validate_service(service: &Service) -> Result<()> {
    for (index, target) in service.spec.traffic.iter().flatten().enumerate() {
        if target.is_latest() && target.named_revision().is_some() {
            return Err(ExportError::malformed(format!(
                "traffic target {} of service '{}' sets latestRevision=true and revisionName '{}'",
                index,
                service.name(),
                target.named_revision().unwrap_or_default()
            )));
        }
        check_percent(service.name(), index, target)?;
    }
    Ok(())
}

pub(crate) fn check_percent(service: &str, index: usize, target: &TrafficTarget) -> Result<()> {
    match target.percent {
        Some(percent) if !(0..=100).contains(&percent) => Err(ExportError::malformed(format!(
            "traffic target {} of service '{}' has percent {} outside 0..=100",
            index, service, percent
        ))),
        _ => Ok(()),
    }
}

/// Canonical form of a service: identity metadata, defaulted template, pruned route
pub fn normalize_service(service: &Service) -> Service {
    let traffic = service
        .spec
        .traffic
        .as_ref()
        .map(|targets| targets.iter().map(normalize_target).collect::<Vec<_>>())
        .filter(|targets| !targets.is_empty());

    Service {
        api_version: SERVING_API_VERSION.to_string(),
        kind: SERVICE_KIND.to_string(),
        metadata: export_metadata(&service.metadata, |_| true, |key| {
            !keys::SERVICE_VOLATILE_ANNOTATIONS.contains(&key)
        }),
        spec: ServiceSpec {
            template: normalize_template(&service.spec.template),
            traffic,
        },
        status: None,
    }
}

/// Template with volatile metadata removed and spec defaults applied
pub fn normalize_template(template: &RevisionTemplateSpec) -> RevisionTemplateSpec {
    RevisionTemplateSpec {
        metadata: export_metadata(&template.metadata, |_| true, |key| {
            !keys::SERVICE_VOLATILE_ANNOTATIONS.contains(&key)
        }),
        spec: normalize_revision_spec(&template.spec),
    }
}

/// Revision as it looked at creation: linkage labels, creator, defaulted spec
pub fn normalize_revision(revision: &Revision) -> Revision {
    Revision {
        api_version: SERVING_API_VERSION.to_string(),
        kind: REVISION_KIND.to_string(),
        metadata: export_metadata(
            &revision.metadata,
            |key| !keys::REVISION_VOLATILE_LABELS.contains(&key),
            |key| !keys::REVISION_VOLATILE_ANNOTATIONS.contains(&key),
        ),
        spec: normalize_revision_spec(&revision.spec),
        status: None,
    }
}

/// Rebuild the service template that stamped out `revision`
///
/// Controller-owned labels and annotations are removed so only what the user
/// put on the template survives. The template is pinned to the revision name.
pub fn template_from_revision(revision: &Revision) -> RevisionTemplateSpec {
    RevisionTemplateSpec {
        metadata: export_metadata(
            &revision.metadata,
            |key| !key.starts_with(keys::labels::SERVING_PREFIX),
            |key| !keys::TEMPLATE_SYSTEM_ANNOTATIONS.contains(&key),
        ),
        spec: normalize_revision_spec(&revision.spec),
    }
}

/// Apply serving defaults and prune empty collections
pub fn normalize_revision_spec(spec: &RevisionSpec) -> RevisionSpec {
    let mut spec = spec.clone();
    spec.container_concurrency
        .get_or_insert(DEFAULT_CONTAINER_CONCURRENCY);
    spec.timeout_seconds.get_or_insert(DEFAULT_TIMEOUT_SECONDS);
    normalize_pod_spec(&mut spec.pod_spec);
    spec
}

/// Route entry without cluster-populated fields
pub fn normalize_target(target: &TrafficTarget) -> TrafficTarget {
    TrafficTarget {
        url: None,
        tag: target.tag.clone().filter(|tag| !tag.is_empty()),
        revision_name: target.named_revision().map(str::to_string),
        ..target.clone()
    }
}

fn export_metadata(
    meta: &ObjectMeta,
    keep_label: impl Fn(&str) -> bool,
    keep_annotation: impl Fn(&str) -> bool,
) -> ObjectMeta {
    ObjectMeta {
        name: meta.name.clone(),
        labels: filter_map(meta.labels.as_ref(), keep_label),
        annotations: filter_map(meta.annotations.as_ref(), keep_annotation),
        ..Default::default()
    }
}

fn filter_map(
    map: Option<&BTreeMap<String, String>>,
    keep: impl Fn(&str) -> bool,
) -> Option<BTreeMap<String, String>> {
    let kept: BTreeMap<String, String> = map?
        .iter()
        .filter(|(key, _)| keep(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    (!kept.is_empty()).then_some(kept)
}

fn normalize_pod_spec(pod_spec: &mut PodSpec) {
    for container in pod_spec
        .containers
        .iter_mut()
        .chain(pod_spec.init_containers.iter_mut().flatten())
    {
        normalize_container(container);
    }
    prune_vec(&mut pod_spec.init_containers);
    prune_vec(&mut pod_spec.volumes);
    prune_vec(&mut pod_spec.image_pull_secrets);
    prune_vec(&mut pod_spec.tolerations);
    prune_vec(&mut pod_spec.host_aliases);
    prune_vec(&mut pod_spec.topology_spread_constraints);
    prune_map(&mut pod_spec.node_selector);
}

fn normalize_container(container: &mut Container) {
    prune_vec(&mut container.args);
    prune_vec(&mut container.command);
    prune_vec(&mut container.env);
    prune_vec(&mut container.env_from);
    prune_vec(&mut container.ports);
    prune_vec(&mut container.volume_mounts);
    prune_vec(&mut container.volume_devices);

    let empty_resources = match container.resources.as_mut() {
        Some(resources) => {
            prune_map(&mut resources.limits);
            prune_map(&mut resources.requests);
            prune_vec(&mut resources.claims);
            resources.limits.is_none() && resources.requests.is_none() && resources.claims.is_none()
        }
        None => false,
    };
    if empty_resources {
        container.resources = None;
    }
}

fn prune_vec<T>(field: &mut Option<Vec<T>>) {
    if field.as_ref().is_some_and(Vec::is_empty) {
        *field = None;
    }
}

fn prune_map<K, V>(field: &mut Option<BTreeMap<K, V>>) {
    if field.as_ref().is_some_and(BTreeMap::is_empty) {
        *field = None;
    }
}
