//! Traffic resolution
//!
//! Turns the route reported by the cluster into canonical routing entries
//! that can be re-applied. Each entry either follows the latest ready
//! revision or pins a named revision; declaration order is preserved.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ExportError, Result};
use crate::model::{Service, TrafficTarget};
use crate::normalize::check_percent;

/// A canonical traffic target paired with the revision it actually routes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Entry as it appears in the exported route
    pub target: TrafficTarget,
    /// Concrete revision serving this entry; `None` only for a latest
    /// target of a service with no known revision at all
    pub revision: Option<String>,
}

impl ResolvedTarget {
    pub fn percent(&self) -> i64 {
        self.target.percent.unwrap_or_default()
    }

    /// Whether this entry keeps its revision alive: it carries traffic or a tag
    pub fn is_active(&self) -> bool {
        self.percent() > 0 || self.target.tag.is_some()
    }

    pub fn routes_to(&self, revision: &str) -> bool {
        self.revision.as_deref() == Some(revision)
    }
}

/// Mapping from traffic tags to the revisions they currently address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    /// Collect tags from resolved targets (typically `status.traffic`)
    pub fn from_targets<'a>(targets: impl IntoIterator<Item = &'a TrafficTarget>) -> Self {
        Self(
            targets
                .into_iter()
                .filter_map(|t| {
                    let tag = t.tag.as_deref().filter(|tag| !tag.is_empty())?;
                    Some((tag.to_string(), t.named_revision()?.to_string()))
                })
                .collect(),
        )
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    pub fn insert(&mut self, tag: impl Into<String>, revision: impl Into<String>) {
        self.0.insert(tag.into(), revision.into());
    }
}

/// Resolves routing entries against the service's latest ready revision
#[derive(Debug, Clone, Default)]
pub struct TrafficResolver {
    latest_ready: Option<String>,
    /// Revision a latest target resolves to while nothing is ready yet
    latest_fallback: Option<String>,
    tags: TagMap,
}

impl TrafficResolver {
    pub fn new(latest_ready: Option<&str>) -> Self {
        Self {
            latest_ready: latest_ready.map(str::to_string),
            latest_fallback: None,
            tags: TagMap::default(),
        }
    }

    /// Resolve latest targets to `revision` when no revision is ready
    ///
    /// Only affects which revision a target is attributed to; targets are
    /// still rendered as following the latest revision.
    pub fn with_latest_fallback(mut self, revision: Option<&str>) -> Self {
        self.latest_fallback = revision.map(str::to_string);
        self
    }

    /// Resolve tag-only targets through this mapping
    pub fn with_tags(mut self, tags: TagMap) -> Self {
        self.tags = tags;
        self
    }

    /// Resolver for a live service, fed from its status
    pub fn for_service(service: &Service) -> Self {
        let tags = service
            .status
            .as_ref()
            .and_then(|s| s.traffic.as_ref())
            .map(|targets| TagMap::from_targets(targets))
            .unwrap_or_default();
        let fallback = service
            .status
            .as_ref()
            .and_then(|s| s.latest_created_revision_name.as_deref())
            .or(service.spec.template.metadata.name.as_deref());
        Self::new(service.latest_ready_revision())
            .with_latest_fallback(fallback)
            .with_tags(tags)
    }

    /// Resolve one routing entry
    pub fn resolve_target(
        &self,
        service: &str,
        index: usize,
        target: &TrafficTarget,
    ) -> Result<ResolvedTarget> {
        check_percent(service, index, target)?;

        let follows_latest = target.is_latest() || target.configuration_name.is_some();
        let tag = target.tag.clone().filter(|tag| !tag.is_empty());
        let revision = match target.named_revision() {
            Some(name) => Some(name.to_string()),
            None if follows_latest => self
                .latest_ready
                .clone()
                .or_else(|| self.latest_fallback.clone()),
            None => {
                let name = tag
                    .as_deref()
                    .and_then(|tag| self.tags.get(tag))
                    .ok_or_else(|| {
                        ExportError::malformed(format!(
                            "traffic target {} of service '{}' selects neither a revision nor the latest revision",
                            index, service
                        ))
                    })?;
                Some(name.to_string())
            }
        };

        let is_latest = match (&self.latest_ready, &revision) {
            (Some(latest), Some(revision)) => latest == revision,
            _ => follows_latest,
        };

        let target = TrafficTarget {
            tag,
            revision_name: if is_latest { None } else { revision.clone() },
            configuration_name: None,
            latest_revision: Some(is_latest),
            percent: Some(target.percent.unwrap_or_default()),
            url: None,
        };
        Ok(ResolvedTarget { target, revision })
    }

    /// Resolve a whole route, keeping declaration order
    pub fn resolve(&self, service: &str, route: &[TrafficTarget]) -> Result<Vec<ResolvedTarget>> {
        route
            .iter()
            .enumerate()
            .map(|(index, target)| self.resolve_target(service, index, target))
            .collect()
    }
}

/// Resolve the live route of `service`
///
/// Uses `status.traffic` when the cluster has reported it, since those
/// entries already name concrete revisions; otherwise falls back to the
/// declared `spec.traffic`. A service with no route at all yields no entries.
pub fn resolve_service_route(service: &Service) -> Result<Vec<ResolvedTarget>> {
    let observed = service
        .status
        .as_ref()
        .and_then(|s| s.traffic.as_deref())
        .filter(|targets| !targets.is_empty());
    let (source, route) = match observed {
        Some(targets) => ("status", targets),
        None => ("spec", service.spec.traffic.as_deref().unwrap_or_default()),
    };

    let resolved = TrafficResolver::for_service(service).resolve(service.name(), route)?;

    let total: i64 = resolved.iter().map(ResolvedTarget::percent).sum();
    debug!(
        service = %service.name(),
        source,
        targets = resolved.len(),
        total_percent = total,
        "Resolved traffic route"
    );

    Ok(resolved)
}

/// Strip resolution details, leaving the route as it is exported
pub fn route_targets(resolved: &[ResolvedTarget]) -> Option<Vec<TrafficTarget>> {
    let targets: Vec<TrafficTarget> = resolved.iter().map(|r| r.target.clone()).collect();
    (!targets.is_empty()).then_some(targets)
}
