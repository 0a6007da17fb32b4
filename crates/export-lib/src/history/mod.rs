//! Revision history reconstruction
//!
//! Orders a service's revisions chronologically and rebuilds them either as
//! standalone revision objects or as the service definitions that produced
//! them, with the traffic each one currently receives.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::{ExportError, Result};
use crate::model::{List, Revision, Service, ServiceSpec};
use crate::normalize::{normalize_revision, template_from_revision};
use crate::traffic::{route_targets, ResolvedTarget};

/// The revisions of one service, oldest first
#[derive(Debug, Clone)]
pub struct RevisionHistory {
    service: String,
    revisions: Vec<Revision>,
}

impl RevisionHistory {
    /// Build the history of `service` from fetched revisions
    ///
    /// Revisions labeled as belonging to another service are skipped.
    /// Unnamed or duplicate revisions are rejected.
    pub fn new(service: &str, revisions: &[Revision]) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut owned = Vec::with_capacity(revisions.len());

        for revision in revisions {
            if let Some(owner) = revision.service_name() {
                if owner != service {
                    warn!(
                        service = %service,
                        revision = %revision.name(),
                        owner = %owner,
                        "Skipping revision owned by another service"
                    );
                    continue;
                }
            }
            if revision.name().is_empty() {
                return Err(ExportError::malformed(format!(
                    "revision without a name in history of service '{}'",
                    service
                )));
            }
            if !seen.insert(revision.name()) {
                return Err(ExportError::malformed(format!(
                    "revision '{}' appears twice in history of service '{}'",
                    revision.name(),
                    service
                )));
            }
            owned.push(revision.clone());
        }

        owned.sort_by(chronological);
        debug!(service = %service, revisions = owned.len(), "Built revision history");

        Ok(Self {
            service: service.to_string(),
            revisions: owned,
        })
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Revision> {
        self.revisions.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.iter()
    }

    /// Ensure everything the route and status point at was fetched
    ///
    /// A route entry that resolved to no revision at all is rejected too.
    pub fn verify_references(&self, route: &[ResolvedTarget], current: Option<&str>) -> Result<()> {
        if let Some(index) = route.iter().position(|r| r.revision.is_none()) {
            return Err(ExportError::malformed(format!(
                "traffic target {} of service '{}' follows the latest revision, but no revision is ready, created or named by the template",
                index, self.service
            )));
        }

        let referenced = route
            .iter()
            .filter_map(|r| r.revision.as_deref())
            .chain(current);
        for name in referenced {
            if self.get(name).is_none() {
                return Err(ExportError::consistency(&self.service, name));
            }
        }
        Ok(())
    }

    /// Every revision as it was at creation, oldest first
    pub fn revision_list(&self) -> List<Revision> {
        List::new(self.revisions.iter().map(normalize_revision).collect())
    }

    /// One service definition per revision that is still routed to
    ///
    /// A revision is kept when a target with traffic or a tag points at it,
    /// or when it is the service's `current` revision. Each entry carries the
    /// metadata of `service`, a template rebuilt from the revision, and only
    /// the route entries serving that revision.
    pub fn replay_services(
        &self,
        service: &Service,
        route: &[ResolvedTarget],
        current: Option<&str>,
    ) -> Vec<Service> {
        self.revisions
            .iter()
            .filter(|revision| {
                let name = revision.name();
                current == Some(name) || route.iter().any(|r| r.routes_to(name) && r.is_active())
            })
            .map(|revision| {
                let attributed: Vec<ResolvedTarget> = route
                    .iter()
                    .filter(|r| r.routes_to(revision.name()))
                    .cloned()
                    .collect();
                Service {
                    api_version: service.api_version.clone(),
                    kind: service.kind.clone(),
                    metadata: service.metadata.clone(),
                    spec: ServiceSpec {
                        template: template_from_revision(revision),
                        traffic: route_targets(&attributed),
                    },
                    status: None,
                }
            })
            .collect()
    }
}

/// Oldest first: configuration generation, then creation time, then name.
/// Revisions without a generation label sort after those with one.
fn chronological(a: &Revision, b: &Revision) -> Ordering {
    let key = |r: &Revision| {
        let generation = r.configuration_generation();
        (generation.is_none(), generation, r.created_at())
    };
    key(a)
        .cmp(&key(b))
        .then_with(|| a.name().cmp(b.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RevisionSpec, RevisionTemplateSpec, TrafficTarget};
    use crate::normalize::keys;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use pretty_assertions::assert_eq;

    fn revision(name: &str, generation: Option<u32>) -> Revision {
        let mut revision = Revision::new(name, RevisionSpec::default());
        let mut labels = std::collections::BTreeMap::new();
        labels.insert(keys::labels::SERVICE.to_string(), "hello".to_string());
        if let Some(generation) = generation {
            labels.insert(
                keys::labels::CONFIGURATION_GENERATION.to_string(),
                generation.to_string(),
            );
        }
        revision.metadata.labels = Some(labels);
        revision
    }

    fn resolved(target: TrafficTarget, revision: &str) -> ResolvedTarget {
        ResolvedTarget {
            target,
            revision: Some(revision.to_string()),
        }
    }

    fn names(history: &RevisionHistory) -> Vec<&str> {
        history.iter().map(Revision::name).collect()
    }

    #[test]
    fn test_sorted_by_generation() {
        let history = RevisionHistory::new(
            "hello",
            &[
                revision("hello-rev3", Some(3)),
                revision("hello-rev1", Some(1)),
                revision("hello-rev10", Some(10)),
                revision("hello-rev2", Some(2)),
            ],
        )
        .unwrap();

        assert_eq!(
            names(&history),
            vec!["hello-rev1", "hello-rev2", "hello-rev3", "hello-rev10"]
        );
    }

    #[test]
    fn test_unlabeled_revisions_sorted_last_by_creation() {
        let mut late = revision("hello-b", None);
        late.metadata.creation_timestamp =
            Some(Time(Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap()));
        let mut early = revision("hello-c", None);
        early.metadata.creation_timestamp =
            Some(Time(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));

        let history =
            RevisionHistory::new("hello", &[late, revision("hello-a", Some(1)), early]).unwrap();

        assert_eq!(names(&history), vec!["hello-a", "hello-c", "hello-b"]);
    }

    #[test]
    fn test_foreign_revisions_skipped() {
        let mut foreign = revision("other-rev1", Some(1));
        foreign
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert(keys::labels::SERVICE.to_string(), "other".to_string());

        let history =
            RevisionHistory::new("hello", &[foreign, revision("hello-rev1", Some(1))]).unwrap();

        assert_eq!(names(&history), vec!["hello-rev1"]);
    }

    #[test]
    fn test_duplicate_revision_rejected() {
        let err = RevisionHistory::new(
            "hello",
            &[revision("hello-rev1", Some(1)), revision("hello-rev1", Some(1))],
        )
        .unwrap_err();

        assert!(matches!(err, ExportError::MalformedInput(_)));
    }

    #[test]
    fn test_dangling_route_reference() {
        let history = RevisionHistory::new("hello", &[revision("hello-rev1", Some(1))]).unwrap();
        let route = vec![resolved(TrafficTarget::revision("hello-rev9", 100), "hello-rev9")];

        let err = history
            .verify_references(&route, Some("hello-rev1"))
            .unwrap_err();

        match err {
            ExportError::ConsistencyFault { service, revision } => {
                assert_eq!(service, "hello");
                assert_eq!(revision, "hello-rev9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unresolved_latest_target_rejected() {
        let history = RevisionHistory::new("hello", &[revision("hello-rev1", Some(1))]).unwrap();
        let route = vec![ResolvedTarget {
            target: TrafficTarget::latest(100),
            revision: None,
        }];

        let err = history.verify_references(&route, None).unwrap_err();

        assert!(matches!(err, ExportError::MalformedInput(_)));
        assert!(err.to_string().contains("target 0"));
    }

    #[test]
    fn test_dangling_current_revision() {
        let history = RevisionHistory::new("hello", &[revision("hello-rev1", Some(1))]).unwrap();

        assert!(matches!(
            history.verify_references(&[], Some("hello-rev2")),
            Err(ExportError::ConsistencyFault { .. })
        ));
        assert!(history.verify_references(&[], Some("hello-rev1")).is_ok());
    }

    #[test]
    fn test_revision_list_contains_full_history() {
        let history = RevisionHistory::new(
            "hello",
            &[
                revision("hello-rev2", Some(2)),
                revision("hello-rev1", Some(1)),
                revision("hello-rev3", Some(3)),
            ],
        )
        .unwrap();

        let list = history.revision_list();

        assert_eq!(list.kind, "List");
        let listed: Vec<&str> = list.items.iter().map(Revision::name).collect();
        assert_eq!(listed, vec!["hello-rev1", "hello-rev2", "hello-rev3"]);
        assert!(list.items.iter().all(|r| r.kind == "Revision"));
    }

    #[test]
    fn test_replay_keeps_only_routed_revisions() {
        let history = RevisionHistory::new(
            "hello",
            &[
                revision("hello-rev1", Some(1)),
                revision("hello-rev2", Some(2)),
                revision("hello-rev3", Some(3)),
            ],
        )
        .unwrap();
        let route = vec![
            resolved(TrafficTarget::revision("hello-rev1", 0), "hello-rev1"),
            resolved(TrafficTarget::latest(100), "hello-rev3"),
        ];
        let base = Service::new("hello", RevisionTemplateSpec::default());

        let services = history.replay_services(&base, &route, Some("hello-rev3"));

        assert_eq!(services.len(), 1);
        assert_eq!(
            services[0].spec.template.metadata.name.as_deref(),
            Some("hello-rev3")
        );
        assert_eq!(services[0].spec.traffic, Some(vec![TrafficTarget::latest(100)]));
    }

    #[test]
    fn test_replay_includes_current_without_traffic() {
        let history = RevisionHistory::new(
            "hello",
            &[revision("hello-rev2", Some(2)), revision("hello-rev3", Some(3))],
        )
        .unwrap();
        let route = vec![resolved(TrafficTarget::revision("hello-rev2", 100), "hello-rev2")];
        let base = Service::new("hello", RevisionTemplateSpec::default());

        let services = history.replay_services(&base, &route, Some("hello-rev3"));

        assert_eq!(services.len(), 2);
        assert_eq!(
            services[0].spec.traffic,
            Some(vec![TrafficTarget::revision("hello-rev2", 100)])
        );
        assert_eq!(services[1].spec.template.metadata.name.as_deref(), Some("hello-rev3"));
        assert_eq!(services[1].spec.traffic, None);
    }
}
