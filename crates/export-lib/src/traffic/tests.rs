//! Tests for traffic resolution

use super::*;
use crate::model::{RevisionTemplateSpec, ServiceStatus};
use pretty_assertions::assert_eq;

fn observed(name: &str, percent: i64) -> TrafficTarget {
    TrafficTarget {
        revision_name: Some(name.to_string()),
        percent: Some(percent),
        ..Default::default()
    }
}

fn observed_latest(name: &str, percent: i64) -> TrafficTarget {
    TrafficTarget {
        latest_revision: Some(true),
        url: Some("http://hello.default.example.com".to_string()),
        ..observed(name, percent)
    }
}

fn service(latest_ready: &str, declared: Vec<TrafficTarget>, observed: Vec<TrafficTarget>) -> Service {
    let mut service = Service::new("hello", RevisionTemplateSpec::default());
    service.spec.traffic = Some(declared);
    service.status = Some(ServiceStatus {
        latest_ready_revision_name: Some(latest_ready.to_string()),
        traffic: Some(observed),
        ..Default::default()
    });
    service
}

fn targets(resolved: &[ResolvedTarget]) -> Vec<TrafficTarget> {
    resolved.iter().map(|r| r.target.clone()).collect()
}

#[test]
fn test_single_latest_target_kept() {
    let svc = service(
        "hello-rev1",
        vec![TrafficTarget::latest(100)],
        vec![observed_latest("hello-rev1", 100)],
    );

    let resolved = resolve_service_route(&svc).unwrap();

    assert_eq!(targets(&resolved), vec![TrafficTarget::latest(100)]);
    assert_eq!(resolved[0].revision.as_deref(), Some("hello-rev1"));
}

#[test]
fn test_latest_ready_rendered_as_latest() {
    let svc = service(
        "hello-rev3",
        vec![
            TrafficTarget::revision("hello-rev1", 30),
            TrafficTarget::revision("hello-rev2", 30),
            TrafficTarget::revision("hello-rev3", 40),
        ],
        vec![
            observed("hello-rev1", 30),
            observed("hello-rev2", 30),
            observed("hello-rev3", 40),
        ],
    );

    let resolved = resolve_service_route(&svc).unwrap();

    assert_eq!(
        targets(&resolved),
        vec![
            TrafficTarget::revision("hello-rev1", 30),
            TrafficTarget::revision("hello-rev2", 30),
            TrafficTarget::latest(40),
        ]
    );
}

#[test]
fn test_declaration_order_preserved() {
    let svc = service(
        "hello-rev2",
        vec![],
        vec![
            observed("hello-rev1", 2).with_tag("candidate"),
            observed_latest("hello-rev2", 98),
        ],
    );

    let resolved = resolve_service_route(&svc).unwrap();

    assert_eq!(
        targets(&resolved),
        vec![
            TrafficTarget::revision("hello-rev1", 2).with_tag("candidate"),
            TrafficTarget::latest(98),
        ]
    );
}

#[test]
fn test_tag_only_target_retained() {
    let svc = service(
        "hello-rev2",
        vec![],
        vec![
            observed_latest("hello-rev2", 100),
            observed("hello-rev1", 0).with_tag("candidate"),
        ],
    );

    let resolved = resolve_service_route(&svc).unwrap();

    assert_eq!(resolved.len(), 2);
    assert_eq!(
        resolved[1].target,
        TrafficTarget::revision("hello-rev1", 0).with_tag("candidate")
    );
    assert!(resolved[1].is_active());
}

#[test]
fn test_exactly_one_selector_and_sum_preserved() {
    let svc = service(
        "hello-rev3",
        vec![],
        vec![
            observed("hello-rev1", 10),
            observed_latest("hello-rev3", 60),
            observed("hello-rev2", 30).with_tag("blue"),
        ],
    );

    let resolved = resolve_service_route(&svc).unwrap();

    let total: i64 = resolved.iter().map(ResolvedTarget::percent).sum();
    assert_eq!(total, 100);
    for entry in &resolved {
        let target = &entry.target;
        assert_ne!(target.is_latest(), target.revision_name.is_some());
        assert!(target.url.is_none());
    }
}

#[test]
fn test_declared_route_used_without_status() {
    let mut svc = service("unused", vec![TrafficTarget::latest(100)], vec![]);
    svc.status = None;

    let resolved = resolve_service_route(&svc).unwrap();

    assert_eq!(targets(&resolved), vec![TrafficTarget::latest(100)]);
    assert_eq!(resolved[0].revision, None);
}

#[test]
fn test_latest_falls_back_to_template_name() {
    let mut svc = service("unused", vec![TrafficTarget::latest(100)], vec![]);
    svc.status = None;
    svc.spec.template.metadata.name = Some("hello-rev1".to_string());

    let resolved = resolve_service_route(&svc).unwrap();

    assert_eq!(targets(&resolved), vec![TrafficTarget::latest(100)]);
    assert_eq!(resolved[0].revision.as_deref(), Some("hello-rev1"));
}

#[test]
fn test_latest_falls_back_to_latest_created() {
    let mut svc = service("unused", vec![TrafficTarget::latest(100)], vec![]);
    svc.spec.template.metadata.name = Some("hello-rev1".to_string());
    svc.status = Some(ServiceStatus {
        latest_created_revision_name: Some("hello-rev2".to_string()),
        ..Default::default()
    });

    let resolved = resolve_service_route(&svc).unwrap();

    assert_eq!(targets(&resolved), vec![TrafficTarget::latest(100)]);
    assert_eq!(resolved[0].revision.as_deref(), Some("hello-rev2"));
}

#[test]
fn test_empty_route_yields_nothing() {
    let mut svc = service("hello-rev1", vec![], vec![]);
    svc.spec.traffic = None;

    let resolved = resolve_service_route(&svc).unwrap();

    assert!(resolved.is_empty());
    assert_eq!(route_targets(&resolved), None);
}

#[test]
fn test_tag_resolved_through_tag_map() {
    let mut tags = TagMap::default();
    tags.insert("candidate", "hello-rev1");
    let resolver = TrafficResolver::new(Some("hello-rev2")).with_tags(tags);
    let target = TrafficTarget {
        tag: Some("candidate".to_string()),
        percent: Some(0),
        ..Default::default()
    };

    let resolved = resolver.resolve_target("hello", 0, &target).unwrap();

    assert_eq!(resolved.revision.as_deref(), Some("hello-rev1"));
    assert_eq!(
        resolved.target,
        TrafficTarget::revision("hello-rev1", 0).with_tag("candidate")
    );
}

#[test]
fn test_target_without_selector_rejected() {
    let resolver = TrafficResolver::new(Some("hello-rev2"));
    let target = TrafficTarget {
        percent: Some(100),
        ..Default::default()
    };

    let err = resolver.resolve_target("hello", 0, &target).unwrap_err();

    assert!(matches!(err, ExportError::MalformedInput(_)));
}

#[test]
fn test_configuration_selector_follows_latest() {
    let resolver = TrafficResolver::new(Some("hello-rev2"));
    let target = TrafficTarget {
        configuration_name: Some("hello".to_string()),
        percent: Some(100),
        ..Default::default()
    };

    let resolved = resolver.resolve_target("hello", 0, &target).unwrap();

    assert_eq!(resolved.target, TrafficTarget::latest(100));
    assert_eq!(resolved.revision.as_deref(), Some("hello-rev2"));
}

#[test]
fn test_tag_map_ignores_untagged() {
    let tags = TagMap::from_targets(&[
        observed("hello-rev1", 50),
        observed("hello-rev2", 50).with_tag("current"),
    ]);

    assert_eq!(tags.get("current"), Some("hello-rev2"));
    assert_eq!(tags, {
        let mut expected = TagMap::default();
        expected.insert("current", "hello-rev2");
        expected
    });
}
