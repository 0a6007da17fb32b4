//! Export assembly
//!
//! Runs the export pipeline over an already fetched service and its
//! revisions: validate, resolve traffic, check references, normalize,
//! reconstruct history, and assemble the requested manifest shape.

mod options;
mod render;


pub use options::{ExportMode, ExportOptions, ManifestFormat, ManifestShape};
pub use render::DOCUMENT_SEPARATOR;

use tracing::debug;

use crate::error::{ExportError, Result};
use crate::history::RevisionHistory;
use crate::model::{List, Revision, Service};
use crate::normalize::{normalize_service, validate_service};
use crate::traffic::{resolve_service_route, route_targets};

/// Result of an export, in one of three shapes
#[derive(Debug, Clone, PartialEq)]
pub enum ExportedManifest {
    /// The service with its current template and route
    Service(Service),
    /// One service definition per routed revision, oldest first
    ServiceList(List<Service>),
    /// The service plus its full revision history, oldest first
    ServiceWithRevisions {
        service: Service,
        revisions: List<Revision>,
    },
}

impl ExportedManifest {
    pub fn shape(&self) -> ManifestShape {
        match self {
            ExportedManifest::Service(_) => ManifestShape::ServiceOnly,
            ExportedManifest::ServiceList(_) => ManifestShape::ServiceList,
            ExportedManifest::ServiceWithRevisions { .. } => ManifestShape::ServiceWithRevisions,
        }
    }
}

/// Export `service` given every revision of its history
///
/// Nothing is produced on error: a route or status entry naming a revision
/// missing from `revisions` fails with [`ExportError::ConsistencyFault`].
pub fn export_service(
    service: &Service,
    revisions: &[Revision],
    options: &ExportOptions,
) -> Result<ExportedManifest> {
    options.validate()?;
    if service.name().is_empty() {
        return Err(ExportError::malformed("service has no name"));
    }
    validate_service(service)?;

    let route = resolve_service_route(service)?;
    let history = RevisionHistory::new(service.name(), revisions)?;
    let current = service.current_revision();
    history.verify_references(&route, current)?;

    let mut canonical = normalize_service(service);
    canonical.spec.traffic = route_targets(&route);

    let manifest = match options.shape() {
        ManifestShape::ServiceOnly => ExportedManifest::Service(canonical),
        ManifestShape::ServiceList => {
            let services = history.replay_services(&canonical, &route, current);
            ExportedManifest::ServiceList(List::new(services))
        }
        ManifestShape::ServiceWithRevisions => ExportedManifest::ServiceWithRevisions {
            service: canonical,
            revisions: history.revision_list(),
        },
    };

    debug!(
        service = %service.name(),
        shape = ?manifest.shape(),
        targets = route.len(),
        revisions = history.len(),
        "Assembled export manifest"
    );

    Ok(manifest)
}

/// Export and encode in one step, using `options.format`
pub fn export_to_string(
    service: &Service,
    revisions: &[Revision],
    options: &ExportOptions,
) -> Result<String> {
    export_service(service, revisions, options)?.render(options.format)
}
