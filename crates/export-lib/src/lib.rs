//! Service export library for Knative serving
//!
//! This crate turns the live state of a deployed service into a portable,
//! deterministic manifest:
//! - Field normalization of cluster-assigned and volatile fields
//! - Traffic resolution into latest / named revision routing entries
//! - Revision history reconstruction
//! - Manifest assembly and encoding (JSON, YAML document streams)
//!
//! The crate performs no I/O; callers fetch the service and its revisions.

pub mod error;
pub mod export;
pub mod history;
pub mod model;
pub mod normalize;
pub mod traffic;

pub use error::{ExportError, Result};
pub use export::{
    export_service, export_to_string, ExportMode, ExportOptions, ExportedManifest,
    ManifestFormat, ManifestShape,
};
pub use history::RevisionHistory;
pub use model::*;
pub use traffic::{ResolvedTarget, TagMap, TrafficResolver};
