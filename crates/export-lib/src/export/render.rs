//! Manifest encoding

use serde::Serialize;

use super::{ExportedManifest, ManifestFormat};
use crate::error::{ExportError, Result};

/// Boundary between documents in a YAML stream
pub const DOCUMENT_SEPARATOR: &str = "---\n";

impl ExportedManifest {
    /// Number of top-level documents this manifest renders to
    pub fn document_count(&self) -> usize {
        match self {
            ExportedManifest::ServiceWithRevisions { .. } => 2,
            _ => 1,
        }
    }

    /// Encode the manifest
    ///
    /// JSON output is pretty-printed. The service-with-revisions shape is
    /// written as two YAML documents and cannot be written as JSON.
    pub fn render(&self, format: ManifestFormat) -> Result<String> {
        match (self, format) {
            (ExportedManifest::Service(service), ManifestFormat::Json) => to_json(service),
            (ExportedManifest::Service(service), ManifestFormat::Yaml) => to_yaml(service),
            (ExportedManifest::ServiceList(list), ManifestFormat::Json) => to_json(list),
            (ExportedManifest::ServiceList(list), ManifestFormat::Yaml) => to_yaml(list),
            (ExportedManifest::ServiceWithRevisions { .. }, ManifestFormat::Json) => {
                Err(ExportError::UnsupportedCombination(
                    "a service with its revision list needs two documents; use yaml".to_string(),
                ))
            }
            (ExportedManifest::ServiceWithRevisions { service, revisions }, ManifestFormat::Yaml) => {
                Ok(format!(
                    "{}{}{}",
                    to_yaml(service)?,
                    DOCUMENT_SEPARATOR,
                    to_yaml(revisions)?
                ))
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}
