//! Export options and the manifest shapes they select

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// How revision history is represented when exported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// One service definition per routed revision, in a `v1/List`
    #[default]
    Kubernetes,
    /// The service followed by a list of every revision
    Resources,
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportMode::Kubernetes => write!(f, "kubernetes"),
            ExportMode::Resources => write!(f, "resources"),
        }
    }
}

/// Encoding of the rendered manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    Json,
    #[default]
    Yaml,
}

impl ManifestFormat {
    /// Whether several top-level documents can share one stream
    pub fn is_multi_document(&self) -> bool {
        matches!(self, ManifestFormat::Yaml)
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestFormat::Json => write!(f, "json"),
            ManifestFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Shape of an exported manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestShape {
    ServiceOnly,
    ServiceList,
    ServiceWithRevisions,
}

/// What to export and how to encode it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub with_revisions: bool,
    /// Only consulted when `with_revisions` is set
    pub mode: ExportMode,
    pub format: ManifestFormat,
}

impl ExportOptions {
    pub fn service_only(format: ManifestFormat) -> Self {
        Self {
            with_revisions: false,
            mode: ExportMode::default(),
            format,
        }
    }

    pub fn with_revisions(mode: ExportMode, format: ManifestFormat) -> Self {
        Self {
            with_revisions: true,
            mode,
            format,
        }
    }

    pub fn shape(&self) -> ManifestShape {
        match (self.with_revisions, self.mode) {
            (false, _) => ManifestShape::ServiceOnly,
            (true, ExportMode::Kubernetes) => ManifestShape::ServiceList,
            (true, ExportMode::Resources) => ManifestShape::ServiceWithRevisions,
        }
    }

    /// Reject combinations that cannot be rendered
    ///
    /// Resources mode emits two top-level documents, which only a
    /// multi-document format can carry.
    pub fn validate(&self) -> Result<()> {
        if self.shape() == ManifestShape::ServiceWithRevisions && !self.format.is_multi_document() {
            return Err(ExportError::UnsupportedCombination(format!(
                "{} mode emits two documents and cannot be written as {}; use yaml",
                self.mode, self.format
            )));
        }
        Ok(())
    }
}
