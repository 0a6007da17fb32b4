//! Output formatting utilities

use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use export_lib::{ExportMode, ManifestFormat};
use serde::Deserialize;

/// Manifest encoding selected with `-o`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format (default)
    #[default]
    Yaml,
}

impl From<OutputFormat> for ManifestFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ManifestFormat::Json,
            OutputFormat::Yaml => ManifestFormat::Yaml,
        }
    }
}

/// Revision history representation selected with `--mode`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeArg {
    /// One service definition per routed revision
    #[default]
    Kubernetes,
    /// The service followed by every revision object
    Resources,
}

impl From<ModeArg> for ExportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Kubernetes => ExportMode::Kubernetes,
            ModeArg::Resources => ExportMode::Resources,
        }
    }
}

/// Write a rendered manifest to stdout as-is
pub fn print_manifest(manifest: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(manifest.as_bytes())
        .and_then(|_| stdout.flush())
        .context("Failed to write manifest to stdout")
}

// Status messages go to stderr; stdout carries only the manifest.

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}
