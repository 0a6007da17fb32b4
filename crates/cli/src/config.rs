//! Configuration management for the CLI
//!
//! Settings are layered: `~/.config/kse/config.{json,yaml,toml}`, then
//! `KSE_*` environment variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::output::{ModeArg, OutputFormat};

const CONFIG_EXTENSIONS: &[&str] = &["json", "yaml", "toml"];

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    /// Default namespace
    pub namespace: Option<String>,
    /// Default output format
    pub output: Option<OutputFormat>,
    /// Default export mode for `--with-revisions`
    pub mode: Option<ModeArg>,
    /// Path to kubeconfig file
    pub kubeconfig: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default directory and environment
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_dir()?)
    }

    /// Load configuration from `dir` and environment
    ///
    /// A missing config file is not an error.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = config::Config::builder();
        for extension in CONFIG_EXTENSIONS {
            let path = dir.join(format!("config.{}", extension));
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(config::Environment::with_prefix("KSE"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration directory
    fn config_dir() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("kse"))
    }
}

/// Pick the kubeconfig to use, if any was given explicitly
///
/// `None` lets the client infer it from `KUBECONFIG`, `~/.kube/config` or the
/// in-cluster service account.
pub fn kubeconfig_path(override_path: Option<&Path>, config: &Config) -> Option<PathBuf> {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.kubeconfig.clone())
}
