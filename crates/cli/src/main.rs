//! Knative Service Export CLI
//!
//! Exports a deployed Knative service, optionally with its revision
//! history, as a portable manifest that can be re-applied elsewhere.

mod client;
mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use export_lib::ExportOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::export;
use output::{ModeArg, OutputFormat};

/// Knative Service Export CLI
#[derive(Parser)]
#[command(name = "kse")]
#[command(author, version, about = "Export Knative services as portable manifests", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (inferred if not specified)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace of the service (defaults to the kubeconfig context's)
    #[arg(long, short, global = true)]
    pub namespace: Option<String>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage Knative services
    #[command(subcommand)]
    Service(ServiceCommands),
}

#[derive(Subcommand)]
pub enum ServiceCommands {
    /// Export a service as a manifest
    Export {
        /// Service name
        name: String,

        /// Include the service's revision history
        #[arg(long)]
        with_revisions: bool,

        /// How revisions are exported (with --with-revisions)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Output format
        #[arg(long, short, value_enum)]
        output: Option<OutputFormat>,

        /// Read live state from a kubectl dump instead of the cluster
        #[arg(long)]
        from_file: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let namespace = cli.namespace.or_else(|| config.namespace.clone());
    let kubeconfig = config::kubeconfig_path(cli.kubeconfig.as_deref(), &config);

    match cli.command {
        Commands::Service(ServiceCommands::Export {
            name,
            with_revisions,
            mode,
            output,
            from_file,
        }) => {
            let options = ExportOptions {
                with_revisions,
                mode: mode.or(config.mode).unwrap_or_default().into(),
                format: output.or(config.output).unwrap_or_default().into(),
            };
            options.validate().with_context(|| {
                format!(
                    "--mode {} cannot be combined with -o {}",
                    options.mode, options.format
                )
            })?;

            let source = client::create_source(
                from_file.as_deref(),
                kubeconfig.as_deref(),
                namespace.as_deref(),
            )
            .await?;
            let manifest = export::export_service(source.as_ref(), &name, &options).await?;
            output::print_manifest(&manifest)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
