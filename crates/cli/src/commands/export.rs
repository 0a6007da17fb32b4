//! `service export` command

use anyhow::{Context, Result};
use export_lib::{export_to_string, ExportOptions};

use crate::client::LiveStateSource;

/// Fetch the live state of `name`, export it, and return the rendered manifest
///
/// Options are validated before anything is fetched.
pub async fn export_service(
    source: &dyn LiveStateSource,
    name: &str,
    options: &ExportOptions,
) -> Result<String> {
    options.validate()?;

    let service = source.fetch_service(name).await?;
    let revisions = source.fetch_revisions(name).await?;
    tracing::debug!(
        service = %name,
        revisions = revisions.len(),
        with_revisions = options.with_revisions,
        mode = %options.mode,
        format = %options.format,
        "Exporting service"
    );

    export_to_string(&service, &revisions, options)
        .with_context(|| format!("Failed to export service '{}'", name))
}
