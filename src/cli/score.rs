//! CLI entry-point for DEI scoring and aggregation.

use anyhow::Result;
use tracing::instrument;

use crate::{config::Settings, scoring};

#[instrument(skip(settings))]
pub async fn run(settings: Settings) -> Result<()> {
    scoring::score(&settings).await?;
    Ok(())
}
