//! CLI entry-point for ingesting raw reviews.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{config::Settings, data};

/// Args for the `load` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Raw review CSV (drugName, condition, review, rating, date).
    #[arg(long, default_value = "data/raw/reviews.csv")]
    pub input: PathBuf,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    data::reviews::load(&settings, &args.input).await?;
    Ok(())
}
