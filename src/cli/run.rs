//! CLI entry-point running every pipeline stage in order.

use anyhow::Result;
use tracing::{info, instrument};

use crate::{
    cli::{load, train},
    config::Settings,
    data,
    nlp::{self, TextNormalizer},
    scoring,
};

/// Args for the `run` sub-command.
#[derive(Debug, Clone, clap::Args)]
pub struct Args {
    #[command(flatten)]
    pub load: load::Args,
    #[command(flatten)]
    pub train: train::Args,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, mut settings: Settings) -> Result<()> {
    args.train.apply(&mut settings);
    let normalizer = TextNormalizer::from_config(settings.stopwords_path.as_deref())?;

    let loaded = data::reviews::load(&settings, &args.load.input).await?;
    data::reviews::clean(&settings, &normalizer).await?;
    nlp::train_model(&settings).await?;
    let summary = scoring::score(&settings).await?;

    info!(
        loaded = loaded.reviews.len(),
        malformed = loaded.skipped,
        scored = summary.scored,
        score_skipped = summary.skipped,
        groups = summary.aggregates.len(),
        "pipeline complete"
    );
    Ok(())
}
