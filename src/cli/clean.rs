//! CLI entry-point for review text normalisation.

use anyhow::Result;
use tracing::instrument;

use crate::{config::Settings, data, nlp::TextNormalizer};

#[instrument(skip(settings))]
pub async fn run(settings: Settings) -> Result<()> {
    let normalizer = TextNormalizer::from_config(settings.stopwords_path.as_deref())?;
    data::reviews::clean(&settings, &normalizer).await?;
    Ok(())
}
