//! Text normalisation and sentiment modelling layer.

pub mod metrics;
pub mod normalize;
pub mod sentiment;
pub mod vocabulary;

use anyhow::Result;
use tracing::info;

use crate::{config::Settings, data::reviews};

pub use normalize::{StopWords, TextNormalizer};
pub use sentiment::{LabeledExample, Sentiment, SentimentModel};
pub use vocabulary::{SparseVector, Vocabulary};

/// Train on the cleaned-review table and publish the model artifact.
pub async fn train_model(settings: &Settings) -> Result<SentimentModel> {
    let cleaned = reviews::read_cleaned(&settings.cleaned_reviews_path())?;
    let total = cleaned.rows.len();
    let examples: Vec<LabeledExample> = cleaned
        .rows
        .iter()
        .filter(|c| !c.clean_text.is_empty())
        .filter_map(|c| LabeledExample::from_rating(&c.clean_text, c.review.rating))
        .collect();
    info!(
        reviews = total,
        examples = examples.len(),
        skipped = cleaned.skipped,
        "labelled training examples"
    );

    let model = sentiment::train(&examples, &settings.training)?;
    model.save(&settings.model_path())?;
    Ok(model)
}
