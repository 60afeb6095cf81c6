//! Per-review DEI scoring and the scored/aggregate output tables.

pub mod aggregate;
pub mod dei;

use std::path::Path;

use anyhow::Result;
use polars::prelude::{CsvWriter, DataFrame, NamedFrom, SerWriter, Series};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    config::Settings,
    data::{self, reviews, CleanedReview},
    error::PipelineError,
    nlp::SentimentModel,
};

pub use aggregate::{aggregate, AggregateRow, PartialAggregate};
pub use dei::DeiWeights;

/// A cleaned review with its rating, sentiment and composite scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReview {
    pub cleaned: CleanedReview,
    pub rating_norm: f64,
    pub sentiment_score: f64,
    pub dei: f64,
}

impl ScoredReview {
    pub fn new(cleaned: CleanedReview, sentiment_score: f64, weights: &DeiWeights) -> Self {
        let rating = cleaned.review.rating;
        Self {
            rating_norm: dei::normalize_rating(rating),
            dei: weights.compose(rating, sentiment_score),
            sentiment_score,
            cleaned,
        }
    }
}

/// Score one review. Ratings outside 0-10 are rejected so the row can be skipped
/// rather than written with a meaningless DEI.
pub fn score_review(
    cleaned: CleanedReview,
    model: &SentimentModel,
    weights: &DeiWeights,
) -> Result<ScoredReview, PipelineError> {
    let rating = cleaned.review.rating;
    if !(0.0..=reviews::RATING_SCALE).contains(&rating) {
        return Err(PipelineError::MalformedRow {
            row: cleaned.review.id,
            reason: format!("rating {rating} outside 0-10"),
        });
    }
    let sentiment = model.positive_probability(&cleaned.clean_text);
    debug_assert!((0.0..=1.0).contains(&sentiment));
    Ok(ScoredReview::new(cleaned, sentiment, weights))
}

/// Result of scoring a batch.
#[derive(Debug, Clone, Default)]
pub struct ScoreBatch {
    pub scored: Vec<ScoredReview>,
    pub skipped: usize,
}

/// Score reviews in parallel against a shared read-only model; failed rows are
/// logged and counted, never fatal.
pub fn score_reviews(
    cleaned: Vec<CleanedReview>,
    model: &SentimentModel,
    weights: &DeiWeights,
) -> ScoreBatch {
    let results: Vec<Result<ScoredReview, PipelineError>> = cleaned
        .into_par_iter()
        .map(|review| score_review(review, model, weights))
        .collect();

    let mut batch = ScoreBatch::default();
    for result in results {
        match result {
            Ok(scored) => batch.scored.push(scored),
            Err(err) => {
                warn!(%err, "skipping review");
                batch.skipped += 1;
            }
        }
    }
    batch
}

/// Run summary for the `score` stage.
#[derive(Debug, Clone)]
pub struct ScoreSummary {
    pub scored: usize,
    /// Rows dropped while reading the cleaned table or while scoring.
    pub skipped: usize,
    pub aggregates: Vec<AggregateRow>,
}

/// Score the cleaned-review table with the published model and write both output
/// tables. Missing prerequisites abort before anything is written.
pub async fn score(settings: &Settings) -> Result<ScoreSummary> {
    let cleaned_path = settings.cleaned_reviews_path();
    let model_path = settings.model_path();
    PipelineError::require("cleaned review table", &cleaned_path)?;
    PipelineError::require("model artifact", &model_path)?;

    let model = SentimentModel::load(&model_path)?;
    let cleaned = reviews::read_cleaned(&cleaned_path)?;
    let unreadable = cleaned.skipped;
    let batch = score_reviews(cleaned.rows, &model, &settings.weights);
    let aggregates = aggregate(&batch.scored);

    write_scored(&settings.scored_reviews_path(), &batch.scored)?;
    write_aggregates(&settings.aggregates_path(), &aggregates)?;
    info!(
        scored = batch.scored.len(),
        skipped = batch.skipped,
        unreadable,
        groups = aggregates.len(),
        "scored reviews"
    );
    Ok(ScoreSummary {
        scored: batch.scored.len(),
        skipped: batch.skipped + unreadable,
        aggregates,
    })
}

fn write_csv(path: &Path, mut df: DataFrame) -> Result<()> {
    data::publish(path, |writer| {
        CsvWriter::new(writer).finish(&mut df)?;
        Ok(())
    })?;
    info!(path = %path.display(), rows = df.height(), "wrote table");
    Ok(())
}

pub fn write_scored(path: &Path, scored: &[ScoredReview]) -> Result<()> {
    let df = DataFrame::new(vec![
        Series::new(
            "review_id".into(),
            scored.iter().map(|s| s.cleaned.review.id).collect::<Vec<_>>(),
        ),
        Series::new(
            "drugName".into(),
            scored
                .iter()
                .map(|s| s.cleaned.review.drug_name.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "condition".into(),
            scored
                .iter()
                .map(|s| s.cleaned.review.condition.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "date".into(),
            scored
                .iter()
                .map(|s| s.cleaned.review.date.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "rating".into(),
            scored
                .iter()
                .map(|s| s.cleaned.review.rating)
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "review".into(),
            scored
                .iter()
                .map(|s| s.cleaned.review.text.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "clean_review".into(),
            scored
                .iter()
                .map(|s| s.cleaned.clean_text.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "rating_norm".into(),
            scored.iter().map(|s| s.rating_norm).collect::<Vec<_>>(),
        ),
        Series::new(
            "sentiment_score".into(),
            scored.iter().map(|s| s.sentiment_score).collect::<Vec<_>>(),
        ),
        Series::new(
            "DEI".into(),
            scored.iter().map(|s| s.dei).collect::<Vec<_>>(),
        ),
    ])?;
    write_csv(path, df)
}

pub fn write_aggregates(path: &Path, rows: &[AggregateRow]) -> Result<()> {
    let df = DataFrame::new(vec![
        Series::new(
            "drugName".into(),
            rows.iter().map(|r| r.drug_name.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "condition".into(),
            rows.iter().map(|r| r.condition.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "avg_dei".into(),
            rows.iter().map(|r| r.avg_dei).collect::<Vec<_>>(),
        ),
        Series::new(
            "avg_rating".into(),
            rows.iter().map(|r| r.avg_rating).collect::<Vec<_>>(),
        ),
        Series::new(
            "avg_sentiment".into(),
            rows.iter().map(|r| r.avg_sentiment).collect::<Vec<_>>(),
        ),
        Series::new(
            "review_count".into(),
            rows.iter().map(|r| r.review_count).collect::<Vec<_>>(),
        ),
    ])?;
    write_csv(path, df)
}
