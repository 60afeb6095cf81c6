//! Shared DTOs for JSON responses.

use serde::{Deserialize, Serialize};

/// One row of the scored-reviews table as read back from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub review_id: u64,
    #[serde(rename = "drugName")]
    pub drug_name: String,
    pub condition: String,
    pub date: Option<String>,
    pub rating: f64,
    pub review: Option<String>,
    pub clean_review: Option<String>,
    pub rating_norm: f64,
    pub sentiment_score: f64,
    #[serde(rename = "DEI")]
    pub dei: f64,
}

/// Equal-width DEI bucket over [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Drill-down payload for one drug.
#[derive(Debug, Clone, Serialize)]
pub struct DrugReviewsDto {
    pub drug: String,
    pub condition: Option<String>,
    pub review_count: usize,
    pub mean_dei: Option<f64>,
    pub histogram: Vec<HistogramBin>,
    pub reviews: Vec<ScoredRecord>,
}
