//! Drug Effectiveness Index composition.

use serde::{Deserialize, Serialize};

use crate::data::reviews::RATING_SCALE;

/// Blend of normalised rating and positive-sentiment probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeiWeights {
    pub rating: f64,
    pub sentiment: f64,
}

impl Default for DeiWeights {
    fn default() -> Self {
        Self {
            rating: 0.6,
            sentiment: 0.4,
        }
    }
}

impl DeiWeights {
    /// `rating_weight * rating / 10 + sentiment_weight * sentiment`. Inputs are not
    /// clamped; ratings must lie in 0-10 and sentiment in 0-1 for a 0-1 result.
    pub fn compose(&self, rating: f64, sentiment: f64) -> f64 {
        self.rating * normalize_rating(rating) + self.sentiment * sentiment
    }
}

pub fn normalize_rating(rating: f64) -> f64 {
    rating / RATING_SCALE
}

/// DEI with the default 0.6/0.4 weights.
pub fn compose(rating: f64, sentiment: f64) -> f64 {
    DeiWeights::default().compose(rating, sentiment)
}
