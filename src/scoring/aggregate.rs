//! Per (drug, condition) summary statistics over scored reviews.

use std::{cmp::Ordering, collections::HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::scoring::ScoredReview;

/// Reviews per shard when accumulating in parallel.
const SHARD_SIZE: usize = 4096;

/// One row of the aggregate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    #[serde(rename = "drugName")]
    pub drug_name: String,
    pub condition: String,
    pub avg_dei: f64,
    pub avg_rating: f64,
    pub avg_sentiment: f64,
    pub review_count: u64,
}

/// Running sums for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupAccumulator {
    pub dei_sum: f64,
    pub rating_sum: f64,
    pub sentiment_sum: f64,
    pub count: u64,
}

impl GroupAccumulator {
    pub fn push(&mut self, dei: f64, rating: f64, sentiment: f64) {
        self.dei_sum += dei;
        self.rating_sum += rating;
        self.sentiment_sum += sentiment;
        self.count += 1;
    }

    /// Combining sums is the count-weighted mean of the shard means.
    pub fn merge(&mut self, other: &GroupAccumulator) {
        self.dei_sum += other.dei_sum;
        self.rating_sum += other.rating_sum;
        self.sentiment_sum += other.sentiment_sum;
        self.count += other.count;
    }
}

/// Partial aggregate of one shard, keyed by (drug, condition).
#[derive(Debug, Clone, Default)]
pub struct PartialAggregate {
    groups: HashMap<(String, String), GroupAccumulator>,
}

impl PartialAggregate {
    pub fn accumulate(scored: &[ScoredReview]) -> Self {
        let mut partial = Self::default();
        for review in scored {
            partial.push(review);
        }
        partial
    }

    pub fn push(&mut self, review: &ScoredReview) {
        let source = &review.cleaned.review;
        self.groups
            .entry((source.drug_name.clone(), source.condition.clone()))
            .or_default()
            .push(review.dei, source.rating, review.sentiment_score);
    }

    pub fn merge(mut self, other: PartialAggregate) -> Self {
        for (key, acc) in other.groups {
            self.groups.entry(key).or_default().merge(&acc);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Means per group, ordered by `avg_dei` descending then drug and condition ascending.
    pub fn finish(self) -> Vec<AggregateRow> {
        let mut rows: Vec<AggregateRow> = self
            .groups
            .into_iter()
            .map(|((drug_name, condition), acc)| {
                let n = acc.count as f64;
                AggregateRow {
                    drug_name,
                    condition,
                    avg_dei: acc.dei_sum / n,
                    avg_rating: acc.rating_sum / n,
                    avg_sentiment: acc.sentiment_sum / n,
                    review_count: acc.count,
                }
            })
            .collect();
        rows.sort_by(ranking);
        rows
    }
}

fn ranking(a: &AggregateRow, b: &AggregateRow) -> Ordering {
    b.avg_dei
        .total_cmp(&a.avg_dei)
        .then_with(|| a.drug_name.cmp(&b.drug_name))
        .then_with(|| a.condition.cmp(&b.condition))
}

/// Group scored reviews by (drug, condition). Shards are accumulated in parallel and
/// merged at a single reduction point.
pub fn aggregate(scored: &[ScoredReview]) -> Vec<AggregateRow> {
    scored
        .par_chunks(SHARD_SIZE)
        .map(PartialAggregate::accumulate)
        .reduce(PartialAggregate::default, PartialAggregate::merge)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::scored;

    #[test]
    fn groups_and_averages() {
        let rows = aggregate(&[
            scored("DrugA", "Pain", 9.0, 0.9),
            scored("DrugA", "Pain", 3.0, 0.1),
            scored("DrugB", "Acne", 10.0, 1.0),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].drug_name, "DrugB");
        assert_eq!(rows[0].review_count, 1);
        let pain = &rows[1];
        assert_eq!(pain.review_count, 2);
        assert!((pain.avg_rating - 6.0).abs() < 1e-12);
        assert!((pain.avg_sentiment - 0.5).abs() < 1e-12);
        assert!((pain.avg_dei - 0.56).abs() < 1e-12);
    }

    #[test]
    fn ties_order_by_drug_then_condition() {
        let rows = aggregate(&[
            scored("Zeta", "Pain", 5.0, 0.5),
            scored("Alpha", "Pain", 5.0, 0.5),
            scored("Alpha", "Acne", 5.0, 0.5),
        ]);
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.drug_name.as_str(), r.condition.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("Alpha", "Acne"), ("Alpha", "Pain"), ("Zeta", "Pain")]
        );
    }

    #[test]
    fn merged_shards_match_single_pass() {
        let all = vec![
            scored("DrugA", "Pain", 9.0, 0.8),
            scored("DrugA", "Pain", 2.0, 0.2),
            scored("DrugA", "Pain", 7.0, 0.6),
            scored("DrugC", "Flu", 4.0, 0.3),
        ];
        let merged = PartialAggregate::accumulate(&all[..1])
            .merge(PartialAggregate::accumulate(&all[1..]))
            .finish();
        let single = PartialAggregate::accumulate(&all).finish();
        assert_eq!(merged.len(), single.len());
        for (m, s) in merged.iter().zip(&single) {
            assert_eq!(m.review_count, s.review_count);
            assert!((m.avg_dei - s.avg_dei).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_input_has_no_rows() {
        assert!(aggregate(&[]).is_empty());
    }
}
