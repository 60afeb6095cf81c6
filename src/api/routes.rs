//! HTTP route handlers for Axum.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::types::{DrugReviewsDto, HistogramBin, ScoredRecord},
    scoring::AggregateRow,
};

use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

const HISTOGRAM_BINS: usize = 20;
const DEFAULT_AGGREGATE_LIMIT: usize = 100;
const DEFAULT_REVIEW_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct AggregateQuery {
    pub drug: Option<String>,
    pub condition: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub condition: Option<String>,
    pub limit: Option<usize>,
}

fn internal(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}

fn matches(value: &str, filter: &Option<String>) -> bool {
    filter
        .as_deref()
        .map_or(true, |wanted| value.eq_ignore_ascii_case(wanted))
}

pub async fn list_aggregates(
    state: State<AppState>,
    Query(query): Query<AggregateQuery>,
) -> ApiResult<Vec<AggregateRow>> {
    let rows = state
        .aggregates
        .get_or_load(&state.settings.aggregates_path())
        .map_err(internal)?;
    // table is persisted in ranking order
    let selected: Vec<AggregateRow> = rows
        .iter()
        .filter(|r| matches(&r.drug_name, &query.drug) && matches(&r.condition, &query.condition))
        .take(query.limit.unwrap_or(DEFAULT_AGGREGATE_LIMIT))
        .cloned()
        .collect();
    Ok(Json(selected))
}

pub async fn drug_reviews(
    Path(drug): Path<String>,
    state: State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> ApiResult<DrugReviewsDto> {
    let rows = state
        .reviews
        .get_or_load(&state.settings.scored_reviews_path())
        .map_err(internal)?;
    let filter = Some(drug.clone());
    let selected: Vec<&ScoredRecord> = rows
        .iter()
        .filter(|r| matches(&r.drug_name, &filter) && matches(&r.condition, &query.condition))
        .collect();

    let deis: Vec<f64> = selected.iter().map(|r| r.dei).collect();
    let mean_dei = (!deis.is_empty()).then(|| deis.iter().sum::<f64>() / deis.len() as f64);
    Ok(Json(DrugReviewsDto {
        drug,
        condition: query.condition,
        review_count: selected.len(),
        mean_dei,
        histogram: histogram(&deis, HISTOGRAM_BINS),
        reviews: selected
            .into_iter()
            .take(query.limit.unwrap_or(DEFAULT_REVIEW_LIMIT))
            .cloned()
            .collect(),
    }))
}

/// Equal-width bins over [0, 1]; values outside are clamped into the end bins.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if bins == 0 {
        return Vec::new();
    }
    let width = 1.0 / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: i as f64 * width,
            upper: (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for value in values.iter().filter(|v| v.is_finite()) {
        let idx = ((value * bins as f64).floor().max(0.0) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_places_edges_in_end_bins() {
        let bins = histogram(&[0.0, 0.04, 0.5, 1.0, 1.2], 20);
        assert_eq!(bins.len(), 20);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[10].count, 1);
        assert_eq!(bins[19].count, 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
    }

    #[test]
    fn filters_are_case_insensitive_and_optional() {
        assert!(matches("DrugA", &None));
        assert!(matches("DrugA", &Some("druga".into())));
        assert!(!matches("DrugA", &Some("drugb".into())));
    }
}
