//! Review ingestion and the loaded/cleaned review tables.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::prelude::{DataFrame, NamedFrom, ParquetReader, ParquetWriter, SerReader, Series};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{config::Settings, data::publish, error::PipelineError, nlp::TextNormalizer};

/// Upper end of the rating scale.
pub const RATING_SCALE: f64 = 10.0;

/// One patient review as ingested. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    /// Position among the valid rows of the input table.
    pub id: u64,
    pub drug_name: String,
    pub condition: String,
    pub rating: f64,
    pub date: String,
    pub text: Option<String>,
}

/// A review together with its normalised text.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedReview {
    pub review: Review,
    pub clean_text: String,
}

impl CleanedReview {
    pub fn new(review: Review, normalizer: &TextNormalizer) -> Self {
        let clean_text = normalizer.normalize(review.text.as_deref());
        Self { review, clean_text }
    }
}

#[derive(Debug, Deserialize)]
struct RawReviewRow {
    #[serde(rename = "drugName")]
    drug_name: Option<String>,
    condition: Option<String>,
    review: Option<String>,
    rating: Option<String>,
    date: Option<String>,
}

/// Outcome of ingesting a raw review table.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub reviews: Vec<Review>,
    pub skipped: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawReviewRow {
    fn validate(self, line: u64, id: u64) -> Result<Review, PipelineError> {
        let malformed = |reason: &str| PipelineError::MalformedRow {
            row: line,
            reason: reason.to_string(),
        };
        let drug_name = non_blank(self.drug_name).ok_or_else(|| malformed("missing drugName"))?;
        let condition = non_blank(self.condition).ok_or_else(|| malformed("missing condition"))?;
        let raw_rating = non_blank(self.rating).ok_or_else(|| malformed("missing rating"))?;
        let rating: f64 = raw_rating
            .parse()
            .map_err(|_| malformed(&format!("non-numeric rating {raw_rating:?}")))?;
        if !(0.0..=RATING_SCALE).contains(&rating) {
            return Err(malformed(&format!("rating {rating} outside 0-10")));
        }
        Ok(Review {
            id,
            drug_name,
            condition,
            rating,
            date: self.date.unwrap_or_default().trim().to_string(),
            text: self.review.filter(|r| !r.trim().is_empty()),
        })
    }
}

/// Parse a raw review CSV, skipping and counting rows that cannot be used.
pub fn read_raw_csv(path: &Path) -> Result<LoadReport> {
    PipelineError::require("input review table", path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut report = LoadReport::default();
    for (offset, result) in reader.deserialize::<RawReviewRow>().enumerate() {
        // header occupies line 1
        let line = offset as u64 + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                let err = PipelineError::MalformedRow {
                    row: line,
                    reason: err.to_string(),
                };
                debug!(%err, "skipping row");
                report.skipped += 1;
                continue;
            }
        };
        match row.validate(line, report.reviews.len() as u64) {
            Ok(review) => report.reviews.push(review),
            Err(err) => {
                debug!(%err, "skipping row");
                report.skipped += 1;
            }
        }
    }
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "skipped malformed review rows");
    }
    Ok(report)
}

fn review_columns(reviews: &[&Review]) -> Vec<Series> {
    vec![
        Series::new(
            "review_id".into(),
            reviews.iter().map(|r| r.id).collect::<Vec<_>>(),
        ),
        Series::new(
            "drugName".into(),
            reviews
                .iter()
                .map(|r| r.drug_name.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "condition".into(),
            reviews
                .iter()
                .map(|r| r.condition.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "rating".into(),
            reviews.iter().map(|r| r.rating).collect::<Vec<_>>(),
        ),
        Series::new(
            "date".into(),
            reviews.iter().map(|r| r.date.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "review".into(),
            reviews.iter().map(|r| r.text.clone()).collect::<Vec<_>>(),
        ),
    ]
}

fn write_parquet(path: &Path, columns: Vec<Series>) -> Result<usize> {
    let mut df = DataFrame::new(columns)?;
    publish(path, |writer| {
        ParquetWriter::new(writer).finish(&mut df)?;
        Ok(())
    })?;
    Ok(df.height())
}

pub fn write_loaded(path: &Path, reviews: &[Review]) -> Result<()> {
    let refs: Vec<&Review> = reviews.iter().collect();
    let rows = write_parquet(path, review_columns(&refs))?;
    info!(path = %path.display(), rows, "wrote loaded reviews");
    Ok(())
}

pub fn write_cleaned(path: &Path, cleaned: &[CleanedReview]) -> Result<()> {
    let refs: Vec<&Review> = cleaned.iter().map(|c| &c.review).collect();
    let mut columns = review_columns(&refs);
    columns.push(Series::new(
        "clean_review".into(),
        cleaned
            .iter()
            .map(|c| c.clean_text.clone())
            .collect::<Vec<_>>(),
    ));
    let rows = write_parquet(path, columns)?;
    info!(path = %path.display(), rows, "wrote cleaned reviews");
    Ok(())
}

fn read_parquet(what: &'static str, path: &Path) -> Result<DataFrame> {
    PipelineError::require(what, path)?;
    let df = ParquetReader::new(File::open(path)?)
        .finish()
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(df)
}

/// Rows read back from a review table. `skipped` counts rows dropped for a null
/// required column.
#[derive(Debug, Clone, Default)]
pub struct TableRows<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

/// Rows with every required column present, paired with their frame position.
fn frame_reviews(df: &DataFrame) -> Result<TableRows<(usize, Review)>> {
    let id_col = df.column("review_id")?.u64()?;
    let drug_col = df.column("drugName")?.str()?;
    let condition_col = df.column("condition")?.str()?;
    let rating_col = df.column("rating")?.f64()?;
    let date_col = df.column("date")?.str()?;
    let text_col = df.column("review")?.str()?;
    let mut table = TableRows {
        rows: Vec::with_capacity(df.height()),
        skipped: 0,
    };
    for idx in 0..df.height() {
        let (Some(id), Some(drug), Some(condition), Some(rating)) = (
            id_col.get(idx),
            drug_col.get(idx),
            condition_col.get(idx),
            rating_col.get(idx),
        ) else {
            let err = PipelineError::MalformedRow {
                row: idx as u64,
                reason: "null required column".to_string(),
            };
            debug!(%err, "skipping row");
            table.skipped += 1;
            continue;
        };
        table.rows.push((
            idx,
            Review {
                id,
                drug_name: drug.to_string(),
                condition: condition.to_string(),
                rating,
                date: date_col.get(idx).unwrap_or_default().to_string(),
                text: text_col.get(idx).map(str::to_string),
            },
        ));
    }
    if table.skipped > 0 {
        warn!(skipped = table.skipped, "skipped incomplete table rows");
    }
    Ok(table)
}

pub fn read_loaded(path: &Path) -> Result<TableRows<Review>> {
    let df = read_parquet("loaded review table", path)?;
    let table = frame_reviews(&df)?;
    Ok(TableRows {
        rows: table.rows.into_iter().map(|(_, review)| review).collect(),
        skipped: table.skipped,
    })
}

pub fn read_cleaned(path: &Path) -> Result<TableRows<CleanedReview>> {
    let df = read_parquet("cleaned review table", path)?;
    let clean_col = df.column("clean_review")?.str()?;
    let table = frame_reviews(&df)?;
    Ok(TableRows {
        rows: table
            .rows
            .into_iter()
            .map(|(idx, review)| CleanedReview {
                review,
                clean_text: clean_col.get(idx).unwrap_or_default().to_string(),
            })
            .collect(),
        skipped: table.skipped,
    })
}

/// Ingest the raw CSV into the loaded-review table.
pub async fn load(settings: &Settings, input: &Path) -> Result<LoadReport> {
    let report = read_raw_csv(input)?;
    write_loaded(&settings.loaded_reviews_path(), &report.reviews)?;
    info!(
        input = %input.display(),
        rows = report.reviews.len(),
        skipped = report.skipped,
        "loaded reviews"
    );
    Ok(report)
}

/// Normalise every loaded review in parallel into the cleaned-review table.
pub async fn clean(settings: &Settings, normalizer: &TextNormalizer) -> Result<Vec<CleanedReview>> {
    let loaded = read_loaded(&settings.loaded_reviews_path())?;
    let cleaned: Vec<CleanedReview> = loaded
        .rows
        .into_par_iter()
        .map(|review| CleanedReview::new(review, normalizer))
        .collect();
    let empty = cleaned.iter().filter(|c| c.clean_text.is_empty()).count();
    write_cleaned(&settings.cleaned_reviews_path(), &cleaned)?;
    info!(
        rows = cleaned.len(),
        empty,
        skipped = loaded.skipped,
        "cleaned reviews"
    );
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_csv(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("reviews.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "uniqueID,drugName,condition,review,rating,date,usefulCount\n\
             1,DrugA,Pain,\"great, no side effects\",9,\"May 20, 2012\",27\n\
             2,DrugA,Pain,terrible nausea,two,\"May 21, 2012\",3\n\
             3,,Pain,missing drug,5,\"May 22, 2012\",1\n\
             4,DrugB,Acne,out of range,11,\"May 23, 2012\",0\n\
             5,DrugB,Acne,,4,\"May 24, 2012\",0\n",
        );
        let report = read_raw_csv(&path).unwrap();
        assert_eq!(report.skipped, 3);
        assert_eq!(report.reviews.len(), 2);
        assert_eq!(report.reviews[0].drug_name, "DrugA");
        assert_eq!(report.reviews[0].date, "May 20, 2012");
        assert_eq!(report.reviews[1].id, 1);
        assert_eq!(report.reviews[1].text, None);
    }

    #[test]
    fn missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_raw_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingResource { .. })
        ));
    }

    #[test]
    fn cleaned_table_round_trips_through_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.parquet");
        let normalizer = TextNormalizer::default();
        let cleaned = vec![
            CleanedReview::new(
                Review {
                    id: 0,
                    drug_name: "DrugA".into(),
                    condition: "Pain".into(),
                    rating: 9.0,
                    date: "May 20, 2012".into(),
                    text: Some("Great, no side effects".into()),
                },
                &normalizer,
            ),
            CleanedReview::new(
                Review {
                    id: 1,
                    drug_name: "DrugB".into(),
                    condition: "Acne".into(),
                    rating: 2.0,
                    date: String::new(),
                    text: None,
                },
                &normalizer,
            ),
        ];
        write_cleaned(&path, &cleaned).unwrap();
        let read = read_cleaned(&path).unwrap();
        assert_eq!(read.skipped, 0);
        let read = read.rows;
        assert_eq!(read, cleaned);
        assert_eq!(read[0].clean_text, "great side effects");
    }

    #[test]
    fn rows_with_null_required_columns_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loaded.parquet");
        let columns = vec![
            Series::new("review_id".into(), vec![0u64, 1, 2]),
            Series::new("drugName".into(), vec![Some("DrugA"), None, Some("DrugB")]),
            Series::new("condition".into(), vec![Some("Pain"), Some("Pain"), None]),
            Series::new("rating".into(), vec![9.0, 2.0, 5.0]),
            Series::new("date".into(), vec!["", "", ""]),
            Series::new("review".into(), vec![Some("fine"), None, None::<&str>]),
        ];
        write_parquet(&path, columns).unwrap();
        let table = read_loaded(&path).unwrap();
        assert_eq!(table.skipped, 2);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].drug_name, "DrugA");
    }
}
