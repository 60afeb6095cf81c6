//! CLI entry-point printing the top-ranked drug/condition pairs.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{instrument, warn};

use crate::{config::Settings, data, scoring::AggregateRow};

/// Args for the `top` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Number of rows to print.
    #[arg(long, short, default_value_t = 10)]
    pub n: usize,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let rows: Vec<AggregateRow> = data::read_csv_table(&settings.aggregates_path())?;
    if rows.is_empty() {
        warn!("no aggregate rows; run score first");
        return Ok(());
    }
    println!(
        "{:<4} {:<30} {:<30} {:>8} {:>8} {:>8} {:>7}",
        "rank", "drug", "condition", "dei", "rating", "sent", "reviews"
    );
    for (rank, row) in rows.iter().take(args.n).enumerate() {
        println!(
            "{:<4} {:<30} {:<30} {:>8.3} {:>8.2} {:>8.3} {:>7}",
            rank + 1,
            row.drug_name,
            row.condition,
            row.avg_dei,
            row.avg_rating,
            row.avg_sentiment,
            row.review_count
        );
    }
    Ok(())
}
