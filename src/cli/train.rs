//! CLI entry-point for sentiment model training.

use anyhow::Result;
use chrono::Utc;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, nlp};

/// Args for the `train` sub-command; unset values fall back to configuration.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct Args {
    /// Random seed for the train/held-out split.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Maximum vocabulary size.
    #[arg(long)]
    pub max_features: Option<usize>,
    /// Held-out fraction in [0, 1).
    #[arg(long)]
    pub test_fraction: Option<f64>,
}

impl Args {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(seed) = self.seed {
            settings.training.seed = seed;
        }
        if let Some(max_features) = self.max_features {
            settings.training.max_features = max_features;
        }
        if let Some(test_fraction) = self.test_fraction {
            settings.training.test_fraction = test_fraction;
        }
    }
}

#[instrument(skip(settings))]
pub async fn run(args: Args, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);
    let started = Utc::now();
    let model = nlp::train_model(&settings).await?;
    info!(
        started = %started.to_rfc3339(),
        elapsed_ms = (Utc::now() - started).num_milliseconds(),
        macro_f1 = model.report.macro_f1,
        "training finished"
    );
    Ok(())
}
