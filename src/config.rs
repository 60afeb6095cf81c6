//! Runtime configuration utilities for dei-explorer.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;

use crate::{nlp::sentiment::TrainingConfig, scoring::dei::DeiWeights};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root folder for loaded and cleaned review tables.
    pub data_dir: PathBuf,
    /// Root folder for scored and aggregated tables.
    pub outputs_dir: PathBuf,
    /// Folder holding the published sentiment model artifact.
    pub models_dir: PathBuf,
    /// Optional newline-separated stop-word list replacing the built-in English set.
    pub stopwords_path: Option<PathBuf>,
    /// Vocabulary, split and optimiser parameters.
    pub training: TrainingConfig,
    /// Blend of rating and sentiment in the DEI.
    pub weights: DeiWeights,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = TrainingConfig::default();
        let training = TrainingConfig {
            max_features: env_or("MAX_FEATURES", defaults.max_features),
            seed: env_or("TRAIN_SEED", defaults.seed),
            test_fraction: env_or("TEST_FRACTION", defaults.test_fraction),
            max_iterations: env_or("MAX_ITERATIONS", defaults.max_iterations),
            l2_penalty: env_or("L2_PENALTY", defaults.l2_penalty),
        };
        let base_weights = DeiWeights::default();
        let weights = DeiWeights {
            rating: env_or("RATING_WEIGHT", base_weights.rating),
            sentiment: env_or("SENTIMENT_WEIGHT", base_weights.sentiment),
        };

        let settings = Self {
            data_dir: env_path("DATA_DIR", "./data"),
            outputs_dir: env_path("OUTPUTS_DIR", "./outputs"),
            models_dir: env_path("MODELS_DIR", "./models"),
            stopwords_path: env::var("STOPWORDS_PATH").ok().map(PathBuf::from),
            training,
            weights,
        };
        settings.ensure_dirs()?;
        Ok(settings)
    }

    /// Default configuration with every folder beneath `root`.
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let settings = Self {
            data_dir: root.join("data"),
            outputs_dir: root.join("outputs"),
            models_dir: root.join("models"),
            stopwords_path: None,
            training: TrainingConfig::default(),
            weights: DeiWeights::default(),
        };
        settings.ensure_dirs()?;
        Ok(settings)
    }

    fn ensure_dirs(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.join_data("processed")).context("creating data dir")?;
        std::fs::create_dir_all(&self.outputs_dir).context("creating outputs dir")?;
        std::fs::create_dir_all(&self.models_dir).context("creating models dir")?;
        Ok(())
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }

    pub fn loaded_reviews_path(&self) -> PathBuf {
        self.join_data("processed/raw_loaded.parquet")
    }

    pub fn cleaned_reviews_path(&self) -> PathBuf {
        self.join_data("processed/cleaned_reviews.parquet")
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join("sentiment_model.json")
    }

    pub fn scored_reviews_path(&self) -> PathBuf {
        self.join_output("metrics_with_dei.csv")
    }

    pub fn aggregates_path(&self) -> PathBuf {
        self.join_output("drug_condition_dei.csv")
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
