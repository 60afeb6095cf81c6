//! Rating-derived sentiment labels, logistic regression training and inference.

use std::{collections::BTreeSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use linfa::{dataset::DatasetBase, prelude::Fit};
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    data,
    error::PipelineError,
    nlp::{
        metrics::ClassificationReport,
        normalize::TextNormalizer,
        vocabulary::{SparseVector, Vocabulary},
    },
};

/// Bumped whenever the persisted layout changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Ratings at or above this are positive.
pub const POSITIVE_MIN_RATING: f64 = 7.0;
/// Ratings at or below this are negative.
pub const NEGATIVE_MAX_RATING: f64 = 4.0;

/// Sentiment class derived from a 0-10 rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn from_rating(rating: f64) -> Self {
        if rating >= POSITIVE_MIN_RATING {
            Self::Positive
        } else if rating <= NEGATIVE_MAX_RATING {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// Neutral reviews are excluded from training.
    pub fn is_trainable(self) -> bool {
        !matches!(self, Self::Neutral)
    }
}

/// Normalised review text with its training label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub clean_text: String,
    pub label: Sentiment,
}

impl LabeledExample {
    /// Label a cleaned review from its rating; neutral ratings yield `None`.
    pub fn from_rating(clean_text: &str, rating: f64) -> Option<Self> {
        let label = Sentiment::from_rating(rating);
        label.is_trainable().then(|| Self {
            clean_text: clean_text.to_string(),
            label,
        })
    }
}

/// Vocabulary, split and optimiser parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub max_features: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub max_iterations: u64,
    pub l2_penalty: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_features: 20_000,
            seed: 42,
            test_fraction: 0.2,
            max_iterations: 1000,
            l2_penalty: 1.0,
        }
    }
}

/// Shape of the run that produced an artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub seed: u64,
    pub test_fraction: f64,
    pub l2_penalty: f64,
    pub max_iterations: u64,
    pub train_size: usize,
    pub test_size: usize,
}

/// Published model artifact: the vocabulary together with the weights fitted over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentModel {
    pub format_version: u32,
    pub vocabulary: Vocabulary,
    /// Oriented so that `sigmoid(weights . x + bias)` is P(positive).
    pub weights: Vec<f64>,
    pub bias: f64,
    pub classes: Vec<Sentiment>,
    pub report: ClassificationReport,
    pub training: TrainingSummary,
}

/// Build a vocabulary from the training partition and fit a logistic regression on it.
pub fn train(examples: &[LabeledExample], config: &TrainingConfig) -> Result<SentimentModel> {
    let examples: Vec<&LabeledExample> =
        examples.iter().filter(|e| e.label.is_trainable()).collect();
    let classes: Vec<Sentiment> = examples
        .iter()
        .map(|e| e.label)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if classes.len() < 2 {
        return Err(PipelineError::DegenerateModel(format!(
            "need positive and negative examples, found {classes:?}"
        ))
        .into());
    }

    let (train_idx, test_idx) = stratified_split(&examples, config.test_fraction, config.seed);
    let train_docs: Vec<&str> = train_idx
        .iter()
        .map(|&i| examples[i].clean_text.as_str())
        .collect();
    let vocabulary = Vocabulary::build(train_docs.as_slice(), config.max_features);
    if vocabulary.is_empty() {
        return Err(PipelineError::DegenerateModel(
            "vocabulary is empty after normalisation".to_string(),
        )
        .into());
    }

    let x = design_matrix(&vocabulary, &train_docs)?;
    let y: Array1<Sentiment> = train_idx.iter().map(|&i| examples[i].label).collect();
    let dataset: DatasetBase<_, _> = DatasetBase::new(x, y);
    let fitted = LogisticRegression::default()
        .alpha(config.l2_penalty)
        .max_iterations(config.max_iterations)
        .with_intercept(true)
        .fit(&dataset)
        .context("fitting logistic regression")?;

    let mut weights = fitted.params().to_vec();
    let mut bias = fitted.intercept();
    // linfa's positive class is whichever label it saw first.
    if fitted.labels().pos.class != Sentiment::Positive {
        weights.iter_mut().for_each(|w| *w = -*w);
        bias = -bias;
    }

    let mut model = SentimentModel {
        format_version: MODEL_FORMAT_VERSION,
        vocabulary,
        weights,
        bias,
        classes: classes.clone(),
        report: ClassificationReport::default(),
        training: TrainingSummary {
            seed: config.seed,
            test_fraction: config.test_fraction,
            l2_penalty: config.l2_penalty,
            max_iterations: config.max_iterations,
            train_size: train_idx.len(),
            test_size: test_idx.len(),
        },
    };

    let truth: Vec<Sentiment> = test_idx.iter().map(|&i| examples[i].label).collect();
    let held_out: Vec<Sentiment> = test_idx
        .iter()
        .map(|&i| model.predict_label(&examples[i].clean_text))
        .collect();
    model.report = ClassificationReport::compute(&truth, &held_out, &classes);

    for scores in &model.report.classes {
        info!(
            class = ?scores.class,
            precision = scores.precision,
            recall = scores.recall,
            f1 = scores.f1,
            support = scores.support,
            "held-out classification report"
        );
    }
    info!(
        accuracy = model.report.accuracy,
        train = model.training.train_size,
        test = model.training.test_size,
        vocabulary_size = model.vocabulary.len(),
        "trained sentiment model"
    );
    Ok(model)
}

/// Per-class shuffle with a fixed seed; each class contributes `floor(n * fraction)`
/// examples to the held-out side so both labels always reach training.
fn stratified_split(
    examples: &[&LabeledExample],
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [Sentiment::Negative, Sentiment::Positive] {
        let mut members: Vec<usize> = examples
            .iter()
            .enumerate()
            .filter(|(_, e)| e.label == class)
            .map(|(idx, _)| idx)
            .collect();
        members.shuffle(&mut rng);
        let held_out = ((members.len() as f64 * fraction).floor() as usize)
            .min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..held_out]);
        train.extend_from_slice(&members[held_out..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

fn design_matrix(vocabulary: &Vocabulary, docs: &[&str]) -> Result<Array2<f64>> {
    let mut x = Array2::<f64>::zeros((docs.len(), vocabulary.len()));
    for (row, doc) in docs.iter().enumerate() {
        for (col, value) in vocabulary.vectorize(doc).iter() {
            x[[row, col]] = value;
        }
    }
    Ok(x)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl SentimentModel {
    pub fn has_positive_class(&self) -> bool {
        self.classes.contains(&Sentiment::Positive)
    }

    /// P(positive) for already-normalised text. Models without a positive class
    /// score every input as 0.
    pub fn positive_probability(&self, clean_text: &str) -> f64 {
        if !self.has_positive_class() {
            return 0.0;
        }
        let features = self.vocabulary.vectorize(clean_text);
        self.probability_of(&features)
    }

    /// Normalise raw review text, then score it.
    pub fn predict_positive_probability(&self, normalizer: &TextNormalizer, text: &str) -> f64 {
        self.positive_probability(&normalizer.normalize(Some(text)))
    }

    fn probability_of(&self, features: &SparseVector) -> f64 {
        sigmoid(features.dot(&self.weights) + self.bias)
    }

    fn predict_label(&self, clean_text: &str) -> Sentiment {
        if self.positive_probability(clean_text) >= 0.5 {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }

    /// Publish the artifact atomically over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        data::publish(path, |writer| {
            serde_json::to_writer(writer, self).context("serialising model")
        })?;
        info!(
            path = %path.display(),
            vocabulary_fingerprint = %format!("{:016x}", self.vocabulary.fingerprint()),
            "published sentiment model"
        );
        Ok(())
    }

    /// Load and validate a published artifact. Absence is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        PipelineError::require("model artifact", path)?;
        let file = File::open(path)?;
        let model: Self = serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            PipelineError::UnusableModel {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        model.validate().map_err(|reason| PipelineError::UnusableModel {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(
            path = %path.display(),
            vocabulary_fingerprint = %format!("{:016x}", model.vocabulary.fingerprint()),
            terms = model.vocabulary.len(),
            "loaded sentiment model"
        );
        if !model.has_positive_class() {
            warn!(
                path = %path.display(),
                classes = ?model.classes,
                "model has no positive class; every sentiment score will be 0"
            );
        }
        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {MODEL_FORMAT_VERSION})",
                self.format_version
            ));
        }
        self.vocabulary.validate()?;
        if self.weights.len() != self.vocabulary.len() {
            return Err(format!(
                "{} weights for a vocabulary of {} terms",
                self.weights.len(),
                self.vocabulary.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn examples() -> Vec<LabeledExample> {
        let positive = [
            "great relief works wonders",
            "excellent great results",
            "works great happy",
            "amazing relief highly recommend",
            "happy results excellent",
        ];
        let negative = [
            "terrible nausea headache",
            "awful side effects nausea",
            "worst headache terrible",
            "nausea vomiting awful",
            "terrible dizzy awful",
        ];
        positive
            .iter()
            .map(|t| LabeledExample::from_rating(t, 9.0).unwrap())
            .chain(
                negative
                    .iter()
                    .map(|t| LabeledExample::from_rating(t, 2.0).unwrap()),
            )
            .collect()
    }

    #[test]
    fn rating_thresholds_map_to_labels() {
        assert_eq!(Sentiment::from_rating(10.0), Sentiment::Positive);
        assert_eq!(Sentiment::from_rating(7.0), Sentiment::Positive);
        assert_eq!(Sentiment::from_rating(6.9), Sentiment::Neutral);
        assert_eq!(Sentiment::from_rating(5.0), Sentiment::Neutral);
        assert_eq!(Sentiment::from_rating(4.0), Sentiment::Negative);
        assert_eq!(Sentiment::from_rating(0.0), Sentiment::Negative);
        assert!(LabeledExample::from_rating("meh", 5.0).is_none());
    }

    #[test]
    fn split_is_reproducible_and_keeps_both_classes() {
        let owned = examples();
        let refs: Vec<&LabeledExample> = owned.iter().collect();
        let (train_a, test_a) = stratified_split(&refs, 0.2, 42);
        let (train_b, test_b) = stratified_split(&refs, 0.2, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(train_a.len() + test_a.len(), refs.len());
        assert_eq!(test_a.len(), 2);
        let labels: BTreeSet<_> = train_a.iter().map(|&i| refs[i].label).collect();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn single_class_training_is_rejected() {
        let only_positive: Vec<_> = examples()
            .into_iter()
            .filter(|e| e.label == Sentiment::Positive)
            .collect();
        let err = train(&only_positive, &TrainingConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DegenerateModel(_))
        ));
    }

    #[test]
    fn empty_text_corpus_is_rejected() {
        let blank = vec![
            LabeledExample::from_rating("", 9.0).unwrap(),
            LabeledExample::from_rating("", 1.0).unwrap(),
        ];
        let err = train(&blank, &TrainingConfig::default()).unwrap_err();
        assert!(err.to_string().contains("vocabulary is empty"));
    }

    #[test]
    fn trained_model_separates_training_extremes() {
        let model = train(&examples(), &TrainingConfig::default()).unwrap();
        assert_eq!(model.classes, vec![Sentiment::Negative, Sentiment::Positive]);
        assert_eq!(model.weights.len(), model.vocabulary.len());
        let good = model.positive_probability("great relief excellent");
        let bad = model.positive_probability("terrible nausea awful");
        assert!(good > 0.5, "good = {good}");
        assert!(bad < 0.5, "bad = {bad}");
        assert!((0.0..=1.0).contains(&model.positive_probability("unseen words only")));
    }

    #[test]
    fn negative_first_corpus_still_scores_positive_probability() {
        let mut negative_first = examples();
        negative_first.reverse();
        assert_eq!(negative_first[0].label, Sentiment::Negative);
        let config = TrainingConfig {
            test_fraction: 0.0,
            ..TrainingConfig::default()
        };
        let model = train(&negative_first, &config).unwrap();
        assert_eq!(model.training.test_size, 0);
        let good = model.positive_probability("great relief excellent");
        let bad = model.positive_probability("terrible nausea awful");
        assert!(good > 0.5, "good = {good}");
        assert!(bad < 0.5, "bad = {bad}");
    }

    #[test]
    fn model_without_positive_class_fails_open() {
        let mut model = train(&examples(), &TrainingConfig::default()).unwrap();
        model.classes = vec![Sentiment::Negative];
        assert_eq!(model.positive_probability("great relief excellent"), 0.0);
        let normalizer = TextNormalizer::default();
        assert_eq!(
            model.predict_positive_probability(&normalizer, "Great relief!"),
            0.0
        );
    }

    #[test]
    fn save_then_load_preserves_artifact_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = train(&examples(), &TrainingConfig::default()).unwrap();
        model.save(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        let loaded = SentimentModel::load(&path).unwrap();
        assert_eq!(loaded, model);

        model.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_artifact_is_a_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        let err = SentimentModel::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingResource { .. })
        ));
    }

    #[test]
    fn mismatched_weights_are_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut model = train(&examples(), &TrainingConfig::default()).unwrap();
        model.weights.pop();
        model.save(&path).unwrap();
        let err = SentimentModel::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnusableModel { .. })
        ));
    }
}
