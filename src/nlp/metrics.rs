//! Held-out classification diagnostics reported after training.

use serde::{Deserialize, Serialize};

use crate::nlp::sentiment::Sentiment;

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub class: Option<Sentiment>,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub evaluated: usize,
}

impl ClassificationReport {
    /// Score `predicted` against `truth` for each of `classes`. Undefined ratios are 0.
    pub fn compute(truth: &[Sentiment], predicted: &[Sentiment], classes: &[Sentiment]) -> Self {
        let evaluated = truth.len().min(predicted.len());
        let pairs = || truth.iter().zip(predicted.iter());

        let per_class: Vec<ClassScores> = classes
            .iter()
            .map(|&class| {
                let tp = pairs().filter(|(t, p)| **t == class && **p == class).count();
                let predicted_pos = pairs().filter(|(_, p)| **p == class).count();
                let support = pairs().filter(|(t, _)| **t == class).count();
                let precision = ratio(tp, predicted_pos);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassScores {
                    class: Some(class),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let correct = pairs().filter(|(t, p)| t == p).count();
        let macro_f1 = if per_class.is_empty() {
            0.0
        } else {
            per_class.iter().map(|c| c.f1).sum::<f64>() / per_class.len() as f64
        };

        Self {
            classes: per_class,
            accuracy: ratio(correct, evaluated),
            macro_f1,
            evaluated,
        }
    }

    pub fn scores_for(&self, class: Sentiment) -> Option<&ClassScores> {
        self.classes.iter().find(|c| c.class == Some(class))
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
