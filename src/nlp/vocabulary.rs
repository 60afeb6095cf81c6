//! TF-IDF term index over unigrams and bigrams of normalised text.

use std::{
    collections::{hash_map::DefaultHasher, BTreeMap, HashMap, HashSet},
    hash::{Hash, Hasher},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sparse TF-IDF features: strictly increasing column indices with their weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Dot product against a dense weight vector; out-of-range columns contribute nothing.
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .filter_map(|(&idx, &value)| dense.get(idx).map(|w| w * value))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// Fixed term index with smoothed idf weights, shared verbatim by training and inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Term to column index, stored in column order.
    terms: IndexMap<String, usize>,
    idf: Vec<f64>,
    /// Corpus size the idf weights were computed from.
    documents: usize,
}

impl Vocabulary {
    /// Count document frequency of every unigram and bigram, keep the `max_features`
    /// most frequent terms and weight them with `ln((1 + D) / (1 + df)) + 1`.
    pub fn build<S: AsRef<str>>(corpus: &[S], max_features: usize) -> Self {
        let mut total_counts: HashMap<String, u64> = HashMap::new();
        let mut doc_freq: HashMap<String, u64> = HashMap::new();

        for doc in corpus {
            let grams = ngrams(doc.as_ref());
            let mut seen = HashSet::new();
            for gram in grams {
                *total_counts.entry(gram.clone()).or_insert(0) += 1;
                if seen.insert(gram.clone()) {
                    *doc_freq.entry(gram).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, u64)> = total_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let documents = corpus.len();
        let idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + documents as f64) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let terms = kept
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term, idx))
            .collect();

        let vocab = Self {
            terms,
            idf,
            documents,
        };
        debug!(terms = vocab.len(), documents, "built vocabulary");
        vocab
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get(term).copied()
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Terms in column order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Term counts times idf, L2-normalised. Terms outside the index are ignored.
    pub fn vectorize(&self, doc: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in ngrams(doc) {
            if let Some(idx) = self.index_of(&gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        let norm = weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return SparseVector::default();
        }
        let (indices, values) = weighted.into_iter().map(|(idx, v)| (idx, v / norm)).unzip();
        SparseVector { indices, values }
    }

    /// In-process content hash, logged when an artifact is published or loaded.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.documents.hash(&mut hasher);
        for (term, idx) in &self.terms {
            term.hash(&mut hasher);
            idx.hash(&mut hasher);
        }
        for weight in &self.idf {
            weight.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Structural consistency of a deserialised vocabulary.
    pub fn validate(&self) -> Result<(), String> {
        if self.idf.len() != self.terms.len() {
            return Err(format!(
                "idf has {} weights for {} terms",
                self.idf.len(),
                self.terms.len()
            ));
        }
        if let Some((term, idx)) = self
            .terms
            .iter()
            .enumerate()
            .find_map(|(pos, (term, &idx))| (pos != idx).then_some((term, idx)))
        {
            return Err(format!("term {term:?} has out-of-order index {idx}"));
        }
        Ok(())
    }
}

/// Unigrams followed by bigrams of adjacent tokens.
fn ngrams(doc: &str) -> Vec<String> {
    let tokens: Vec<&str> = doc.split_whitespace().collect();
    let mut grams: Vec<String> = tokens.iter().map(|t| (*t).to_string()).collect();
    grams.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    grams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec!["great relief", "great nausea", "nausea nausea dizzy"]
    }

    #[test]
    fn indexes_unigrams_and_bigrams_in_lexical_order() {
        let vocab = Vocabulary::build(corpus().as_slice(), 100);
        let terms: Vec<&str> = vocab.terms().collect();
        assert_eq!(
            terms,
            vec![
                "dizzy",
                "great",
                "great nausea",
                "great relief",
                "nausea",
                "nausea dizzy",
                "nausea nausea",
                "relief",
            ]
        );
        assert!(vocab.validate().is_ok());
    }

    #[test]
    fn top_k_keeps_most_frequent_terms() {
        let vocab = Vocabulary::build(corpus().as_slice(), 2);
        let terms: Vec<&str> = vocab.terms().collect();
        assert_eq!(terms, vec!["great", "nausea"]);
    }

    #[test]
    fn idf_uses_smoothed_formula() {
        let vocab = Vocabulary::build(corpus().as_slice(), 100);
        let great = vocab.index_of("great").unwrap();
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((vocab.idf()[great] - expected).abs() < 1e-12);
        let dizzy = vocab.index_of("dizzy").unwrap();
        assert!((vocab.idf()[dizzy] - (2.0f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn vectors_are_unit_length_and_ignore_unknown_terms() {
        let vocab = Vocabulary::build(corpus().as_slice(), 100);
        let vector = vocab.vectorize("great relief unheard");
        assert_eq!(vector.len(), 3);
        let norm: f64 = vector.values.iter().map(|v| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(vocab.vectorize("completely unseen words").is_empty());
        assert!(vocab.vectorize("").is_empty());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Vocabulary::build(corpus().as_slice(), 100);
        let b = Vocabulary::build(corpus().as_slice(), 100);
        let c = Vocabulary::build(corpus().as_slice(), 3);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn sparse_dot_skips_out_of_range_columns() {
        let vector = SparseVector {
            indices: vec![0, 5],
            values: vec![2.0, 1.0],
        };
        assert!((vector.dot(&[0.5, 1.0]) - 1.0).abs() < 1e-12);
    }
}
