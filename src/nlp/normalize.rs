//! Review text normalisation into canonical token strings.

use std::{collections::HashSet, path::Path, sync::Arc};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens of this length or shorter are discarded.
const MAX_DROPPED_LEN: usize = 2;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his",
    "himself", "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself",
    "they", "them", "their", "theirs", "themselves", "what", "which", "who", "whom", "this",
    "that", "that'll", "these", "those", "am", "is", "are", "was", "were", "be", "been",
    "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an", "the",
    "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "don't", "should", "should've", "now", "d", "ll", "m", "o", "re",
    "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn", "didn't", "doesn",
    "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn", "isn't", "ma",
    "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+").expect("valid regex"));

/// Closed set of low-information words removed during normalisation.
#[derive(Debug, Clone)]
pub struct StopWords {
    words: Arc<HashSet<String>>,
}

impl StopWords {
    /// The built-in English list.
    pub fn english() -> Self {
        Self::from_words(ENGLISH_STOP_WORDS.iter().copied())
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            words: Arc::new(words),
        }
    }

    /// Read a newline-separated list; blank lines and `#` comments are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading stop words from {}", path.display()))?;
        Ok(Self::from_words(
            raw.lines().filter(|line| !line.trim_start().starts_with('#')),
        ))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Maps raw review text onto the canonical token string shared by training and scoring.
///
/// Cheap to clone; the stop-word set is shared.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    stop_words: StopWords,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(StopWords::english())
    }
}

impl TextNormalizer {
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words }
    }

    /// Build from an optional stop-word file, falling back to the English list.
    pub fn from_config(stopwords_path: Option<&Path>) -> Result<Self> {
        let stop_words = match stopwords_path {
            Some(path) => StopWords::from_file(path)?,
            None => StopWords::english(),
        };
        Ok(Self::new(stop_words))
    }

    /// Lower-case, strip URLs and non `[a-z0-9]` characters, drop stop-words and
    /// short tokens, and rejoin with single spaces. Missing text yields `""`.
    pub fn normalize(&self, text: Option<&str>) -> String {
        let Some(text) = text else {
            return String::new();
        };
        let lower = text.to_lowercase();
        let without_urls = URL_PATTERN.replace_all(&lower, "");
        let ascii: String = without_urls
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        ascii
            .split_whitespace()
            .filter(|token| token.len() > MAX_DROPPED_LEN && !self.stop_words.contains(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
