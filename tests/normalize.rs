use dei_explorer::nlp::{StopWords, TextNormalizer};
use proptest::prelude::*;

#[test]
fn review_text_is_canonicalised() {
    let normalizer = TextNormalizer::default();
    assert_eq!(
        normalizer.normalize(Some("Great, no side effects")),
        "great side effects"
    );
    assert_eq!(normalizer.normalize(Some("Terrible nausea")), "terrible nausea");
    assert_eq!(
        normalizer.normalize(Some("It was ok... read http://t.co/xyz LOL")),
        "read lol"
    );
}

#[test]
fn stop_words_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stop.txt");
    std::fs::write(&path, "# custom list\nnausea\n\nawful\n").unwrap();
    let normalizer = TextNormalizer::from_config(Some(&path)).unwrap();
    assert_eq!(
        normalizer.normalize(Some("awful nausea and dizziness")),
        "and dizziness"
    );
    assert_eq!(StopWords::from_file(&path).unwrap().len(), 2);
}

proptest! {
    #[test]
    fn normalize_is_total_and_idempotent(text in any::<String>()) {
        let normalizer = TextNormalizer::default();
        let once = normalizer.normalize(Some(&text));
        let twice = normalizer.normalize(Some(&once));
        prop_assert_eq!(&once, &twice);
        prop_assert!(once
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
        prop_assert!(once.split(' ').filter(|t| !t.is_empty()).all(|t| t.len() > 2));
    }

    #[test]
    fn normalize_handles_review_like_text(text in "[A-Za-z0-9 ,.!?'/:-]{0,120}") {
        let normalizer = TextNormalizer::default();
        let once = normalizer.normalize(Some(&text));
        prop_assert_eq!(normalizer.normalize(Some(&once)), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }
}
