use shelf_core::counter::count_terms;
use shelf_core::{Tokenizer, TokenizerConfig};
use std::collections::BTreeMap;

fn words(t: &Tokenizer, text: &str, lang: Option<&str>) -> Vec<String> {
    t.tokens(text, lang).collect()
}

#[test]
fn quick_fox_example() {
    let mut t = Tokenizer::new(TokenizerConfig::default());
    t.set_stopwords("en", ["the", "over"]);
    let counts = count_terms(&t, "The quick fox jumps over the lazy dog.", None, 1 << 20);
    let got: BTreeMap<&str, u32> = counts.iter().collect();
    let want = BTreeMap::from([("jumps", 1), ("lazy", 1), ("quick", 1)]);
    assert_eq!(got, want);
}

#[test]
fn it_normalizes_and_keeps_accents() {
    let t = Tokenizer::default();
    let w = words(&t, "Café ÉCOLE naïve", Some("fr"));
    assert_eq!(w, vec!["café", "école", "naïve"]);
    // Decomposed e + combining acute composes to the same term.
    let w = words(&t, "Cafe\u{301}", Some("fr"));
    assert_eq!(w, vec!["café"]);
    // Compatibility ligature folds to plain letters.
    let w = words(&t, "ﬁnal", None);
    assert_eq!(w, vec!["final"]);
}

#[test]
fn it_filters_stopwords_and_short_tokens() {
    let t = Tokenizer::default();
    let w = words(&t, "The quick brown fox and the lazy dog", None);
    assert_eq!(w, vec!["quick", "brown", "lazy"]);
}

#[test]
fn stopwords_follow_declared_language() {
    let t = Tokenizer::default();
    assert_eq!(words(&t, "toutes these", Some("fr")), vec!["these"]);
    assert_eq!(words(&t, "toutes these", Some("en")), vec!["toutes"]);
    assert_eq!(words(&t, "toutes these", None), vec!["toutes"]);
}

#[test]
fn separators_never_merge_words() {
    let t = Tokenizer::default();
    assert_eq!(words(&t, "ending.Starting", None), vec!["ending", "starting"]);
    assert_eq!(words(&t, "word1234word", None), vec!["word", "word"]);
    assert_eq!(words(&t, "night--watch", None), vec!["night", "watch"]);
    assert!(words(&t, "1234 5678 ####", None).is_empty());
}

#[test]
fn internal_apostrophes_and_hyphens_stay_inside() {
    let t = Tokenizer::default();
    assert_eq!(words(&t, "A well-known o’clock tale", None), vec!["well-known", "o'clock", "tale"]);
}

#[test]
fn lowercase_happens_before_filters() {
    let t = Tokenizer::default();
    // "THERE" is a stopword only once lowercased.
    assert!(words(&t, "THERE", None).is_empty());
}

#[test]
fn min_length_counts_characters_not_bytes() {
    let t = Tokenizer::default();
    assert_eq!(words(&t, "été ôter", Some("es")), vec!["ôter"]);
    let mut cfg = TokenizerConfig::default();
    cfg.min_length = 6;
    let t = Tokenizer::new(cfg);
    assert_eq!(words(&t, "quick brownish", None), vec!["brownish"]);
}

#[test]
fn extra_stopwords_apply_everywhere() {
    let cfg = TokenizerConfig { extra_stopwords: vec!["Gutenberg".into()], ..Default::default() };
    let t = Tokenizer::new(cfg);
    assert!(words(&t, "gutenberg", Some("fr")).is_empty());
    assert!(words(&t, "Gutenberg", None).is_empty());
}

#[test]
fn stemming_is_opt_in() {
    let cfg = TokenizerConfig { stem: true, ..Default::default() };
    let t = Tokenizer::new(cfg);
    assert!(words(&t, "Running runners", None).contains(&"run".to_string()));
    assert_eq!(words(&Tokenizer::default(), "Running", None), vec!["running"]);
}

#[test]
fn tokenization_is_deterministic_and_restartable() {
    let t = Tokenizer::default();
    let text = "It was the best of times, it was the worst of times, it was the age of wisdom.";
    let first = words(&t, text, None);
    let second = words(&t, text, None);
    assert_eq!(first, second);
    assert_eq!(first, vec!["best", "times", "worst", "times", "wisdom"]);
}

#[test]
fn combining_marks_without_precomposed_form_are_kept() {
    let t = Tokenizer::default();
    assert_eq!(words(&t, "ca\u{331}sal", None), vec!["ca\u{331}sal"]);
    assert_eq!(words(&t, "हिन्दी भाषा", Some("hi")), vec!["हिन्दी", "भाषा"]);
}
