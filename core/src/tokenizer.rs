use crate::config::TokenizerConfig;
use crate::stopwords;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Letter runs, optionally glued by a single apostrophe or hyphen. Anything
    // else separates words, so dropping it can never merge two words.
    static ref WORD_RE: Regex =
        Regex::new(r"(?u)[\p{L}\p{M}]+(?:['’\-][\p{L}\p{M}]+)*").expect("valid regex");
    // Same shape after folding: marks ride on a preceding letter, joiners sit
    // between letters.
    static ref TERM_RE: Regex =
        Regex::new(r"(?u)^\p{L}[\p{L}\p{M}]*(?:['\-]\p{L}[\p{L}\p{M}]*)*$").expect("valid regex");
    static ref COUNT_RE: Regex = Regex::new(r"(?u)\w+").expect("valid regex");
}

/// Normalizes raw text into index terms.
///
/// Pipeline per candidate word: NFKC, apostrophe folding, lowercase, then the
/// stopword, length and alphabetic filters, then optional stemming.
pub struct Tokenizer {
    config: TokenizerConfig,
    stopwords: HashMap<String, HashSet<String>>,
    stemmers: HashMap<String, Stemmer>,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let mut lists: HashMap<String, HashSet<String>> = HashMap::new();
        for lang in stopwords::languages() {
            let words = stopwords::builtin(lang).into_iter().flatten().map(|w| w.to_string());
            lists.insert(lang.to_string(), words.collect());
        }
        lists.entry(language_key(&config.default_language)).or_default();
        for set in lists.values_mut() {
            set.extend(config.extra_stopwords.iter().map(|w| w.to_lowercase()));
        }

        let mut stemmers = HashMap::new();
        if config.stem {
            for lang in lists.keys() {
                if let Some(alg) = stemmer_algorithm(lang) {
                    stemmers.insert(lang.clone(), Stemmer::create(alg));
                }
            }
        }

        Self { config, stopwords: lists, stemmers }
    }

    /// Replace the stopword list of one language. Configured extra stopwords are kept.
    pub fn set_stopwords<I, S>(&mut self, language: &str, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: HashSet<String> = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        set.extend(self.config.extra_stopwords.iter().map(|w| w.to_lowercase()));
        let key = language_key(language);
        if self.config.stem && !self.stemmers.contains_key(&key) {
            if let Some(alg) = stemmer_algorithm(&key) {
                self.stemmers.insert(key.clone(), Stemmer::create(alg));
            }
        }
        self.stopwords.insert(key, set);
    }

    /// Lazily yield the terms of `text`. Each call starts over from the beginning.
    ///
    /// `language` selects the stopword list; an absent or unknown language
    /// falls back to the configured default.
    pub fn tokens<'a>(&'a self, text: &'a str, language: Option<&str>) -> impl Iterator<Item = String> + 'a {
        let lang = self.resolve(language);
        let stopwords = &self.stopwords[lang];
        let stemmer = self.stemmers.get(lang);
        WORD_RE
            .find_iter(text)
            .filter_map(move |m| self.normalize(m.as_str(), stopwords, stemmer))
    }

    /// Words of `text` folded like terms (NFKC, apostrophes, lowercase) but
    /// without any filter. Used to match query fragments inside index terms.
    pub fn fragments(&self, text: &str) -> Vec<String> {
        WORD_RE.find_iter(text).map(|m| fold(m.as_str())).collect()
    }

    fn resolve(&self, language: Option<&str>) -> &str {
        let found = language.and_then(|l| self.stopwords.get_key_value(&language_key(l)));
        match found {
            Some((k, _)) => k.as_str(),
            None => self
                .stopwords
                .get_key_value(&language_key(&self.config.default_language))
                .map(|(k, _)| k.as_str())
                .unwrap_or_default(),
        }
    }

    fn normalize(&self, raw: &str, stopwords: &HashSet<String>, stemmer: Option<&Stemmer>) -> Option<String> {
        let token = fold(raw);
        if stopwords.contains(&token) {
            return None;
        }
        if token.chars().count() < self.config.min_length {
            return None;
        }
        if !is_word(&token) {
            return None;
        }
        match stemmer {
            Some(s) => Some(s.stem(&token).into_owned()),
            None => Some(token),
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

fn fold(raw: &str) -> String {
    raw.nfkc().map(|c| if c == '’' { '\'' } else { c }).collect::<String>().to_lowercase()
}

/// Number of `\w+` runs, the acquirer's notion of book length.
pub fn word_count(text: &str) -> usize {
    COUNT_RE.find_iter(text).count()
}

/// Letters and the combining marks attached to them, plus a joiner sitting
/// between two letters.
fn is_word(token: &str) -> bool {
    TERM_RE.is_match(token)
}

// "en-US", "EN" and "en_GB" all select the "en" list.
fn language_key(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
        .trim()
        .to_ascii_lowercase()
}

fn stemmer_algorithm(language: &str) -> Option<Algorithm> {
    let alg = match language {
        "en" => Algorithm::English,
        "fr" => Algorithm::French,
        "es" => Algorithm::Spanish,
        "de" => Algorithm::German,
        "it" => Algorithm::Italian,
        "pt" => Algorithm::Portuguese,
        "nl" => Algorithm::Dutch,
        "sv" => Algorithm::Swedish,
        "da" => Algorithm::Danish,
        "fi" => Algorithm::Finnish,
        "no" => Algorithm::Norwegian,
        "ru" => Algorithm::Russian,
        _ => return None,
    };
    Some(alg)
}
