use crate::tokenizer::Tokenizer;
use std::collections::HashMap;

/// Occurrences of each term within one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermCounts {
    counts: HashMap<String, u32>,
}

impl TermCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, term: String) {
        *self.counts.entry(term).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: TermCounts) {
        for (term, n) in other.counts {
            *self.counts.entry(term).or_insert(0) += n;
        }
    }

    /// Drop terms seen fewer than `min` times.
    pub fn retain_at_least(&mut self, min: u32) {
        if min > 1 {
            self.counts.retain(|_, n| *n >= min);
        }
    }

    pub fn get(&self, term: &str) -> u32 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&n| n as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(t, &n)| (t.as_str(), n))
    }
}

impl FromIterator<String> for TermCounts {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut c = TermCounts::new();
        for term in iter {
            c.add(term);
        }
        c
    }
}

impl IntoIterator for TermCounts {
    type Item = (String, u32);
    type IntoIter = std::collections::hash_map::IntoIter<String, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

/// Splits text into pieces of roughly `size` bytes. Every cut is placed on a
/// whitespace character so no word straddles two chunks.
pub struct Chunks<'a> {
    rest: &'a str,
    size: usize,
}

pub fn chunks(text: &str, size: usize) -> Chunks<'_> {
    Chunks { rest: text, size: size.max(1) }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.len() <= self.size {
            return Some(std::mem::take(&mut self.rest));
        }
        let mut cut = self.size;
        while !self.rest.is_char_boundary(cut) {
            cut += 1;
        }
        let cut = self.rest[cut..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| cut + i)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(cut);
        self.rest = tail;
        Some(head)
    }
}

/// Count the terms of one document, chunk by chunk.
pub fn count_terms(tokenizer: &Tokenizer, text: &str, language: Option<&str>, chunk_size: usize) -> TermCounts {
    let mut counts = TermCounts::new();
    for chunk in chunks(text, chunk_size) {
        let partial: TermCounts = tokenizer.tokens(chunk, language).collect();
        counts.merge(partial);
    }
    counts
}
