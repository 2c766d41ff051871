use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Tokens with fewer characters than this are dropped.
    pub min_length: usize,
    /// Stopword list used when a document declares no language or one we have no list for.
    pub default_language: String,
    /// Stem surviving tokens with the Snowball stemmer of the document's language.
    pub stem: bool,
    /// Added to the stopword set of every language.
    pub extra_stopwords: Vec<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_length: 4,
            default_language: "en".to_string(),
            stem: false,
            extra_stopwords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Pairs scoring at or below this are not stored.
    pub threshold: f64,
    /// Neighbours shown per book.
    pub limit: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self { threshold: 0.05, limit: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub tokenizer: TokenizerConfig,
    /// Target chunk size in bytes for counting large documents.
    pub chunk_size: usize,
    /// Number of term records per storage batch.
    pub write_batch: usize,
    /// Per-document counts below this are not posted.
    pub min_term_count: u32,
    /// Worker threads; `None` uses one per CPU.
    pub threads: Option<usize>,
    pub similarity: SimilarityConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerConfig::default(),
            chunk_size: 1 << 20,
            write_batch: 5_000,
            min_term_count: 1,
            threads: None,
            similarity: SimilarityConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let cfg: IndexerConfig = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }
}
