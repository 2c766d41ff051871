use crate::error::DocumentError;
use serde::{Deserialize, Serialize};

/// Catalog identifier of a book. Stable across runs.
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub author: String,
    /// ISO-639-1 codes as reported by the catalog, primary language first.
    pub languages: Vec<String>,
    /// Path of the stored text relative to the data directory, e.g. texts/book_84.txt
    pub content_ref: String,
    pub word_count: u64,
    pub cover_url: Option<String>,
    /// RFC 3339
    pub created_at: String,
}

impl Document {
    pub fn language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }
}

/// Read side of the corpus as seen by the indexer.
pub trait DocumentSource: Sync {
    /// Every document visible right now. Called once per run.
    fn snapshot(&self) -> anyhow::Result<Vec<Document>>;

    /// Full text behind `doc.content_ref`.
    fn content(&self, doc: &Document) -> Result<String, DocumentError>;
}
