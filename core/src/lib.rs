//! Core of the shelf book indexer.
//!
//! The acquirer (crawler) fills a [`store::DocumentStore`]; the indexer reads a
//! snapshot of it, counts terms per book and swaps a freshly built inverted
//! index into the [`persist::IndexStore`]. A separate batch job derives
//! book-to-book similarity from the live index.

pub mod config;
pub mod counter;
pub mod document;
pub mod error;
pub mod index;
pub mod persist;
pub mod pipeline;
pub mod similarity;
pub mod stopwords;
pub mod store;
pub mod tokenizer;

pub use config::{IndexerConfig, SimilarityConfig, TokenizerConfig};
pub use counter::TermCounts;
pub use document::{DocId, Document, DocumentSource};
pub use error::DocumentError;
pub use index::{InvertedIndex, Posting, PostingList};
pub use persist::{open_db, DataPaths, IndexManifest, IndexSink, IndexStore};
pub use pipeline::{RunReport, RunStats};
pub use similarity::{Neighbour, SimilarityStore};
pub use store::DocumentStore;
pub use tokenizer::Tokenizer;
