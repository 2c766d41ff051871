//! One full indexing run: snapshot the corpus, count terms per document in
//! parallel, merge the partial indexes and swap the result into storage.

use crate::config::IndexerConfig;
use crate::counter::count_terms;
use crate::document::{Document, DocumentSource};
use crate::error::DocumentError;
use crate::index::InvertedIndex;
use crate::persist::{IndexManifest, IndexSink};
use crate::tokenizer::Tokenizer;
use anyhow::{anyhow, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub documents_seen: u64,
    pub documents_indexed: u64,
    pub missing_content: u64,
    pub encoding_errors: u64,
    pub io_errors: u64,
    /// Indexed documents with no surviving term.
    pub empty_documents: u64,
    pub tokens: u64,
}

impl RunStats {
    fn merge(&mut self, other: RunStats) {
        self.documents_seen += other.documents_seen;
        self.documents_indexed += other.documents_indexed;
        self.missing_content += other.missing_content;
        self.encoding_errors += other.encoding_errors;
        self.io_errors += other.io_errors;
        self.empty_documents += other.empty_documents;
        self.tokens += other.tokens;
    }

    pub fn skipped(&self) -> u64 {
        self.missing_content + self.encoding_errors + self.io_errors
    }

    fn record_skip(&mut self, err: &DocumentError) {
        match err {
            DocumentError::ContentMissing { .. } => self.missing_content += 1,
            DocumentError::Encoding { .. } => self.encoding_errors += 1,
            DocumentError::Io { .. } => self.io_errors += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    pub manifest: IndexManifest,
    pub elapsed: Duration,
}

/// Build the inverted index of everything `source` holds right now.
pub fn build_index<S: DocumentSource + ?Sized>(
    source: &S,
    tokenizer: &Tokenizer,
    config: &IndexerConfig,
) -> Result<(InvertedIndex, RunStats)> {
    let docs = source.snapshot()?;
    tracing::info!(documents = docs.len(), "corpus snapshot taken");

    let mut pool = ThreadPoolBuilder::new().thread_name(|i| format!("shelf-index-{i}"));
    if let Some(n) = config.threads {
        pool = pool.num_threads(n);
    }
    let pool = pool.build().map_err(|e| anyhow!("failed to create thread pool: {e}"))?;

    let (mut index, stats) = pool.install(|| {
        docs.par_iter()
            .fold(
                || (InvertedIndex::new(), RunStats::default()),
                |(mut index, mut stats), doc| {
                    index_one(source, tokenizer, config, doc, &mut index, &mut stats);
                    (index, stats)
                },
            )
            .reduce(
                || (InvertedIndex::new(), RunStats::default()),
                |(mut a, mut sa), (b, sb)| {
                    a.merge(b);
                    sa.merge(sb);
                    (a, sa)
                },
            )
    });
    index.finish();
    Ok((index, stats))
}

fn index_one<S: DocumentSource + ?Sized>(
    source: &S,
    tokenizer: &Tokenizer,
    config: &IndexerConfig,
    doc: &Document,
    index: &mut InvertedIndex,
    stats: &mut RunStats,
) {
    stats.documents_seen += 1;
    let text = match source.content(doc) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(doc_id = doc.id, error = %e, "skipping document");
            stats.record_skip(&e);
            return;
        }
    };
    let mut counts = count_terms(tokenizer, &text, doc.language(), config.chunk_size);
    counts.retain_at_least(config.min_term_count);
    stats.documents_indexed += 1;
    stats.tokens += counts.total();
    if counts.is_empty() {
        stats.empty_documents += 1;
    }
    tracing::debug!(doc_id = doc.id, terms = counts.len(), "document counted");
    index.add_document(doc.id, counts);
}

/// Build a new index and atomically make it the live one.
///
/// Nothing is written to `sink` until the whole corpus has been processed; an
/// error or crash before the final swap leaves the previous index in place.
pub fn run<S, K>(
    source: &S,
    sink: &K,
    tokenizer: &Tokenizer,
    config: &IndexerConfig,
) -> Result<RunReport>
where
    S: DocumentSource + ?Sized,
    K: IndexSink + ?Sized,
{
    let started = Instant::now();
    let (index, stats) = build_index(source, tokenizer, config)?;
    tracing::info!(
        indexed = stats.documents_indexed,
        skipped = stats.skipped(),
        empty = stats.empty_documents,
        terms = index.len(),
        "aggregation finished"
    );
    let manifest = sink.replace(&index, config.write_batch)?;
    let elapsed = started.elapsed();
    tracing::info!(terms = manifest.num_terms, elapsed_s = elapsed.as_secs_f64(), "index run complete");
    Ok(RunReport { stats, manifest, elapsed })
}
