//! Book-to-book similarity, computed offline from the live index.
//!
//! Two books are compared by the weighted Jaccard index of their term counts:
//! the sum over all terms of the smaller count divided by the sum of the larger
//! one. A term missing from a book counts as zero.

use crate::config::SimilarityConfig;
use crate::index::Posting;
use crate::persist::IndexStore;
use crate::DocId;
use anyhow::{anyhow, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

const SIMILARITY_TREE: &str = "similarity";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbour {
    pub doc_id: DocId,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SimilarityReport {
    /// Index generation the table was computed from.
    pub generation: Option<u64>,
    pub books: usize,
    /// Unordered pairs above the threshold.
    pub pairs: usize,
    pub elapsed: Duration,
}

/// Neighbours of every book in `entries`, best first. Only scores strictly
/// above `threshold` are kept; ties are ordered by doc id.
pub fn compute(entries: &[(String, Vec<Posting>)], threshold: f64) -> Vec<(DocId, Vec<Neighbour>)> {
    let ids: Vec<DocId> = entries
        .iter()
        .flat_map(|(_, ps)| ps.iter().map(|p| p.doc_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let slot: HashMap<DocId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    // rows: book -> (term, count); columns: term -> (book, count)
    let mut totals = vec![0u64; ids.len()];
    let mut rows: Vec<Vec<(usize, u32)>> = vec![Vec::new(); ids.len()];
    let mut columns: Vec<Vec<(usize, u32)>> = Vec::with_capacity(entries.len());
    for (term, (_, postings)) in entries.iter().enumerate() {
        let mut column = Vec::with_capacity(postings.len());
        for p in postings {
            let book = slot[&p.doc_id];
            totals[book] += p.count as u64;
            rows[book].push((term, p.count));
            column.push((book, p.count));
        }
        columns.push(column);
    }

    (0..ids.len())
        .into_par_iter()
        .map(|i| {
            let mut shared = vec![0u64; ids.len()];
            for &(term, a) in &rows[i] {
                for &(j, b) in &columns[term] {
                    if j != i {
                        shared[j] += a.min(b) as u64;
                    }
                }
            }
            let mut out: Vec<Neighbour> = shared
                .iter()
                .enumerate()
                .filter(|(_, min_sum)| **min_sum > 0)
                .filter_map(|(j, &min_sum)| {
                    // sum of max = |a| + |b| - sum of min
                    let max_sum = totals[i] + totals[j] - min_sum;
                    let score = min_sum as f64 / max_sum as f64;
                    (score > threshold).then_some(Neighbour { doc_id: ids[j], score })
                })
                .collect();
            out.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
            (ids[i], out)
        })
        .collect()
}

/// Per-book neighbour lists in the `similarity` tree, keyed by big-endian doc id.
#[derive(Clone)]
pub struct SimilarityStore {
    tree: sled::Tree,
}

impl SimilarityStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(SIMILARITY_TREE)?;
        Ok(Self { tree })
    }

    /// Replace the whole table in one atomic batch. Books without neighbours
    /// are not stored.
    pub fn replace(&self, table: &[(DocId, Vec<Neighbour>)]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for key in self.tree.iter().keys() {
            batch.remove(key?);
        }
        for (id, neighbours) in table.iter().filter(|(_, ns)| !ns.is_empty()) {
            batch.insert(&id.to_be_bytes()[..], bincode::serialize(neighbours)?);
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        Ok(())
    }

    /// The `limit` books most similar to `doc_id`, best first.
    pub fn similar(&self, doc_id: DocId, limit: usize) -> Result<Vec<Neighbour>> {
        let mut neighbours: Vec<Neighbour> = match self.tree.get(doc_id.to_be_bytes())? {
            Some(bytes) => bincode::deserialize(&bytes)?,
            None => Vec::new(),
        };
        neighbours.truncate(limit);
        Ok(neighbours)
    }

    /// Books with at least one neighbour.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// Recompute the similarity table from the live index and store it.
pub fn run(
    index: &IndexStore,
    out: &SimilarityStore,
    config: &SimilarityConfig,
    threads: Option<usize>,
) -> Result<SimilarityReport> {
    let started = Instant::now();
    let generation = index.active()?.map(|m| m.generation);
    let entries = index.entries()?;
    tracing::info!(terms = entries.len(), ?generation, "computing book similarity");

    let mut pool = ThreadPoolBuilder::new().thread_name(|i| format!("shelf-similarity-{i}"));
    if let Some(n) = threads {
        pool = pool.num_threads(n);
    }
    let pool = pool.build().map_err(|e| anyhow!("failed to create thread pool: {e}"))?;
    let table = pool.install(|| compute(&entries, config.threshold));

    let pairs = table.iter().map(|(_, ns)| ns.len()).sum::<usize>() / 2;
    out.replace(&table)?;
    let report = SimilarityReport { generation, books: table.len(), pairs, elapsed: started.elapsed() };
    tracing::info!(books = report.books, pairs, elapsed_s = report.elapsed.as_secs_f64(), "similarity table stored");
    Ok(report)
}
