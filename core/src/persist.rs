use crate::index::{InvertedIndex, Posting, PostingList};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

const META_TREE: &str = "meta";
const ACTIVE_KEY: &str = "active_index";
const INDEX_PREFIX: &str = "index.";
const FORMAT_VERSION: u32 = 1;

/// Layout of a data directory shared by the crawler and the indexer.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn db(&self) -> PathBuf { self.root.join("db") }
    pub fn texts(&self) -> PathBuf { self.root.join("texts") }
}

pub fn open_db(paths: &DataPaths) -> Result<sled::Db> {
    create_dir_all(&paths.root)?;
    let db = sled::open(paths.db()).with_context(|| format!("opening database at {}", paths.db().display()))?;
    Ok(db)
}

/// Describes the live index generation. Stored as the value of the swap pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub generation: u64,
    pub tree: String,
    pub num_docs: u32,
    pub num_terms: u64,
    pub created_at: String,
    pub version: u32,
}

/// Term -> postings records, one sled tree per generation.
///
/// A new generation is written completely into a fresh tree; only then does a
/// single write to the pointer key make it live. A process dying before that
/// write leaves the previous generation as the visible index.
#[derive(Clone)]
pub struct IndexStore {
    db: sled::Db,
    meta: sled::Tree,
}

impl IndexStore {
    pub fn new(db: sled::Db) -> Result<Self> {
        let meta = db.open_tree(META_TREE)?;
        Ok(Self { db, meta })
    }

    pub fn active(&self) -> Result<Option<IndexManifest>> {
        match self.meta.get(ACTIVE_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Start a new generation. Leftover trees of abandoned runs are dropped first.
    pub fn stage(&self) -> Result<StagedIndex<'_>> {
        self.purge_orphans()?;
        let generation = self.db.generate_id()?;
        let name = format!("{INDEX_PREFIX}{generation:020}");
        let tree = self.db.open_tree(&name)?;
        tracing::debug!(tree = %name, "staging index generation");
        Ok(StagedIndex { store: self, generation, name, tree, num_terms: 0 })
    }

    /// Write `index` as a new generation and make it live.
    pub fn replace(&self, index: &InvertedIndex, write_batch: usize) -> Result<IndexManifest> {
        let mut staged = self.stage()?;
        staged.write(index, write_batch)?;
        staged.commit(index.num_docs())
    }

    /// Number of terms in the live index.
    pub fn term_count(&self) -> Result<usize> {
        Ok(self.read_live(|tree| Ok(tree.len()))?.unwrap_or(0))
    }

    pub fn postings(&self, term: &str) -> Result<Option<Vec<Posting>>> {
        Ok(self.read_live(|tree| postings_in(tree, term))?.flatten())
    }

    /// Every record of the live index, in term order.
    pub fn entries(&self) -> Result<Vec<(String, Vec<Posting>)>> {
        let entries = self.read_live(|tree| {
            let mut out = Vec::with_capacity(tree.len());
            for kv in tree.iter() {
                let (k, v) = kv?;
                let term = String::from_utf8(k.to_vec()).context("index key is not UTF-8")?;
                out.push((term, bincode::deserialize(&v)?));
            }
            Ok(out)
        })?;
        Ok(entries.unwrap_or_default())
    }

    /// Documents containing every term of `query`, with the count of each
    /// query term, ordered by doc id. Query words are normalized with
    /// `tokenizer`; words it filters out do not constrain the result.
    pub fn lookup(&self, tokenizer: &Tokenizer, query: &str) -> Result<Vec<(DocId, BTreeMap<String, u32>)>> {
        let mut terms: Vec<String> = tokenizer.tokens(query, None).collect();
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let hits = self.read_live(|tree| {
            let mut per_term = Vec::with_capacity(terms.len());
            for term in &terms {
                let docs: BTreeMap<DocId, u32> = postings_in(tree, term)?
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| (p.doc_id, p.count))
                    .collect();
                per_term.push((term.clone(), docs));
            }
            Ok(intersect(per_term))
        })?;
        Ok(hits.unwrap_or_default())
    }

    /// Like [`IndexStore::lookup`], but a query word matches every index term
    /// that contains it. The count reported for a word is the sum over all
    /// terms it matched. Query words are only folded, never filtered.
    pub fn lookup_substring(&self, tokenizer: &Tokenizer, query: &str) -> Result<Vec<(DocId, BTreeMap<String, u32>)>> {
        let mut words = tokenizer.fragments(query);
        words.sort();
        words.dedup();
        if words.is_empty() {
            return Ok(Vec::new());
        }
        let hits = self.read_live(|tree| {
            let mut per_word: Vec<BTreeMap<DocId, u32>> = vec![BTreeMap::new(); words.len()];
            for kv in tree.iter() {
                let (k, v) = kv?;
                let term = std::str::from_utf8(&k).context("index key is not UTF-8")?;
                let matched: Vec<usize> = (0..words.len()).filter(|&i| term.contains(words[i].as_str())).collect();
                if matched.is_empty() {
                    continue;
                }
                let postings: Vec<Posting> = bincode::deserialize(&v)?;
                for i in matched {
                    for p in &postings {
                        let n = per_word[i].entry(p.doc_id).or_insert(0);
                        *n = n.saturating_add(p.count);
                    }
                }
            }
            Ok(intersect(words.iter().cloned().zip(per_word).collect()))
        })?;
        Ok(hits.unwrap_or_default())
    }

    /// Run `read` against the live tree. A generation swap during the read
    /// retries it against the new one, so a reader never mixes generations
    /// or sees a superseded tree disappear underneath it.
    fn read_live<T>(&self, read: impl Fn(&sled::Tree) -> Result<T>) -> Result<Option<T>> {
        loop {
            let Some(manifest) = self.active()? else { return Ok(None) };
            let tree = self.db.open_tree(&manifest.tree)?;
            let out = read(&tree);
            let now = self.active()?.map(|m| m.generation);
            if now == Some(manifest.generation) {
                return out.map(Some);
            }
            tracing::debug!(tree = %manifest.tree, "index generation replaced during read, retrying");
        }
    }

    fn purge_orphans(&self) -> Result<()> {
        let live = self.active()?.map(|m| m.tree);
        for name in self.db.tree_names() {
            let name = String::from_utf8_lossy(&name).into_owned();
            if name.starts_with(INDEX_PREFIX) && Some(&name) != live.as_ref() {
                tracing::info!(tree = %name, "dropping superseded index generation");
                if let Err(e) = self.db.drop_tree(name.as_bytes()) {
                    tracing::warn!(tree = %name, error = %e, "failed to drop index generation");
                }
            }
        }
        Ok(())
    }
}

/// Destination of a finished index build.
pub trait IndexSink {
    /// Make `index` the live index, or leave the previous one untouched on error.
    fn replace(&self, index: &InvertedIndex, write_batch: usize) -> Result<IndexManifest>;
}

impl IndexSink for IndexStore {
    fn replace(&self, index: &InvertedIndex, write_batch: usize) -> Result<IndexManifest> {
        IndexStore::replace(self, index, write_batch)
    }
}

fn postings_in(tree: &sled::Tree, term: &str) -> Result<Option<Vec<Posting>>> {
    match tree.get(term.as_bytes())? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

// Documents present for every word, keeping each word's count.
fn intersect(per_word: Vec<(String, BTreeMap<DocId, u32>)>) -> Vec<(DocId, BTreeMap<String, u32>)> {
    let mut hits: Option<BTreeMap<DocId, BTreeMap<String, u32>>> = None;
    for (word, docs) in per_word {
        let next: BTreeMap<DocId, BTreeMap<String, u32>> = match hits {
            None => docs.into_iter().map(|(id, n)| (id, BTreeMap::from([(word.clone(), n)]))).collect(),
            Some(mut prev) => {
                let mut kept = BTreeMap::new();
                for (id, n) in docs {
                    if let Some(mut counts) = prev.remove(&id) {
                        counts.insert(word.clone(), n);
                        kept.insert(id, counts);
                    }
                }
                kept
            }
        };
        hits = Some(next);
    }
    hits.unwrap_or_default().into_iter().collect()
}

/// A generation being written. Dropping it without [`StagedIndex::commit`]
/// leaves the live index untouched; the tree is purged by the next `stage`.
pub struct StagedIndex<'a> {
    store: &'a IndexStore,
    generation: u64,
    name: String,
    tree: sled::Tree,
    num_terms: u64,
}

impl StagedIndex<'_> {
    /// Append `index` in batches of `write_batch` term records.
    pub fn write(&mut self, index: &InvertedIndex, write_batch: usize) -> Result<()> {
        let write_batch = write_batch.max(1);
        let mut batch = sled::Batch::default();
        let mut pending = 0usize;
        for (term, list) in index.sorted() {
            batch.insert(term.as_bytes(), encode(list)?);
            pending += 1;
            if pending == write_batch {
                self.tree.apply_batch(std::mem::take(&mut batch))?;
                self.num_terms += pending as u64;
                pending = 0;
            }
        }
        if pending > 0 {
            self.tree.apply_batch(batch)?;
            self.num_terms += pending as u64;
        }
        tracing::debug!(tree = %self.name, terms = self.num_terms, "generation written");
        Ok(())
    }

    /// Flip the pointer to this generation. The superseded tree stays on disk
    /// for readers still holding it and is dropped by the next [`IndexStore::stage`].
    pub fn commit(self, num_docs: u32) -> Result<IndexManifest> {
        self.tree.flush()?;
        let manifest = IndexManifest {
            generation: self.generation,
            tree: self.name.clone(),
            num_docs,
            num_terms: self.num_terms,
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: FORMAT_VERSION,
        };
        self.store.meta.insert(ACTIVE_KEY, serde_json::to_vec(&manifest)?)?;
        self.store.db.flush()?;
        tracing::info!(generation = manifest.generation, terms = manifest.num_terms, "index generation committed");
        Ok(manifest)
    }
}

fn encode(list: &PostingList) -> Result<Vec<u8>> {
    Ok(bincode::serialize(list.as_slice())?)
}
