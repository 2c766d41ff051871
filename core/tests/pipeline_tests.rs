use shelf_core::pipeline::{build_index, run};
use shelf_core::{
    open_db, DataPaths, DocId, Document, DocumentError, DocumentSource, DocumentStore, IndexManifest, IndexSink,
    IndexStore, IndexerConfig, InvertedIndex, Posting, Tokenizer,
};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tempfile::tempdir;

struct MemoryCorpus {
    docs: Vec<Document>,
    texts: HashMap<DocId, Vec<u8>>,
    panic_on: Option<DocId>,
}

impl MemoryCorpus {
    fn new() -> Self {
        Self { docs: Vec::new(), texts: HashMap::new(), panic_on: None }
    }

    fn with(mut self, id: DocId, text: &str) -> Self {
        self.docs.push(doc(id));
        self.texts.insert(id, text.as_bytes().to_vec());
        self
    }

    fn with_bytes(mut self, id: DocId, bytes: &[u8]) -> Self {
        self.docs.push(doc(id));
        self.texts.insert(id, bytes.to_vec());
        self
    }

    fn with_missing(mut self, id: DocId) -> Self {
        self.docs.push(doc(id));
        self
    }
}

impl DocumentSource for MemoryCorpus {
    fn snapshot(&self) -> anyhow::Result<Vec<Document>> {
        Ok(self.docs.clone())
    }

    fn content(&self, d: &Document) -> Result<String, DocumentError> {
        if self.panic_on == Some(d.id) {
            panic!("simulated crash while reading {}", d.id);
        }
        let bytes = self
            .texts
            .get(&d.id)
            .ok_or_else(|| DocumentError::ContentMissing { id: d.id, content_ref: d.content_ref.clone() })?;
        String::from_utf8(bytes.clone())
            .map_err(|e| DocumentError::Encoding { id: d.id, valid_up_to: e.utf8_error().valid_up_to() })
    }
}

/// Writes part of the generation into the real store, then fails like a full disk.
struct FailingWriter<'a> {
    store: &'a IndexStore,
}

impl IndexSink for FailingWriter<'_> {
    fn replace(&self, index: &InvertedIndex, write_batch: usize) -> anyhow::Result<IndexManifest> {
        let mut half = InvertedIndex::new();
        for (term, list) in index.sorted().into_iter().take(index.len() / 2) {
            for p in list.as_slice() {
                half.add_document(p.doc_id, std::iter::repeat(term.to_string()).take(p.count as usize).collect());
            }
        }
        half.finish();
        let mut staged = self.store.stage()?;
        staged.write(&half, write_batch)?;
        Err(anyhow::anyhow!("No space left on device"))
    }
}

fn doc(id: DocId) -> Document {
    Document {
        id,
        title: format!("Book {id}"),
        author: "Unknown".into(),
        languages: vec!["en".into()],
        content_ref: format!("texts/book_{id}.txt"),
        word_count: 0,
        cover_url: None,
        created_at: "2024-01-01T00:00:00Z".into(),
    }
}

fn temp_store() -> IndexStore {
    IndexStore::new(sled::Config::new().temporary(true).open().unwrap()).unwrap()
}

fn config() -> IndexerConfig {
    IndexerConfig { threads: Some(4), write_batch: 3, ..Default::default() }
}

fn as_map(entries: Vec<(String, Vec<Posting>)>) -> BTreeMap<String, BTreeMap<DocId, u32>> {
    entries
        .into_iter()
        .map(|(t, ps)| (t, ps.into_iter().map(|p| (p.doc_id, p.count)).collect()))
        .collect()
}

fn sample_corpus() -> MemoryCorpus {
    MemoryCorpus::new()
        .with(1, "The library opened at dawn. A library is a quiet place; the library cat slept.")
        .with(2, "She walked to the LIBRARY with her lantern.")
        .with(3, "Whales sing beneath the grey northern ocean.")
}

#[test]
fn three_document_library_posting() {
    let store = temp_store();
    let report = run(&sample_corpus(), &store, &Tokenizer::default(), &config()).unwrap();

    assert_eq!(report.stats.documents_indexed, 3);
    assert_eq!(
        store.postings("library").unwrap().unwrap(),
        vec![Posting { doc_id: 1, count: 3 }, Posting { doc_id: 2, count: 1 }]
    );
    assert_eq!(report.manifest.num_terms as usize, store.term_count().unwrap());
    assert_eq!(report.manifest.num_docs, 3);
}

#[test]
fn inclusion_and_count_conservation() {
    let corpus = sample_corpus();
    let tokenizer = Tokenizer::default();
    let (index, stats) = build_index(&corpus, &tokenizer, &config()).unwrap();

    let mut expected: BTreeMap<String, BTreeMap<DocId, u32>> = BTreeMap::new();
    for d in &corpus.docs {
        let text = corpus.content(d).unwrap();
        for term in tokenizer.tokens(&text, d.language()) {
            *expected.entry(term).or_default().entry(d.id).or_insert(0) += 1;
        }
    }

    assert_eq!(index.len(), expected.len());
    for (term, per_doc) in &expected {
        let list = index.get(term).unwrap();
        let got: BTreeMap<DocId, u32> = list.as_slice().iter().map(|p| (p.doc_id, p.count)).collect();
        assert_eq!(&got, per_doc, "{term}");
        assert_eq!(list.total(), per_doc.values().map(|&n| n as u64).sum::<u64>());
    }
    let total: u64 = expected.values().flat_map(|m| m.values()).map(|&n| n as u64).sum();
    assert_eq!(stats.tokens, total);
}

#[test]
fn rerun_on_unchanged_corpus_is_identical() {
    let corpus = sample_corpus();
    let store = temp_store();
    let t = Tokenizer::default();

    let first = run(&corpus, &store, &t, &config()).unwrap();
    let before = as_map(store.entries().unwrap());
    let second = run(&corpus, &store, &t, &IndexerConfig { threads: Some(1), ..config() }).unwrap();
    let after = as_map(store.entries().unwrap());

    assert_eq!(before, after);
    assert!(second.manifest.generation > first.manifest.generation);
}

#[test]
fn stopword_only_document_contributes_nothing() {
    let corpus = MemoryCorpus::new().with(1, "the of and a to in it is was he").with(2, "Lanterns flicker");
    let store = temp_store();
    let report = run(&corpus, &store, &Tokenizer::default(), &config()).unwrap();

    assert_eq!(report.stats.documents_indexed, 2);
    assert_eq!(report.stats.empty_documents, 1);
    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|(_, ps)| ps.iter().all(|p| p.doc_id == 2)));
}

#[test]
fn empty_corpus_commits_empty_index() {
    let store = temp_store();
    let report = run(&MemoryCorpus::new(), &store, &Tokenizer::default(), &config()).unwrap();
    assert_eq!(report.manifest.num_terms, 0);
    assert_eq!(store.term_count().unwrap(), 0);
    assert!(store.active().unwrap().is_some());
}

#[test]
fn unreadable_documents_are_skipped() {
    let corpus = MemoryCorpus::new()
        .with(1, "Lanterns flicker")
        .with_missing(2)
        .with_bytes(3, &[b'l', b'a', b'n', b't', b'e', b'r', b'n', 0xc3, 0x28]);
    let store = temp_store();
    let report = run(&corpus, &store, &Tokenizer::default(), &config()).unwrap();

    assert_eq!(report.stats.documents_seen, 3);
    assert_eq!(report.stats.documents_indexed, 1);
    assert_eq!(report.stats.missing_content, 1);
    assert_eq!(report.stats.encoding_errors, 1);
    assert_eq!(store.postings("lanterns").unwrap().unwrap(), vec![Posting { doc_id: 1, count: 1 }]);
}

#[test]
fn min_term_count_drops_rare_postings() {
    let corpus = MemoryCorpus::new().with(1, "whale whale ship").with(2, "whale");
    let store = temp_store();
    let cfg = IndexerConfig { min_term_count: 2, ..config() };
    run(&corpus, &store, &Tokenizer::default(), &cfg).unwrap();
    assert_eq!(as_map(store.entries().unwrap()), BTreeMap::from([("whale".to_string(), BTreeMap::from([(1, 2)]))]));
}

#[test]
fn crash_before_commit_keeps_previous_index() {
    let t = Tokenizer::default();
    let store = temp_store();
    run(&MemoryCorpus::new().with(9, "Ancient parchment"), &store, &t, &config()).unwrap();
    let previous = as_map(store.entries().unwrap());

    let mut crashing = sample_corpus();
    crashing.panic_on = Some(2);
    let outcome = catch_unwind(AssertUnwindSafe(|| run(&crashing, &store, &t, &config())));
    assert!(outcome.is_err());
    assert_eq!(as_map(store.entries().unwrap()), previous);

    // A half-written generation is equally invisible.
    let (partial, _) = build_index(&MemoryCorpus::new().with(1, "library"), &t, &config()).unwrap();
    let mut staged = store.stage().unwrap();
    staged.write(&partial, 1).unwrap();
    drop(staged);
    assert_eq!(as_map(store.entries().unwrap()), previous);

    run(&sample_corpus(), &store, &t, &config()).unwrap();
    let fresh = temp_store();
    run(&sample_corpus(), &fresh, &t, &config()).unwrap();
    assert_eq!(as_map(store.entries().unwrap()), as_map(fresh.entries().unwrap()));
}

#[test]
fn failed_index_write_is_fatal_and_keeps_previous_index() {
    let t = Tokenizer::default();
    let store = temp_store();
    let before = run(&MemoryCorpus::new().with(9, "Ancient parchment"), &store, &t, &config()).unwrap();
    let previous = as_map(store.entries().unwrap());

    let err = run(&sample_corpus(), &FailingWriter { store: &store }, &t, &config()).unwrap_err();
    assert!(err.to_string().contains("No space left"));
    assert_eq!(as_map(store.entries().unwrap()), previous);
    assert_eq!(store.active().unwrap(), Some(before.manifest));
    assert!(store.postings("library").unwrap().is_none());

    // The next successful run replaces everything, abandoned generation included.
    run(&sample_corpus(), &store, &t, &config()).unwrap();
    assert_eq!(store.postings("ancient").unwrap(), None);
    assert_eq!(store.postings("library").unwrap().unwrap().len(), 2);
}

#[test]
fn very_large_document_is_counted_fully() {
    let text = "library catalogue ".repeat(8_000_000 / 18 + 1);
    assert!(text.chars().count() >= 8_000_000);
    let n = (8_000_000 / 18 + 1) as u32;
    let corpus = MemoryCorpus::new().with(1, &text);
    let cfg = IndexerConfig { chunk_size: 64 * 1024, ..config() };
    let (index, _) = build_index(&corpus, &Tokenizer::default(), &cfg).unwrap();
    assert_eq!(index.get("library").unwrap().get(1), Some(n));
    assert_eq!(index.get("catalogue").unwrap().get(1), Some(n));
}

#[test]
fn end_to_end_over_document_store() {
    let dir = tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let db = open_db(&paths).unwrap();
    let docs = DocumentStore::new(&db, paths.clone()).unwrap();
    let index = IndexStore::new(db.clone()).unwrap();

    for (id, lang, text) in [
        (11, "en", "The lighthouse keeper trimmed the lighthouse lamp."),
        (12, "fr", "Toutes les lanternes du phare."),
    ] {
        let content_ref = docs.write_text(id, text).unwrap();
        let mut d = doc(id);
        d.languages = vec![lang.to_string()];
        d.content_ref = content_ref;
        docs.insert(&d).unwrap();
    }
    let mut orphan = doc(13);
    orphan.content_ref = "texts/book_13.txt".into();
    docs.insert(&orphan).unwrap();

    let report = run(&docs, &index, &Tokenizer::default(), &config()).unwrap();
    assert_eq!(report.stats.missing_content, 1);
    assert_eq!(
        as_map(index.entries().unwrap()),
        BTreeMap::from([
            ("keeper".to_string(), BTreeMap::from([(11, 1)])),
            ("lamp".to_string(), BTreeMap::from([(11, 1)])),
            ("lanternes".to_string(), BTreeMap::from([(12, 1)])),
            ("lighthouse".to_string(), BTreeMap::from([(11, 2)])),
            ("phare".to_string(), BTreeMap::from([(12, 1)])),
            ("trimmed".to_string(), BTreeMap::from([(11, 1)])),
        ])
    );
}
