use crate::counter::TermCounts;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub count: u32,
}

/// Postings of one term. Appends are cheap; [`PostingList::finish`] sorts by
/// doc id and folds duplicate doc ids together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList(Vec<Posting>);

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the document, or increment it if it was the last one added.
    pub fn add(&mut self, doc_id: DocId, count: u32) {
        match self.0.last_mut() {
            Some(last) if last.doc_id == doc_id => last.count += count,
            _ => self.0.push(Posting { doc_id, count }),
        }
    }

    pub fn append(&mut self, other: PostingList) {
        self.0.extend(other.0);
    }

    pub fn finish(&mut self) {
        self.0.sort_unstable_by_key(|p| p.doc_id);
        self.0.dedup_by(|next, kept| {
            if next.doc_id == kept.doc_id {
                kept.count += next.count;
                true
            } else {
                false
            }
        });
    }

    pub fn get(&self, doc_id: DocId) -> Option<u32> {
        self.0.iter().find(|p| p.doc_id == doc_id).map(|p| p.count)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|p| p.count as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Posting] {
        &self.0
    }
}

/// term -> posting list, built in memory for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingList>,
    num_docs: u32,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post every term of one document. Empty counts still count the document.
    pub fn add_document(&mut self, doc_id: DocId, counts: TermCounts) {
        self.num_docs += 1;
        for (term, n) in counts {
            self.postings.entry(term).or_default().add(doc_id, n);
        }
    }

    /// Fold another partial index into this one.
    pub fn merge(&mut self, mut other: InvertedIndex) {
        if other.postings.len() > self.postings.len() {
            std::mem::swap(self, &mut other);
        }
        self.num_docs += other.num_docs;
        for (term, list) in other.postings {
            self.postings.entry(term).or_default().append(list);
        }
    }

    /// Sort every posting list; call once before persisting.
    pub fn finish(&mut self) {
        for list in self.postings.values_mut() {
            list.finish();
        }
    }

    pub fn get(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Documents folded into this index, empty ones included.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Entries in term order.
    pub fn sorted(&self) -> Vec<(&str, &PostingList)> {
        let mut v: Vec<(&str, &PostingList)> = self.postings.iter().map(|(t, l)| (t.as_str(), l)).collect();
        v.sort_unstable_by(|a, b| a.0.cmp(b.0));
        v
    }
}
