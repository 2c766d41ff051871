use crate::document::{DocId, Document, DocumentSource};
use crate::error::DocumentError;
use crate::persist::DataPaths;
use anyhow::{Context, Result};
use std::fs::{self, create_dir_all};
use std::io::{ErrorKind, Write};

const DOCUMENTS_TREE: &str = "documents";

/// Book metadata in the `documents` tree, texts as plain files under `texts/`.
#[derive(Clone)]
pub struct DocumentStore {
    paths: DataPaths,
    docs: sled::Tree,
}

impl DocumentStore {
    pub fn new(db: &sled::Db, paths: DataPaths) -> Result<Self> {
        let docs = db.open_tree(DOCUMENTS_TREE)?;
        Ok(Self { paths, docs })
    }

    pub fn insert(&self, doc: &Document) -> Result<()> {
        let bytes = bincode::serialize(doc)?;
        self.docs.insert(doc.id.to_be_bytes(), bytes)?;
        Ok(())
    }

    pub fn contains(&self, id: DocId) -> Result<bool> {
        Ok(self.docs.contains_key(id.to_be_bytes())?)
    }

    pub fn get(&self, id: DocId) -> Result<Option<Document>> {
        match self.docs.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn flush(&self) -> Result<()> {
        self.docs.flush()?;
        Ok(())
    }

    /// Store a book's text and return its `content_ref`. The file is written
    /// under a temporary name and renamed, so a reader never sees half a book.
    pub fn write_text(&self, id: DocId, text: &str) -> Result<String> {
        let dir = self.paths.texts();
        create_dir_all(&dir)?;
        let name = format!("book_{id}.txt");
        let tmp = dir.join(format!(".{name}.tmp"));
        {
            let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(text.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, dir.join(&name))?;
        Ok(format!("texts/{name}"))
    }

    pub fn read_text(&self, id: DocId, content_ref: &str) -> Result<String, DocumentError> {
        let path = self.paths.root.join(content_ref);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DocumentError::ContentMissing { id, content_ref: content_ref.to_string() })
            }
            Err(source) => return Err(DocumentError::Io { id, source }),
        };
        let mut text = String::from_utf8(bytes)
            .map_err(|e| DocumentError::Encoding { id, valid_up_to: e.utf8_error().valid_up_to() })?;
        if text.starts_with('\u{feff}') {
            text.drain(..'\u{feff}'.len_utf8());
        }
        Ok(text)
    }
}

impl DocumentSource for DocumentStore {
    fn snapshot(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(self.docs.len());
        for kv in self.docs.iter() {
            let (_, v) = kv?;
            docs.push(bincode::deserialize::<Document>(&v).context("decoding document record")?);
        }
        // Big-endian keys already iterate in id order.
        Ok(docs)
    }

    fn content(&self, doc: &Document) -> Result<String, DocumentError> {
        self.read_text(doc.id, &doc.content_ref)
    }
}
