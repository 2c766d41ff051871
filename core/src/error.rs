use crate::DocId;
use thiserror::Error;

/// Per-document failures. None of these abort an indexing run: the document is
/// skipped and counted in the run statistics.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("content for document {id} not found at {content_ref}")]
    ContentMissing { id: DocId, content_ref: String },

    #[error("content for document {id} is not valid UTF-8 (first bad byte at {valid_up_to})")]
    Encoding { id: DocId, valid_up_to: usize },

    #[error("failed to read content for document {id}: {source}")]
    Io {
        id: DocId,
        #[source]
        source: std::io::Error,
    },
}

