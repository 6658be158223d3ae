//! Core data types that flow through the question-answering pipeline.
//!
//! A loaded document becomes a sequence of [`Page`]s, the chunker turns
//! pages into [`Chunk`]s, and the answering session records turns
//! (defined in [`crate::session`]).

use serde::Serialize;

/// Provenance metadata attached to a [`Page`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    /// Identifier of the originating document (typically its path).
    pub source: String,
    /// Zero-based position of the page within the document.
    pub page_index: usize,
}

/// One page of raw or normalized document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub text: String,
    pub metadata: PageMetadata,
}

impl Page {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page_index: usize) -> Self {
        Self {
            text: text.into(),
            metadata: PageMetadata {
                source: source.into(),
                page_index,
            },
        }
    }
}

/// Provenance metadata attached to a [`Chunk`].
///
/// Inherits the source and page index from the originating page and adds
/// the chunk's position within that page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page_index: usize,
    /// Zero-based sequence number of the chunk within its page.
    pub chunk_index: usize,
}

/// A bounded contiguous span of a document's normalized text — the unit
/// of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// SHA-256 of the chunk text, available to callers for caching and
    /// staleness decisions.
    pub hash: String,
}
