//! Error taxonomy for the ingestion and answering pipeline.
//!
//! External collaborators (loader, embedding backend, generation
//! backend) report failures as `anyhow::Error` through their trait
//! seams; the pipeline layers wrap those into the typed errors below so
//! callers can apply the atomic-replace and graceful-degradation
//! policies without inspecting error strings.

use thiserror::Error;

/// Document ingestion failed. The caller's previous retriever and
/// session state must remain untouched.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The document loader could not read or parse the input.
    #[error("failed to load document: {0}")]
    Load(#[source] anyhow::Error),

    /// Loading succeeded but no usable text came out.
    #[error("document '{0}' produced no text after extraction")]
    EmptyDocument(String),

    /// Embedding the chunk set failed.
    #[error(transparent)]
    Index(#[from] IndexBuildError),
}

/// Building the embedding index failed.
#[derive(Debug, Error)]
pub enum IndexBuildError {
    #[error("embedding backend failed: {0}")]
    Backend(#[source] anyhow::Error),

    /// The backend returned a different number of vectors than chunks.
    #[error("embedding backend returned {got} vectors for {expected} chunks")]
    VectorCountMismatch { expected: usize, got: usize },
}

/// Embedding the query at search time failed.
///
/// An empty index is not an error: `Retriever::search` returns an empty
/// chunk list in that case.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("embedding backend returned no vector for the query")]
    EmptyResponse,
}

/// The generation backend failed to produce an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend failed: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Any per-query failure surfaced by [`crate::session::ask`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
