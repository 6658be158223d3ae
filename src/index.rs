//! In-memory embedding index and diversity-aware retrieval.
//!
//! An [`EmbeddingIndex`] holds the chunk/vector pairs for exactly one
//! document. It is immutable once built, so concurrent readers need no
//! locking; replacing the document means building a fresh index and
//! dropping the old one.
//!
//! Retrieval uses maximal marginal relevance (MMR): candidates are
//! picked greedily by `λ·sim(c, query) − (1−λ)·max sim(c, selected)`,
//! which trades relevance to the query against redundancy among the
//! results already chosen.

use std::fmt;
use std::sync::Arc;

use crate::embedding::{cosine_similarity, EmbeddingBackend};
use crate::error::{IndexBuildError, RetrievalError};
use crate::models::Chunk;

/// Chunk/vector pairs for one document.
pub struct EmbeddingIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Embed all chunks through `backend` and build the index.
    ///
    /// Fails if the backend errors or returns a vector count that does
    /// not match the chunk count; no partial index is ever produced.
    pub async fn build(
        backend: &dyn EmbeddingBackend,
        chunks: Vec<Chunk>,
    ) -> Result<Self, IndexBuildError> {
        if chunks.is_empty() {
            return Ok(Self {
                chunks,
                vectors: Vec::new(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = backend
            .embed(&texts)
            .await
            .map_err(IndexBuildError::Backend)?;

        if vectors.len() != chunks.len() {
            return Err(IndexBuildError::VectorCountMismatch {
                expected: chunks.len(),
                got: vectors.len(),
            });
        }

        tracing::info!(chunks = chunks.len(), model = backend.model_name(), "built embedding index");
        Ok(Self { chunks, vectors })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Select up to `k` chunks for a pre-embedded query using greedy
    /// MMR with relevance weight `lambda_mult` in `[0, 1]`.
    ///
    /// `lambda_mult = 1.0` reduces to pure top-k similarity ranking;
    /// `lambda_mult = 0.0` ignores the query and picks pairwise
    /// maximally dissimilar chunks. Ties are broken by input order, so
    /// the selection is deterministic for a fixed index.
    pub fn mmr_search(&self, query_vec: &[f32], k: usize, lambda_mult: f32) -> Vec<&Chunk> {
        let query_sims: Vec<f32> = self
            .vectors
            .iter()
            .map(|v| cosine_similarity(query_vec, v))
            .collect();

        let mut remaining: Vec<usize> = (0..self.chunks.len()).collect();
        let mut selected: Vec<usize> = Vec::with_capacity(k.min(self.chunks.len()));

        while selected.len() < k && !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_score = f32::NEG_INFINITY;

            for (pos, &cand) in remaining.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|&s| cosine_similarity(&self.vectors[cand], &self.vectors[s]))
                    .fold(f32::NEG_INFINITY, f32::max);
                // Nothing selected yet: score on relevance alone.
                let redundancy = if selected.is_empty() { 0.0 } else { redundancy };

                let score = lambda_mult * query_sims[cand] - (1.0 - lambda_mult) * redundancy;
                if score > best_score {
                    best_score = score;
                    best_pos = pos;
                }
            }

            selected.push(remaining.remove(best_pos));
        }

        selected.iter().map(|&i| &self.chunks[i]).collect()
    }
}

/// Query-side handle over a built [`EmbeddingIndex`].
///
/// Embeds the query through the same backend that built the index and
/// runs MMR selection with the configured defaults. Cloning shares the
/// underlying index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    backend: Arc<dyn EmbeddingBackend>,
    top_k: usize,
    lambda_mult: f32,
}

// Manual impl: the backend is a trait object.
impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("chunks", &self.index.len())
            .field("model", &self.backend.model_name())
            .field("top_k", &self.top_k)
            .field("lambda_mult", &self.lambda_mult)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    pub fn new(
        index: Arc<EmbeddingIndex>,
        backend: Arc<dyn EmbeddingBackend>,
        top_k: usize,
        lambda_mult: f32,
    ) -> Self {
        Self {
            index,
            backend,
            top_k,
            lambda_mult,
        }
    }

    /// Number of chunks in the underlying index.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Retrieve the chunks most relevant to `query` with the default
    /// `k` and `λ`.
    pub async fn search(&self, query: &str) -> Result<Vec<Chunk>, RetrievalError> {
        self.search_with(query, self.top_k, self.lambda_mult).await
    }

    /// Retrieve up to `k` chunks for `query` with an explicit relevance
    /// weight.
    ///
    /// An empty index yields an empty result without calling the
    /// embedding backend; "no document content" is an expected state,
    /// not an error.
    pub async fn search_with(
        &self,
        query: &str,
        k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<Chunk>, RetrievalError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .backend
            .embed(&[query.to_string()])
            .await
            .map_err(RetrievalError::Backend)?
            .into_iter()
            .next()
            .ok_or(RetrievalError::EmptyResponse)?;

        let hits = self.index.mmr_search(&query_vec, k, lambda_mult);
        tracing::debug!(query_len = query.len(), hits = hits.len(), "retrieved chunks");
        Ok(hits.into_iter().cloned().collect())
    }
}
