//! Ingestion pipeline: the composition root.
//!
//! Coordinates the full flow for one uploaded document: loader →
//! normalization → chunking → embedding index, then hands back a
//! [`Retriever`] closed over the built index and an [`AnswerGenerator`]
//! bound to the fixed instruction template.
//!
//! Ingestion is all-or-nothing: any failure returns [`IngestError`]
//! without exposing a partial index, so callers can keep serving their
//! previous retriever untouched.

use std::path::Path;
use std::sync::Arc;

use crate::chunk::split_pages;
use crate::config::Config;
use crate::embedding::EmbeddingBackend;
use crate::error::IngestError;
use crate::generate::{AnswerGenerator, GenerationBackend, PromptTemplate, ANSWER_TEMPLATE};
use crate::index::{EmbeddingIndex, Retriever};
use crate::loader::DocumentLoader;
use crate::normalize::normalize;

/// Build the retrieval and answering halves of the pipeline for the
/// document at `path`.
pub async fn build(
    loader: &dyn DocumentLoader,
    embedder: Arc<dyn EmbeddingBackend>,
    generation: Arc<dyn GenerationBackend>,
    path: &Path,
    config: &Config,
) -> Result<(Retriever, AnswerGenerator), IngestError> {
    let source = path.display().to_string();

    let mut pages = loader.load(path).map_err(IngestError::Load)?;
    tracing::info!(source = %source, pages = pages.len(), "loaded document");

    for page in &mut pages {
        page.metadata.source = source.clone();
        page.text = normalize(&page.text);
    }

    let chunks = split_pages(&pages, &config.chunking);
    if chunks.is_empty() {
        return Err(IngestError::EmptyDocument(source));
    }
    tracing::info!(chunks = chunks.len(), "chunked document");

    let index = EmbeddingIndex::build(embedder.as_ref(), chunks).await?;

    let retriever = Retriever::new(
        Arc::new(index),
        embedder,
        config.retrieval.top_k,
        config.retrieval.lambda_mult,
    );
    let generator = AnswerGenerator::new(PromptTemplate::new(ANSWER_TEMPLATE), generation);

    Ok((retriever, generator))
}
