//! # docchat
//!
//! Retrieval-augmented question answering over a single uploaded
//! document.
//!
//! docchat ingests one document at a time (PDF or plain text), cleans
//! and splits its text into overlapping chunks, embeds those chunks
//! into an in-memory vector index, and answers natural-language
//! questions by retrieving the most relevant chunks with a
//! diversity-aware (MMR) search and handing them, with the question, to
//! a language-model backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌───────────┐   ┌─────────┐   ┌───────────────┐
//! │ Loader │──▶│ Normalizer │──▶│ Chunker │──▶│ EmbeddingIndex │
//! └────────┘   └───────────┘   └─────────┘   └───────┬───────┘
//!                                                    │ MMR search
//!                                   ┌────────────────┤
//!                                   ▼                ▼
//!                             ┌───────────┐   ┌─────────────────┐
//!                             │ Retriever │──▶│ AnswerGenerator │
//!                             └───────────┘   └─────────────────┘
//! ```
//!
//! The embedding and generation models are external collaborators
//! behind the [`embedding::EmbeddingBackend`] and
//! [`generate::GenerationBackend`] traits; the built-in implementations
//! speak the OpenAI-compatible HTTP protocols. No UI, network listener,
//! or persistence layer is part of this crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docchat::config::Config;
//! use docchat::embedding::HttpEmbeddingBackend;
//! use docchat::generate::HttpGenerationBackend;
//! use docchat::loader::PdfLoader;
//! use docchat::session::ChatSession;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let embedder = Arc::new(HttpEmbeddingBackend::new(config.embedding.clone())?);
//! let generation = Arc::new(HttpGenerationBackend::new(config.generation.clone())?);
//!
//! let mut chat = ChatSession::new();
//! chat.upload(&PdfLoader, embedder, generation, "paper.pdf".as_ref(), &config)
//!     .await?;
//!
//! let answer = chat.ask("What problem does the paper address?").await;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration: chunking, retrieval, backends |
//! | [`error`] | Typed error taxonomy |
//! | [`models`] | Pages and chunks |
//! | [`normalize`] | Extraction-artifact cleanup |
//! | [`chunk`] | Recursive overlapping splitter |
//! | [`loader`] | Document loader trait, PDF/text loaders |
//! | [`embedding`] | Embedding backend trait, cosine similarity |
//! | [`index`] | In-memory index and MMR retrieval |
//! | [`generate`] | Prompt template and generation backend |
//! | [`pipeline`] | Ingestion composition root |
//! | [`session`] | Conversation transcript and `ask` |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod index;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod session;

pub use config::Config;
pub use error::{ChatError, GenerationError, IndexBuildError, IngestError, RetrievalError};
pub use index::Retriever;
pub use models::{Chunk, Page};
pub use session::{Answer, ChatSession, Session};
