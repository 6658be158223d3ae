//! Conversation state and the answering entry points.
//!
//! [`ask`] is the stateless core: retrieve chunks for the question,
//! join them into a context block, and run the generator. [`Session`]
//! is the append-only transcript owned by the caller. [`ChatSession`]
//! combines both and enforces the state policies: an upload replaces
//! the index and clears the transcript only after the new pipeline is
//! fully built, and per-query failures become explanatory assistant
//! turns instead of corrupting the transcript.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::EmbeddingBackend;
use crate::error::{ChatError, IngestError};
use crate::generate::{AnswerGenerator, GenerationBackend};
use crate::index::Retriever;
use crate::loader::DocumentLoader;
use crate::pipeline;

/// Fixed reply returned before any document has been ingested.
pub const NO_DOCUMENT_ANSWER: &str =
    "No document has been uploaded yet. Upload a document to start asking questions about it.";

/// Separator between chunk texts in the composed context block.
const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation transcript.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Texts of the chunks that supported an assistant answer.
    pub supporting: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only conversation history for one document's active chat.
#[derive(Debug, Default)]
pub struct Session {
    turns: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            content: content.into(),
            supporting: Vec::new(),
            created_at: Utc::now(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, supporting: Vec<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.into(),
            supporting,
            created_at: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// An answer together with the chunk texts that grounded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub supporting: Vec<String>,
}

/// Answer `question` from the retrieved document context.
///
/// With no retriever (`None`: nothing ingested yet) this returns the
/// fixed no-document answer without touching either backend. Otherwise
/// the retrieved chunk texts are joined with a blank line into the
/// context block, and the generator output is returned verbatim
/// alongside those texts.
///
/// Stateless with respect to the transcript; the caller appends the
/// resulting turns.
pub async fn ask(
    retriever: Option<&Retriever>,
    generator: &AnswerGenerator,
    question: &str,
) -> Result<Answer, ChatError> {
    let retriever = match retriever {
        Some(r) => r,
        None => {
            return Ok(Answer {
                text: NO_DOCUMENT_ANSWER.to_string(),
                supporting: Vec::new(),
            })
        }
    };

    let chunks = retriever.search(question).await?;
    let supporting: Vec<String> = chunks.into_iter().map(|c| c.text).collect();
    let context = supporting.join(CONTEXT_SEPARATOR);

    let text = generator.generate(&context, question).await?;
    Ok(Answer { text, supporting })
}

/// One user's chat over one document at a time.
pub struct ChatSession {
    retriever: Option<Retriever>,
    generator: Option<AnswerGenerator>,
    session: Session,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            retriever: None,
            generator: None,
            session: Session::new(),
        }
    }

    /// Ingest a new document, replacing any previous one.
    ///
    /// The previous retriever and transcript are swapped out only after
    /// the new pipeline builds successfully; on error they remain
    /// exactly as they were.
    pub async fn upload(
        &mut self,
        loader: &dyn DocumentLoader,
        embedder: Arc<dyn EmbeddingBackend>,
        generation: Arc<dyn GenerationBackend>,
        path: &Path,
        config: &Config,
    ) -> Result<(), IngestError> {
        let (retriever, generator) = pipeline::build(loader, embedder, generation, path, config).await?;

        self.retriever = Some(retriever);
        self.generator = Some(generator);
        self.session.clear();
        Ok(())
    }

    /// Ask a question and record both turns in the transcript.
    ///
    /// Per-query failures do not corrupt the transcript: the failed
    /// turn is recorded with an explanatory message as the answer.
    pub async fn ask(&mut self, question: &str) -> Answer {
        self.session.push_user(question);

        let answer = match &self.generator {
            None => Answer {
                text: NO_DOCUMENT_ANSWER.to_string(),
                supporting: Vec::new(),
            },
            Some(generator) => match ask(self.retriever.as_ref(), generator, question).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(error = %e, "query failed");
                    Answer {
                        text: format!("Sorry, I could not answer that question: {}", e),
                        supporting: Vec::new(),
                    }
                }
            },
        };

        self.session
            .push_assistant(answer.text.clone(), answer.supporting.clone());
        answer
    }

    /// Read access to the transcript.
    pub fn history(&self) -> &[Turn] {
        self.session.turns()
    }

    /// Whether a document has been ingested successfully.
    pub fn has_document(&self) -> bool {
        self.retriever.is_some()
    }
}
