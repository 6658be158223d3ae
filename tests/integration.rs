//! End-to-end pipeline tests driven by injected fakes.
//!
//! No network access: the loader, embedding backend, and generation
//! backend are all in-process test doubles. The embedding fake hashes
//! words into a fixed-dimension bag-of-words vector, which is
//! deterministic and makes lexically overlapping texts similar.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use docchat::config::Config;
use docchat::embedding::EmbeddingBackend;
use docchat::error::{IndexBuildError, IngestError};
use docchat::generate::{AnswerGenerator, GenerationBackend, PromptTemplate, ANSWER_TEMPLATE};
use docchat::index::{EmbeddingIndex, Retriever};
use docchat::loader::{loader_for_path, DocumentLoader, TextLoader};
use docchat::models::Page;
use docchat::session::{self, ChatSession, Role, NO_DOCUMENT_ANSWER};
use docchat::{pipeline, Chunk};

// ============ Test doubles ============

/// Loader serving fixed in-memory pages.
struct InMemoryLoader {
    pages: Vec<String>,
}

impl DocumentLoader for InMemoryLoader {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| Page::new(text.clone(), path.display().to_string(), i))
            .collect())
    }
}

/// Loader that always fails, simulating unreadable input.
struct FailingLoader;

impl DocumentLoader for FailingLoader {
    fn name(&self) -> &str {
        "failing"
    }

    fn load(&self, _path: &Path) -> Result<Vec<Page>> {
        anyhow::bail!("corrupt document")
    }
}

const DIMS: usize = 32;

/// Deterministic bag-of-words embedding: each lowercased token hashes
/// into one of `DIMS` buckets.
fn word_hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for token in text.split_whitespace() {
        let token: String = token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if token.is_empty() {
            continue;
        }
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        v[(hasher.finish() % DIMS as u64) as usize] += 1.0;
    }
    v
}

#[derive(Default)]
struct WordHashEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingBackend for WordHashEmbedder {
    fn model_name(&self) -> &str {
        "word-hash"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| word_hash_vector(t)).collect())
    }
}

/// Embedding backend with a fixed text → vector table.
struct MappingEmbedder {
    map: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl EmbeddingBackend for MappingEmbedder {
    fn model_name(&self) -> &str {
        "mapping"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                self.map
                    .get(t)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no vector for {:?}", t))
            })
            .collect()
    }
}

/// Embedding backend returning the wrong number of vectors.
struct MiscountingEmbedder;

#[async_trait]
impl EmbeddingBackend for MiscountingEmbedder {
    fn model_name(&self) -> &str {
        "miscounting"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![1.0, 0.0]])
    }
}

/// Generation backend recording every prompt it sees.
#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationBackend for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("generated answer".to_string())
    }
}

/// Generation backend that always fails.
struct FailingGenerator;

#[async_trait]
impl GenerationBackend for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("model unavailable")
    }
}

fn three_page_loader() -> InMemoryLoader {
    InMemoryLoader {
        pages: vec![
            "Rust is a systems programming language focused on memory safety.".to_string(),
            "The borrow checker enforces ownership rules at compile time.".to_string(),
            "Cargo is the package manager and build tool used by every project.".to_string(),
        ],
    }
}

// ============ Scenarios ============

#[tokio::test]
async fn end_to_end_ask_retrieves_the_matching_page() {
    let loader = three_page_loader();
    let embedder = Arc::new(WordHashEmbedder::default());
    let generation = Arc::new(RecordingGenerator::default());

    let (retriever, generator) = pipeline::build(
        &loader,
        embedder.clone(),
        generation.clone(),
        Path::new("doc.txt"),
        &Config::default(),
    )
    .await
    .expect("pipeline build");

    // Each short page becomes exactly one chunk.
    assert_eq!(retriever.index_len(), 3);

    let answer = session::ask(
        Some(&retriever),
        &generator,
        "Which package manager and build tool does a project use?",
    )
    .await
    .expect("ask");

    assert_eq!(answer.text, "generated answer");
    assert!(
        answer.supporting[0].contains("package manager"),
        "expected the Cargo chunk first, got: {:?}",
        answer.supporting
    );

    // The composed context contains the supporting chunk verbatim.
    let prompts = generation.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&answer.supporting[0]));
    assert!(prompts[0].contains("Which package manager and build tool does a project use?"));
}

#[tokio::test]
async fn chunk_metadata_carries_document_source() {
    let loader = three_page_loader();
    let embedder = Arc::new(WordHashEmbedder::default());
    let generation = Arc::new(RecordingGenerator::default());

    let (retriever, _) = pipeline::build(
        &loader,
        embedder,
        generation,
        Path::new("paper.pdf"),
        &Config::default(),
    )
    .await
    .unwrap();

    let hits: Vec<Chunk> = retriever.search("borrow checker ownership").await.unwrap();
    assert!(!hits.is_empty());
    for chunk in &hits {
        assert_eq!(chunk.metadata.source, "paper.pdf");
    }
}

#[tokio::test]
async fn pipeline_handles_format_for_debugging() {
    let loader = three_page_loader();
    let (retriever, generator) = pipeline::build(
        &loader,
        Arc::new(WordHashEmbedder::default()),
        Arc::new(RecordingGenerator::default()),
        Path::new("doc.txt"),
        &Config::default(),
    )
    .await
    .unwrap();

    let dump = format!("{:?} {:?}", retriever, generator);
    assert!(dump.contains("Retriever"));
    assert!(dump.contains("AnswerGenerator"));
    assert!(dump.contains("word-hash"));
}

#[tokio::test]
async fn extension_dispatch_feeds_the_session() {
    let tmp = tempfile::TempDir::new().unwrap();
    let doc = tmp.path().join("notes.txt");
    std::fs::write(&doc, "Field notes about ferrets and weasels.").unwrap();

    let loader = loader_for_path(&doc);
    assert_eq!(loader.name(), "text");

    let mut chat = ChatSession::new();
    chat.upload(
        loader.as_ref(),
        Arc::new(WordHashEmbedder::default()),
        Arc::new(RecordingGenerator::default()),
        &doc,
        &Config::default(),
    )
    .await
    .unwrap();

    assert!(chat.has_document());
    let answer = chat.ask("What animals do the notes mention?").await;
    assert!(answer.supporting.iter().any(|c| c.contains("ferrets")));
}

#[tokio::test]
async fn no_document_short_circuits_without_backend_calls() {
    let generation = Arc::new(RecordingGenerator::default());
    let generator = AnswerGenerator::new(PromptTemplate::new(ANSWER_TEMPLATE), generation.clone());

    let answer = session::ask(None, &generator, "anything?").await.unwrap();

    assert_eq!(answer.text, NO_DOCUMENT_ANSWER);
    assert!(answer.supporting.is_empty());
    assert_eq!(generation.calls.load(Ordering::SeqCst), 0);

    // Same short-circuit through the stateful session.
    let mut chat = ChatSession::new();
    let answer = chat.ask("anything?").await;
    assert_eq!(answer.text, NO_DOCUMENT_ANSWER);
    assert_eq!(chat.history().len(), 2);
}

#[tokio::test]
async fn upload_replaces_index_and_clears_session() {
    let tmp = tempfile::TempDir::new().unwrap();
    let doc_a = tmp.path().join("a.txt");
    let doc_b = tmp.path().join("b.txt");
    std::fs::write(&doc_a, "Alpha document talks about lions and tigers.").unwrap();
    std::fs::write(&doc_b, "Beta document talks about compilers and linkers.").unwrap();

    let config = Config::default();
    let embedder = Arc::new(WordHashEmbedder::default());
    let generation = Arc::new(RecordingGenerator::default());

    let mut chat = ChatSession::new();
    chat.upload(&TextLoader, embedder.clone(), generation.clone(), &doc_a, &config)
        .await
        .unwrap();

    chat.ask("What animals appear?").await;
    assert_eq!(chat.history().len(), 2);

    chat.upload(&TextLoader, embedder, generation, &doc_b, &config)
        .await
        .unwrap();

    // History is exactly empty and answers now come from document B.
    assert!(chat.history().is_empty());
    let answer = chat.ask("What does the document say about compilers?").await;
    assert!(answer.supporting.iter().all(|c| c.contains("compilers")));
    assert!(answer.supporting.iter().all(|c| !c.contains("lions")));
}

#[tokio::test]
async fn failed_ingest_preserves_previous_state() {
    let tmp = tempfile::TempDir::new().unwrap();
    let doc = tmp.path().join("a.txt");
    std::fs::write(&doc, "The original document mentions zebras.").unwrap();

    let config = Config::default();
    let embedder = Arc::new(WordHashEmbedder::default());
    let generation = Arc::new(RecordingGenerator::default());

    let mut chat = ChatSession::new();
    chat.upload(&TextLoader, embedder.clone(), generation.clone(), &doc, &config)
        .await
        .unwrap();
    chat.ask("What animal is mentioned?").await;
    assert_eq!(chat.history().len(), 2);

    let err = chat
        .upload(&FailingLoader, embedder, generation, Path::new("bad.txt"), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Load(_)));

    // Old transcript and old index both still serve.
    assert_eq!(chat.history().len(), 2);
    let answer = chat.ask("What animal is mentioned?").await;
    assert!(answer.supporting.iter().any(|c| c.contains("zebras")));
}

#[tokio::test]
async fn generation_failure_is_recorded_as_explanatory_turn() {
    let tmp = tempfile::TempDir::new().unwrap();
    let doc = tmp.path().join("a.txt");
    std::fs::write(&doc, "Some content to index.").unwrap();

    let config = Config::default();
    let embedder = Arc::new(WordHashEmbedder::default());
    let generation = Arc::new(FailingGenerator);

    let mut chat = ChatSession::new();
    chat.upload(&TextLoader, embedder, generation, &doc, &config)
        .await
        .unwrap();

    let answer = chat.ask("What is in the document?").await;
    assert!(answer.text.contains("could not answer"));
    assert!(answer.supporting.is_empty());

    let turns = chat.history();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Assistant);
    assert!(turns[1].content.contains("could not answer"));
}

#[tokio::test]
async fn empty_document_fails_ingest() {
    let loader = InMemoryLoader {
        pages: vec!["   ".to_string(), "\n\n".to_string()],
    };
    let err = pipeline::build(
        &loader,
        Arc::new(WordHashEmbedder::default()),
        Arc::new(RecordingGenerator::default()),
        Path::new("blank.txt"),
        &Config::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, IngestError::EmptyDocument(_)));
}

#[tokio::test]
async fn vector_count_mismatch_fails_index_build() {
    let loader = three_page_loader();
    let err = pipeline::build(
        &loader,
        Arc::new(MiscountingEmbedder),
        Arc::new(RecordingGenerator::default()),
        Path::new("doc.txt"),
        &Config::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Index(IndexBuildError::VectorCountMismatch { expected: 3, got: 1 })
    ));
}

#[tokio::test]
async fn full_relevance_search_returns_all_chunks_ranked() {
    // Three chunks with fixed vectors at known similarities to the query.
    let texts = ["far", "near", "middle"];
    let mut map = HashMap::new();
    map.insert("far".to_string(), vec![0.0, 1.0]);
    map.insert("near".to_string(), vec![1.0, 0.0]);
    map.insert("middle".to_string(), vec![0.7, 0.7]);
    map.insert("the query".to_string(), vec![1.0, 0.0]);
    let embedder = Arc::new(MappingEmbedder { map });

    let pages: Vec<Page> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| Page::new(*t, "doc", i))
        .collect();
    let chunks = docchat::chunk::split_pages(&pages, &Config::default().chunking);
    let index = EmbeddingIndex::build(embedder.as_ref(), chunks).await.unwrap();

    let retriever = Retriever::new(Arc::new(index), embedder, 5, 0.7);
    let hits = retriever.search_with("the query", 3, 1.0).await.unwrap();

    let order: Vec<&str> = hits.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(order, vec!["near", "middle", "far"]);
}

#[tokio::test]
async fn empty_index_search_returns_empty_without_embedding() {
    let embedder = Arc::new(WordHashEmbedder::default());
    let index = EmbeddingIndex::build(embedder.as_ref(), Vec::new()).await.unwrap();

    let retriever = Retriever::new(Arc::new(index), embedder.clone(), 5, 0.7);
    let hits = retriever.search("any query at all").await.unwrap();

    assert!(hits.is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}
