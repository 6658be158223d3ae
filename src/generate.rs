//! Answer generation: prompt template, generation backend trait, and
//! the Groq/OpenAI-compatible chat backend.
//!
//! The generation side of the pipeline is a single typed function:
//! [`AnswerGenerator::generate`] substitutes the retrieved context and
//! the question into a fixed instruction template, invokes the backend
//! with the resulting prompt, and trims the output. Backends may be
//! non-deterministic (temperature above zero) and are treated as opaque
//! text-in/text-out.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::GenerationError;

/// Instruction template for grounded answers.
///
/// The model must answer only from the supplied context, prefer bullet
/// points, include definitions verbatim when present, and render
/// comparisons as a table.
pub const ANSWER_TEMPLATE: &str = "\
You are an academic assistant.

Rules:
- Answer ONLY from the context
- Use bullet points if possible
- If definitions exist, include them
- If comparison is asked, answer in a table

Context:
{context}

Question:
{question}

Answer:
";

/// Trait for generation backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the model identifier (e.g. `"llama-3.1-8b-instant"`).
    fn model_name(&self) -> &str;

    /// Produce a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A prompt template with literal `{context}` and `{question}` slots.
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute both slots in a single pass over the template.
    ///
    /// Substitution is literal: slot markers occurring inside the
    /// substituted values are left untouched (no recursive expansion).
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(stripped) = tail.strip_prefix("{context}") {
                out.push_str(context);
                rest = stripped;
            } else if let Some(stripped) = tail.strip_prefix("{question}") {
                out.push_str(question);
                rest = stripped;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// Composes template substitution, backend invocation, and output
/// normalization into one answer-generation function.
pub struct AnswerGenerator {
    template: PromptTemplate,
    backend: Arc<dyn GenerationBackend>,
}

// Manual impl: the backend is a trait object.
impl fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("model", &self.backend.model_name())
            .finish_non_exhaustive()
    }
}

impl AnswerGenerator {
    pub fn new(template: PromptTemplate, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { template, backend }
    }

    /// Generate a grounded answer for `question` given retrieved
    /// `context`.
    pub async fn generate(&self, context: &str, question: &str) -> Result<String, GenerationError> {
        let prompt = self.template.render(context, question);
        let raw = self
            .backend
            .generate(&prompt)
            .await
            .map_err(GenerationError::Backend)?;
        Ok(raw.trim().to_string())
    }
}

/// Generation backend speaking the OpenAI `POST /chat/completions`
/// protocol, defaulting to the Groq endpoint.
///
/// Requires the `GROQ_API_KEY` environment variable. Retry behavior
/// matches the embedding backend: 429/5xx/network errors back off
/// exponentially, other client errors fail immediately.
pub struct HttpGenerationBackend {
    config: GenerationConfig,
    client: reqwest::Client,
}

impl HttpGenerationBackend {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        if std::env::var("GROQ_API_KEY").is_err() {
            bail!("GROQ_API_KEY environment variable not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key =
            std::env::var("GROQ_API_KEY").map_err(|_| anyhow::anyhow!("GROQ_API_KEY not set"))?;

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, delay_secs = delay.as_secs(), "retrying generation request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("chat API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("chat API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("generation failed after retries")))
    }
}

/// Pull the first choice's message content out of a chat-completions
/// response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("invalid chat response: missing choices[0].message.content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_both_slots() {
        let template = PromptTemplate::new("C: {context}\nQ: {question}\n");
        let out = template.render("some facts", "what?");
        assert_eq!(out, "C: some facts\nQ: what?\n");
    }

    #[test]
    fn test_render_is_not_recursive() {
        let template = PromptTemplate::new("{context}|{question}");
        let out = template.render("literal {question} inside", "q");
        assert_eq!(out, "literal {question} inside|q");
    }

    #[test]
    fn test_render_leaves_unknown_braces_alone() {
        let template = PromptTemplate::new("{other} {context}");
        let out = template.render("ctx", "q");
        assert_eq!(out, "{other} ctx");
    }

    #[test]
    fn test_answer_template_has_both_slots() {
        assert!(ANSWER_TEMPLATE.contains("{context}"));
        assert!(ANSWER_TEMPLATE.contains("{question}"));
    }

    #[test]
    fn test_parse_completion_response() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "An answer." } }]
        });
        assert_eq!(parse_completion_response(&json).unwrap(), "An answer.");
        assert!(parse_completion_response(&serde_json::json!({})).is_err());
    }
}
