//! Generation Provider Strategy Pattern
//!
//! Defines a common interface for text-generation backends (Gemini, Ollama)
//! so the advisory composer works with any backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use advisor_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = GeminiProvider::from_env()?;
//!
//! // Single-shot
//! let completion = provider.complete(&messages, &options).await?;
//!
//! // Incremental
//! let mut stream = provider.complete_stream(&messages, &options).await?;
//! while let Some(chunk) = stream.next().await { /* ... */ }
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::message::Message;

/// Configuration for LLM generation
#[derive(Clone, Debug)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gemini-1.5-flash", "llama3.2")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    pub top_p: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".into(),
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 0.9,
        }
    }
}

impl GenerationOptions {
    /// Options for a specific model, defaults elsewhere
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

/// Reason for completion finishing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// A chunk from streaming completion
#[derive(Clone, Debug)]
pub struct StreamChunk {
    /// The text delta
    pub delta: String,

    /// Whether the backend flagged this as its last chunk
    pub done: bool,
}

impl StreamChunk {
    /// A mid-stream text segment
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            done: false,
        }
    }

    /// Empty end-of-generation marker
    pub const fn finished() -> Self {
        Self {
            delta: String::new(),
            done: true,
        }
    }
}

/// Stream type for completion streaming.
///
/// The stream ending (`None`) is the backend's normal end-of-generation.
/// An `Err` item is a generation failure; consumers stop at the first one.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Strategy trait for generation providers
///
/// Implement this trait to add support for new LLM backends.
/// A single instance is shared read-only by every request.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name used in logs and health output
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// Generate a streaming completion
    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_for_model_keeps_sampling_defaults() {
        let opts = GenerationOptions::for_model("llama3.2");
        assert_eq!(opts.model, "llama3.2");
        assert_eq!(opts.max_tokens, 2048);
        assert!((opts.top_p - 0.9).abs() < f32::EPSILON);
    }
}
