//! # advisor-runtime
//!
//! Text-generation backends for the weather advisor.
//!
//! ## Providers
//!
//! - **Gemini** (default): hosted generation, needs `GEMINI_API_KEY`
//! - **Ollama**: local inference, no credential
//!
//! ## Usage
//!
//! ```rust,ignore
//! use advisor_runtime::{GeminiProvider, ProviderKind};
//!
//! let provider = advisor_runtime::from_env(ProviderKind::Gemini)?;
//! let completion = provider.complete(&messages, &options).await?;
//! ```

#[cfg(feature = "gemini")]
mod lines;

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

use std::sync::Arc;

// Re-export core types for convenience
pub use advisor_core::{
    GenerationOptions, LlmProvider, Message, ProviderError, Result, Role, StreamChunk,
};

/// Which generation backend to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ProviderError::Config(format!(
                "unknown LLM_PROVIDER '{other}' (expected gemini or ollama)"
            ))),
        }
    }
}

/// Build the shared provider handle for `kind` from environment variables.
///
/// Returns the provider together with its default model name.
pub fn from_env(kind: ProviderKind) -> Result<(Arc<dyn LlmProvider>, String)> {
    match kind {
        #[cfg(feature = "gemini")]
        ProviderKind::Gemini => {
            let provider = GeminiProvider::from_env()?;
            let model = provider.model().to_string();
            Ok((Arc::new(provider), model))
        }
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => {
            let provider = OllamaProvider::from_env()?;
            let model = provider.model().to_string();
            Ok((Arc::new(provider), model))
        }
        #[allow(unreachable_patterns)]
        other => Err(ProviderError::Config(format!(
            "provider {other:?} not compiled in"
        ))),
    }
}
