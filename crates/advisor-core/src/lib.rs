//! # advisor-core
//!
//! Provider-agnostic text-generation abstraction and the process-scoped
//! metrics handle shared by the weather advisor crates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Advice Orchestrator                      │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────────────────────┐  │
//! │  │ Resolver │──▶│ Fetcher  │──▶│ Composer ─▶ LlmProvider  │  │
//! │  └──────────┘   └──────────┘   │            (Strategy)    │  │
//! │                                └──────────────────────────┘  │
//! │                    AdvisorMetrics (shared)                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Gemini, Ollama, or any
//! other backend without changing the advisor logic.

pub mod error;
pub mod message;
pub mod metrics;
pub mod provider;

pub use error::{ProviderError, Result};
pub use message::{Message, Role};
pub use metrics::{AdvisorMetrics, Operation, Outcome};
pub use provider::{CompletionStream, GenerationOptions, LlmProvider, StreamChunk};
