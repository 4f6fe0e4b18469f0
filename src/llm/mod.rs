//! LLM provider interface (spec.md §6, external collaborator) and its
//! concrete adapters: a real network-calling Ollama client plus a
//! deterministic mock used by tests and the demo binary.

pub mod ollama;
pub mod provider;
pub mod types;

pub use ollama::OllamaLlmProvider;
pub use provider::{generate_json, LlmProvider, MockLlmProvider};
pub use types::{ChatMessage, ChatRole, GenerationOptions, UsageStats};
