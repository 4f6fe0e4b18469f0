//! # leafmark-summarizer
//!
//! Hybrid extractive/abstractive summarisation over single documents and
//! multi-work anthologies (e.g. a "Complete Works" collection): archive
//! ingestion, markdown parsing, segment extraction, collection detection,
//! hybrid (BM25 + dense + salience) retrieval, and an LLM synthesis layer,
//! with an in-process vector store and deterministic mock providers so the
//! whole pipeline runs without any network service configured.
//!
//! ## Pipeline
//!
//! [`pipeline::SummarizerPipeline`] is the single entry point: it accepts a
//! file or raw markdown, classifies it as a standalone work or a collection
//! ([`collection::detect`]), and takes one of two paths:
//!
//! - **Single document**: [`segment::extract`] -> embed -> [`retrieval::retrieve`]
//!   (hybrid RRF) -> LLM synthesis over the top segments.
//! - **Collection**: [`summarizer::summarize_collection`] partitions the
//!   document into works, samples a representative subset, summarises each
//!   (map), then synthesises one final summary (reduce).
//!
//! A [`capability::ServiceProbe`] decides, per request, whether an LLM and a
//! persistent vector store are actually reachable and selects a
//! [`capability::SummarizationMode`] accordingly — falling back to pure
//! extractive concatenation when no LLM is available.

pub mod archive;
pub mod capability;
pub mod collection;
pub mod config;
pub mod embedding;
pub mod error;
pub mod handler;
pub mod llm;
pub mod markdown;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod retrieval;
pub mod segment;
pub mod store;
pub mod summarizer;

pub use config::SummarizerConfig;
pub use error::{SummarizerError, SummarizerResult};
pub use pipeline::{SummarizeOutcome, SummarizeRequest, SummarizerPipeline};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use embedding::MockEmbeddingProvider;
    use llm::MockLlmProvider;
    use store::MemoryVectorStore;

    #[tokio::test]
    async fn pipeline_builds_from_public_reexports_end_to_end() {
        let pipeline = SummarizerPipeline::new(
            SummarizerConfig::default(),
            Arc::new(MockEmbeddingProvider::new(16)),
            Arc::new(MockLlmProvider::default()),
            Arc::new(MemoryVectorStore::new()),
        );

        let request = SummarizeRequest { collection: "doctest".into(), ..Default::default() };
        let markdown = "# A Short Report\n\nThis report covers one topic in moderate detail across a couple of paragraphs.\n\n## Findings\n\nThe findings section elaborates on the topic further.\n";
        let outcome = pipeline.summarize_markdown(markdown, Some("A Short Report"), &request).await.unwrap();
        assert!(!outcome.summary.text.is_empty());
    }
}
