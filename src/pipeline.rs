//! Top-level orchestration: ties every component together into the two
//! paths spec.md describes — single-document (embed -> retrieve top-K ->
//! synthesise) and hierarchical-collection (delegated to
//! [`crate::summarizer`]) — plus the startup lifecycle that prepares a
//! collection before either path runs.
//!
//! Shaped after a service struct holding `Arc`-shared collaborators, with
//! an `initialise` that idempotently prepares backing storage and a
//! single public entry point per use case.

use std::sync::Arc;

use tracing::info;

use crate::capability::{self, ServiceProbe, SummarizationMode};
use crate::collection;
use crate::config::SummarizerConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{SummarizerError, SummarizerResult};
use crate::handler::{HandlerRegistry, ProcessOptions};
use crate::llm::{GenerationOptions, LlmProvider};
use crate::markdown;
use crate::model::{CollectionInfo, DocumentSummary, ProviderInfo, RecommendedStrategy, Segment};
use crate::retrieval;
use crate::segment;
use crate::store::{evidence_hash, VectorStore};
use crate::summarizer::{self, CollectionSummaryResult};

/// Everything a single summarisation request needs beyond the document
/// itself: which collection to read/write and an optional user query used
/// to focus retrieval and the final synthesis prompt.
#[derive(Debug, Clone, Default)]
pub struct SummarizeRequest {
    pub collection: String,
    pub focus_query: Option<String>,
    pub force_reindex: bool,
}

/// Outcome of summarising one input, regardless of which path was taken.
#[derive(Debug, Clone)]
pub struct SummarizeOutcome {
    pub summary: DocumentSummary,
    pub mode: SummarizationMode,
    pub collection_info: CollectionInfo,
    pub collection_detail: Option<CollectionDetail>,
}

/// Extra detail populated only when the hierarchical path ran.
#[derive(Debug, Clone)]
pub struct CollectionDetail {
    pub total_works: usize,
    pub summarized_works: usize,
}

/// Owns every external collaborator and orchestrates both summarisation
/// paths. Cheap to clone: every field is an `Arc`.
#[derive(Clone)]
pub struct SummarizerPipeline {
    config: Arc<SummarizerConfig>,
    embedding: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    handlers: Arc<HandlerRegistry>,
}

impl SummarizerPipeline {
    pub fn new(
        config: SummarizerConfig,
        embedding: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            embedding,
            llm,
            store,
            handlers: Arc::new(HandlerRegistry::with_defaults()),
        }
    }

    /// Probes external collaborators and selects a [`SummarizationMode`]
    /// (spec.md §4.8). Callers that already know their mode can skip this.
    pub async fn probe(&self) -> ServiceProbe {
        capability::probe(self.llm.as_ref(), false, false, true).await
    }

    /// Prepares `collection` for use: initialises the embedding provider
    /// and creates the backing vector-store collection at the provider's
    /// dimension. Idempotent; safe to call before every request.
    pub async fn initialise_collection(&self, collection: &str) -> SummarizerResult<()> {
        self.embedding.initialise().await?;
        self.store.initialise(collection, self.embedding.dimension()).await?;
        Ok(())
    }

    /// Runs a file through its registered [`crate::handler::DocumentHandler`]
    /// and the full summarisation pipeline (spec.md §6 end-to-end flow).
    pub async fn summarize_path(
        &self,
        path: &std::path::Path,
        request: &SummarizeRequest,
    ) -> SummarizerResult<SummarizeOutcome> {
        let options = ProcessOptions { archive: self.config.archive.clone() };
        let content = self.handlers.process(path, &options)?;
        self.summarize_markdown(&content.markdown, content.title.as_deref(), request).await
    }

    /// Runs already-extracted markdown through the full pipeline: parse ->
    /// detect collection vs single document -> segment + embed + index ->
    /// synthesise (spec.md §4 end to end).
    pub async fn summarize_markdown(
        &self,
        markdown_source: &str,
        doc_title: Option<&str>,
        request: &SummarizeRequest,
    ) -> SummarizerResult<SummarizeOutcome> {
        self.initialise_collection(&request.collection).await?;
        if request.force_reindex {
            self.store.delete_collection(&request.collection).await?;
            self.initialise_collection(&request.collection).await?;
        }

        let parsed = markdown::parse(markdown_source);
        let info = collection::detect(doc_title, &parsed);

        match info.recommended_strategy {
            RecommendedStrategy::HierarchicalCollection => {
                let result = self.summarize_collection(markdown_source, &info, request).await?;
                Ok(SummarizeOutcome {
                    summary: result.summary,
                    mode: SummarizationMode::BertRag,
                    collection_detail: Some(CollectionDetail {
                        total_works: result.total_works,
                        summarized_works: result.summarized_works,
                    }),
                    collection_info: info,
                })
            }
            RecommendedStrategy::SingleDocument => {
                let probe = self.probe().await;
                let mode = probe.select_mode();
                let summary = self
                    .summarize_single_document(doc_title.unwrap_or("document"), &parsed, request, mode)
                    .await?;
                Ok(SummarizeOutcome { summary, mode, collection_info: info, collection_detail: None })
            }
        }
    }

    async fn summarize_collection(
        &self,
        markdown_source: &str,
        info: &CollectionInfo,
        request: &SummarizeRequest,
    ) -> SummarizerResult<CollectionSummaryResult> {
        let token = tokio_util::sync::CancellationToken::new();
        let result = summarizer::summarize_collection(
            markdown_source,
            info,
            request.focus_query.as_deref(),
            self.llm.as_ref(),
            self.store.as_ref(),
            &request.collection,
            &self.config.summarizer,
            self.llm.name(),
            &token,
        )
        .await?;

        result.ok_or_else(|| {
            SummarizerError::Internal("detect reported a collection but partition found none".into())
        })
    }

    /// Single-document path (spec.md §4.6): reuse prior embeddings for any
    /// segment whose content hash is unchanged, embed only the miss set,
    /// evict stale segments left over from a previous ingest of this
    /// document, then retrieve top-K segments with RRF and synthesise with
    /// the LLM (or concatenate the top segments verbatim when no LLM is
    /// available).
    async fn summarize_single_document(
        &self,
        doc_title: &str,
        parsed: &crate::model::ParsedDocument,
        request: &SummarizeRequest,
        mode: SummarizationMode,
    ) -> SummarizerResult<DocumentSummary> {
        let doc_id = crate::model::sanitise_id(doc_title);
        let mut segments = segment::extract(&doc_id, parsed, &self.config.segment);
        if segments.is_empty() {
            return Err(SummarizerError::InvalidInput("document has no extractable segments".into()));
        }

        let valid_hashes: Vec<String> = segments.iter().map(|s| s.content_hash.clone()).collect();
        let reusable = self.store.get_segments_by_hash(&request.collection, &valid_hashes).await?;
        let reusable_by_hash: std::collections::HashMap<&str, &Segment> =
            reusable.iter().map(|s| (s.content_hash.as_str(), s)).collect();

        let miss_indices: Vec<usize> = segments
            .iter_mut()
            .enumerate()
            .filter_map(|(i, segment)| {
                match reusable_by_hash.get(segment.content_hash.as_str()).and_then(|s| s.embedding.clone()) {
                    Some(embedding) => {
                        segment.embedding = Some(embedding);
                        None
                    }
                    None => Some(i),
                }
            })
            .collect();

        if !miss_indices.is_empty() {
            let miss_texts: Vec<String> =
                miss_indices.iter().map(|&i| segments[i].text.clone()).collect();
            let miss_embeddings = self.embedding.embed_batch(&miss_texts).await?;
            for (&i, embedding) in miss_indices.iter().zip(miss_embeddings) {
                segments[i].embedding = Some(embedding);
            }
        }

        self.store.upsert_segments(&request.collection, &segments).await?;
        self.store.remove_stale_segments(&request.collection, &doc_id, &valid_hashes).await?;

        let query = request.focus_query.clone().unwrap_or_else(|| doc_title.to_string());
        let query_embedding = self.embedding.embed(&query).await?;

        let top_indices =
            retrieval::retrieve(&mut segments, &query, Some(&query_embedding), &self.config.retrieval);
        let top_segments: Vec<&Segment> = top_indices.iter().map(|&i| &segments[i]).collect();

        let content_hashes: Vec<String> = top_segments.iter().map(|s| s.content_hash.clone()).collect();
        let evidence = evidence_hash(&content_hashes, self.llm.name(), "single-document-v1");

        if let Some(cached) = self.store.get_cached_summary(&request.collection, &evidence).await? {
            return Ok(cached);
        }

        let text = match mode {
            SummarizationMode::Bert => extractive_concat(&top_segments),
            SummarizationMode::BertHybrid | SummarizationMode::BertRag => {
                self.synthesize(doc_title, &top_segments, request.focus_query.as_deref()).await?
            }
        };

        let summary = DocumentSummary {
            text,
            evidence_hash: evidence.clone(),
            provider: ProviderInfo {
                name: self.llm.name().to_string(),
                model: self.llm.name().to_string(),
            },
            generated_at: chrono::Utc::now(),
        };

        self.store.cache_summary(&request.collection, &evidence, summary.clone()).await?;
        Ok(summary)
    }

    async fn synthesize(
        &self,
        doc_title: &str,
        segments: &[&Segment],
        focus_query: Option<&str>,
    ) -> SummarizerResult<String> {
        let mut prompt = format!(
            "Synthesise a concise, factual summary of \"{doc_title}\" using only the evidence below.\n"
        );
        if let Some(query) = focus_query {
            prompt.push_str(&format!("Focus particularly on: {query}\n"));
        }
        prompt.push('\n');
        for segment in segments {
            prompt.push_str(&format!("- {}\n", segment.text));
        }

        let options = GenerationOptions::default().with_temperature(0.3);
        info!(doc_title, segments = segments.len(), "synthesising single-document summary");
        self.llm.generate(&prompt, &options).await
    }
}

fn extractive_concat(segments: &[&Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummarizerConfig;
    use crate::embedding::MockEmbeddingProvider;
    use crate::llm::MockLlmProvider;
    use crate::store::MemoryVectorStore;

    fn pipeline() -> SummarizerPipeline {
        SummarizerPipeline::new(
            SummarizerConfig::default(),
            Arc::new(MockEmbeddingProvider::new(16)),
            Arc::new(MockLlmProvider::default()),
            Arc::new(MemoryVectorStore::new()),
        )
    }

    #[tokio::test]
    async fn single_document_path_produces_a_summary() {
        let pipeline = pipeline();
        let request = SummarizeRequest { collection: "test".into(), ..Default::default() };
        let markdown = "# An Essay\n\nThis essay discusses several important matters at length.\n\n## Section Two\n\nMore discussion follows here about the same matters.\n";
        let outcome = pipeline.summarize_markdown(markdown, Some("An Essay"), &request).await.unwrap();
        assert!(!outcome.summary.text.is_empty());
        assert!(outcome.collection_detail.is_none());
    }

    #[tokio::test]
    async fn collection_path_produces_work_counts() {
        let pipeline = pipeline();
        let request = SummarizeRequest { collection: "test-collection".into(), ..Default::default() };
        let markdown = format!(
            "# Complete Works\n# Hamlet\n{}\n# Macbeth\n{}\n",
            "word ".repeat(200),
            "word ".repeat(200)
        );
        let outcome =
            pipeline.summarize_markdown(&markdown, Some("Complete Works"), &request).await.unwrap();
        let detail = outcome.collection_detail.expect("collection path should report work counts");
        assert_eq!(detail.total_works, 2);
        assert_eq!(detail.summarized_works, 2);
    }

    #[tokio::test]
    async fn re_ingest_evicts_stale_segments_and_keeps_only_latest_hashes() {
        let pipeline = pipeline();
        let request = SummarizeRequest { collection: "reingest-test".into(), ..Default::default() };
        let v1 = "# A Document\n\nFirst revision of the paragraph with enough words to form a segment on its own.\n";
        let v2 = "# A Document\n\nSecond, shorter revision of that paragraph.\n";

        pipeline.summarize_markdown(v1, Some("A Document"), &request).await.unwrap();
        let doc_id = crate::model::sanitise_id("A Document");
        let after_v1 = pipeline.store.get_document_segments("reingest-test", &doc_id).await.unwrap();
        assert!(!after_v1.is_empty());

        pipeline.summarize_markdown(v2, Some("A Document"), &request).await.unwrap();
        let after_v2 = pipeline.store.get_document_segments("reingest-test", &doc_id).await.unwrap();

        let v2_parsed = markdown::parse(v2);
        let v2_segments = segment::extract(&doc_id, &v2_parsed, &pipeline.config.segment);
        let expected_hashes: std::collections::HashSet<&str> =
            v2_segments.iter().map(|s| s.content_hash.as_str()).collect();
        let stored_hashes: std::collections::HashSet<&str> =
            after_v2.iter().map(|s| s.content_hash.as_str()).collect();
        assert_eq!(stored_hashes, expected_hashes);
    }

    #[tokio::test]
    async fn repeated_request_hits_the_summary_cache() {
        let pipeline = pipeline();
        let request = SummarizeRequest { collection: "cache-test".into(), ..Default::default() };
        let markdown = "# A Document\n\nSome stable content that does not change between calls.\n";
        let first = pipeline.summarize_markdown(markdown, Some("A Document"), &request).await.unwrap();
        let second = pipeline.summarize_markdown(markdown, Some("A Document"), &request).await.unwrap();
        assert_eq!(first.summary.evidence_hash, second.summary.evidence_hash);
        assert_eq!(first.summary.text, second.summary.text);
    }
}
