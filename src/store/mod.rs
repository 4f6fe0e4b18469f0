//! Vector Store Interface (spec.md component D) and Summary Cache Layer
//! (spec.md component I).
//!
//! Generalises a flat id->embedding map (store/search/delete/stats) to
//! the full contract this pipeline needs: per-document segment
//! lifecycles, content-hash based reuse, stale-segment eviction, and
//! evidence-hash keyed summary caching.

pub mod memory;

use async_trait::async_trait;

use crate::error::SummarizerResult;
use crate::model::{DocumentSummary, Segment};

pub use memory::MemoryVectorStore;

/// Persistence and nearest-neighbour search contract consumed by the
/// retrieval engine and the summary cache layer. Implementations must be
/// `Send + Sync` so a store can be shared across concurrently-mapped works.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotently creates `collection` with the given embedding
    /// dimension if it does not already exist.
    async fn initialise(&self, collection: &str, vector_dim: usize) -> SummarizerResult<()>;

    /// True iff any segment belonging to `doc_hash` is already stored.
    async fn has_document(&self, collection: &str, doc_hash: &str) -> SummarizerResult<bool>;

    /// Replace-by-id upsert. Segments without an embedding are skipped.
    async fn upsert_segments(&self, collection: &str, segments: &[Segment]) -> SummarizerResult<()>;

    /// Top-`top_k` segments by cosine similarity to `query_embedding`,
    /// optionally restricted to a single document by `doc_hash` prefix.
    /// Populates `query_similarity` on each returned segment.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        top_k: usize,
        doc_hash: Option<&str>,
    ) -> SummarizerResult<Vec<Segment>>;

    /// All segments belonging to `doc_hash`, ordered by `index`.
    async fn get_document_segments(
        &self,
        collection: &str,
        doc_hash: &str,
    ) -> SummarizerResult<Vec<Segment>>;

    /// Looks up stored segments by their `content_hash`, for granular reuse
    /// when only part of a document changed between ingests.
    async fn get_segments_by_hash(
        &self,
        collection: &str,
        content_hashes: &[String],
    ) -> SummarizerResult<Vec<Segment>>;

    /// Deletes segments belonging to `doc_hash` whose `content_hash` is not
    /// in `valid_hashes`. Segments of other documents are never touched.
    async fn remove_stale_segments(
        &self,
        collection: &str,
        doc_hash: &str,
        valid_hashes: &[String],
    ) -> SummarizerResult<usize>;

    /// Cached summary for `evidence_hash`, if one was stored previously.
    async fn get_cached_summary(
        &self,
        collection: &str,
        evidence_hash: &str,
    ) -> SummarizerResult<Option<DocumentSummary>>;

    /// Stores `summary` keyed by `evidence_hash`.
    async fn cache_summary(
        &self,
        collection: &str,
        evidence_hash: &str,
        summary: DocumentSummary,
    ) -> SummarizerResult<()>;

    /// Removes every segment and cached summary belonging to `collection`.
    async fn delete_collection(&self, collection: &str) -> SummarizerResult<()>;

    /// Removes every segment belonging to `doc_hash` within `collection`.
    async fn delete_document(&self, collection: &str, doc_hash: &str) -> SummarizerResult<usize>;
}

/// Computes the evidence hash used to key the summary cache:
/// `H(sorted(content_hashes) || model_id || prompt_template_version)`.
pub fn evidence_hash(content_hashes: &[String], model_id: &str, prompt_version: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut sorted = content_hashes.to_vec();
    sorted.sort();
    let mut hasher = Sha256::new();
    hasher.update(sorted.join(",").as_bytes());
    hasher.update(b"|");
    hasher.update(model_id.as_bytes());
    hasher.update(b"|");
    hasher.update(prompt_version.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(16).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_hash_is_order_independent_over_content_hashes() {
        let a = evidence_hash(&["h1".into(), "h2".into()], "model", "v1");
        let b = evidence_hash(&["h2".into(), "h1".into()], "model", "v1");
        assert_eq!(a, b);
    }

    #[test]
    fn evidence_hash_changes_with_model() {
        let a = evidence_hash(&["h1".into()], "model-a", "v1");
        let b = evidence_hash(&["h1".into()], "model-b", "v1");
        assert_ne!(a, b);
    }
}
