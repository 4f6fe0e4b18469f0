//! In-memory reference implementation of [`super::VectorStore`]: an
//! in-process `HashMap`-backed index guarded by a per-collection
//! `RwLock`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SummarizerResult;
use crate::model::{DocumentSummary, Segment};
use crate::retrieval::cosine_similarity;

use super::VectorStore;

#[derive(Default)]
struct CollectionState {
    segments: HashMap<String, Segment>,
    summaries: HashMap<String, DocumentSummary>,
    vector_dim: usize,
}

/// Process-local vector store. The only mutable shared state the core
/// owns; every collection is guarded by its own lock so concurrent
/// readers/writers across collections never contend.
#[derive(Default, Clone)]
pub struct MemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, Arc<RwLock<CollectionState>>>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collection(&self, name: &str) -> Arc<RwLock<CollectionState>> {
        if let Some(state) = self.collections.read().await.get(name) {
            return state.clone();
        }
        let mut write = self.collections.write().await;
        write
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(CollectionState::default())))
            .clone()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn initialise(&self, collection: &str, vector_dim: usize) -> SummarizerResult<()> {
        let state = self.collection(collection).await;
        let mut guard = state.write().await;
        guard.vector_dim = vector_dim;
        Ok(())
    }

    async fn has_document(&self, collection: &str, doc_hash: &str) -> SummarizerResult<bool> {
        let state = self.collection(collection).await;
        let guard = state.read().await;
        let sanitised = crate::model::sanitise_id(doc_hash);
        Ok(guard
            .segments
            .values()
            .any(|s| s.id.starts_with(&sanitised) || s.content_hash.starts_with(doc_hash)))
    }

    async fn upsert_segments(&self, collection: &str, segments: &[Segment]) -> SummarizerResult<()> {
        let state = self.collection(collection).await;
        let mut guard = state.write().await;
        for segment in segments {
            if segment.embedding.is_none() {
                continue;
            }
            guard.segments.insert(segment.id.clone(), segment.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        top_k: usize,
        doc_hash: Option<&str>,
    ) -> SummarizerResult<Vec<Segment>> {
        let state = self.collection(collection).await;
        let guard = state.read().await;

        let mut scored: Vec<(f32, Segment)> = guard
            .segments
            .values()
            .filter(|s| doc_hash.map(|d| s.doc_id == d).unwrap_or(true))
            .filter_map(|s| {
                s.embedding.as_deref().map(|emb| {
                    let mut clone = s.clone();
                    clone.query_similarity = cosine_similarity(query_embedding, emb);
                    (clone.query_similarity, clone)
                })
            })
            .collect();

        scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(top_k).map(|(_, s)| s).collect())
    }

    async fn get_document_segments(
        &self,
        collection: &str,
        doc_hash: &str,
    ) -> SummarizerResult<Vec<Segment>> {
        let state = self.collection(collection).await;
        let guard = state.read().await;
        let mut result: Vec<Segment> =
            guard.segments.values().filter(|s| s.doc_id == doc_hash).cloned().collect();
        result.sort_by_key(|s| s.index);
        Ok(result)
    }

    async fn get_segments_by_hash(
        &self,
        collection: &str,
        content_hashes: &[String],
    ) -> SummarizerResult<Vec<Segment>> {
        let state = self.collection(collection).await;
        let guard = state.read().await;
        let wanted: std::collections::HashSet<&String> = content_hashes.iter().collect();
        Ok(guard
            .segments
            .values()
            .filter(|s| wanted.contains(&s.content_hash))
            .cloned()
            .collect())
    }

    async fn remove_stale_segments(
        &self,
        collection: &str,
        doc_hash: &str,
        valid_hashes: &[String],
    ) -> SummarizerResult<usize> {
        let state = self.collection(collection).await;
        let mut guard = state.write().await;
        let valid: std::collections::HashSet<&String> = valid_hashes.iter().collect();
        let stale_ids: Vec<String> = guard
            .segments
            .values()
            .filter(|s| s.doc_id == doc_hash && !valid.contains(&s.content_hash))
            .map(|s| s.id.clone())
            .collect();
        let removed = stale_ids.len();
        for id in stale_ids {
            guard.segments.remove(&id);
        }
        Ok(removed)
    }

    async fn get_cached_summary(
        &self,
        collection: &str,
        evidence_hash: &str,
    ) -> SummarizerResult<Option<DocumentSummary>> {
        let state = self.collection(collection).await;
        let guard = state.read().await;
        Ok(guard.summaries.get(evidence_hash).cloned())
    }

    async fn cache_summary(
        &self,
        collection: &str,
        evidence_hash: &str,
        summary: DocumentSummary,
    ) -> SummarizerResult<()> {
        let state = self.collection(collection).await;
        let mut guard = state.write().await;
        guard.summaries.insert(evidence_hash.to_string(), summary);
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> SummarizerResult<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, doc_hash: &str) -> SummarizerResult<usize> {
        let state = self.collection(collection).await;
        let mut guard = state.write().await;
        let ids: Vec<String> = guard
            .segments
            .values()
            .filter(|s| s.doc_id == doc_hash)
            .map(|s| s.id.clone())
            .collect();
        let removed = ids.len();
        for id in ids {
            guard.segments.remove(&id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderInfo;

    fn segment_with_embedding(doc: &str, idx: usize, text: &str, embedding: Vec<f32>) -> Segment {
        let mut s = Segment::new(doc, idx, text.to_string(), vec![]);
        s.embedding = Some(embedding);
        s
    }

    #[tokio::test]
    async fn upsert_then_search_returns_nearest() {
        let store = MemoryVectorStore::new();
        store.initialise("col", 2).await.unwrap();
        let segments = vec![
            segment_with_embedding("doc1", 0, "a", vec![1.0, 0.0]),
            segment_with_embedding("doc1", 1, "b", vec![0.0, 1.0]),
        ];
        store.upsert_segments("col", &segments).await.unwrap();

        let results = store.search("col", &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "doc1_0");
    }

    #[tokio::test]
    async fn has_document_matches_sanitised_id_prefix_or_content_hash_prefix() {
        let store = MemoryVectorStore::new();
        store.initialise("col", 2).await.unwrap();
        let mut seg = segment_with_embedding("My Doc.md", 0, "a", vec![1.0, 0.0]);
        seg.content_hash = "abcd1234".into();
        store.upsert_segments("col", &[seg]).await.unwrap();

        assert!(store.has_document("col", "My Doc.md").await.unwrap());
        assert!(store.has_document("col", "abcd1234").await.unwrap());
        assert!(!store.has_document("col", "no-such-doc").await.unwrap());
    }

    #[tokio::test]
    async fn stale_segments_are_evicted_without_touching_other_docs() {
        let store = MemoryVectorStore::new();
        store.initialise("col", 2).await.unwrap();
        let mut seg_a = segment_with_embedding("doc1", 0, "a", vec![1.0, 0.0]);
        seg_a.content_hash = "hash_a".into();
        let mut seg_b = segment_with_embedding("doc2", 0, "b", vec![0.0, 1.0]);
        seg_b.content_hash = "hash_b".into();
        store.upsert_segments("col", &[seg_a, seg_b]).await.unwrap();

        let removed = store.remove_stale_segments("col", "doc1", &[]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_document_segments("col", "doc1").await.unwrap().is_empty());
        assert_eq!(store.get_document_segments("col", "doc2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn summary_cache_roundtrips() {
        let store = MemoryVectorStore::new();
        let summary = DocumentSummary {
            text: "summary text".into(),
            evidence_hash: "ev1".into(),
            provider: ProviderInfo { name: "mock".into(), model: "mock-1".into() },
            generated_at: chrono::Utc::now(),
        };
        assert!(store.get_cached_summary("col", "ev1").await.unwrap().is_none());
        store.cache_summary("col", "ev1", summary.clone()).await.unwrap();
        assert_eq!(store.get_cached_summary("col", "ev1").await.unwrap(), Some(summary));
    }
}
