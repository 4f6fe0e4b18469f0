//! Embedding Provider interface (spec.md §6, external collaborator).
//!
//! The embedding backend itself (any service mapping text to a
//! fixed-dimension vector) is out of scope for the core; this module only
//! reifies the contract the rest of the pipeline depends on, plus a
//! deterministic in-process implementation for tests and the demo binary.
//! Shaped after a mock-embedding-model code path, generalised into an
//! `async_trait` so a real network-calling provider can be swapped in
//! without touching callers.

use async_trait::async_trait;

use crate::error::SummarizerResult;

/// Maps text to fixed-length dense vectors. Implementations must return
/// vectors of exactly [`EmbeddingProvider::dimension`] length and must be
/// ready to serve `embed`/`embed_batch` once `initialise` returns `Ok`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Prepares the provider for use (loads a model, opens a connection).
    /// Idempotent.
    async fn initialise(&self) -> SummarizerResult<()>;

    /// Embeds a single piece of text.
    async fn embed(&self, text: &str) -> SummarizerResult<Vec<f32>>;

    /// Embeds a batch of texts. Default implementation embeds one at a
    /// time; real backends should override this to batch the RPC.
    async fn embed_batch(&self, texts: &[String]) -> SummarizerResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Fixed dimension of every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Human-readable provider name, used in [`crate::model::ProviderInfo`].
    fn name(&self) -> &str;
}

/// Deterministic, network-free embedding provider: hashes overlapping
/// character shingles of the input into a fixed-length vector and
/// normalises it. Good enough to exercise cosine similarity and RRF in
/// tests without a real model.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn initialise(&self) -> SummarizerResult<()> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> SummarizerResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = crate::retrieval::tokenize(text);
        for token in &tokens {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            std::hash::Hash::hash(token, &mut hasher);
            let bucket = (std::hash::Hasher::finish(&hasher) as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic_and_unit_length() {
        let provider = MockEmbeddingProvider::new(32);
        let a = provider.embed("the quick brown fox").await.unwrap();
        let b = provider.embed("the quick brown fox").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5 || norm == 0.0);
    }

    #[tokio::test]
    async fn distinct_texts_yield_distinct_vectors() {
        let provider = MockEmbeddingProvider::new(32);
        let a = provider.embed("alpha beta gamma").await.unwrap();
        let b = provider.embed("delta epsilon zeta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn embed_batch_matches_individual_embeds() {
        let provider = MockEmbeddingProvider::new(16);
        let texts = vec!["one".to_string(), "two".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        let individual: Vec<Vec<f32>> = vec![
            provider.embed("one").await.unwrap(),
            provider.embed("two").await.unwrap(),
        ];
        assert_eq!(batch, individual);
    }
}
