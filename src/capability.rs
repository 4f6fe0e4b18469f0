//! Service Capability Model (spec.md component H).
//!
//! Decides which summarisation strategy to run given which external
//! collaborators are actually reachable, and derives PDF-chunking
//! parameters from whether a GPU-backed converter is available. Shaped
//! after a health-monitor pattern of tracking per-service status
//! independently and combining it into one report, generalised from a
//! periodic background health check to a one-shot startup capability
//! probe run with `tokio::join!`.

use serde::{Deserialize, Serialize};

use crate::llm::LlmProvider;

/// Raw probe results for every external collaborator the pipeline can use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ServiceProbe {
    pub llm_available: bool,
    pub pdf_converter_available: bool,
    pub pdf_has_gpu: bool,
    pub vector_db_available: bool,
}

/// Runs `llm.is_available()` alongside the caller-supplied PDF/vector-db
/// probes concurrently, per spec.md §4.8 ("Probes run concurrently").
pub async fn probe(
    llm: &dyn LlmProvider,
    pdf_converter_available: bool,
    pdf_has_gpu: bool,
    vector_db_available: bool,
) -> ServiceProbe {
    let (llm_available,) = tokio::join!(llm.is_available());
    ServiceProbe {
        llm_available,
        pdf_converter_available,
        pdf_has_gpu,
        vector_db_available,
    }
}

/// Summarisation strategy selected by [`ServiceProbe::select_mode`] when
/// the caller requests `Auto`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SummarizationMode {
    /// Full pipeline: extractive retrieval + LLM synthesis, backed by a
    /// persistent vector store.
    BertRag,
    /// Extractive retrieval + LLM synthesis, in-memory vectors only.
    BertHybrid,
    /// Pure extractive: concatenates the top-RRF segments, no LLM call.
    Bert,
}

impl ServiceProbe {
    /// Chooses a mode from the probed capabilities (spec.md §4.8).
    pub fn select_mode(&self) -> SummarizationMode {
        match (self.llm_available, self.vector_db_available) {
            (true, true) => SummarizationMode::BertRag,
            (true, false) => SummarizationMode::BertHybrid,
            (false, _) => SummarizationMode::Bert,
        }
    }
}

/// Pages-per-chunk and allowed concurrency for PDF conversion, derived
/// from whether the converter has GPU acceleration. With a GPU the
/// converter parallelises internally, so the caller should submit larger
/// chunks one at a time; without one, smaller chunks submitted with more
/// concurrency keep throughput up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PdfChunkParams {
    pub pages_per_chunk: usize,
    pub concurrency: usize,
}

impl ServiceProbe {
    pub fn pdf_chunk_params(&self) -> PdfChunkParams {
        if self.pdf_has_gpu {
            PdfChunkParams { pages_per_chunk: 32, concurrency: 1 }
        } else {
            PdfChunkParams { pages_per_chunk: 8, concurrency: 4 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmProvider;

    #[tokio::test]
    async fn llm_and_vector_db_select_rag_mode() {
        let llm = MockLlmProvider::default();
        let probed = probe(&llm, false, false, true).await;
        assert_eq!(probed.select_mode(), SummarizationMode::BertRag);
    }

    #[test]
    fn llm_only_selects_hybrid_mode() {
        let probed = ServiceProbe { llm_available: true, vector_db_available: false, ..Default::default() };
        assert_eq!(probed.select_mode(), SummarizationMode::BertHybrid);
    }

    #[test]
    fn no_llm_selects_pure_extractive_mode() {
        let probed = ServiceProbe::default();
        assert_eq!(probed.select_mode(), SummarizationMode::Bert);
    }

    #[test]
    fn gpu_pdf_converter_uses_larger_chunks_and_no_extra_concurrency() {
        let probed = ServiceProbe { pdf_has_gpu: true, ..Default::default() };
        let params = probed.pdf_chunk_params();
        assert_eq!(params.concurrency, 1);
        assert!(params.pages_per_chunk > 8);
    }

    #[test]
    fn cpu_pdf_converter_uses_more_concurrency() {
        let probed = ServiceProbe { pdf_has_gpu: false, ..Default::default() };
        assert!(probed.pdf_chunk_params().concurrency >= 2);
    }
}
