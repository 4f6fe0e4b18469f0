//! CLI front-end for `leafmark-summarizer`. Reads one input file, runs it
//! through the pipeline, and prints the resulting summary.
//!
//! A subcommand-free, flat-flag `clap`-derive CLI.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use leafmark_summarizer::config::{init_logging, SummarizerConfig};
use leafmark_summarizer::embedding::{EmbeddingProvider, MockEmbeddingProvider};
use leafmark_summarizer::llm::{LlmProvider, MockLlmProvider, OllamaLlmProvider};
use leafmark_summarizer::store::MemoryVectorStore;
use leafmark_summarizer::{SummarizeRequest, SummarizerPipeline};

#[derive(Parser, Debug)]
#[command(name = "leafmark-summarize", about = "Summarise a document or anthology")]
struct Cli {
    /// Input file: .txt, .md/.markdown, or .zip
    input: PathBuf,

    /// Vector-store collection to read/write segments and cached summaries in.
    #[arg(long, default_value = "default")]
    collection: String,

    /// Optional focus query steering retrieval and synthesis.
    #[arg(long)]
    focus: Option<String>,

    /// Drop and rebuild the collection before summarising.
    #[arg(long)]
    reindex: bool,

    /// Ollama endpoint to use as the LLM backend. Omit to use the
    /// deterministic mock provider (no network calls).
    #[arg(long)]
    ollama_endpoint: Option<String>,

    /// Model name passed to the Ollama endpoint.
    #[arg(long, default_value = "llama3")]
    ollama_model: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = SummarizerConfig::default();
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("failed to initialise logging: {e}");
    }

    let llm: Arc<dyn LlmProvider> = match &cli.ollama_endpoint {
        Some(endpoint) => Arc::new(OllamaLlmProvider::new(cli.ollama_model.clone(), endpoint.clone())),
        None => Arc::new(MockLlmProvider::default()),
    };
    let embedding: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::default());
    let store = Arc::new(MemoryVectorStore::new());

    let pipeline = SummarizerPipeline::new(config, embedding, llm, store);

    let request = SummarizeRequest {
        collection: cli.collection,
        focus_query: cli.focus,
        force_reindex: cli.reindex,
    };

    match pipeline.summarize_path(&cli.input, &request).await {
        Ok(outcome) => {
            println!("{}", outcome.summary.text);
            if let Some(detail) = outcome.collection_detail {
                eprintln!(
                    "(summarised {}/{} works, mode {:?})",
                    detail.summarized_works, detail.total_works, outcome.mode
                );
            } else {
                eprintln!("(mode {:?})", outcome.mode);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
