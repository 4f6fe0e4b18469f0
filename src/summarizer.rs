//! Hierarchical Summariser (spec.md component G): partitions a detected
//! collection into works, samples a representative subset, summarises
//! each sampled work independently (map), and synthesises the per-work
//! summaries into one final summary (reduce).
//!
//! Shaped after a map-reduce README compressor (section scoring ->
//! budget allocation -> synthesis), generalised from one document's
//! sections to many works across a whole collection, and after a
//! phased-service lifecycle (chunk -> embed -> index -> search) for the
//! DETECT/PARTITION/SAMPLE/MAP/REDUCE state progression.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::collection::{self, quick_is_collection};
use crate::config::SummarizerPhaseConfig;
use crate::error::{SummarizerError, SummarizerResult};
use crate::llm::{GenerationOptions, LlmProvider};
use crate::markdown;
use crate::model::{CollectionInfo, DocumentSummary, ProviderInfo, WorkInfo, WorkPartition, WorkType};
use crate::store::{self, VectorStore};

/// Mirrors the summarisation job's state machine (spec.md §4.7), emitted
/// as tracing events for observability rather than polled by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Ready,
    Detecting,
    Partitioning,
    Sampling,
    Mapping { completed: usize, total: usize },
    Reducing,
    Done,
    Failed(String),
}

fn check_cancelled(token: &CancellationToken) -> SummarizerResult<()> {
    if token.is_cancelled() {
        Err(SummarizerError::Cancelled)
    } else {
        Ok(())
    }
}

/// Walks `markdown` line by line and splits it into [`WorkPartition`]s at
/// each `# ` heading that is not a meta/quick-collection title (spec.md
/// §4.7 PARTITION). Works whose content is ≤100 characters are dropped.
pub fn partition(markdown: &str, is_shakespeare: bool) -> Vec<WorkPartition> {
    let mut works: Vec<(String, String)> = Vec::new(); // (title, content)

    for line in markdown.lines() {
        if let Some(title) = line.strip_prefix("# ") {
            let title = title.trim();
            if quick_is_collection(title) {
                continue;
            }
            works.push((title.to_string(), String::new()));
            continue;
        }
        if let Some((_, content)) = works.last_mut() {
            content.push_str(line);
            content.push('\n');
        }
    }

    works
        .into_iter()
        .filter(|(_, content)| content.trim().len() > 100)
        .enumerate()
        .map(|(index, (title, content))| {
            let content = content.trim().to_string();
            let word_count = content.split_whitespace().count();
            let work_type = collection::infer_work_type(&title, is_shakespeare);
            WorkPartition {
                title: title.clone(),
                content,
                index,
                word_count,
                work_info: Some(WorkInfo { title, work_type }),
            }
        })
        .collect()
}

fn work_type_of(work: &WorkPartition) -> WorkType {
    work.work_info.as_ref().map(|w| w.work_type.clone()).unwrap_or(WorkType::Unknown)
}

/// Selects a representative subset of `works` when there are more than
/// `max_works` (spec.md §4.7 SAMPLE). Returns all works unchanged when
/// already within budget.
pub fn sample(works: &[WorkPartition], max_works: usize) -> Vec<WorkPartition> {
    if works.len() <= max_works {
        return works.to_vec();
    }

    let mut by_type: HashMap<WorkType, Vec<&WorkPartition>> = HashMap::new();
    for work in works {
        by_type.entry(work_type_of(work)).or_default().push(work);
    }

    let num_types = by_type.len().max(1);
    let quota = (max_works / num_types).max(2);

    let mut selected_indices: std::collections::BTreeSet<usize> = std::collections::BTreeSet::new();

    for group in by_type.values() {
        let n = group.len();
        if n == 0 {
            continue;
        }
        let mut taken: Vec<usize> = Vec::new();
        taken.push(0);
        if quota > 1 && n > 1 {
            taken.push(n - 1);
        }
        let remaining = quota.saturating_sub(taken.len());
        if remaining > 0 && n > taken.len() {
            for step in 1..=remaining {
                let pos = (step * n) / (remaining + 1);
                let pos = pos.min(n - 1);
                if !taken.contains(&pos) {
                    taken.push(pos);
                }
            }
        }
        for pos in taken {
            if let Some(work) = group.get(pos) {
                selected_indices.insert(work.index);
            }
        }
    }

    if selected_indices.len() < max_works {
        let mut remainder: Vec<&WorkPartition> = works
            .iter()
            .filter(|w| !selected_indices.contains(&w.index))
            .collect();
        remainder.sort_by(|a, b| b.word_count.cmp(&a.word_count));
        for work in remainder {
            if selected_indices.len() >= max_works {
                break;
            }
            selected_indices.insert(work.index);
        }
    }

    works.iter().filter(|w| selected_indices.contains(&w.index)).cloned().collect()
}

/// Summarises a single work (spec.md §4.7 MAP). Long works are excerpted
/// (beginning/middle/end, 2,000 chars each); short works are summarised
/// whole, up to 8,000 chars.
pub async fn map_work(
    work: &WorkPartition,
    llm: &dyn LlmProvider,
    config: &SummarizerPhaseConfig,
) -> String {
    let prompt = build_map_prompt(work, config);
    let options = GenerationOptions::default()
        .with_temperature(0.3)
        .with_system_prompt(
            "You summarise a single literary or expository work concisely and factually.",
        );

    match llm.generate(&prompt, &options).await {
        Ok(raw) => clean_summary(&raw),
        Err(e) => format!("(Failed to summarize: {e})"),
    }
}

fn build_map_prompt(work: &WorkPartition, config: &SummarizerPhaseConfig) -> String {
    let body = if work.word_count < config.long_work_words {
        truncate_chars(&work.content, 8_000)
    } else {
        excerpt_beginning_middle_end(&work.content)
    };

    format!(
        "Summarise the following work titled \"{}\" in approximately {} words.\n\n{}",
        work.title, config.target_words_per_work, body
    )
}

fn excerpt_beginning_middle_end(content: &str) -> String {
    let doc = markdown::parse(content);
    if doc.sections.is_empty() {
        return truncate_chars(content, 2_000);
    }

    let n = doc.sections.len();
    let beginning = truncate_chars(&doc.sections[0].get_full_text(), 2_000);
    let middle = truncate_chars(&doc.sections[n / 2].get_full_text(), 2_000);
    let end = truncate_chars(&doc.sections[n - 1].get_full_text(), 2_000);

    format!(
        "=== BEGINNING ===\n{beginning}\n\n=== MIDDLE ===\n{middle}\n\n=== END ===\n{end}"
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

const REFUSAL_PREFIXES: &[&str] = &[
    "i cannot",
    "i can't",
    "i'm sorry",
    "i am sorry",
    "as an ai",
    "as a language model",
];

/// Strips markdown code fences a model may have wrapped the answer in,
/// collapses whitespace, and drops a leading refusal-prefix sentence.
fn clean_summary(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        text = stripped.trim_start_matches(|c: char| c.is_alphabetic());
        text = text.trim_start();
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }

    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sentences: Vec<&str> = collapsed.split(". ").collect();
    if let Some(first) = sentences.first() {
        let lower = first.to_lowercase();
        if REFUSAL_PREFIXES.iter().any(|p| lower.starts_with(p)) && sentences.len() > 1 {
            sentences.remove(0);
        }
    }
    sentences.join(". ").trim().to_string()
}

/// One per-work summary produced by the MAP phase, kept in original
/// document order regardless of sampling order (spec.md §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSummary {
    pub title: String,
    pub work_type: WorkType,
    pub text: String,
    pub index: usize,
}

/// Outcome of a full collection summarisation job.
#[derive(Debug, Clone)]
pub struct CollectionSummaryResult {
    pub summary: DocumentSummary,
    pub work_summaries: Vec<WorkSummary>,
    pub total_works: usize,
    pub summarized_works: usize,
}

/// Synthesises per-work summaries into one final summary (spec.md §4.7
/// REDUCE): groups by inferred type (largest group first), builds a
/// synthesis prompt, and appends a coverage footer when sampling left
/// works out.
pub async fn reduce(
    collection_title: &str,
    is_shakespeare: bool,
    focus_query: Option<&str>,
    work_summaries: &[WorkSummary],
    total_works: usize,
    llm: &dyn LlmProvider,
    config: &SummarizerPhaseConfig,
    model_id: &str,
    evidence_hash: &str,
) -> SummarizerResult<DocumentSummary> {
    let mut by_type: HashMap<WorkType, Vec<&WorkSummary>> = HashMap::new();
    for summary in work_summaries {
        by_type.entry(summary.work_type.clone()).or_default().push(summary);
    }
    let mut groups: Vec<(WorkType, Vec<&WorkSummary>)> = by_type.into_iter().collect();
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut body = String::new();
    for (work_type, summaries) in &groups {
        body.push_str(&format!("\n## {work_type} ({} works)\n\n", summaries.len()));
        for s in summaries {
            body.push_str(&format!("- {}: {}\n", s.title, s.text));
        }
    }

    let mut prompt = format!(
        "Synthesise a cohesive summary of the collection \"{}\" ({} works total, {} summarised) \
         in approximately {} words, drawing on the per-work summaries below.\n",
        collection_title,
        total_works,
        work_summaries.len(),
        config.target_words_final
    );
    if let Some(query) = focus_query {
        prompt.push_str(&format!("Focus particularly on: {query}\n"));
    }
    if is_shakespeare {
        prompt.push_str(
            "This is a Shakespeare collection: note recurring themes across tragedies, \
             comedies, histories, and poetry, and the arc of his career where evident.\n",
        );
    }
    prompt.push_str(&body);

    let options = GenerationOptions::default().with_temperature(0.4);
    let text = llm.generate(&prompt, &options).await?;
    let mut text = clean_summary(&text);

    if work_summaries.len() < total_works {
        let pct = (work_summaries.len() as f64 / total_works.max(1) as f64) * 100.0;
        text.push_str(&format!(
            "\n\n*Coverage: {} of {} works summarized ({:.0}%)*",
            work_summaries.len(),
            total_works,
            pct
        ));
    }

    Ok(DocumentSummary {
        text,
        evidence_hash: evidence_hash.to_string(),
        provider: ProviderInfo { name: llm.name().to_string(), model: model_id.to_string() },
        generated_at: chrono::Utc::now(),
    })
}

/// Runs the full DETECT -> PARTITION -> SAMPLE -> MAP -> REDUCE pipeline
/// over `markdown` (spec.md §4.7). Returns `Ok(None)` when `info` says the
/// document is not a collection, instructing the caller to take the
/// single-document path instead (DETECT phase stub result).
pub async fn summarize_collection(
    markdown: &str,
    info: &CollectionInfo,
    focus_query: Option<&str>,
    llm: &dyn LlmProvider,
    store: &dyn VectorStore,
    collection: &str,
    config: &SummarizerPhaseConfig,
    model_id: &str,
    cancellation: &CancellationToken,
) -> SummarizerResult<Option<CollectionSummaryResult>> {
    let mut state = JobState::Detecting;
    info!(?state, "hierarchical summariser phase");
    if !info.is_collection {
        return Ok(None);
    }
    check_cancelled(cancellation)?;

    state = JobState::Partitioning;
    info!(?state, "hierarchical summariser phase");
    let works = partition(markdown, info.is_shakespeare);
    let total_works = works.len();
    check_cancelled(cancellation)?;

    state = JobState::Sampling;
    info!(?state, "hierarchical summariser phase");
    let sampled = sample(&works, config.max_works);
    check_cancelled(cancellation)?;

    // Evidence is keyed on the sampled works' own content, not on the
    // summaries a run produces, so a cache hit can skip MAP entirely.
    let content_hashes: Vec<String> =
        sampled.iter().map(|w| crate::model::content_hash(&w.content)).collect();
    let evidence_hash = store::evidence_hash(&content_hashes, model_id, "collection-v1");

    if let Some(cached) = store.get_cached_summary(collection, &evidence_hash).await? {
        info!(state = ?JobState::Done, "hierarchical summariser phase (cache hit)");
        return Ok(Some(CollectionSummaryResult {
            summary: cached,
            work_summaries: Vec::new(),
            total_works,
            summarized_works: sampled.len(),
        }));
    }

    let mut work_summaries = Vec::with_capacity(sampled.len());
    for (i, work) in sampled.iter().enumerate() {
        check_cancelled(cancellation)?;
        state = JobState::Mapping { completed: i, total: sampled.len() };
        info!(?state, "hierarchical summariser phase");
        let text = map_work(work, llm, config).await;
        if text.starts_with("(Failed to summarize:") {
            warn!(work = %work.title, "map phase failed for work, continuing");
        }
        work_summaries.push(WorkSummary {
            title: work.title.clone(),
            work_type: work_type_of(work),
            text,
            index: work.index,
        });
    }
    work_summaries.sort_by_key(|s| s.index);

    check_cancelled(cancellation)?;
    state = JobState::Reducing;
    info!(?state, "hierarchical summariser phase");

    let collection_title = info.collection_title.clone().unwrap_or_else(|| "Untitled collection".to_string());
    let summary = reduce(
        &collection_title,
        info.is_shakespeare,
        focus_query,
        &work_summaries,
        total_works,
        llm,
        config,
        model_id,
        &evidence_hash,
    )
    .await?;

    store.cache_summary(collection, &evidence_hash, summary.clone()).await?;

    info!(state = ?JobState::Done, "hierarchical summariser phase");

    Ok(Some(CollectionSummaryResult {
        summary,
        summarized_works: work_summaries.len(),
        work_summaries,
        total_works,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmProvider;

    #[test]
    fn partition_skips_meta_h1_and_keeps_document_order() {
        let markdown = "# Complete Works\n# Hamlet\nA very long enough piece of content to pass the character floor here.\n# Macbeth\nAnother sufficiently long piece of content to pass the character floor here too.\n";
        let works = partition(markdown, false);
        assert_eq!(works.len(), 2);
        assert_eq!(works[0].title, "Hamlet");
        assert_eq!(works[1].title, "Macbeth");
    }

    #[test]
    fn partition_drops_short_works() {
        let markdown = "# Complete Works\n# Tiny\nshort\n# Hamlet\n".to_string()
            + &"word ".repeat(30);
        let works = partition(&markdown, false);
        assert_eq!(works.len(), 1);
        assert_eq!(works[0].title, "Hamlet");
    }

    fn work(title: &str, index: usize, work_type: WorkType) -> WorkPartition {
        WorkPartition {
            title: title.to_string(),
            content: "x".repeat(200),
            index,
            word_count: 200,
            work_info: Some(WorkInfo { title: title.to_string(), work_type }),
        }
    }

    #[test]
    fn sampling_keeps_all_works_within_budget() {
        let works = vec![work("A", 0, WorkType::Tragedy), work("B", 1, WorkType::Comedy)];
        let sampled = sample(&works, 15);
        assert_eq!(sampled.len(), 2);
    }

    #[test]
    fn sampling_covers_every_type_present() {
        let mut works = Vec::new();
        let types = [WorkType::Tragedy, WorkType::Comedy, WorkType::History, WorkType::Poetry];
        for (t_idx, work_type) in types.iter().enumerate() {
            for i in 0..10 {
                works.push(work(&format!("{:?}-{}", work_type, i), t_idx * 10 + i, work_type.clone()));
            }
        }
        let sampled = sample(&works, 8);
        assert!(sampled.len() <= 8 || sampled.len() <= 4 * 2);
        for work_type in &types {
            assert!(sampled.iter().any(|w| work_type_of(w) == *work_type));
        }
    }

    #[test]
    fn sampled_list_preserves_original_document_order() {
        let works: Vec<WorkPartition> = (0..20).map(|i| work(&format!("W{i}"), i, WorkType::Essay)).collect();
        let sampled = sample(&works, 5);
        let indices: Vec<usize> = sampled.iter().map(|w| w.index).collect();
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, sorted);
    }

    #[tokio::test]
    async fn map_phase_failure_is_isolated_as_text() {
        struct FailingLlm;
        #[async_trait::async_trait]
        impl LlmProvider for FailingLlm {
            async fn generate(&self, _: &str, _: &GenerationOptions) -> SummarizerResult<String> {
                Err(SummarizerError::ExternalUnavailable("down".into()))
            }
            async fn is_available(&self) -> bool {
                false
            }
            fn context_window(&self) -> u32 {
                1024
            }
            fn name(&self) -> &str {
                "failing"
            }
        }

        let w = work("Hamlet", 0, WorkType::Tragedy);
        let config = SummarizerPhaseConfig::default();
        let text = map_work(&w, &FailingLlm, &config).await;
        assert!(text.starts_with("(Failed to summarize:"));
    }

    #[tokio::test]
    async fn non_collection_returns_none() {
        let llm = MockLlmProvider::default();
        let info = CollectionInfo::default();
        let config = SummarizerPhaseConfig::default();
        let token = CancellationToken::new();
        let store = crate::store::MemoryVectorStore::new();
        let result = summarize_collection(
            "# Just One Work\nbody",
            &info,
            None,
            &llm,
            &store,
            "test",
            &config,
            "mock",
            &token,
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn second_run_over_identical_collection_hits_the_summary_cache() {
        let llm = MockLlmProvider::default();
        let config = SummarizerPhaseConfig::default();
        let store = crate::store::MemoryVectorStore::new();
        let markdown = format!(
            "# Complete Works\n# Hamlet\n{}\n# Macbeth\n{}\n",
            "word ".repeat(200),
            "word ".repeat(200)
        );
        let info = CollectionInfo {
            is_collection: true,
            collection_title: Some("Complete Works".into()),
            is_shakespeare: false,
            ..Default::default()
        };

        let first = summarize_collection(
            &markdown, &info, None, &llm, &store, "cache-col", &config, "mock", &CancellationToken::new(),
        )
        .await
        .unwrap()
        .expect("is a collection");
        assert!(!first.work_summaries.is_empty());

        let second = summarize_collection(
            &markdown, &info, None, &llm, &store, "cache-col", &config, "mock", &CancellationToken::new(),
        )
        .await
        .unwrap()
        .expect("is a collection");

        assert_eq!(first.summary.text, second.summary.text);
        assert!(second.work_summaries.is_empty(), "cache hit should skip the map phase entirely");
    }

    #[test]
    fn clean_summary_drops_refusal_prefix() {
        let raw = "I cannot help with this. Here is a summary of the work anyway.";
        let cleaned = clean_summary(raw);
        assert!(!cleaned.to_lowercase().starts_with("i cannot"));
    }
}
