//! Collection Detector (spec.md component F).
//!
//! Classifies a parsed markdown document as a standalone work or an
//! anthology of multiple works, and enumerates those works with an
//! inferred genre/type. Grounded on the corpus's title/keyword-density
//! classification idiom (`section_importance` keyword scoring in the
//! README compressor), generalised from section-importance weighting to
//! collection-vs-single-work classification.

use crate::model::{CollectionInfo, ParsedDocument, RecommendedStrategy, WorkInfo, WorkType};

const COLLECTION_KEYWORDS: &[&str] =
    &["complete works", "collected", "anthology", "complete poems", "collected works"];

const SHAKESPEARE_MARKERS: &[&str] = &["shakespeare"];

/// Fast keyword check used by the partitioner to recognise a meta H1 that
/// should be skipped rather than treated as the first work.
pub fn quick_is_collection(title: &str) -> bool {
    let lower = title.to_lowercase();
    COLLECTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Classifies `doc` (whose title, if any, is `doc_title`) as a collection
/// or a standalone work.
pub fn detect(doc_title: Option<&str>, doc: &ParsedDocument) -> CollectionInfo {
    let is_shakespeare = doc_title
        .map(|t| {
            let lower = t.to_lowercase();
            SHAKESPEARE_MARKERS.iter().any(|m| lower.contains(m))
        })
        .unwrap_or(false);

    let h1_titles: Vec<&str> = doc
        .sections
        .iter()
        .filter(|s| s.level == 1)
        .map(|s| s.heading.as_str())
        .filter(|h| !quick_is_collection(h))
        .collect();

    let meta_is_collection = doc_title.map(quick_is_collection).unwrap_or(false);
    let is_collection = meta_is_collection || h1_titles.len() > 1 || is_shakespeare;

    if !is_collection {
        return CollectionInfo {
            is_collection: false,
            collection_title: doc_title.map(|s| s.to_string()),
            works: Vec::new(),
            is_shakespeare,
            recommended_strategy: RecommendedStrategy::SingleDocument,
        };
    }

    let works = h1_titles
        .iter()
        .map(|title| WorkInfo {
            title: title.to_string(),
            work_type: infer_work_type(title, is_shakespeare),
        })
        .collect();

    CollectionInfo {
        is_collection: true,
        collection_title: doc_title.map(|s| s.to_string()),
        works,
        is_shakespeare,
        recommended_strategy: RecommendedStrategy::HierarchicalCollection,
    }
}

/// Infers a work's genre/type from its title, with a Shakespeare-specific
/// fallback. Exposed for reuse by the hierarchical summariser's partition
/// phase, which needs the same classification per `WorkPartition`.
pub fn infer_work_type(title: &str, is_shakespeare: bool) -> WorkType {
    let lower = title.to_lowercase();

    const TRAGEDIES: &[&str] =
        &["hamlet", "macbeth", "othello", "lear", "romeo", "juliet", "tragedy"];
    const COMEDIES: &[&str] =
        &["much ado", "twelfth night", "dream", "tempest", "comedy", "shrew"];
    const HISTORIES: &[&str] =
        &["henry", "richard", "king john", "history"];
    const POETRY: &[&str] = &["sonnet", "sonnets", "venus and adonis", "lucrece", "poem", "poems"];

    if TRAGEDIES.iter().any(|k| lower.contains(k)) {
        return WorkType::Tragedy;
    }
    if COMEDIES.iter().any(|k| lower.contains(k)) {
        return WorkType::Comedy;
    }
    if HISTORIES.iter().any(|k| lower.contains(k)) {
        return WorkType::History;
    }
    if POETRY.iter().any(|k| lower.contains(k)) {
        return WorkType::Poetry;
    }
    if is_shakespeare {
        return WorkType::Unknown;
    }
    if lower.contains("essay") {
        return WorkType::Essay;
    }
    if lower.contains("novel") {
        return WorkType::Novel;
    }
    WorkType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse;

    #[test]
    fn single_h1_document_is_not_a_collection() {
        let doc = parse("# Just One Essay\n\nSome content here.\n");
        let info = detect(None, &doc);
        assert!(!info.is_collection);
    }

    #[test]
    fn multiple_h1s_form_a_collection() {
        let doc = parse("# Hamlet\n\nA\n\n# Macbeth\n\nB\n");
        let info = detect(Some("Complete Works"), &doc);
        assert!(info.is_collection);
        assert_eq!(info.works.len(), 2);
        assert_eq!(info.works[0].work_type, WorkType::Tragedy);
    }

    #[test]
    fn shakespeare_title_sets_flag() {
        let doc = parse("# Hamlet\n\nA\n");
        let info = detect(Some("The Complete Works of William Shakespeare"), &doc);
        assert!(info.is_shakespeare);
    }

    #[test]
    fn quick_is_collection_matches_known_keywords() {
        assert!(quick_is_collection("Complete Works of Poe"));
        assert!(!quick_is_collection("A Single Short Story"));
    }
}
