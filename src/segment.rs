//! Segment Extractor (spec.md component C).
//!
//! Splits a [`ParsedDocument`] into character-budget-bounded [`Segment`]s,
//! generalising strategy-based chunking to also track `section_path` and
//! compute a deterministic, query-independent `salience_score` per
//! segment.

use crate::config::SegmentConfig;
use crate::model::{ParsedDocument, Segment};

/// Splits `doc` into segments bounded by `config`'s character budget.
///
/// Segments never cross a section boundary: a section's text is split into
/// one or more segments, preferring sentence boundaries near the budget.
pub fn extract(doc_id: &str, doc: &ParsedDocument, config: &SegmentConfig) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut heading_stack: Vec<(u8, String)> = Vec::new();

    for section in &doc.sections {
        if section.level > 0 {
            heading_stack.retain(|(level, _)| *level < section.level);
            heading_stack.push((section.level, section.heading.clone()));
        }
        let section_path: Vec<String> = heading_stack.iter().map(|(_, h)| h.clone()).collect();

        let text = section.get_full_text();
        for chunk in split_budgeted(&text, config.min_chars, config.max_chars) {
            if chunk.trim().is_empty() {
                continue;
            }
            segments.push(Segment::new(doc_id, segments.len(), chunk, section_path.clone()));
        }
    }

    let total = segments.len();
    for (i, segment) in segments.iter_mut().enumerate() {
        segment.salience_score = salience(segment, i, total);
    }

    segments
}

/// Splits `text` into chunks of at most `max_chars`, preferring to break at
/// a sentence boundary (`. `, `! `, `? `) once the chunk has reached
/// `min_chars`. Falls back to a hard break at `max_chars` if no sentence
/// boundary is found.
fn split_budgeted(text: &str, min_chars: usize, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0usize;

    while start < bytes.len() {
        let remaining = bytes.len() - start;
        if remaining <= max_chars {
            chunks.push(text[start..].to_string());
            break;
        }

        let window_end = (start + max_chars).min(bytes.len());
        let search_from = (start + min_chars).min(window_end);
        let window = &text[search_from..window_end];

        let break_at = find_sentence_boundary(window).map(|rel| search_from + rel);

        let cut = break_at.unwrap_or(window_end);
        let cut = find_char_boundary(text, cut);

        chunks.push(text[start..cut].trim().to_string());
        start = cut;
        while start < bytes.len() && bytes[start].is_ascii_whitespace() {
            start += 1;
        }
    }

    chunks
}

fn find_sentence_boundary(window: &str) -> Option<usize> {
    let candidates = [". ", "! ", "? ", ".\n", "!\n", "?\n"];
    candidates
        .iter()
        .filter_map(|needle| window.rfind(needle).map(|i| i + needle.len()))
        .max()
}

fn find_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx.min(text.len())
}

/// Deterministic, query-independent importance signal combining heading
/// proximity, capitalised-token density, and position within the document.
fn salience(segment: &Segment, index: usize, total: usize) -> f32 {
    let heading_signal = if segment.section_path.is_empty() {
        0.3
    } else {
        (1.0 - (segment.section_path.len() as f32 - 1.0) * 0.15).clamp(0.2, 1.0)
    };

    let words: Vec<&str> = segment.text.split_whitespace().collect();
    let cap_signal = if words.is_empty() {
        0.0
    } else {
        let cap_count = words
            .iter()
            .filter(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
            .count();
        (cap_count as f32 / words.len() as f32).min(1.0)
    };

    let position_signal = if total <= 1 {
        1.0
    } else if index == 0 || index == total - 1 {
        1.0
    } else {
        0.6
    };

    (heading_signal * 0.4 + cap_signal * 0.3 + position_signal * 0.3).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Section};

    fn doc_from(paragraphs: &[&str]) -> ParsedDocument {
        ParsedDocument {
            sections: vec![Section {
                heading: "Heading".into(),
                level: 1,
                blocks: paragraphs.iter().map(|p| Block::Paragraph(p.to_string())).collect(),
            }],
        }
    }

    #[test]
    fn short_section_becomes_one_segment() {
        let doc = doc_from(&["A short paragraph."]);
        let config = SegmentConfig::default();
        let segments = extract("doc1", &doc, &config);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[0].id, "doc1_0");
    }

    #[test]
    fn long_section_is_split_within_budget() {
        let long_para = "Sentence one. ".repeat(400);
        let doc = doc_from(&[&long_para]);
        let config = SegmentConfig {
            min_chars: 100,
            max_chars: 200,
        };
        let segments = extract("doc1", &doc, &config);
        assert!(segments.len() > 1);
        for seg in &segments {
            assert!(seg.text.len() <= config.max_chars + 32);
        }
    }

    #[test]
    fn segment_indices_are_strictly_increasing() {
        let doc = doc_from(&["First paragraph.", "Second paragraph.", "Third paragraph."]);
        let config = SegmentConfig::default();
        let segments = extract("doc1", &doc, &config);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.index, i);
        }
    }

    #[test]
    fn salience_is_deterministic() {
        let doc = doc_from(&["Some Text With Capitals And Words."]);
        let config = SegmentConfig::default();
        let a = extract("doc1", &doc, &config);
        let b = extract("doc1", &doc, &config);
        assert_eq!(a[0].salience_score, b[0].salience_score);
    }
}
