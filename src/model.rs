//! Core data types shared across every pipeline component.

use serde::{Deserialize, Serialize};

/// An embeddable unit of text extracted from a parsed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// `<sanitised_doc_id>_<index>`, unique within a document.
    pub id: String,
    pub doc_id: String,
    /// 0-based position within the document.
    pub index: usize,
    pub text: String,
    /// Hash of the segment text after whitespace normalisation.
    pub content_hash: String,
    /// Dense embedding, populated once an embedding provider has run.
    pub embedding: Option<Vec<f32>>,
    /// Query-independent importance signal, computed at extraction time.
    pub salience_score: f32,
    /// Cosine similarity to the last query this segment was scored against.
    pub query_similarity: f32,
    /// Fused relevance score written by the retrieval engine.
    pub retrieval_score: f32,
    /// Ordered heading path leading to this segment, e.g. `["Act I", "Scene 1"]`.
    pub section_path: Vec<String>,
}

impl Segment {
    pub fn new(doc_id: &str, index: usize, text: String, section_path: Vec<String>) -> Self {
        let content_hash = content_hash(&text);
        let id = format!("{}_{}", sanitise_id(doc_id), index);
        Self {
            id,
            doc_id: doc_id.to_string(),
            index,
            text,
            content_hash,
            embedding: None,
            salience_score: 0.0,
            query_similarity: 0.0,
            retrieval_score: 0.0,
            section_path,
        }
    }
}

/// Sanitises an arbitrary document identifier into the character set used
/// for segment ids: lowercase letters, digits, and underscores.
pub fn sanitise_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Stable content hash over whitespace-normalised text, used for segment
/// identity and cache keys. Deterministic across runs and processes.
pub fn content_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let normalised: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hasher = Sha256::new();
    hasher.update(normalised.as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 16)
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    let mut out = String::with_capacity(chars);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
        if out.len() >= chars {
            break;
        }
    }
    out.truncate(chars);
    out
}

/// A heading-delimited block of parsed markdown content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Block {
    Paragraph(String),
    CodeBlock { language: Option<String>, code: String },
    ListItem(String),
    BlockQuote(String),
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Block::Paragraph(s) => s,
            Block::CodeBlock { code, .. } => code,
            Block::ListItem(s) => s,
            Block::BlockQuote(s) => s,
        }
    }
}

/// One heading-delimited section of a parsed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub heading: String,
    /// 1-6, or 0 for an implicit leading section with no heading.
    pub level: u8,
    pub blocks: Vec<Block>,
}

impl Section {
    /// Heading followed by its blocks, each on its own paragraph.
    pub fn get_full_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.heading.is_empty() {
            parts.push(self.heading.clone());
        }
        for block in &self.blocks {
            parts.push(block.text().to_string());
        }
        parts.join("\n\n")
    }

    pub fn word_count(&self) -> usize {
        self.get_full_text().split_whitespace().count()
    }
}

/// A markdown document parsed into an ordered list of sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParsedDocument {
    pub sections: Vec<Section>,
}

impl ParsedDocument {
    pub fn get_full_text(&self) -> String {
        self.sections
            .iter()
            .map(Section::get_full_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn word_count(&self) -> usize {
        self.sections.iter().map(Section::word_count).sum()
    }
}

/// A contiguous slice of a collection delimited by H1 boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkPartition {
    pub title: String,
    pub content: String,
    pub index: usize,
    pub word_count: usize,
    pub work_info: Option<WorkInfo>,
}

/// Inferred classification of a single work inside a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkType {
    Tragedy,
    Comedy,
    History,
    Poetry,
    Novel,
    Essay,
    Unknown,
}

impl std::fmt::Display for WorkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WorkType::Tragedy => "Tragedy",
            WorkType::Comedy => "Comedy",
            WorkType::History => "History",
            WorkType::Poetry => "Poetry",
            WorkType::Novel => "Novel",
            WorkType::Essay => "Essay",
            WorkType::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkInfo {
    pub title: String,
    pub work_type: WorkType,
}

/// Which top-level path the summarisation pipeline should take for a
/// classified document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecommendedStrategy {
    /// Embed -> retrieve top-K -> synthesise over the whole document.
    SingleDocument,
    /// Partition into works -> sample -> map -> reduce.
    HierarchicalCollection,
}

/// Result of classifying a parsed document as a standalone work or a
/// collection (anthology) of multiple works.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    pub is_collection: bool,
    pub collection_title: Option<String>,
    pub works: Vec<WorkInfo>,
    pub is_shakespeare: bool,
    pub recommended_strategy: RecommendedStrategy,
}

impl Default for CollectionInfo {
    fn default() -> Self {
        Self {
            is_collection: false,
            collection_title: None,
            works: Vec::new(),
            is_shakespeare: false,
            recommended_strategy: RecommendedStrategy::SingleDocument,
        }
    }
}

/// Which backend produced a [`DocumentSummary`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}

/// A generated summary plus the evidence it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub text: String,
    /// Hash over the sorted content hashes of segments used, the model id,
    /// and the prompt template version; used as the cache key.
    pub evidence_hash: String,
    pub provider: ProviderInfo,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// Result of inspecting a `.zip` archive without fully extracting it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveInfo {
    pub is_valid: bool,
    pub error: Option<String>,
    pub main_file_name: Option<String>,
    pub main_file_size: u64,
    pub total_text_files: usize,
    pub compression_ratio: f64,
    pub is_gutenberg: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_under_whitespace_reformatting() {
        let a = content_hash("hello   world\n\nfoo");
        let b = content_hash("hello world foo");
        assert_eq!(a, b);
    }

    #[test]
    fn segment_id_is_sanitised_and_indexed() {
        let seg = Segment::new("My Doc.md", 3, "text".into(), vec![]);
        assert_eq!(seg.id, "my_doc_md_3");
    }

    #[test]
    fn section_full_text_joins_heading_and_blocks() {
        let section = Section {
            heading: "# Title".into(),
            level: 1,
            blocks: vec![Block::Paragraph("body".into())],
        };
        assert_eq!(section.get_full_text(), "# Title\n\nbody");
    }
}
