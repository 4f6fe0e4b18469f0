//! Document handler registry (spec.md §6).
//!
//! Extension-keyed, priority-ordered lookup of handlers that turn an
//! input file into markdown, in the style of a priority-ordered provider
//! registry (highest-priority capable handler wins), applied here to
//! file extensions. The core ships handlers for plain text/markdown and
//! zip archives; PDF/DOCX conversion is an out-of-scope external
//! collaborator and is represented only by the trait.

use std::collections::HashMap;
use std::path::Path;

use crate::archive;
use crate::config::ArchiveConfig;
use crate::error::{SummarizerError, SummarizerResult};

/// Markdown (plus any structural metadata a handler can recover) produced
/// from an input file.
#[derive(Debug, Clone, Default)]
pub struct DocumentContent {
    pub markdown: String,
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Options threaded through to a handler's `process` call. Currently only
/// carries the archive ingestion bounds; grows as out-of-scope handlers
/// (PDF/DOCX) gain their own tunables.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub archive: ArchiveConfig,
}

/// Converts a single input file into markdown.
pub trait DocumentHandler: Send + Sync {
    /// Lowercase, dot-free extensions this handler recognises.
    fn supported_extensions(&self) -> &[&str];

    /// Higher wins when more than one registered handler can process a
    /// file; the registry picks the highest-priority capable handler.
    fn priority(&self) -> i32;

    fn handler_name(&self) -> &str;

    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.supported_extensions().contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn process(&self, path: &Path, options: &ProcessOptions) -> SummarizerResult<DocumentContent>;
}

/// Plain `.txt`/`.text` passthrough: the file's bytes, decoded as UTF-8,
/// become the markdown body verbatim.
pub struct PlainTextHandler;

impl DocumentHandler for PlainTextHandler {
    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text"]
    }

    fn priority(&self) -> i32 {
        10
    }

    fn handler_name(&self) -> &str {
        "plain_text"
    }

    fn process(&self, path: &Path, _options: &ProcessOptions) -> SummarizerResult<DocumentContent> {
        let bytes = std::fs::read(path)
            .map_err(|e| SummarizerError::InvalidInput(format!("cannot read {path:?}: {e}")))?;
        let markdown = String::from_utf8_lossy(&bytes).to_string();
        Ok(DocumentContent {
            markdown,
            title: file_stem(path),
            content_type: Some("text/plain".to_string()),
            metadata: HashMap::new(),
        })
    }
}

/// `.md`/`.markdown` passthrough: the file already is the expected input
/// format for every downstream component.
pub struct MarkdownHandler;

impl DocumentHandler for MarkdownHandler {
    fn supported_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn priority(&self) -> i32 {
        20
    }

    fn handler_name(&self) -> &str {
        "markdown"
    }

    fn process(&self, path: &Path, _options: &ProcessOptions) -> SummarizerResult<DocumentContent> {
        let markdown = std::fs::read_to_string(path)
            .map_err(|e| SummarizerError::InvalidInput(format!("cannot read {path:?}: {e}")))?;
        Ok(DocumentContent {
            markdown,
            title: file_stem(path),
            content_type: Some("text/markdown".to_string()),
            metadata: HashMap::new(),
        })
    }
}

/// `.zip` archives: delegates to the archive ingestor (component A) for
/// safe inspection and extraction, then hands back the resulting markdown
/// (already HTML-flattened / Gutenberg-stripped where applicable).
pub struct ArchiveHandler;

impl DocumentHandler for ArchiveHandler {
    fn supported_extensions(&self) -> &[&str] {
        &["zip"]
    }

    fn priority(&self) -> i32 {
        30
    }

    fn handler_name(&self) -> &str {
        "archive"
    }

    fn process(&self, path: &Path, options: &ProcessOptions) -> SummarizerResult<DocumentContent> {
        let bytes = std::fs::read(path)
            .map_err(|e| SummarizerError::InvalidInput(format!("cannot read {path:?}: {e}")))?;
        let info = archive::inspect(&bytes, &options.archive)?;
        let markdown = archive::extract_main_text(&bytes, &info, &options.archive)?;
        let mut metadata = HashMap::new();
        metadata.insert("is_gutenberg".to_string(), info.is_gutenberg.to_string());
        metadata.insert("total_text_files".to_string(), info.total_text_files.to_string());
        Ok(DocumentContent {
            markdown,
            title: info.main_file_name.as_deref().and_then(|n| n.rsplit('/').next()).map(String::from),
            content_type: Some("application/zip".to_string()),
            metadata,
        })
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(String::from)
}

/// Priority-ordered, extension-keyed handler lookup.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn DocumentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Registers the core's built-in handlers: markdown, plain text, zip
    /// archives. PDF/DOCX are out of scope and not registered here.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MarkdownHandler));
        registry.register(Box::new(PlainTextHandler));
        registry.register(Box::new(ArchiveHandler));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn DocumentHandler>) {
        self.handlers.push(handler);
    }

    /// Highest-priority registered handler that claims `path`, if any.
    pub fn find(&self, path: &Path) -> Option<&dyn DocumentHandler> {
        self.handlers
            .iter()
            .filter(|h| h.can_handle(path))
            .max_by_key(|h| h.priority())
            .map(|h| h.as_ref())
    }

    pub fn process(&self, path: &Path, options: &ProcessOptions) -> SummarizerResult<DocumentContent> {
        let handler = self.find(path).ok_or_else(|| {
            SummarizerError::InvalidInput(format!("no handler registered for {path:?}"))
        })?;
        handler.process(path, options)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn markdown_handler_wins_over_nothing_for_md_files() {
        let registry = HandlerRegistry::with_defaults();
        let path = Path::new("book.md");
        let handler = registry.find(path).expect("markdown handler registered");
        assert_eq!(handler.handler_name(), "markdown");
    }

    #[test]
    fn unknown_extension_has_no_handler() {
        let registry = HandlerRegistry::with_defaults();
        assert!(registry.find(Path::new("book.pdf")).is_none());
    }

    #[test]
    fn markdown_handler_reads_file_contents_and_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essay.md");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# Title\n\nBody text.").unwrap();

        let registry = HandlerRegistry::with_defaults();
        let content = registry.process(&path, &ProcessOptions::default()).unwrap();
        assert!(content.markdown.contains("Body text."));
        assert_eq!(content.title.as_deref(), Some("essay"));
    }
}
