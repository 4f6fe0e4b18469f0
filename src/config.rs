//! Typed, validated configuration for every tunable the pipeline exposes.
//!
//! Plain serde structs with sane `Default` impls and a `validate()` that
//! rejects out-of-range values before the pipeline starts using them.

use serde::{Deserialize, Serialize};

use crate::error::{SummarizerError, SummarizerResult};

/// Root configuration aggregating every component's tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    pub archive: ArchiveConfig,
    pub segment: SegmentConfig,
    pub retrieval: RetrievalConfig,
    pub summarizer: SummarizerPhaseConfig,
    pub logging: LoggingConfig,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            archive: ArchiveConfig::default(),
            segment: SegmentConfig::default(),
            retrieval: RetrievalConfig::default(),
            summarizer: SummarizerPhaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SummarizerConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        self.archive.validate()?;
        self.segment.validate()?;
        self.retrieval.validate()?;
        self.summarizer.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Archive Ingestor bounds (spec.md component A).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Maximum number of entries scanned before rejecting the archive.
    pub max_entries: usize,
    /// Maximum total uncompressed bytes of candidate text files.
    pub max_size_bytes: u64,
    /// Maximum allowed uncompressed/compressed ratio per entry.
    pub max_compression_ratio: f64,
    /// How many of the largest candidate text files to consider.
    pub max_candidates: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_size_bytes: 100 * 1024 * 1024,
            max_compression_ratio: 100.0,
            max_candidates: 10,
        }
    }
}

impl ArchiveConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        if self.max_entries == 0 {
            return Err(SummarizerError::Internal(
                "archive.max_entries must be greater than 0".into(),
            ));
        }
        if self.max_size_bytes == 0 {
            return Err(SummarizerError::Internal(
                "archive.max_size_bytes must be greater than 0".into(),
            ));
        }
        if self.max_compression_ratio <= 0.0 {
            return Err(SummarizerError::Internal(
                "archive.max_compression_ratio must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Segment Extractor bounds (spec.md component C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Target minimum characters per segment.
    pub min_chars: usize,
    /// Maximum characters per segment.
    pub max_chars: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_chars: 800,
            max_chars: 1500,
        }
    }
}

impl SegmentConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        if self.min_chars == 0 || self.min_chars > self.max_chars {
            return Err(SummarizerError::Internal(
                "segment.min_chars must be > 0 and <= segment.max_chars".into(),
            ));
        }
        Ok(())
    }
}

/// Retrieval Engine parameters (spec.md component E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// BM25 term-frequency saturation parameter.
    pub bm25_k1: f64,
    /// BM25 length-normalisation parameter.
    pub bm25_b: f64,
    /// RRF rank-smoothing constant.
    pub rrf_k: f64,
    /// Number of segments returned by a retrieval query.
    pub top_k: usize,
    /// Whether to strip a small stop-word list before BM25 tokenisation.
    pub filter_stopwords: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            bm25_k1: 1.5,
            bm25_b: 0.75,
            rrf_k: 60.0,
            top_k: 25,
            filter_stopwords: false,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        if self.bm25_k1 < 0.0 {
            return Err(SummarizerError::Internal("retrieval.bm25_k1 must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.bm25_b) {
            return Err(SummarizerError::Internal(
                "retrieval.bm25_b must be between 0.0 and 1.0".into(),
            ));
        }
        if self.rrf_k <= 0.0 {
            return Err(SummarizerError::Internal("retrieval.rrf_k must be positive".into()));
        }
        if self.top_k == 0 {
            return Err(SummarizerError::Internal("retrieval.top_k must be > 0".into()));
        }
        Ok(())
    }
}

/// Hierarchical Summariser parameters (spec.md component G).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerPhaseConfig {
    /// Maximum number of works to summarise without sampling.
    pub max_works: usize,
    /// Word count above which a work is excerpted rather than read whole.
    pub long_work_words: usize,
    /// Target words for each per-work summary.
    pub target_words_per_work: usize,
    /// Target words for the final synthesised summary.
    pub target_words_final: usize,
    /// How many works may be mapped concurrently (1 = sequential).
    pub map_concurrency: usize,
}

impl Default for SummarizerPhaseConfig {
    fn default() -> Self {
        Self {
            max_works: 15,
            long_work_words: 2000,
            target_words_per_work: 150,
            target_words_final: 800,
            map_concurrency: 1,
        }
    }
}

impl SummarizerPhaseConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        if self.max_works == 0 {
            return Err(SummarizerError::Internal("summarizer.max_works must be > 0".into()));
        }
        if self.map_concurrency == 0 {
            return Err(SummarizerError::Internal(
                "summarizer.map_concurrency must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub console: bool,
    pub json_format: bool,
    /// Optional rolling file output, alongside or instead of the console.
    pub file: Option<FileLoggingConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            json_format: false,
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(SummarizerError::Internal(format!(
                "invalid log level '{}'; valid levels are: {}",
                self.level,
                valid_levels.join(", ")
            )));
        }
        if !self.console && self.file.is_none() {
            return Err(SummarizerError::Internal(
                "at least one of logging.console or logging.file must be enabled".into(),
            ));
        }
        if let Some(file) = &self.file {
            file.validate()?;
        }
        Ok(())
    }
}

/// Rolling log file destination (spec.md's ambient logging stack).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLoggingConfig {
    pub directory: std::path::PathBuf,
    pub filename_prefix: String,
    pub rotation: LogRotation,
}

impl FileLoggingConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        if self.filename_prefix.trim().is_empty() {
            return Err(SummarizerError::Internal("logging.file.filename_prefix cannot be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    Daily,
}

impl From<LogRotation> for tracing_appender::rolling::Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => tracing_appender::rolling::Rotation::NEVER,
            LogRotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
            LogRotation::Daily => tracing_appender::rolling::Rotation::DAILY,
        }
    }
}

/// Initialise the global tracing subscriber from a `LoggingConfig`.
///
/// Idempotent: a second call is a no-op (mirrors `try_init`'s semantics).
pub fn init_logging(config: &LoggingConfig) -> SummarizerResult<()> {
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let mut layers = Vec::new();

    if config.console {
        let console_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };
        layers.push(console_layer);
    }

    if let Some(file) = &config.file {
        std::fs::create_dir_all(&file.directory)
            .map_err(|e| SummarizerError::Internal(format!("failed to create log directory: {e}")))?;
        let appender = tracing_appender::rolling::RollingFileAppender::new(
            file.rotation.clone().into(),
            &file.directory,
            &file.filename_prefix,
        );
        let file_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().with_writer(appender).with_ansi(false).boxed()
        } else {
            tracing_subscriber::fmt::layer().with_writer(appender).with_ansi(false).boxed()
        };
        layers.push(file_layer);
    }

    let _ = Registry::default().with(env_filter).with(layers).try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SummarizerConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_bm25_b_rejected() {
        let mut cfg = RetrievalConfig::default();
        cfg.bm25_b = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_log_level_rejected() {
        let mut cfg = LoggingConfig::default();
        cfg.level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn logging_requires_at_least_one_output() {
        let mut cfg = LoggingConfig::default();
        cfg.console = false;
        cfg.file = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn file_logging_with_empty_prefix_rejected() {
        let mut cfg = LoggingConfig::default();
        cfg.file = Some(FileLoggingConfig {
            directory: std::path::PathBuf::from("/tmp/leafmark-logs"),
            filename_prefix: "".into(),
            rotation: LogRotation::Daily,
        });
        assert!(cfg.validate().is_err());
    }
}
