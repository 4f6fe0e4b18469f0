//! Archive Ingestor (spec.md component A).
//!
//! Opens `.zip` archives, inspects entries without extracting, and enforces
//! the entry/size/ratio safety bounds before any entry is fully decoded.
//! Detects Project Gutenberg boilerplate and flattens HTML to markdown
//! using regex-based structural conversion rather than a full HTML
//! parser, since only structural flattening is needed here.

use std::io::Read;

use regex::Regex;
use zip::ZipArchive;

use crate::config::ArchiveConfig;
use crate::error::{ArchiveRejectReason, SummarizerError, SummarizerResult};
use crate::model::ArchiveInfo;

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "html", "htm", "xhtml"];

fn extension_priority(name: &str) -> u8 {
    let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "html" | "htm" | "xhtml" => 3,
        "md" | "markdown" => 2,
        "txt" | "text" => 1,
        _ => 0,
    }
}

fn is_candidate(name: &str) -> bool {
    let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
    TEXT_EXTENSIONS.contains(&ext.as_str())
}

/// Inspects `bytes` as a zip archive and selects the main text entry,
/// enforcing the entry/size/ratio caps before reading any entry fully.
pub fn inspect(bytes: &[u8], config: &ArchiveConfig) -> SummarizerResult<ArchiveInfo> {
    let reader = std::io::Cursor::new(bytes);
    let mut archive = ZipArchive::new(reader)?;

    if archive.len() > config.max_entries {
        return Err(SummarizerError::from(ArchiveRejectReason::TooManyEntries {
            count: archive.len(),
            max: config.max_entries,
        }));
    }

    let mut candidates: Vec<(String, u64, u64)> = Vec::new(); // (name, uncompressed, compressed)
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| SummarizerError::from(ArchiveRejectReason::ReadFailure(e.to_string())))?;
        let name = entry.name().to_string();
        if !is_candidate(&name) {
            continue;
        }
        candidates.push((name, entry.size(), entry.compressed_size()));
    }

    if candidates.is_empty() {
        return Err(SummarizerError::from(ArchiveRejectReason::NoTextFiles));
    }

    candidates.sort_by(|a, b| {
        extension_priority(&b.0)
            .cmp(&extension_priority(&a.0))
            .then(b.1.cmp(&a.1))
    });
    candidates.truncate(config.max_candidates);

    let total_uncompressed: u64 = candidates.iter().map(|c| c.1).sum();
    if total_uncompressed > config.max_size_bytes {
        return Err(SummarizerError::from(ArchiveRejectReason::ContentTooLarge {
            size: total_uncompressed,
            max: config.max_size_bytes,
        }));
    }

    for (name, uncompressed, compressed) in &candidates {
        if *compressed > 0 {
            let ratio = *uncompressed as f64 / *compressed as f64;
            if ratio > config.max_compression_ratio {
                return Err(SummarizerError::from(ArchiveRejectReason::SuspiciousRatio {
                    ratio,
                    max: config.max_compression_ratio,
                }));
            }
        }
        let _ = name;
    }

    let (main_name, main_size, main_compressed) = candidates[0].clone();
    let compression_ratio = if main_compressed > 0 {
        main_size as f64 / main_compressed as f64
    } else {
        1.0
    };
    let is_gutenberg = is_gutenberg_entry(&main_name)
        || (0..archive.len()).any(|i| {
            archive
                .by_index(i)
                .map(|e| e.name().contains("images/"))
                .unwrap_or(false)
        });

    Ok(ArchiveInfo {
        is_valid: true,
        error: None,
        main_file_name: Some(main_name),
        main_file_size: main_size,
        total_text_files: candidates.len(),
        compression_ratio,
        is_gutenberg,
    })
}

/// Reads the main entry's content as markdown, re-enforcing the size bound
/// during decode and applying Gutenberg boilerplate stripping / HTML
/// flattening as needed.
pub fn extract_main_text(bytes: &[u8], info: &ArchiveInfo, config: &ArchiveConfig) -> SummarizerResult<String> {
    let main_name = info
        .main_file_name
        .as_ref()
        .ok_or_else(|| SummarizerError::InvalidInput("archive has no main entry".into()))?;

    let reader = std::io::Cursor::new(bytes);
    let mut archive = ZipArchive::new(reader)?;
    let mut entry = archive.by_name(main_name)?;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        let n = entry
            .read(&mut chunk)
            .map_err(|e| SummarizerError::from(ArchiveRejectReason::ReadFailure(e.to_string())))?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > config.max_size_bytes {
            return Err(SummarizerError::from(ArchiveRejectReason::ContentTooLarge {
                size: total,
                max: config.max_size_bytes,
            }));
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let raw = String::from_utf8_lossy(&buf).to_string();
    let is_html = main_name.to_lowercase().ends_with(".html")
        || main_name.to_lowercase().ends_with(".htm")
        || main_name.to_lowercase().ends_with(".xhtml");

    let mut content = if is_html { html_to_markdown(&raw) } else { raw };
    if info.is_gutenberg {
        content = strip_gutenberg_boilerplate(&content);
    }
    Ok(content)
}

fn is_gutenberg_entry(name: &str) -> bool {
    let re = Regex::new(r"(?i)^pg\d+(-\w+)?\.html?$").unwrap();
    let base = name.rsplit('/').next().unwrap_or(name);
    re.is_match(base)
}

fn strip_gutenberg_boilerplate(text: &str) -> String {
    let start_re = Regex::new(r"(?i)\*\*\*\s*START OF[^\n]*\*\*\*").unwrap();
    let end_re = Regex::new(r"(?i)\*\*\*\s*END OF[^\n]*\*\*\*").unwrap();

    let after_start = match start_re.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    };
    let before_end = match end_re.find(after_start) {
        Some(m) => &after_start[..m.start()],
        None => after_start,
    };

    let header_footer_re =
        Regex::new(r#"(?is)<div[^>]*(?:id|class)\s*=\s*"pg-(?:header|footer)"[^>]*>.*?</div>"#).unwrap();
    header_footer_re.replace_all(before_end, "").trim().to_string()
}

/// Regex-based structural HTML -> markdown flattening. Sufficient for
/// summarisation input; a full HTML parser is intentionally out of scope.
fn html_to_markdown(html: &str) -> String {
    let strip_tags_re = Regex::new(r"(?is)<(script|style|head)[^>]*>.*?</\1>").unwrap();
    let mut text = strip_tags_re.replace_all(html, "").to_string();

    for (level, tag) in [(1, "h1"), (2, "h2"), (3, "h3"), (4, "h4"), (5, "h5"), (6, "h6")] {
        let open_re = Regex::new(&format!(r"(?i)<{}[^>]*>", tag)).unwrap();
        let close_re = Regex::new(&format!(r"(?i)</{}>", tag)).unwrap();
        let prefix = "#".repeat(level);
        text = open_re.replace_all(&text, format!("\n{} ", prefix)).to_string();
        text = close_re.replace_all(&text, "\n").to_string();
    }

    let blockquote_open = Regex::new(r"(?i)<blockquote[^>]*>").unwrap();
    let blockquote_close = Regex::new(r"(?i)</blockquote>").unwrap();
    text = blockquote_open.replace_all(&text, "\n> ").to_string();
    text = blockquote_close.replace_all(&text, "\n").to_string();

    let br_re = Regex::new(r"(?i)<br\s*/?>").unwrap();
    text = br_re.replace_all(&text, "\n").to_string();

    let hr_re = Regex::new(r"(?i)<hr\s*/?>").unwrap();
    text = hr_re.replace_all(&text, "\n---\n").to_string();

    let p_close_re = Regex::new(r"(?i)</p>").unwrap();
    text = p_close_re.replace_all(&text, "\n\n").to_string();

    let remaining_tags_re = Regex::new(r"(?s)<[^>]+>").unwrap();
    text = remaining_tags_re.replace_all(&text, "").to_string();

    text = decode_html_entities(&text);

    let blank_run_re = Regex::new(r"\n{3,}").unwrap();
    text = blank_run_re.replace_all(&text, "\n\n").to_string();
    let space_run_re = Regex::new(r"[ \t]+").unwrap();
    text = space_run_re.replace_all(&text, " ").to_string();

    text.trim().to_string()
}

fn decode_html_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn make_zip(entries: &[(&str, &[u8])], deflate: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options = if deflate {
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
            } else {
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
            };
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn rejects_zip_with_too_many_entries() {
        let entries: Vec<(String, Vec<u8>)> =
            (0..5).map(|i| (format!("f{}.txt", i), b"hello".to_vec())).collect();
        let entries_ref: Vec<(&str, &[u8])> =
            entries.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
        let bytes = make_zip(&entries_ref, false);
        let mut config = ArchiveConfig::default();
        config.max_entries = 3;
        let result = inspect(&bytes, &config);
        assert!(matches!(
            result,
            Err(SummarizerError::ArchiveRejected(ArchiveRejectReason::TooManyEntries { .. }))
        ));
    }

    #[test]
    fn rejects_no_text_files() {
        let bytes = make_zip(&[("data.bin", b"\x00\x01\x02")], false);
        let config = ArchiveConfig::default();
        assert!(matches!(
            inspect(&bytes, &config),
            Err(SummarizerError::ArchiveRejected(ArchiveRejectReason::NoTextFiles))
        ));
    }

    #[test]
    fn gutenberg_html_is_stripped_to_body() {
        let html = "<html><body>*** START OF THE PROJECT GUTENBERG EBOOK X ***\n\
                    <p>Hello</p>\n\
                    *** END OF THE PROJECT GUTENBERG EBOOK X ***</body></html>";
        let bytes = make_zip(&[("pg1342.html", html.as_bytes())], false);
        let config = ArchiveConfig::default();
        let info = inspect(&bytes, &config).unwrap();
        assert!(info.is_gutenberg);
        let text = extract_main_text(&bytes, &info, &config).unwrap();
        assert_eq!(text.trim(), "Hello");
    }

    #[test]
    fn html_headings_flattened_to_markdown() {
        let html = "<h1>Title</h1><p>Body text.</p>";
        let md = html_to_markdown(html);
        assert!(md.contains("# Title"));
        assert!(md.contains("Body text."));
    }

    #[test]
    fn rejects_suspicious_compression_ratio() {
        let highly_compressible = "a".repeat(10 * 1024 * 1024);
        let bytes = make_zip(&[("big.txt", highly_compressible.as_bytes())], true);
        let mut config = ArchiveConfig::default();
        config.max_compression_ratio = 100.0;
        let result = inspect(&bytes, &config);
        assert!(matches!(
            result,
            Err(SummarizerError::ArchiveRejected(ArchiveRejectReason::SuspiciousRatio { .. }))
        ));
    }
}
