//! Markdown Parser (spec.md component B).
//!
//! Walks a `pulldown_cmark` event stream into an ordered [`ParsedDocument`]
//! of heading-delimited [`Section`]s, in the style of the corpus's
//! README-compression and section-hierarchy readers: headings open/close
//! sections, text events accumulate into the active block.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

use crate::model::{Block, ParsedDocument, Section};

/// Parses markdown source into an ordered section tree.
pub fn parse(markdown: &str) -> ParsedDocument {
    let mut sections = Vec::new();
    let mut current = Section {
        heading: String::new(),
        level: 0,
        blocks: Vec::new(),
    };

    let mut in_heading: Option<HeadingLevel> = None;
    let mut heading_text = String::new();

    let mut in_code_block = false;
    let mut code_lang: Option<String> = None;
    let mut code_text = String::new();

    let mut in_list_item = false;
    let mut list_item_text = String::new();

    let mut in_blockquote = false;
    let mut blockquote_text = String::new();

    let mut paragraph_text = String::new();
    let mut in_paragraph = false;

    let parser = Parser::new(markdown);
    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush_paragraph(&mut current, &mut paragraph_text, &mut in_paragraph);
                in_heading = Some(level);
                heading_text.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = in_heading.take() {
                    if !current.heading.is_empty() || !current.blocks.is_empty() {
                        sections.push(current);
                    }
                    current = Section {
                        heading: heading_text.trim().to_string(),
                        level: heading_level_to_u8(level),
                        blocks: Vec::new(),
                    };
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                flush_paragraph(&mut current, &mut paragraph_text, &mut in_paragraph);
                in_code_block = true;
                code_text.clear();
                code_lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
            }
            Event::End(TagEnd::CodeBlock) => {
                if in_code_block {
                    current.blocks.push(Block::CodeBlock {
                        language: code_lang.take(),
                        code: code_text.trim_end().to_string(),
                    });
                    in_code_block = false;
                }
            }
            Event::Start(Tag::Item) => {
                flush_paragraph(&mut current, &mut paragraph_text, &mut in_paragraph);
                in_list_item = true;
                list_item_text.clear();
            }
            Event::End(TagEnd::Item) => {
                if in_list_item {
                    current.blocks.push(Block::ListItem(list_item_text.trim().to_string()));
                    in_list_item = false;
                }
            }
            Event::Start(Tag::BlockQuote(_)) => {
                flush_paragraph(&mut current, &mut paragraph_text, &mut in_paragraph);
                in_blockquote = true;
                blockquote_text.clear();
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                if in_blockquote {
                    current.blocks.push(Block::BlockQuote(blockquote_text.trim().to_string()));
                    in_blockquote = false;
                }
            }
            Event::Start(Tag::Paragraph) => {
                in_paragraph = true;
                paragraph_text.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                flush_paragraph(&mut current, &mut paragraph_text, &mut in_paragraph);
            }
            Event::Text(text) | Event::Code(text) => {
                if in_heading.is_some() {
                    heading_text.push_str(&text);
                } else if in_code_block {
                    code_text.push_str(&text);
                } else if in_list_item {
                    list_item_text.push_str(&text);
                } else if in_blockquote {
                    blockquote_text.push_str(&text);
                } else if in_paragraph {
                    paragraph_text.push_str(&text);
                }
            }
            Event::SoftBreak => {
                push_space(
                    in_heading.is_some(),
                    &mut heading_text,
                    in_code_block,
                    &mut code_text,
                    in_list_item,
                    &mut list_item_text,
                    in_blockquote,
                    &mut blockquote_text,
                    in_paragraph,
                    &mut paragraph_text,
                );
            }
            Event::HardBreak => {
                if in_paragraph {
                    paragraph_text.push('\n');
                } else if in_blockquote {
                    blockquote_text.push('\n');
                }
            }
            _ => {}
        }
    }
    flush_paragraph(&mut current, &mut paragraph_text, &mut in_paragraph);
    if !current.heading.is_empty() || !current.blocks.is_empty() {
        sections.push(current);
    }

    ParsedDocument { sections }
}

#[allow(clippy::too_many_arguments)]
fn push_space(
    in_heading: bool,
    heading_text: &mut String,
    in_code_block: bool,
    code_text: &mut String,
    in_list_item: bool,
    list_item_text: &mut String,
    in_blockquote: bool,
    blockquote_text: &mut String,
    in_paragraph: bool,
    paragraph_text: &mut String,
) {
    if in_heading {
        heading_text.push(' ');
    } else if in_code_block {
        code_text.push('\n');
    } else if in_list_item {
        list_item_text.push(' ');
    } else if in_blockquote {
        blockquote_text.push(' ');
    } else if in_paragraph {
        paragraph_text.push(' ');
    }
}

fn flush_paragraph(current: &mut Section, paragraph_text: &mut String, in_paragraph: &mut bool) {
    if *in_paragraph {
        let trimmed = paragraph_text.trim();
        if !trimmed.is_empty() {
            current.blocks.push(Block::Paragraph(trimmed.to_string()));
        }
        paragraph_text.clear();
        *in_paragraph = false;
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
