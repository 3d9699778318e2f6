use std::fmt::Write as _;

use serde::Serialize;

use crate::models::{ReadMetadata, ReadResponse, ReadResult};

const SUMMARY_LIMIT: usize = 10;
const LINK_TEXT_LIMIT: usize = 50;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl TextContent {
    fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: text.into(),
        }
    }
}

pub fn word_count(markdown: &str) -> usize {
    markdown.split_whitespace().count()
}

/// Tool output: a heading, the Markdown itself, and a metadata summary.
pub fn tool_content(result: &ReadResult) -> Vec<TextContent> {
    vec![
        TextContent::text(format!("# Web Content from {}\n\n", result.source_url)),
        TextContent::text(result.markdown.clone()),
        TextContent::text(metadata_summary(result)),
    ]
}

pub fn metadata_summary(result: &ReadResult) -> String {
    let mut out = String::from("\n\n---\n**Metadata:**\n");
    let _ = writeln!(out, "- Source: {}", result.source_url);
    let _ = writeln!(out, "- Processing time: {:.2}ms", result.processing_time_ms);
    let _ = writeln!(out, "- Word count: {}", word_count(&result.markdown));
    let _ = writeln!(out, "- Images found: {}", result.images.len());
    let _ = writeln!(out, "- Links found: {}", result.links.len());

    if !result.images.is_empty() {
        out.push_str("\n**Images:**\n");
        for (i, image) in result.images.iter().take(SUMMARY_LIMIT).enumerate() {
            let _ = write!(out, "{}. {}", i + 1, image.original_url);
            if !image.alt.is_empty() {
                let _ = write!(out, " (Alt: {})", image.alt);
            }
            if image.width > 0 && image.height > 0 {
                let _ = write!(out, " [{}x{}]", image.width, image.height);
            }
            out.push('\n');
        }
        push_overflow(&mut out, result.images.len());
    }

    if !result.links.is_empty() {
        out.push_str("\n**Links:**\n");
        for (i, link) in result.links.iter().take(SUMMARY_LIMIT).enumerate() {
            let _ = write!(out, "{}. {}", i + 1, link.url);
            if !link.text.is_empty() {
                let _ = write!(out, " - {}", truncate(&link.text, LINK_TEXT_LIMIT));
            }
            out.push('\n');
        }
        push_overflow(&mut out, result.links.len());
    }

    out
}

fn push_overflow(out: &mut String, total: usize) {
    if total > SUMMARY_LIMIT {
        let _ = writeln!(out, "... and {} more", total - SUMMARY_LIMIT);
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Structured body for the HTTP surface.
pub fn http_response(result: ReadResult) -> ReadResponse {
    let word_count = word_count(&result.markdown);
    ReadResponse {
        metadata: ReadMetadata {
            source_url: result.source_url,
            title: result.title,
            fetched_at: result.fetched_at,
            processing_time_ms: result.processing_time_ms,
            word_count,
            image_count: result.images.len(),
            link_count: result.links.len(),
            images: result.images,
            links: result.links,
        },
        markdown: result.markdown,
    }
}
