//! Document loading: EPUB and HTML files in, tagged text blocks out.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::text::{BlockTag, TextBlock};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document not found: {0}")]
    NotFound(PathBuf),

    #[error("document produced no readable text: {0}")]
    Empty(PathBuf),

    #[error("failed to open {path}: {message}")]
    Epub { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Opening tags of the elements that carry readable text. The tag name
/// is captured; anything not listed here (scripts, tables, nav) is
/// skipped wholesale.
static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(h[1-6]|p|dt|dd)(?:\s[^>]*)?>").expect("valid pattern"));

/// Load a document and extract its text blocks in reading order.
///
/// The format is chosen by file extension. PDF and everything else
/// outside EPUB/HTML is rejected up front rather than half-parsed.
/// `start_item` skips that many spine documents of an EPUB (ignored for
/// plain HTML, which has a single page).
pub fn load_document(
    path: &Path,
    start_item: Option<usize>,
) -> Result<Vec<TextBlock>, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "epub" => load_epub(path, start_item.unwrap_or(0)),
        "html" | "htm" | "xhtml" => {
            if start_item.is_some_and(|i| i > 0) {
                log::warn!("--item-page has no effect on single-page HTML documents");
            }
            let html = std::fs::read_to_string(path)?;
            Ok(extract_blocks(&html))
        }
        other => Err(DocumentError::UnsupportedFormat(if other.is_empty() {
            format!("{} has no file extension", path.display())
        } else {
            other.to_string()
        })),
    }
}

/// Extract blocks from every spine document of an EPUB, in spine order,
/// starting at `start_item`.
fn load_epub(path: &Path, start_item: usize) -> Result<Vec<TextBlock>, DocumentError> {
    let mut doc = epub::doc::EpubDoc::new(path).map_err(|e| DocumentError::Epub {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(title) = doc.mdata("title") {
        log::info!("loaded \"{}\"", title.value);
    }

    let mut blocks = Vec::new();
    let spine = doc.spine.clone();
    for spine_item in spine.iter().skip(start_item) {
        if let Some((content_bytes, _mime)) = doc.get_resource(&spine_item.idref) {
            let html = String::from_utf8_lossy(&content_bytes);
            blocks.extend(extract_blocks(&html));
        }
    }

    log::info!("extracted {} text blocks from {}", blocks.len(), path.display());
    Ok(blocks)
}

/// Pull the readable blocks out of one HTML document.
///
/// Headings h1 map to major headings, h2/h3 to minor; h4 and below read
/// no differently from body text, as do paragraphs and definition-list
/// entries. Inline markup inside a block is stripped, entities decoded,
/// and whitespace collapsed. Empty blocks are dropped.
pub fn extract_blocks(html: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(caps) = OPEN_TAG.captures_at(html, pos) {
        let open = match caps.get(0) {
            Some(m) => m,
            None => break,
        };
        let name = caps[1].to_ascii_lowercase();
        let content_start = open.end();

        let close_pattern = format!("</{name}");
        let Some(close_start) = find_ci(html, &close_pattern, content_start) else {
            // Unbalanced tag; skip the opener and keep scanning.
            pos = content_start;
            continue;
        };

        let text = tidy(&html[content_start..close_start]);
        if !text.is_empty() {
            blocks.push(TextBlock::new(tag_for(&name), text));
        }

        pos = html[close_start..]
            .find('>')
            .map(|i| close_start + i + 1)
            .unwrap_or(html.len());
    }

    blocks
}

fn tag_for(name: &str) -> BlockTag {
    match name {
        "h1" => BlockTag::HeadingMajor,
        "h2" | "h3" => BlockTag::HeadingMinor,
        _ => BlockTag::Body,
    }
}

/// Case-insensitive substring search over ASCII, starting at `from`.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Strip inline tags, decode entities, collapse whitespace.
fn tidy(html: &str) -> String {
    let stripped = strip_inline_tags(html);
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_inline_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Keep a word boundary where the tag was.
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
        .replace("&hellip;", "...")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&rdquo;", "\"")
        .replace("&ldquo;", "\"")
}
