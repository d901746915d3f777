//! crates/bookbyte_core/src/gutenberg.rs
//!
//! Helpers for locating and cleaning Project Gutenberg plain-text books.

use once_cell::sync::Lazy;
use regex::Regex;

pub const GUTENBERG_ORIGIN: &str = "https://www.gutenberg.org";

pub const BODY_START_MARKER: &str = "*** START OF THE PROJECT GUTENBERG EBOOK";
pub const BODY_END_MARKER: &str = "*** END OF THE PROJECT GUTENBERG EBOOK";

/// Downloads shorter than this are treated as empty or broken.
pub const MIN_BOOK_LENGTH: usize = 100;

static DIRECT_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/cache/epub/(\d+)/pg\d+\.txt$").expect("direct text pattern"));
static EBOOK_PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/ebooks/(\d+)").expect("ebook page pattern"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceUrlError {
    #[error("Please enter a URL")]
    Empty,
    #[error("Please enter a valid Project Gutenberg URL")]
    NotGutenberg,
    #[error(
        "Please enter a valid URL format (e.g., https://www.gutenberg.org/ebooks/77254 \
         or https://www.gutenberg.org/cache/epub/77251/pg77251.txt)"
    )]
    UnsupportedFormat,
}

/// Turns a Gutenberg book page or plain-text URL into the plain-text URL.
///
/// `https://www.gutenberg.org/ebooks/2701` becomes
/// `https://www.gutenberg.org/cache/epub/2701/pg2701.txt`; a URL that
/// already points at the cached text file is returned unchanged.
pub fn resolve_text_url(url: &str) -> Result<String, SourceUrlError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(SourceUrlError::Empty);
    }
    if !url.starts_with(&format!("{GUTENBERG_ORIGIN}/")) {
        return Err(SourceUrlError::NotGutenberg);
    }
    if DIRECT_TEXT_RE.is_match(url) {
        return Ok(url.to_string());
    }
    let caps = EBOOK_PAGE_RE
        .captures(url)
        .ok_or(SourceUrlError::UnsupportedFormat)?;
    let number = &caps[1];
    Ok(format!(
        "{GUTENBERG_ORIGIN}/cache/epub/{number}/pg{number}.txt"
    ))
}

/// Rewrites a Gutenberg URL to go through `fetch_base` (e.g. a local proxy).
pub fn proxied_url(text_url: &str, fetch_base: &str) -> String {
    let base = fetch_base.trim_end_matches('/');
    match text_url.strip_prefix(GUTENBERG_ORIGIN) {
        Some(path) => format!("{base}{path}"),
        None => text_url.to_string(),
    }
}

/// Removes the Gutenberg license header and footer.
///
/// When both markers are present the text between them is kept, minus the
/// start-marker line itself. Otherwise the text is returned as is.
pub fn strip_boilerplate(book_text: &str) -> &str {
    let (Some(start), Some(end)) = (
        book_text.find(BODY_START_MARKER),
        book_text.find(BODY_END_MARKER),
    ) else {
        return book_text;
    };
    if end < start {
        return book_text;
    }
    let body = &book_text[start..end];
    match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => "",
    }
}
