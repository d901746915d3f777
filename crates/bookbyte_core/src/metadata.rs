//! crates/bookbyte_core/src/metadata.rs
//!
//! Best-effort extraction of title, author, release date and language from
//! the header block of a Project Gutenberg plain-text download.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Marks the end of the header and the start of the book body.
pub const HEADER_SENTINEL: &str = "*** START OF";

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const UNKNOWN_DATE: &str = "Unknown Date";
pub const UNKNOWN_LANGUAGE: &str = "Unknown Language";

/// Used when the release date cannot be turned into a calendar date.
pub const FALLBACK_PUBLISHED_DATE: (i32, u32, u32) = (2024, 1, 1);

// A label value plus any continuation lines indented with spaces or tabs.
// A blank line or a non-indented line (the next label) ends the value.
static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)title:\s*(\S[^\n]*(?:\n[ \t]+\S[^\n]*)*)").expect("title pattern")
});
static AUTHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)author:\s*(\S[^\n]*(?:\n[ \t]+\S[^\n]*)*)").expect("author pattern")
});
static RELEASE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)release date:\s*([^\[]+?)(?:\s*\[|$)").expect("release date pattern")
});
static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)language:\s*([^\n]+)").expect("language pattern"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static LONG_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s+(\d+),\s+(\d{4})").expect("long date pattern"));

/// Metadata pulled from a book header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub release_date: String,
    pub language: String,
    pub source_url: String,
}

/// Extracts metadata from the header region of `book_text`.
///
/// Returns `None` only when the header sentinel is missing. Every field that
/// cannot be found falls back to its `Unknown ...` placeholder.
pub fn extract_book_metadata(book_text: &str, source_url: &str) -> Option<BookMetadata> {
    let header_end = book_text.find(HEADER_SENTINEL)?;
    let header = &book_text[..header_end];

    let title = capture(&TITLE_RE, header)
        .map(|s| collapse_whitespace(&s))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let author = capture(&AUTHOR_RE, header)
        .map(|s| collapse_whitespace(&s))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let release_date = capture(&RELEASE_DATE_RE, header)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());
    let language = capture(&LANGUAGE_RE, header)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

    Some(BookMetadata {
        title,
        author,
        release_date,
        language,
        source_url: source_url.to_string(),
    })
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.trim().is_empty())
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Parses a release date such as `January 1, 2001` into a calendar date.
///
/// Anything else maps to `2024-01-01`; an unknown month name maps to January.
pub fn parse_release_date(release_date: &str) -> NaiveDate {
    let (y, m, d) = FALLBACK_PUBLISHED_DATE;
    let fallback = NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();

    let Some(caps) = LONG_DATE_RE.captures(release_date) else {
        return fallback;
    };
    let month = month_number(&caps[1]).unwrap_or(1);
    let day = caps[2].parse::<u32>().ok();
    let year = caps[3].parse::<i32>().ok();

    match (year, day) {
        (Some(year), Some(day)) => NaiveDate::from_ymd_opt(year, month, day).unwrap_or(fallback),
        _ => fallback,
    }
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}
