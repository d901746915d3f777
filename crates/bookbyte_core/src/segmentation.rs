//! crates/bookbyte_core/src/segmentation.rs
//!
//! The paragraph segmentation prompt and the parser for the model's reply.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

const SEGMENTATION_INSTRUCTIONS: &str = r#"You are a text processing assistant. Analyze the following book text and extract all paragraphs.

CRITICAL REQUIREMENTS - FOLLOW EXACTLY:
1. Each paragraph MUST be between 3-7 sentences (NO MORE, NO LESS)
2. NEVER create single-word or single-sentence paragraphs
3. NEVER create paragraphs longer than 7 sentences
4. Count sentences carefully - a sentence ends with . ! or ?
5. If dialogue is short, combine multiple exchanges into one paragraph (up to 7 sentences)
6. Preserve the original text exactly (no summarization or modification)
7. Skip empty lines, page numbers, headers, footers, chapter titles
8. Do NOT include table of contents, index, or chapter listings
9. Skip prefaces and forewords if not part of main narrative
10. Split very long paragraphs into multiple smaller ones (3-7 sentences each)

PARAGRAPH SIZE RULES:
- Minimum: 3 sentences
- Maximum: 7 sentences
- Target: 4-6 sentences per paragraph
- If original paragraph is 15 sentences, split it into 3 paragraphs of 5 sentences each

Return ONLY a valid JSON object in this exact format with no additional text:
{
  "paragraphs": [
    "First paragraph text here...",
    "Second paragraph text here..."
  ]
}

Book text:
"#;

static JSON_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("json fence pattern"));
static ANY_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```\s*([\s\S]*?)\s*```").expect("fence pattern"));
static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("json object pattern"));

#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("Could not extract JSON from the model response")]
    NoJson,
    #[error("Model response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Invalid response format from the model - missing paragraphs array")]
    MissingParagraphs,
}

/// Builds the full user prompt for `book_text`.
pub fn build_segmentation_prompt(book_text: &str) -> String {
    format!("{SEGMENTATION_INSTRUCTIONS}{book_text}")
}

/// Parses the model reply into paragraphs.
///
/// The reply is parsed as JSON directly; when that fails, a fenced code
/// block and then the outermost `{...}` are tried. Non-string entries in the
/// `paragraphs` array are skipped.
pub fn parse_paragraphs_response(response: &str) -> Result<Vec<String>, SegmentationError> {
    let value = match serde_json::from_str::<Value>(response) {
        Ok(value) => value,
        Err(_) => {
            let candidate = fenced_block(response).unwrap_or(response);
            let object = JSON_OBJECT_RE
                .find(candidate)
                .ok_or(SegmentationError::NoJson)?;
            serde_json::from_str::<Value>(object.as_str())?
        }
    };

    let items = value
        .get("paragraphs")
        .and_then(Value::as_array)
        .ok_or(SegmentationError::MissingParagraphs)?;

    let paragraphs: Vec<String> = items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect();
    if paragraphs.len() != items.len() {
        warn!(
            skipped = items.len() - paragraphs.len(),
            "Skipping non-string paragraph entries"
        );
    }
    Ok(paragraphs)
}

fn fenced_block(text: &str) -> Option<&str> {
    let re: &Regex = if text.contains("```json") {
        &*JSON_FENCE_RE
    } else if text.contains("```") {
        &*ANY_FENCE_RE
    } else {
        return None;
    };
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let paragraphs =
            parse_paragraphs_response(r#"{"paragraphs": ["One. Two. Three.", "Four."]}"#).unwrap();
        assert_eq!(paragraphs, vec!["One. Two. Three.", "Four."]);
    }

    #[test]
    fn parses_json_fenced_block() {
        let reply = "Here you go:\n```json\n{\"paragraphs\": [\"A.\"]}\n```\nEnjoy.";
        assert_eq!(parse_paragraphs_response(reply).unwrap(), vec!["A."]);
    }

    #[test]
    fn parses_bare_fence_and_surrounding_prose() {
        let reply = "```\n{\"paragraphs\": [\"B.\"]}\n```";
        assert_eq!(parse_paragraphs_response(reply).unwrap(), vec!["B."]);

        let prose = "Sure! {\"paragraphs\": [\"C.\"]} Hope that helps.";
        assert_eq!(parse_paragraphs_response(prose).unwrap(), vec!["C."]);
    }

    #[test]
    fn rejects_missing_or_non_array_paragraphs() {
        assert!(matches!(
            parse_paragraphs_response(r#"{"chunks": []}"#),
            Err(SegmentationError::MissingParagraphs)
        ));
        assert!(matches!(
            parse_paragraphs_response(r#"{"paragraphs": "nope"}"#),
            Err(SegmentationError::MissingParagraphs)
        ));
        assert!(matches!(
            parse_paragraphs_response("no json here"),
            Err(SegmentationError::NoJson)
        ));
    }

    #[test]
    fn skips_non_string_entries() {
        let paragraphs = parse_paragraphs_response(r#"{"paragraphs": ["A.", 3, null, "B."]}"#)
            .unwrap();
        assert_eq!(paragraphs, vec!["A.", "B."]);
    }

    #[test]
    fn prompt_ends_with_the_book_text() {
        let prompt = build_segmentation_prompt("Call me Ishmael.");
        assert!(prompt.starts_with("You are a text processing assistant."));
        assert!(prompt.ends_with("Book text:\nCall me Ishmael."));
    }
}
