//! # Structured Output Module
//!
//! Coerces free-form model text into typed values.
//!
//! Models are asked to answer with a JSON object but do not always comply, so
//! extraction works in two tiers:
//!
//! 1. **Bracketed object**: take the text between the first `{` and the last
//!    `}` and decode it strictly against the target type. A decoded value with
//!    an empty required field is rejected as incomplete.
//! 2. **Line fallback** (list schemas only): when no bracketed region exists,
//!    every trimmed, non-empty line without a brace becomes one list entry.

use serde::de::DeserializeOwned;

use crate::errors::StructuredOutputError;

/// A type that can be decoded from model output.
pub trait Schema: DeserializeOwned {
    /// Name of the first required field that is empty or missing, if any.
    fn missing_field(&self) -> Option<&'static str>;
}

/// A list schema that can also be built from plain lines of text.
pub trait LineFallback: Schema {
    fn from_lines(lines: Vec<String>) -> Self;
}

/// Returns the substring spanning the first `{` through the last `}`.
pub fn bracketed_region(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Lines usable as list items when the model ignored the format instructions.
pub fn fallback_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains('{') && !line.contains('}'))
        .map(str::to_string)
        .collect()
}

fn decode_strict<T: Schema>(candidate: &str) -> Result<T, StructuredOutputError> {
    let value: T =
        serde_json::from_str(candidate).map_err(|source| StructuredOutputError::Malformed {
            source,
            raw: candidate.to_string(),
        })?;

    match value.missing_field() {
        Some(field) => Err(StructuredOutputError::Incomplete(field)),
        None => Ok(value),
    }
}

/// Strict extraction: a bracketed object is required.
pub fn parse_object<T: Schema>(text: &str) -> Result<T, StructuredOutputError> {
    match bracketed_region(text) {
        Some(candidate) => decode_strict(candidate),
        None => Err(StructuredOutputError::NoUsableContent),
    }
}

/// Strict extraction with the line fallback for list schemas.
///
/// The fallback only applies when there is no bracketed region at all; a
/// bracketed region that fails to decode is reported as malformed.
pub fn parse_object_or_lines<T: LineFallback>(text: &str) -> Result<T, StructuredOutputError> {
    if let Some(candidate) = bracketed_region(text) {
        return decode_strict(candidate);
    }

    let lines = fallback_lines(text);
    if lines.is_empty() {
        return Err(StructuredOutputError::NoUsableContent);
    }
    Ok(T::from_lines(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Tags {
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Schema for Tags {
        fn missing_field(&self) -> Option<&'static str> {
            self.tags.is_empty().then_some("tags")
        }
    }

    impl LineFallback for Tags {
        fn from_lines(lines: Vec<String>) -> Self {
            Tags { tags: lines }
        }
    }

    #[test]
    fn test_bracketed_region_spans_first_to_last_brace() {
        let text = "Sure! {\"a\": {\"b\": 1}} hope that helps";
        assert_eq!(bracketed_region(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_bracketed_region_rejects_reversed_braces() {
        assert_eq!(bracketed_region("} nothing here {"), None);
        assert_eq!(bracketed_region("only an opening {"), None);
        assert_eq!(bracketed_region("no braces at all"), None);
    }

    #[test]
    fn test_parse_object_inside_code_fence() {
        let text = "```json\n{\"tags\": [\"x\", \"y\"]}\n```";
        let tags: Tags = parse_object(text).unwrap();
        assert_eq!(tags.tags, vec!["x", "y"]);
    }

    #[test]
    fn test_parse_object_reports_incomplete() {
        let err = parse_object::<Tags>("{\"tags\": []}").unwrap_err();
        assert!(matches!(err, StructuredOutputError::Incomplete("tags")));

        let err = parse_object::<Tags>("{}").unwrap_err();
        assert!(matches!(err, StructuredOutputError::Incomplete("tags")));
    }

    #[test]
    fn test_parse_object_reports_malformed_with_raw_text() {
        let err = parse_object::<Tags>("here: {tags: nope}").unwrap_err();
        assert_eq!(err.raw(), Some("{tags: nope}"));
    }

    #[test]
    fn test_parse_object_without_braces_is_no_usable_content() {
        let err = parse_object::<Tags>("just\nsome\nlines").unwrap_err();
        assert!(matches!(err, StructuredOutputError::NoUsableContent));
    }

    #[test]
    fn test_line_fallback_keeps_order_and_skips_brace_lines() {
        let text = "  egg \n\n tomato\n{\nbasil\n";
        let tags: Tags = parse_object_or_lines(text).unwrap();
        assert_eq!(tags.tags, vec!["egg", "tomato", "basil"]);
    }

    #[test]
    fn test_line_fallback_with_nothing_usable() {
        let err = parse_object_or_lines::<Tags>("  \n\n{\n").unwrap_err();
        assert!(matches!(err, StructuredOutputError::NoUsableContent));
    }

    #[test]
    fn test_bracketed_region_takes_precedence_over_lines() {
        let err = parse_object_or_lines::<Tags>("egg\n{\"tags\": 5}\ntomato").unwrap_err();
        assert!(matches!(err, StructuredOutputError::Malformed { .. }));
    }
}
