//! Display cleanup for inquiry messages stored by the marketplace API.
//!
//! Some stored messages are URL-encoded, comma-concatenated form dumps or
//! captured request log lines. These rules only decide what to *show*. They
//! never write back, and no round trip is implied.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

pub const SERVER_LOG_NOTICE: &str = "[Message unavailable: the stored text contains server log data]";
pub const CORRUPTED_NOTICE: &str = "[Message unavailable: the stored text is corrupted]";

/// Comma-separated text longer than this is reduced to one segment.
const COMMA_DENSE_MIN_LEN: usize = 120;
const COMMA_DENSE_MIN_COMMAS: usize = 3;
/// Unbroken text longer than this cannot be a sentence.
const NO_WHITESPACE_MAX_LEN: usize = 50;
const MIN_SEGMENT_LEN: usize = 3;

static HTTP_REQUEST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s+/\S*\s+HTTP/\d|\bHTTP/1\.[01]\b")
        .expect("valid http marker regex")
});

static LOWERCASE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z]{30,}").expect("valid lowercase run regex"));

static LOG_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)https?://|/uploads/|/api/|\bHTTP/|\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b|\[\d{4}-\d{2}-\d{2}|\b(?:GET|POST|PUT|DELETE)\s+/",
    )
    .expect("valid log-like regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFlag {
    /// Request log lines were stored in place of the message.
    ServerLog,
    /// Text is garbled beyond recovery.
    Corrupted,
    /// A shorter readable part was extracted from a form dump.
    Extracted,
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub text: String,
    pub flag: Option<MessageFlag>,
}

impl NormalizedMessage {
    fn clean(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            flag: None,
        }
    }

    fn flagged(text: impl Into<String>, flag: MessageFlag) -> Self {
        Self {
            text: text.into(),
            flag: Some(flag),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.flag, Some(MessageFlag::ServerLog | MessageFlag::Corrupted))
    }
}

pub fn normalize_message(raw: &str, max_len: usize) -> NormalizedMessage {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedMessage::clean("");
    }

    if HTTP_REQUEST_MARKER.is_match(trimmed) {
        return NormalizedMessage::flagged(SERVER_LOG_NOTICE, MessageFlag::ServerLog);
    }

    if has_corruption_signature(trimmed) {
        return NormalizedMessage::flagged(CORRUPTED_NOTICE, MessageFlag::Corrupted);
    }

    let text: Cow<'_, str> = match decode_if_escaped(trimmed) {
        Some(decoded) => {
            if HTTP_REQUEST_MARKER.is_match(&decoded) {
                return NormalizedMessage::flagged(SERVER_LOG_NOTICE, MessageFlag::ServerLog);
            }
            Cow::Owned(decoded)
        }
        None => Cow::Borrowed(trimmed),
    };

    if is_comma_dense(&text) {
        if let Some(segment) = first_meaningful_segment(&text, max_len) {
            return NormalizedMessage::flagged(segment, MessageFlag::Extracted);
        }
    }

    let char_count = text.chars().count();
    if char_count > NO_WHITESPACE_MAX_LEN && !text.chars().any(char::is_whitespace) {
        return NormalizedMessage::flagged(CORRUPTED_NOTICE, MessageFlag::Corrupted);
    }

    if char_count > max_len {
        let head: String = text.chars().take(max_len).collect();
        return NormalizedMessage::flagged(
            format!("{}...", head.trim_end()),
            MessageFlag::Truncated,
        );
    }

    NormalizedMessage::clean(text.into_owned())
}

fn has_corruption_signature(text: &str) -> bool {
    LOWERCASE_RUN.is_match(text) && text.matches(',').count() >= COMMA_DENSE_MIN_COMMAS
}

/// URL-decode text containing `%` or `+` escapes, keeping the result only if
/// it is printable.
fn decode_if_escaped(text: &str) -> Option<String> {
    if !text.contains('%') && !text.contains('+') {
        return None;
    }
    let spaced = text.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).ok()?;
    let plausible = !decoded.trim().is_empty()
        && !decoded
            .chars()
            .any(|c| (c.is_control() && !c.is_whitespace()) || c == char::REPLACEMENT_CHARACTER);
    plausible.then(|| decoded.trim().to_string())
}

fn is_comma_dense(text: &str) -> bool {
    text.chars().count() > COMMA_DENSE_MIN_LEN && text.matches(',').count() >= COMMA_DENSE_MIN_COMMAS
}

fn first_meaningful_segment(text: &str, max_len: usize) -> Option<String> {
    text.split(',')
        .map(str::trim)
        .find(|segment| {
            let len = segment.chars().count();
            (MIN_SEGMENT_LEN..=max_len).contains(&len)
                && segment.chars().any(|c| "aeiouAEIOU".contains(c))
                && !LOG_LIKE.is_match(segment)
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 200;

    #[test]
    fn request_log_lines_are_replaced() {
        let result = normalize_message(
            "127.0.0.1 - - GET /uploads/foo HTTP/1.1 200 512 \"Mozilla/5.0\"",
            MAX,
        );
        assert_eq!(result.text, SERVER_LOG_NOTICE);
        assert_eq!(result.flag, Some(MessageFlag::ServerLog));
        assert!(result.is_unavailable());

        let result = normalize_message("GET /uploads/foo HTTP/1.1", MAX);
        assert_eq!(result.text, SERVER_LOG_NOTICE);
    }

    #[test]
    fn benign_text_is_kept() {
        let result = normalize_message("hello, world, this is fine", MAX);
        assert_eq!(result.text, "hello, world, this is fine");
        assert_eq!(result.flag, None);
    }

    #[test]
    fn corruption_signature_is_flagged() {
        let result = normalize_message(
            "warehouseavailabilityinquirybhiwandi,mumbai,pune,nashik",
            MAX,
        );
        assert_eq!(result.text, CORRUPTED_NOTICE);
        assert_eq!(result.flag, Some(MessageFlag::Corrupted));
    }

    #[test]
    fn url_encoded_text_is_decoded() {
        let result = normalize_message("Need+5000+sqft+in+Pune%2C+urgently", MAX);
        assert_eq!(result.text, "Need 5000 sqft in Pune, urgently");
        assert_eq!(result.flag, None);
    }

    #[test]
    fn encoded_log_line_is_still_detected() {
        let result = normalize_message("GET+%2Fapi%2Fbookings+HTTP%2F1.1", MAX);
        assert_eq!(result.flag, Some(MessageFlag::ServerLog));
    }

    #[test]
    fn comma_dump_yields_first_meaningful_segment() {
        let dump = format!(
            "  ,12,/api/v1/inquiries,Looking for cold storage near Chakan for two months,{},{}",
            "x".repeat(20),
            "9876543210 ".repeat(6)
        );
        assert!(dump.len() > 120);
        let result = normalize_message(&dump, MAX);
        assert_eq!(result.text, "Looking for cold storage near Chakan for two months");
        assert_eq!(result.flag, Some(MessageFlag::Extracted));
    }

    #[test]
    fn long_unbroken_text_is_flagged() {
        let result = normalize_message("QmFzZTY0RW5jb2RlZERhdGFUaGF0TG9va3NMaWtlR2FyYmFnZQ==", MAX);
        assert_eq!(result.text, CORRUPTED_NOTICE);
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let long = "गोदाम की आवश्यकता ".repeat(30);
        let result = normalize_message(&long, 40);
        assert_eq!(result.flag, Some(MessageFlag::Truncated));
        assert!(result.text.ends_with("..."));
        assert!(result.text.chars().count() <= 43);
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(normalize_message("   ", MAX).text, "");
    }
}
