//! Push message shaping
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Character-based limits for the push API, message-count cap per push
//! - 1.0.0: Extracted from 8 duplicate implementations in command_handler.rs

/// Maximum characters in one text message object
pub const PUSH_TEXT_LIMIT: usize = 5000;
/// Maximum message objects accepted in a single push request
pub const PUSH_MESSAGE_LIMIT: usize = 5;

const ELLIPSIS: &str = "...";

/// Chunk text into pieces of at most `max_chars` characters
///
/// Prefers splitting at newlines and falls back to splitting inside a line
/// when a single line is longer than the limit. Never splits a character.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count() + 1;
        if current_len + line_len > max_chars {
            if !current.is_empty() {
                chunks.push(current.trim_end().to_string());
                current.clear();
                current_len = 0;
            }
            if line_len > max_chars {
                chunks.extend(chunk_long_line(line, max_chars));
                continue;
            }
        }
        current.push_str(line);
        current.push('\n');
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current.trim_end().to_string());
    }
    chunks
}

fn chunk_long_line(line: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Truncate to `max_chars` characters, ending with an ellipsis when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Split a reminder body into the message objects of one push request
///
/// Anything beyond the message-count cap is folded into the last message and
/// truncated.
pub fn chunk_for_push(text: &str) -> Vec<String> {
    let mut chunks = chunk_text(text, PUSH_TEXT_LIMIT);
    if chunks.len() > PUSH_MESSAGE_LIMIT {
        let overflow = chunks.split_off(PUSH_MESSAGE_LIMIT - 1).join("\n");
        chunks.push(truncate_chars(&overflow, PUSH_TEXT_LIMIT));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_no_chunk() {
        assert_eq!(chunk_text("hello", 100), vec!["hello"]);
    }

    #[test]
    fn test_chunk_respects_lines() {
        let result = chunk_text("line1\nline2\nline3", 12);
        assert_eq!(result, vec!["line1\nline2", "line3"]);
    }

    #[test]
    fn test_chunk_handles_long_lines() {
        let result = chunk_text(&"a".repeat(100), 30);
        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|c| c.chars().count() <= 30));
    }

    #[test]
    fn test_limits_count_characters_not_bytes() {
        let text = "旅".repeat(PUSH_TEXT_LIMIT);
        assert_eq!(chunk_for_push(&text).len(), 1);
        let chunks = chunk_for_push(&"旅".repeat(PUSH_TEXT_LIMIT + 1));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "旅");
    }

    #[test]
    fn test_push_caps_message_count() {
        let text = "x".repeat(PUSH_TEXT_LIMIT * 7);
        let chunks = chunk_for_push(&text);
        assert_eq!(chunks.len(), PUSH_MESSAGE_LIMIT);
        let last = chunks.last().unwrap();
        assert!(last.ends_with("..."));
        assert_eq!(last.chars().count(), PUSH_TEXT_LIMIT);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 6), "abc...");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(chunk_text("", 100), vec![""]);
    }

    #[test]
    fn test_exactly_at_limit() {
        let result = chunk_text(&"a".repeat(100), 100);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 100);
    }
}
