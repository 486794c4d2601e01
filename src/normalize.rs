//! Shapes a generated reply for the marketplace's review-answer limits.

use tracing::{debug, warn};

pub const MAX_WORDS: usize = 300;
pub const MAX_CHARACTERS: usize = 700;
pub const UNKNOWN_TITLE: &str = "Не указано";
const ELLIPSIS: &str = "...";

/// Decorative header placed above every reply.
pub fn prefix(order_title: &str) -> String {
    let title = if order_title.is_empty() { UNKNOWN_TITLE } else { order_title };
    format!("(づ ◕‿◕ )づ 🛍 [{title}]\n\n")
}

/// Splits on `\n`, `\r\n`, `\r` and the other Unicode line boundaries.
/// A trailing line break does not produce an empty last line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let is_break = matches!(
            c,
            '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{1C}' | '\u{1D}' | '\u{1E}' | '\u{85}' | '\u{2028}' | '\u{2029}'
        );
        if !is_break {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && matches!(chars.peek(), Some((_, '\n'))) {
            chars.next();
            start += 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn limit_words(text: String) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= MAX_WORDS {
        return text;
    }
    debug!("Response truncated to {MAX_WORDS} words.");
    format!("{}{ELLIPSIS}", words[..MAX_WORDS].join(" "))
}

/// Cut to at most `max_chars` characters including the ellipsis.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.chars().count());
    let cut: String = text.chars().take(keep).collect();
    format!("{}{ELLIPSIS}", cut.trim_end())
}

pub fn normalize(raw: &str, order_title: &str) -> String {
    let prefix = prefix(order_title);
    let body = raw.strip_prefix(prefix.as_str()).unwrap_or(raw);

    let body = limit_words(split_lines(body).join(" "));
    let details = truncate_chars(&format!("{prefix}{body}"), MAX_CHARACTERS);

    debug!("Final length: {} characters.", details.chars().count());
    if details.chars().count() > MAX_CHARACTERS {
        warn!("Final response still exceeds the character limit.");
        return truncate_chars(&details, MAX_CHARACTERS);
    }
    details
}
