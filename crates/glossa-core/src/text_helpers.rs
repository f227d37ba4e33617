//! Text navigation and analysis helpers.
//!
//! Everything here works on plain `&str` in char offsets, matching the
//! offsets carried by selection boundaries.

use std::ops::Range;

/// Characters that end a sentence.
pub const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Length in chars.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Convert a char offset to a byte offset, clamping to the end of the string.
pub fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

/// Convert a byte offset to a char offset.
pub fn byte_to_char(s: &str, byte_offset: usize) -> usize {
    s[..byte_offset.min(s.len())].chars().count()
}

/// Slice by char range. Out-of-range ends are clamped.
pub fn slice_chars(s: &str, range: Range<usize>) -> &str {
    let start = char_to_byte(s, range.start);
    let end = char_to_byte(s, range.end.max(range.start));
    &s[start..end]
}

/// Find `needle` in `haystack` at or after char offset `from`, returning a char offset.
pub fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let from_byte = char_to_byte(haystack, from);
    haystack[from_byte..]
        .find(needle)
        .map(|byte| byte_to_char(haystack, from_byte + byte))
}

/// Spans of every terminated sentence, in char offsets.
///
/// Each span runs from the end of the previous sentence up to and including
/// its terminator. Trailing text without a terminator is not a sentence.
pub fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, c) in text.chars().enumerate() {
        if SENTENCE_TERMINATORS.contains(&c) {
            spans.push(start..idx + 1);
            start = idx + 1;
        }
    }
    spans
}

/// Spans of every `\n`-separated line, in char offsets, newline excluded.
pub fn line_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for line in text.split('\n') {
        let len = char_len(line);
        spans.push(start..start + len);
        // +1 for the newline itself.
        start += len + 1;
    }
    spans
}

/// Narrow a char span so it excludes leading and trailing whitespace.
pub fn trim_span(text: &str, span: Range<usize>) -> Range<usize> {
    let slice = slice_chars(text, span.clone());
    let leading = slice.chars().take_while(|c| c.is_whitespace()).count();
    let body = char_len(slice.trim());
    let start = span.start + leading;
    start..start + body
}

/// Word characters for boundary checks.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_byte_conversion() {
        // "xin chào" - 'à' is 2 bytes, 1 char
        let s = "xin ch\u{E0}o";
        assert_eq!(char_len(s), 8);
        assert_eq!(char_to_byte(s, 6), 6);
        assert_eq!(char_to_byte(s, 7), 8);
        assert_eq!(char_to_byte(s, 8), 9);
        assert_eq!(char_to_byte(s, 20), 9);
        assert_eq!(byte_to_char(s, 9), 8);
    }

    #[test]
    fn test_slice_chars() {
        assert_eq!(slice_chars("hello world", 6..11), "world");
        assert_eq!(slice_chars("ch\u{E0}o b\u{1EA1}n", 5..8), "b\u{1EA1}n");
        assert_eq!(slice_chars("abc", 2..10), "c");
        assert_eq!(slice_chars("abc", 2..1), "");
    }

    #[test]
    fn test_find_from() {
        let s = "cat and cat";
        assert_eq!(find_from(s, "cat", 0), Some(0));
        assert_eq!(find_from(s, "cat", 1), Some(8));
        assert_eq!(find_from(s, "dog", 0), None);
        assert_eq!(find_from("\u{1ED3} cat", "cat", 0), Some(2));
    }

    #[test]
    fn test_sentence_spans() {
        let s = "I saw a cat. The cat ran! Why? tail";
        let spans = sentence_spans(s);
        assert_eq!(spans.len(), 3);
        assert_eq!(slice_chars(s, spans[0].clone()), "I saw a cat.");
        assert_eq!(slice_chars(s, spans[1].clone()), " The cat ran!");
        assert_eq!(slice_chars(s, spans[2].clone()), " Why?");
        assert!(sentence_spans("no terminators here").is_empty());
    }

    #[test]
    fn test_line_spans() {
        let s = "hello world\nfoo bar\n";
        let spans = line_spans(s);
        assert_eq!(spans, vec![0..11, 12..19, 20..20]);
        assert_eq!(slice_chars(s, spans[1].clone()), "foo bar");
    }

    #[test]
    fn test_trim_span() {
        let s = " The cat ran.";
        assert_eq!(trim_span(s, 0..13), 1..13);
        assert_eq!(trim_span("  ", 0..2), 2..2);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  kubelet "), 1);
        assert_eq!(word_count("take off"), 2);
        assert_eq!(word_count("a whole sentence"), 3);
        assert_eq!(word_count(""), 0);
    }
}
