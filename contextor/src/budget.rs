//! Character-count token heuristics.
//!
//! Roughly four characters per token. Lengths are counted in Unicode scalar
//! values, so cuts never split a code point; they may split a word.

/// Appended to every truncated text.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

const CHARS_PER_TOKEN: usize = 4;

/// `ceil(chars / 4)`.
///
/// ```
/// use contextor::budget::estimate_tokens;
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Keeps at most `max_tokens * 4` characters, then appends [`TRUNCATION_MARKER`].
/// Text already within budget is returned unchanged.
pub fn truncate_text(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(4000)), 1000);
    }

    #[test]
    fn estimate_is_monotonic_in_length() {
        let mut prev = 0;
        let mut s = String::new();
        for _ in 0..64 {
            s.push('é');
            let est = estimate_tokens(&s);
            assert!(est >= prev);
            prev = est;
        }
    }

    #[test]
    fn text_within_budget_is_untouched() {
        assert_eq!(truncate_text("abcdefgh", 2), "abcdefgh");
        assert_eq!(truncate_text("", 0), "");
    }

    #[test]
    fn long_text_is_cut_and_marked() {
        let out = truncate_text("abcdefghij", 2);
        assert_eq!(out, "abcdefgh... [truncated]");
    }

    #[test]
    fn truncated_length_is_bounded() {
        let marker = TRUNCATION_MARKER.chars().count();
        for n in 0..12 {
            for len in 0..60 {
                let t: String = std::iter::repeat('ж').take(len).collect();
                let out = truncate_text(&t, n);
                assert!(out.chars().count() <= n * 4 + marker);
                assert_eq!(out == t, len <= n * 4);
            }
        }
    }
}
