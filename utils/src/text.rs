//! Text helpers for platform-limited fields.

/// Truncate `s` to at most `max_chars` characters, replacing the tail with
/// `...` when it does not fit. Counts characters, not bytes.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let mut out: String = s.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Join `items` with `sep`, or return `empty` when there are none.
pub fn join_or(items: &[String], sep: &str, empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(sep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_unchanged() {
        assert_eq!(truncate("gains", 100), "gains");
    }

    #[test]
    fn long_text_gets_ellipsis() {
        let s = "a".repeat(120);
        let t = truncate(&s, 100);
        assert_eq!(t.chars().count(), 100);
        assert!(t.ends_with("..."));
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundary() {
        let s = "👍".repeat(10);
        assert_eq!(truncate(&s, 5), "👍👍...");
    }

    #[test]
    fn join_or_empty() {
        assert_eq!(join_or(&[], "\n", "none"), "none");
        assert_eq!(join_or(&["a".into(), "b".into()], "\n", "none"), "a\nb");
    }
}
