//! Shared utility functions

use unicode_width::UnicodeWidthChar;

/// Safely truncate a string to at most `max_bytes` while respecting UTF-8 boundaries.
///
/// If the string is already shorter than `max_bytes`, returns it unchanged.
/// Otherwise, finds the last valid UTF-8 character boundary at or before `max_bytes`
/// and returns a slice up to that point.
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Fit `s` into exactly `width` terminal columns, padding or ending in `…`
///
/// Width is measured in display columns, so emoji avatars and Cyrillic
/// subjects line up in tables.
pub fn fit_width(s: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();

    if total <= width {
        out.push_str(s);
        used = total;
    } else if width > 0 {
        for c in s.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width - 1 {
                break;
            }
            out.push(c);
            used += w;
        }
        out.push('…');
        used += 1;
    }

    out.extend(std::iter::repeat(' ').take(width.saturating_sub(used)));
    out
}

/// Count characters, not bytes (limits are expressed in characters)
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Keep the first `max_chars` characters of `s`
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate_utf8_safe("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_at_utf8_boundary() {
        // Each character is 3 bytes, so 9 bytes total
        let s = "日本語";
        assert_eq!(truncate_utf8_safe(s, 4), "日");
        assert_eq!(truncate_utf8_safe(s, 6), "日本");
    }

    #[test]
    fn test_fit_width_pads_short_text() {
        assert_eq!(fit_width("abc", 5), "abc  ");
    }

    #[test]
    fn test_fit_width_truncates_with_ellipsis() {
        assert_eq!(fit_width("abcdefgh", 5), "abcd…");
    }

    #[test]
    fn test_fit_width_counts_wide_chars() {
        // "日" is two columns wide
        let fitted = fit_width("日本語", 5);
        assert_eq!(fitted, "日本…");
    }

    #[test]
    fn test_truncate_chars_on_cyrillic() {
        assert_eq!(truncate_chars("Привет", 3), "При");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(char_len("Привет"), 6);
    }
}
