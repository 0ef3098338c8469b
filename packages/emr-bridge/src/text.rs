//! Character-safe string capping.

/// The first `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Cap `s` at `max_chars`, appending `marker` when anything was cut.
pub fn cap_with_marker(s: &str, max_chars: usize, marker: &str) -> String {
    let capped = truncate_chars(s, max_chars);
    if capped.len() < s.len() {
        format!("{capped}{marker}")
    } else {
        capped.to_string()
    }
}
