//! Utility functions shared by views and handlers.

/// Truncates a string to at most `max_chars` characters.
///
/// Works on `char` boundaries, so multi-byte text is never split mid-character.
///
/// # Examples
///
/// ```
/// use vkmusic_core::utils::truncate_str;
///
/// assert_eq!(truncate_str("Привет, мир!", 6), "Привет");
/// ```
#[must_use]
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Splits a message into parts no longer than `max_chars` characters.
///
/// Splits on line boundaries; a single line longer than the limit is cut
/// into fixed-size chunks.
#[must_use]
pub fn split_long_message(message: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || message.chars().count() <= max_chars {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in message.lines() {
        let line_len = line.chars().count();

        if line_len > max_chars {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(max_chars) {
                parts.push(chunk.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };
        if needed > max_chars {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }

    #[test]
    fn test_split_short_message_is_untouched() {
        assert_eq!(split_long_message("one\ntwo", 100), vec!["one\ntwo"]);
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let parts = split_long_message("aaaa\nbbbb\ncccc", 9);
        assert_eq!(parts, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_split_oversized_line() {
        let parts = split_long_message("abcdefgh\nxy", 3);
        assert_eq!(parts, vec!["abc", "def", "gh", "xy"]);
    }
}
