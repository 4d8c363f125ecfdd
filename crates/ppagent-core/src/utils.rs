//! Utility helpers: string truncation, id sanitizing, path names.

/// Longest suffix kept in a derived session id.
const MAX_SESSION_SUFFIX: usize = 64;

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Replace everything outside `[A-Za-z0-9-_]` with `-`, capped at 64 chars.
pub fn sanitize_session_suffix(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .take(MAX_SESSION_SUFFIX)
        .collect()
}

/// Whether a directory name is safe to install a skill under.
pub fn is_plain_dir_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_string("こんにちは世界です", 5), "こん...");
    }

    #[test]
    fn test_sanitize_session_suffix() {
        assert_eq!(sanitize_session_suffix("C0123_abc-9"), "C0123_abc-9");
        assert_eq!(sanitize_session_suffix("a b/c:d"), "a-b-c-d");
        assert_eq!(sanitize_session_suffix("é"), "-");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(100);
        assert_eq!(sanitize_session_suffix(&long).len(), 64);
    }

    #[test]
    fn test_plain_dir_name() {
        assert!(is_plain_dir_name("my-skill"));
        assert!(!is_plain_dir_name(".."));
        assert!(!is_plain_dir_name("a/b"));
        assert!(!is_plain_dir_name(""));
    }
}
