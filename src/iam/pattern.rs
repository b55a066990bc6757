//! Pattern matching for IAM actions and resources
//!
//! Supports wildcards:
//! - `*` - Matches any run of characters, including `/` (e.g., `s3:Get*`, `bucket/*`)
//! - `?` - Matches exactly one character (full matching only)
//!
//! Unlike filesystem globs, `*` is not bounded by path separators: ARN-style
//! resources treat `bucket/a/b` as one opaque string.

use std::borrow::Cow;

/// Pattern matcher for action and resource strings
pub struct PatternMatcher;

impl PatternMatcher {
    /// Check if a string matches a pattern with `*` and `?` wildcards
    ///
    /// # Examples
    /// ```
    /// use gatekeep::iam::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("s3:Get*", "s3:GetObject"));
    /// assert!(PatternMatcher::matches("mybucket/*", "mybucket/a/b/c"));
    /// assert!(PatternMatcher::matches("file-?.txt", "file-1.txt"));
    /// assert!(!PatternMatcher::matches("s3:Put*", "s3:GetObject"));
    /// ```
    pub fn matches(pattern: &str, text: &str) -> bool {
        Self::matches_with(pattern, text, true)
    }

    /// Check if a string matches a pattern where only `*` is special
    ///
    /// Used for principals and bucket-name checks, where `?` is a literal.
    pub fn matches_simple(pattern: &str, text: &str) -> bool {
        Self::matches_with(pattern, text, false)
    }

    /// True if the pattern contains any wildcard character
    pub fn has_wildcard(pattern: &str) -> bool {
        pattern.contains(['*', '?'])
    }

    fn matches_with(pattern: &str, text: &str, single_char: bool) -> bool {
        if pattern.is_empty() {
            return text.is_empty();
        }
        if pattern == "*" {
            return true;
        }

        if pattern.is_ascii() && text.is_ascii() {
            let any = single_char.then_some(b'?');
            return Self::match_units(pattern.as_bytes(), text.as_bytes(), b'*', any);
        }

        let pattern: Vec<char> = pattern.chars().collect();
        let text: Vec<char> = text.chars().collect();
        Self::match_units(&pattern, &text, '*', single_char.then_some('?'))
    }

    /// Greedy match with single-point backtracking to the last `*`
    fn match_units<T: Copy + PartialEq>(pattern: &[T], text: &[T], star: T, any: Option<T>) -> bool {
        let mut pat_idx = 0;
        let mut text_idx = 0;
        // Position of the last `*` seen and the text index it was tried at
        let mut last_star: Option<(usize, usize)> = None;

        while text_idx < text.len() {
            match pattern.get(pat_idx) {
                Some(&c) if c == star => {
                    last_star = Some((pat_idx, text_idx));
                    pat_idx += 1;
                }
                Some(&c) if Some(c) == any || c == text[text_idx] => {
                    pat_idx += 1;
                    text_idx += 1;
                }
                _ => match last_star {
                    // Let the last `*` swallow one more character
                    Some((star_pat, star_text)) => {
                        pat_idx = star_pat + 1;
                        text_idx = star_text + 1;
                        last_star = Some((star_pat, star_text + 1));
                    }
                    None => return false,
                },
            }
        }

        // Text exhausted - only trailing `*` may remain
        pattern[pat_idx..].iter().all(|&c| c == star)
    }

    /// Lexically clean a slash-separated path
    ///
    /// Collapses repeated separators, drops `.` segments, resolves `..`
    /// against preceding segments and removes trailing slashes. An empty
    /// result is `"."`. Already-clean input is borrowed.
    pub fn clean_path(path: &str) -> Cow<'_, str> {
        if Self::is_clean(path) {
            return Cow::Borrowed(path);
        }
        if path.is_empty() {
            return Cow::Borrowed(".");
        }

        let rooted = path.starts_with('/');
        let mut resolved: Vec<&str> = Vec::new();

        for part in path.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    if resolved.last().is_some_and(|last| *last != "..") {
                        resolved.pop();
                    } else if !rooted {
                        resolved.push("..");
                    }
                }
                _ => resolved.push(part),
            }
        }

        let joined = resolved.join("/");
        if rooted {
            Cow::Owned(format!("/{}", joined))
        } else if joined.is_empty() {
            Cow::Borrowed(".")
        } else {
            Cow::Owned(joined)
        }
    }

    fn is_clean(path: &str) -> bool {
        if path == "/" {
            return true;
        }
        let body = path.strip_prefix('/').unwrap_or(path);
        !body.is_empty() && body.split('/').all(|part| !matches!(part, "" | "." | ".."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(PatternMatcher::matches("s3:GetObject", "s3:GetObject"));
        assert!(!PatternMatcher::matches("s3:GetObject", "s3:PutObject"));
    }

    #[test]
    fn test_star_crosses_separators() {
        assert!(PatternMatcher::matches("mybucket/*", "mybucket/a"));
        assert!(PatternMatcher::matches("mybucket/*", "mybucket/a/b/c"));
        assert!(PatternMatcher::matches("mybucket/*", "mybucket/"));
        assert!(!PatternMatcher::matches("mybucket/*", "mybucket"));
        assert!(!PatternMatcher::matches("mybucket/*", "otherbucket/a"));
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert!(PatternMatcher::matches("mybucket/myobject*", "mybucket/myobject"));
        assert!(PatternMatcher::matches("mybucket/myobject*", "mybucket/myobject.txt"));
        assert!(!PatternMatcher::matches("mybucket/myobject*", "mybucket/otherobject"));
        assert!(PatternMatcher::matches("*.txt", "dir/file.txt"));
        assert!(!PatternMatcher::matches("*.txt", "dir/file.json"));
    }

    #[test]
    fn test_multiple_stars() {
        assert!(PatternMatcher::matches("logs/*-*-*.log", "logs/app-prod-2024.log"));
        assert!(PatternMatcher::matches("a*b*c", "abc"));
        assert!(PatternMatcher::matches("a*b*c", "aXXbYYc"));
        assert!(!PatternMatcher::matches("a*b*c", "acb"));
        assert!(PatternMatcher::matches("**", "anything/at/all"));
    }

    #[test]
    fn test_question_mark() {
        assert!(PatternMatcher::matches("file-?.txt", "file-1.txt"));
        assert!(!PatternMatcher::matches("file-?.txt", "file-12.txt"));
        assert!(!PatternMatcher::matches("file-?.txt", "file-.txt"));
        // Literal in simple mode
        assert!(!PatternMatcher::matches_simple("file-?.txt", "file-1.txt"));
        assert!(PatternMatcher::matches_simple("file-?.txt", "file-?.txt"));
    }

    #[test]
    fn test_empty_and_lone_star() {
        assert!(PatternMatcher::matches("", ""));
        assert!(!PatternMatcher::matches("", "x"));
        assert!(PatternMatcher::matches("*", ""));
        assert!(PatternMatcher::matches("*", "everything/here"));
    }

    #[test]
    fn test_unicode() {
        assert!(PatternMatcher::matches("bücket/?", "bücket/ä"));
        assert!(PatternMatcher::matches("*ß", "straß"));
    }

    #[test]
    fn test_has_wildcard() {
        assert!(PatternMatcher::has_wildcard("s3:*"));
        assert!(PatternMatcher::has_wildcard("s3:Get?bject"));
        assert!(!PatternMatcher::has_wildcard("s3:GetObject"));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(PatternMatcher::clean_path("mybucket/"), "mybucket");
        assert_eq!(PatternMatcher::clean_path("mybucket//a/./b/"), "mybucket/a/b");
        assert_eq!(PatternMatcher::clean_path("a/../b"), "b");
        assert_eq!(PatternMatcher::clean_path("../a"), "../a");
        assert_eq!(PatternMatcher::clean_path("/../a"), "/a");
        assert_eq!(PatternMatcher::clean_path("/"), "/");
        assert_eq!(PatternMatcher::clean_path(""), ".");
        assert_eq!(PatternMatcher::clean_path("./"), ".");
    }

    #[test]
    fn test_clean_path_borrows_clean_input() {
        assert!(matches!(PatternMatcher::clean_path("mybucket/a/b"), Cow::Borrowed("mybucket/a/b")));
        assert!(matches!(PatternMatcher::clean_path("/a"), Cow::Borrowed("/a")));
        assert!(matches!(PatternMatcher::clean_path("a/"), Cow::Owned(_)));
        assert!(matches!(PatternMatcher::clean_path("a/../b"), Cow::Owned(_)));
    }

    #[test]
    fn test_mixed_ascii_and_unicode() {
        // Non-ASCII text against an ASCII pattern takes the char path
        assert!(PatternMatcher::matches("b/?", "b/ä"));
        assert!(!PatternMatcher::matches("b/??", "b/ä"));
        assert!(PatternMatcher::matches("b/*", "b/日本"));
        assert!(!PatternMatcher::matches_simple("b/?", "b/ä"));
    }
}
