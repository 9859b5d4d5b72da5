//! Lua-style patterns, compiled to [`regex`] syntax.
//!
//! Supported classes: `%a %c %d %g %l %p %s %u %w %x %z`. Any other `%X`
//! escapes `X` literally. Everything else passes through as regex syntax,
//! except `|` and `\`, which are literal in Lua patterns.

use regex::Regex;

pub fn translate(pattern: &str) -> String {
    let mut re = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => match chars.next() {
                Some('a') => re.push_str("[A-Za-z]"),
                Some('c') => re.push_str(r"[\x00-\x1F\x7F]"),
                Some('d') => re.push_str(r"\d"),
                Some('g') => re.push_str(r"[\x21-\x7E]"),
                Some('l') => re.push_str("[a-z]"),
                Some('p') => re.push_str(r"[\x21-\x2F\x3A-\x40\x5B-\x60\x7B-\x7E]"),
                Some('s') => re.push_str(r"\s"),
                Some('u') => re.push_str("[A-Z]"),
                Some('w') => re.push_str(r"\w"),
                Some('x') => re.push_str("[A-Fa-f0-9]"),
                Some('z') => re.push_str(r"\x00"),
                Some(other) => re.push_str(&regex::escape(&other.to_string())),
                None => re.push('%'),
            },
            '|' => re.push_str(r"\|"),
            '\\' => re.push_str(r"\\"),
            other => re.push(other),
        }
    }
    re
}

/// Compiles a pattern anchored at both ends. `None` if the translation is
/// not a valid regex.
pub fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(&format!("^(?:{})$", translate(pattern))).ok()
}

/// Matches the whole of `text` against `pattern`. On success returns the
/// full match followed by every capture group; unmatched groups are empty.
pub fn lua_match(text: &str, pattern: &str) -> Vec<String> {
    let Some(re) = compile(pattern) else {
        return Vec::new();
    };
    match re.captures(text) {
        Some(caps) => caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_translate() {
        assert_eq!(translate("%d+"), r"\d+");
        assert_eq!(translate("%a%%"), "[A-Za-z]%");
        assert_eq!(translate("a|b"), r"a\|b");
        assert_eq!(translate("%."), r"\.");
    }

    #[test]
    fn whole_string_match_with_captures() {
        assert_eq!(lua_match("key=42", "(%a+)=(%d+)"), vec!["key=42", "key", "42"]);
        assert!(lua_match("key=42!", "(%a+)=(%d+)").is_empty());
        assert_eq!(lua_match("abc", "%l+"), vec!["abc"]);
    }

    #[test]
    fn nested_class_union() {
        assert_eq!(lua_match("a_b", "[%a_]+"), vec!["a_b"]);
    }

    #[test]
    fn invalid_pattern_never_matches() {
        assert!(lua_match("((", "((").is_empty());
        assert!(compile("(").is_none());
    }

    #[test]
    fn optional_group_is_empty() {
        assert_eq!(lua_match("x", "x(y)?"), vec!["x", ""]);
    }
}
