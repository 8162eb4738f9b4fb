//! Glob patterns as used by `KEYS`.

use regex::Regex;

/// Compiles a glob pattern (`*`, `?`, `[...]`, `\x`) into an anchored regex.
pub(crate) fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    expr.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                }
            }
            '[' => {
                expr.push('[');
                let mut first = true;
                for c in chars.by_ref() {
                    match c {
                        ']' => break,
                        '^' if first => expr.push('^'),
                        '\\' | '[' | '&' | '~' => {
                            expr.push('\\');
                            expr.push(c);
                        }
                        _ => expr.push(c),
                    }
                    first = false;
                }
                expr.push(']');
            }
            _ => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

#[cfg(test)]
mod tests {
    use super::compile;

    #[test]
    fn test_star_and_question_mark() {
        let glob = compile("app:test:*").unwrap();
        assert!(glob.is_match("app:test:foo"));
        assert!(glob.is_match("app:test:"));
        assert!(!glob.is_match("app:prod:foo"));

        let glob = compile("h?llo").unwrap();
        assert!(glob.is_match("hello"));
        assert!(!glob.is_match("heello"));
    }

    #[test]
    fn test_character_classes() {
        let glob = compile("h[ae]llo").unwrap();
        assert!(glob.is_match("hallo"));
        assert!(!glob.is_match("hillo"));

        let glob = compile("h[^e]llo").unwrap();
        assert!(glob.is_match("hallo"));
        assert!(!glob.is_match("hello"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let glob = compile("a.b+(c)").unwrap();
        assert!(glob.is_match("a.b+(c)"));
        assert!(!glob.is_match("axb+(c)"));
        assert!(compile(r"star\*").unwrap().is_match("star*"));
    }
}
