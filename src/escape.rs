//! Escaping of special characters for values embedded in TSV payloads
//! and query literals.
//!
//! Stateless: both functions are pure transforms over a `&str`.

/// Returns the escaped form of `c`, if `c` needs escaping.
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '\u{8}' => Some("\\b"),
        '\u{c}' => Some("\\f"),
        '\r' => Some("\\r"),
        '\n' => Some("\\n"),
        '\t' => Some("\\t"),
        '\'' => Some("\\'"),
        '\\' => Some("\\\\"),
        '/' => Some("\\/"),
        '-' => Some("\\-"),
        _ => None,
    }
}

/// Maps the character following a backslash back to its raw form.
fn unescape_char(c: char) -> Option<char> {
    match c {
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'r' => Some('\r'),
        'n' => Some('\n'),
        't' => Some('\t'),
        '\'' => Some('\''),
        '\\' => Some('\\'),
        '/' => Some('/'),
        '-' => Some('-'),
        _ => None,
    }
}

/// Escape special characters.
pub fn escape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match escape_char(c) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// Undo [`escape`].
///
/// A backslash followed by anything other than a known escape is kept
/// verbatim, and the following character is processed on its own.
pub fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.peek().copied().and_then(unescape_char) {
            Some(raw) => {
                out.push(raw);
                chars.next();
            }
            None => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIALS: [char; 9] = ['\u{8}', '\u{c}', '\r', '\n', '\t', '\'', '\\', '/', '-'];

    #[test]
    fn test_escape_specials() {
        assert_eq!(escape("a\tb\nc"), "a\\tb\\nc");
        assert_eq!(escape("it's"), "it\\'s");
        assert_eq!(escape("a/b-c\\d"), "a\\/b\\-c\\\\d");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_unescape_specials() {
        assert_eq!(unescape("a\\tb\\nc"), "a\tb\nc");
        assert_eq!(unescape("\\b\\f\\r"), "\u{8}\u{c}\r");
        assert_eq!(unescape("it\\'s"), "it's");
    }

    #[test]
    fn test_unescape_unknown_sequence_kept() {
        assert_eq!(unescape("a\\qb"), "a\\qb");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_round_trip_all_orders() {
        // Every ordered pair and triple of special characters, mixed with text.
        for a in SPECIALS {
            for b in SPECIALS {
                for c in SPECIALS {
                    let s: String = [a, 'x', b, c].iter().collect();
                    assert_eq!(unescape(&escape(&s)), s, "round trip failed for {:?}", s);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_unicode() {
        let s = "привет\t世界\\n-/'";
        assert_eq!(unescape(&escape(s)), s);
    }
}
