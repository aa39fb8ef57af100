//! IRCv3 tag value escaping.

use std::fmt::{Result as FmtResult, Write};

/// Escape a tag value into a formatter.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Reverse [`escape_tag_value`]. A dangling backslash is dropped.
pub fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        let mut out = String::new();
        escape_tag_value(&mut out, "a b;c\\d").unwrap();
        assert_eq!(out, "a\\sb\\:c\\\\d");
    }

    #[test]
    fn unescape_inverts_escape() {
        assert_eq!(unescape_tag_value("a\\sb\\:c\\\\d"), "a b;c\\d");
        assert_eq!(unescape_tag_value("x\\n\\r"), "x\n\r");
    }

    #[test]
    fn unknown_escape_keeps_character() {
        assert_eq!(unescape_tag_value("\\q"), "q");
        assert_eq!(unescape_tag_value("end\\"), "end");
    }
}
