//! The Ion 1.0 text encoding: grammar, escapes, and the streaming reader
//! and writer built on them.

mod parse;
mod reader;
mod writer;

pub use self::reader::TextReader;
pub use self::writer::{TextWriter, TextWriterConfig};

use phf::{phf_map, phf_set};

/// Tokens with special meaning anywhere a symbol could appear. To denote a
/// symbol with one of these texts it must be single-quoted.
pub(crate) static RESERVED_TOKENS: phf::Set<&'static str> = phf_set! {
    "null",
    "true",
    "false",
    "nan",
};

/// The short escape forms the writer prefers over `\uXXXX`.
pub(crate) static ESCAPED_CODE_POINTS: phf::Map<char, &'static str> = phf_map! {
    '\u{0000}' => r"\0",
    '\u{0007}' => r"\a",
    '\u{0008}' => r"\b",
    '\u{0009}' => r"\t",
    '\u{000A}' => r"\n",
    '\u{000B}' => r"\v",
    '\u{000C}' => r"\f",
    '\u{000D}' => r"\r",
    '\u{005C}' => r"\\",
};

/// Ion whitespace.
pub(crate) fn is_ws(c: char) -> bool {
    matches!(
        c,
        '\u{0009}' | '\u{000A}' | '\u{000B}' | '\u{000C}' | '\u{000D}' | '\u{0020}'
    )
}

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Symbols that may appear unquoted: `[A-Za-z_$][A-Za-z0-9_$]*`, not a
/// reserved word, and not shaped like a symbol id reference (`$` followed
/// by digits only, which would re-read as a sid).
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => {}
        _ => return false,
    }
    if !chars.all(is_identifier_char) {
        return false;
    }
    if RESERVED_TOKENS.contains(text) {
        return false;
    }
    !is_sid_reference(text)
}

/// `$` followed by one or more digits: re-reads as a symbol id, so such
/// text must be quoted when written.
pub(crate) fn is_sid_reference(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next() == Some('$') && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
    }
}

/// Characters an s-expression operator symbol is made of.
pub(crate) fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '!' | '#' | '%' | '&' | '*' | '+' | '-' | '.' | '/' | ';' | '<' | '=' | '>' | '?' | '@'
            | '^' | '`' | '|' | '~'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_classification() {
        assert!(is_identifier("abc"));
        assert!(is_identifier("$ion_1_0"));
        assert!(is_identifier("_1"));
        assert!(is_identifier("$"));
        assert!(!is_identifier("true"));
        assert!(!is_identifier("nan"));
        assert!(!is_identifier("$10"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
