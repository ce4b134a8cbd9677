//! The Ion 1.0 text grammar, one production per function, yielding values
//! of the tree model one top-level value at a time.
//!
//! Follows the Ion text encoding <https://amzn.github.io/ion-docs/docs/text.html>
//! and the Ion specification <https://amzn.github.io/ion-docs/docs/spec.html>.
//! Values that are not self-delimiting (numbers, timestamps) must be
//! followed by a terminator character, which inside an s-expression
//! includes the operator characters.

use nom::character::complete::{char, one_of};
use nom::combinator::opt;
use nom::error::{ErrorKind, ParseError};
use nom::Err;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Num, Zero};

use super::{is_identifier_char, is_identifier_start, is_operator_char, is_sid_reference, is_ws, RESERVED_TOKENS};
use crate::error::{Error, SymbolError, TextFormatError};
use crate::symbol_table::SymbolTable;
use crate::symbols::SymbolToken;
use crate::types::{Decimal, IonType, Timestamp};
use crate::value::{Blob, Clob, Data, List, Sexp, Struct, Value};

const LONG_QUOTE: &str = "'''";

pub(crate) type TResult<'a, T> = nom::IResult<&'a str, T, TextError<'a>>;

/// The error type threaded through the grammar. Plain nom errors mark
/// recoverable branch misses; a cause marks a committed failure.
#[derive(Debug)]
pub(crate) struct TextError<'a> {
    pub(crate) remaining: &'a str,
    pub(crate) cause: Option<Cause>,
}

#[derive(Debug)]
pub(crate) enum Cause {
    /// A complete error (symbol resolution, timestamp validation).
    Complete(Error),
    /// A grammar failure; the reader attaches the position.
    Format(TextFormatError),
}

impl<'a> ParseError<&'a str> for TextError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        TextError {
            remaining: input,
            cause: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn soft_error<'a, T>(i: &'a str) -> TResult<'a, T> {
    Err(Err::Error(TextError::from_error_kind(i, ErrorKind::Alt)))
}

fn fail_format<'a, T>(i: &'a str, error: TextFormatError) -> TResult<'a, T> {
    Err(Err::Failure(TextError {
        remaining: i,
        cause: Some(Cause::Format(error)),
    }))
}

fn fail_with<'a, T>(i: &'a str, error: Error) -> TResult<'a, T> {
    Err(Err::Failure(TextError {
        remaining: i,
        cause: Some(Cause::Complete(error)),
    }))
}

/// Promotes a branch miss to a committed failure, used once a container's
/// opening delimiter has been consumed.
fn commit<T>(result: TResult<T>) -> TResult<T> {
    result.map_err(|error| match error {
        Err::Error(e) => Err::Failure(e),
        other => other,
    })
}

fn expect<'a>(i: &'a str, literal: &'static str, expected: &'static str) -> TResult<'a, ()> {
    match i.strip_prefix(literal) {
        Some(rest) => Ok((rest, ())),
        None => fail_format(i, TextFormatError::Expected(expected)),
    }
}

/// Consumes whitespace and comments.
///
/// ws: WHITESPACE | INLINE_COMMENT | BLOCK_COMMENT
pub(crate) fn skip_ws(i: &str) -> TResult<'_, ()> {
    let mut rest = i;
    loop {
        match rest.chars().next() {
            Some(c) if is_ws(c) => {
                rest = &rest[c.len_utf8()..];
            }
            Some('/') if rest.starts_with("//") => {
                let body = &rest[2..];
                rest = match body.find(|c: char| c == '\n' || c == '\r') {
                    Some(at) => &body[at..],
                    None => "",
                };
            }
            Some('/') if rest.starts_with("/*") => {
                rest = match rest[2..].find("*/") {
                    Some(at) => &rest[2 + at + 2..],
                    None => return fail_format(rest, TextFormatError::UnterminatedComment),
                };
            }
            _ => return Ok((rest, ())),
        }
    }
}

/// Whitespace only; comments are not recognized inside lob delimiters.
fn skip_plain_ws(i: &str) -> TResult<'_, ()> {
    let end = i
        .find(|c: char| !is_ws(c))
        .unwrap_or_else(|| i.len());
    Ok((&i[end..], ()))
}

/// One top-level value, or `None` at the end of input. Version markers and
/// symbol tables are ordinary values at this layer; the reader gives them
/// their stream semantics.
pub(crate) fn parse_top_level<'a>(
    i: &'a str,
    table: &SymbolTable,
) -> TResult<'a, Option<Value>> {
    let (i, _) = skip_ws(i)?;
    if i.is_empty() {
        return Ok((i, None));
    }
    let (i, value) = take_value(i, table, false)?;
    Ok((i, Some(value)))
}

/// value: annotation* entity
pub(crate) fn take_value<'a>(
    i: &'a str,
    table: &SymbolTable,
    in_sexp: bool,
) -> TResult<'a, Value> {
    let (rest, annotations) = take_annotations(i, table)?;
    let entity = take_entity(rest, table, in_sexp);
    let (rest, data) = if annotations.is_empty() {
        entity?
    } else {
        // annotations bind tighter than anything else; once `sym::` has
        // been consumed a value must follow
        commit(entity)?
    };
    Ok((rest, Value { data, annotations }))
}

/// annotation: symbol ws* '::' ws*
fn take_annotations<'a>(
    mut i: &'a str,
    table: &SymbolTable,
) -> TResult<'a, Vec<SymbolToken>> {
    let mut annotations = Vec::new();
    loop {
        match take_one_annotation(i, table) {
            Ok((rest, token)) => {
                annotations.push(token);
                i = rest;
            }
            Err(Err::Error(_)) => return Ok((i, annotations)),
            Err(failure) => return Err(failure),
        }
    }
}

fn take_one_annotation<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, SymbolToken> {
    let (rest, token) = take_symbol_token(i, table)?;
    let (rest, _) = skip_ws(rest)?;
    let (rest, _) = match rest.strip_prefix("::") {
        Some(rest) => (rest, ()),
        None => return soft_error(i),
    };
    let (rest, _) = skip_ws(rest)?;
    Ok((rest, token))
}

/// entity: numeric_entity | delimiting_entity | keyword_entity
///
/// Dispatches on the first character; every branch either consumes the
/// entity or backtracks with a recoverable error.
fn take_entity<'a>(i: &'a str, table: &SymbolTable, in_sexp: bool) -> TResult<'a, Data> {
    let first = match i.chars().next() {
        Some(c) => c,
        None => return soft_error(i),
    };
    match first {
        '[' => {
            let (rest, list) = take_list(i, table)?;
            Ok((rest, Data::List(Some(list))))
        }
        '(' => {
            let (rest, sexp) = take_sexp(i, table)?;
            Ok((rest, Data::Sexp(Some(sexp))))
        }
        '{' => {
            if i.starts_with("{{") {
                take_lob(i)
            } else {
                let (rest, value) = take_struct(i, table)?;
                Ok((rest, Data::Struct(Some(value))))
            }
        }
        '"' => {
            let (rest, text) = take_short_quoted(&i[1..], '"')?;
            Ok((rest, Data::String(Some(text))))
        }
        '\'' => {
            if i.starts_with(LONG_QUOTE) {
                let (rest, text) = take_long_string(i)?;
                Ok((rest, Data::String(Some(text))))
            } else {
                let (rest, text) = take_short_quoted(&i[1..], '\'')?;
                Ok((rest, Data::Symbol(Some(SymbolToken::known(text)))))
            }
        }
        '+' => {
            if let Some(rest) = i.strip_prefix("+inf") {
                let (rest, _) = check_numeric_end(rest, in_sexp)?;
                Ok((rest, Data::Float(Some(f64::INFINITY))))
            } else {
                soft_error(i)
            }
        }
        '-' => {
            if let Some(rest) = i.strip_prefix("-inf") {
                let (rest, _) = check_numeric_end(rest, in_sexp)?;
                Ok((rest, Data::Float(Some(f64::NEG_INFINITY))))
            } else {
                take_number(i, in_sexp)
            }
        }
        c if c.is_ascii_digit() => match take_timestamp(i, in_sexp) {
            Ok(parsed) => Ok(parsed),
            Err(Err::Error(_)) => take_number(i, in_sexp),
            Err(failure) => Err(failure),
        },
        c if is_identifier_start(c) => take_keyword_or_symbol(i, table),
        _ => soft_error(i),
    }
}

/// A numeric entity must be followed by whitespace, a comment, a closing
/// or opening delimiter, or (in an s-expression) an operator.
fn check_numeric_end<'a>(i: &'a str, in_sexp: bool) -> TResult<'a, ()> {
    let c = match i.chars().next() {
        None => return Ok((i, ())),
        Some(c) => c,
    };
    let delimits = is_ws(c)
        || matches!(c, ',' | ']' | '}' | ')' | '[' | '{' | '(' | '"' | '\'')
        || (c == '/' && (i[1..].starts_with('/') || i[1..].starts_with('*')))
        || (in_sexp && is_operator_char(c));
    if delimits {
        Ok((i, ()))
    } else {
        fail_format(i, TextFormatError::UnterminatedNumeric)
    }
}

//
// Symbols and keywords
//

/// IDENTIFIER_SYMBOL: [$_a-zA-Z] ([$_a-zA-Z] | DEC_DIGIT)*
fn take_identifier(i: &str) -> TResult<'_, &str> {
    match i.chars().next() {
        Some(c) if is_identifier_start(c) => {}
        _ => return soft_error(i),
    }
    let end = i
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or_else(|| i.len());
    Ok((&i[end..], &i[..end]))
}

/// A symbol in annotation or field-name position: an identifier (keywords
/// excluded), a `$sid` reference, or a quoted symbol.
fn take_symbol_token<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, SymbolToken> {
    let first = match i.chars().next() {
        Some(c) => c,
        None => return soft_error(i),
    };
    if first == '\'' && !i.starts_with(LONG_QUOTE) {
        let (rest, text) = take_short_quoted(&i[1..], '\'')?;
        return Ok((rest, SymbolToken::known(text)));
    }
    if !is_identifier_start(first) {
        return soft_error(i);
    }
    let (rest, text) = take_identifier(i)?;
    if RESERVED_TOKENS.contains(text) {
        return soft_error(i);
    }
    resolve_symbol_text(i, rest, text, table)
}

/// `$N` references resolve against the current table; anything else is the
/// symbol's own text.
fn resolve_symbol_text<'a>(
    at: &'a str,
    rest: &'a str,
    text: &str,
    table: &SymbolTable,
) -> TResult<'a, SymbolToken> {
    if !is_sid_reference(text) {
        return Ok((rest, SymbolToken::known(text)));
    }
    let sid: usize = match text[1..].parse() {
        Ok(sid) => sid,
        Err(_) => {
            return fail_with(
                at,
                Error::Symbol(SymbolError::SidTooLarge(text.to_string())),
            )
        }
    };
    match table.lookup(sid) {
        Ok(token) => Ok((rest, token)),
        Err(error) => fail_with(at, error.into()),
    }
}

/// keyword_entity: any_null | BOOL | SPECIAL_FLOAT | IDENTIFIER_SYMBOL
fn take_keyword_or_symbol<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, Data> {
    let (rest, text) = take_identifier(i)?;
    match text {
        "null" => match rest.strip_prefix('.') {
            Some(after) => {
                let (rest, ion_type) = commit(take_null_type(after))?;
                Ok((rest, Data::null_of(ion_type)))
            }
            None => Ok((rest, Data::Null)),
        },
        "true" => Ok((rest, Data::Bool(Some(true)))),
        "false" => Ok((rest, Data::Bool(Some(false)))),
        "nan" => Ok((rest, Data::Float(Some(f64::NAN)))),
        _ => {
            let (rest, token) = resolve_symbol_text(i, rest, text, table)?;
            Ok((rest, Data::Symbol(Some(token))))
        }
    }
}

/// typed_null: NULL '.' TYPE
fn take_null_type(i: &str) -> TResult<'_, IonType> {
    let (rest, name) = take_identifier(i)?;
    let ion_type = match name {
        "null" => IonType::Null,
        "bool" => IonType::Bool,
        "int" => IonType::Int,
        "float" => IonType::Float,
        "decimal" => IonType::Decimal,
        "timestamp" => IonType::Timestamp,
        "string" => IonType::String,
        "symbol" => IonType::Symbol,
        "clob" => IonType::Clob,
        "blob" => IonType::Blob,
        "list" => IonType::List,
        "sexp" => IonType::Sexp,
        "struct" => IonType::Struct,
        _ => return fail_format(i, TextFormatError::Expected("null type")),
    };
    Ok((rest, ion_type))
}

//
// Containers
//

/// list: '[' ws* (value (ws* ',' ws* value)* ws* ','?)? ws* ']'
fn take_list<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, List> {
    let (i, _) = char('[')(i)?;
    let mut values = Vec::new();
    let (mut rest, _) = skip_ws(i)?;
    if let Some(r) = rest.strip_prefix(']') {
        return Ok((r, List { values }));
    }
    loop {
        let (r, value) = commit(take_value(rest, table, false))?;
        values.push(value);
        let (r, _) = skip_ws(r)?;
        if let Some(r) = r.strip_prefix(']') {
            return Ok((r, List { values }));
        }
        let (r, _) = expect(r, ",", "',' or ']' in list")?;
        let (r, _) = skip_ws(r)?;
        if let Some(r) = r.strip_prefix(']') {
            // trailing comma
            return Ok((r, List { values }));
        }
        rest = r;
    }
}

/// struct: '{' ws* (field (ws* ',' ws* field)* ws* ','?)? ws* '}'
/// field: field_name ws* ':' ws* annotation* entity
fn take_struct<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, Struct> {
    let (i, _) = char('{')(i)?;
    let mut fields = Vec::new();
    let (mut rest, _) = skip_ws(i)?;
    if let Some(r) = rest.strip_prefix('}') {
        return Ok((r, Struct { fields }));
    }
    loop {
        let (r, name) = commit(take_field_name(rest, table))?;
        let (r, _) = skip_ws(r)?;
        let (r, _) = expect(r, ":", "':' after field name")?;
        let (r, _) = skip_ws(r)?;
        let (r, value) = commit(take_value(r, table, false))?;
        fields.push((name, value));
        let (r, _) = skip_ws(r)?;
        if let Some(r) = r.strip_prefix('}') {
            return Ok((r, Struct { fields }));
        }
        let (r, _) = expect(r, ",", "',' or '}' in struct")?;
        let (r, _) = skip_ws(r)?;
        if let Some(r) = r.strip_prefix('}') {
            return Ok((r, Struct { fields }));
        }
        rest = r;
    }
}

/// field_name: symbol | SHORT_QUOTED_STRING | (ws* LONG_QUOTED_STRING)+
fn take_field_name<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, SymbolToken> {
    if i.starts_with(LONG_QUOTE) {
        let (rest, text) = take_long_string(i)?;
        return Ok((rest, SymbolToken::known(text)));
    }
    if let Some(body) = i.strip_prefix('"') {
        let (rest, text) = take_short_quoted(body, '"')?;
        return Ok((rest, SymbolToken::known(text)));
    }
    take_symbol_token(i, table)
}

/// sexp: '(' (ws* sexp_value)* ws* ')'
fn take_sexp<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, Sexp> {
    let (i, _) = char('(')(i)?;
    let mut values = Vec::new();
    let mut rest = i;
    loop {
        let (r, _) = skip_ws(rest)?;
        if let Some(r) = r.strip_prefix(')') {
            return Ok((r, Sexp { values }));
        }
        let (r, value) = commit(take_sexp_value(r, table))?;
        values.push(value);
        rest = r;
    }
}

/// sexp_value: annotation* (entity | operator)
fn take_sexp_value<'a>(i: &'a str, table: &SymbolTable) -> TResult<'a, Value> {
    let (rest, annotations) = take_annotations(i, table)?;
    let parsed = match take_entity(rest, table, true) {
        Err(Err::Error(_)) => take_operator(rest),
        other => other,
    };
    let (rest, data) = if annotations.is_empty() {
        parsed?
    } else {
        commit(parsed)?
    };
    Ok((rest, Value { data, annotations }))
}

/// operator: (DOT | NON_DOT_OPERATOR)+
fn take_operator(i: &str) -> TResult<'_, Data> {
    let end = i
        .find(|c: char| !is_operator_char(c))
        .unwrap_or_else(|| i.len());
    if end == 0 {
        return soft_error(i);
    }
    Ok((
        &i[end..],
        Data::Symbol(Some(SymbolToken::known(&i[..end]))),
    ))
}

//
// Quoted text
//

/// The body of a short-quoted string or symbol, after the opening quote.
/// Unescaped newlines are not allowed.
fn take_short_quoted(i: &str, quote: char) -> TResult<'_, String> {
    let mut out = String::new();
    let mut rest = i;
    loop {
        let c = match rest.chars().next() {
            Some(c) => c,
            None => return fail_format(i, TextFormatError::UnterminatedQuote),
        };
        match c {
            _ if c == quote => return Ok((&rest[c.len_utf8()..], out)),
            '\\' => {
                let (r, escaped) = take_string_escape(&rest[1..])?;
                if let Some(c) = escaped {
                    out.push(c);
                }
                rest = r;
            }
            '\n' | '\r' => return fail_format(rest, TextFormatError::UnterminatedQuote),
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

/// LONG_QUOTED_STRING+: triple-quoted segments concatenated across
/// intervening whitespace and comments.
fn take_long_string(i: &str) -> TResult<'_, String> {
    let mut out = String::new();
    let mut rest = match i.strip_prefix(LONG_QUOTE) {
        Some(rest) => rest,
        None => return soft_error(i),
    };
    loop {
        let (r, segment) = take_long_quoted_segment(rest)?;
        out.push_str(&segment);
        let (r2, _) = skip_ws(r)?;
        match r2.strip_prefix(LONG_QUOTE) {
            Some(next) => rest = next,
            None => return Ok((r, out)),
        }
    }
}

/// One segment body, after the opening `'''`. Newlines are legal;
/// carriage returns are normalized to line feeds.
fn take_long_quoted_segment(i: &str) -> TResult<'_, String> {
    let mut out = String::new();
    let mut rest = i;
    loop {
        if let Some(r) = rest.strip_prefix(LONG_QUOTE) {
            return Ok((r, out));
        }
        let c = match rest.chars().next() {
            Some(c) => c,
            None => return fail_format(i, TextFormatError::UnterminatedQuote),
        };
        match c {
            '\\' => {
                let (r, escaped) = take_string_escape(&rest[1..])?;
                if let Some(c) = escaped {
                    out.push(c);
                }
                rest = r;
            }
            '\r' => {
                out.push('\n');
                rest = rest[1..].strip_prefix('\n').unwrap_or(&rest[1..]);
            }
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

/// TEXT_ESCAPE, after the backslash. `None` is a line continuation.
fn take_string_escape(i: &str) -> TResult<'_, Option<char>> {
    let c = match i.chars().next() {
        Some(c) => c,
        None => return fail_format(i, TextFormatError::UnterminatedQuote),
    };
    let rest = &i[c.len_utf8()..];
    let mapped = match c {
        '0' => '\0',
        'a' => '\u{0007}',
        'b' => '\u{0008}',
        't' => '\t',
        'n' => '\n',
        'f' => '\u{000C}',
        'v' => '\u{000B}',
        'r' => '\r',
        '\'' => '\'',
        '"' => '"',
        '?' => '?',
        '\\' => '\\',
        '/' => '/',
        'x' => return take_hex_escape(rest, 2),
        'u' => return take_hex_escape(rest, 4),
        'U' => return take_hex_escape(rest, 8),
        '\n' => return Ok((rest, None)),
        '\r' => {
            let rest = rest.strip_prefix('\n').unwrap_or(rest);
            return Ok((rest, None));
        }
        other => return fail_format(i, TextFormatError::InvalidEscape(other.to_string())),
    };
    Ok((rest, Some(mapped)))
}

fn take_hex_escape(i: &str, digits: usize) -> TResult<'_, Option<char>> {
    if i.len() < digits || !i.as_bytes()[..digits].iter().all(u8::is_ascii_hexdigit) {
        let shown: String = i.chars().take(digits).collect();
        return fail_format(i, TextFormatError::InvalidEscape(shown));
    }
    let code = u32::from_str_radix(&i[..digits], 16).expect("hex digits");
    match std::char::from_u32(code) {
        Some(c) => Ok((&i[digits..], Some(c))),
        None => fail_format(i, TextFormatError::EscapedCodePoint(code)),
    }
}

//
// Lobs
//

/// Both lob forms are framed by `{{ }}`; the first character inside
/// decides between clob (quoted text) and blob (base64).
fn take_lob(i: &str) -> TResult<'_, Data> {
    let rest = match i.strip_prefix("{{") {
        Some(rest) => rest,
        None => return soft_error(i),
    };
    let (rest, _) = skip_plain_ws(rest)?;
    if let Some(body) = rest.strip_prefix('"') {
        let (rest, data) = take_clob_short_body(body)?;
        let (rest, _) = skip_plain_ws(rest)?;
        let (rest, _) = expect(rest, "}}", "'}}' after clob")?;
        return Ok((rest, Data::Clob(Some(Clob { data }))));
    }
    if rest.starts_with(LONG_QUOTE) {
        let mut data = Vec::new();
        let mut rest = rest;
        loop {
            let (r, _) = skip_plain_ws(rest)?;
            match r.strip_prefix(LONG_QUOTE) {
                Some(body) => {
                    let (r, segment) = take_clob_long_segment(body)?;
                    data.extend(segment);
                    rest = r;
                }
                None => {
                    rest = r;
                    break;
                }
            }
        }
        let (rest, _) = expect(rest, "}}", "'}}' after clob")?;
        return Ok((rest, Data::Clob(Some(Clob { data }))));
    }
    take_blob_body(rest)
}

/// BLOB: base64 with interspersed whitespace.
fn take_blob_body(i: &str) -> TResult<'_, Data> {
    let mut collected = String::new();
    let mut rest = i;
    loop {
        let c = match rest.chars().next() {
            Some(c) => c,
            None => return fail_format(i, TextFormatError::Expected("'}}' after blob")),
        };
        if is_ws(c) {
            rest = &rest[1..];
        } else if c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' {
            collected.push(c);
            rest = &rest[1..];
        } else if c == '}' {
            break;
        } else {
            return fail_format(rest, TextFormatError::Base64Decode);
        }
    }
    let (rest, _) = expect(rest, "}}", "'}}' after blob")?;
    match base64::decode(&collected) {
        Ok(data) => Ok((rest, Data::Blob(Some(Blob { data })))),
        Err(_) => fail_format(i, TextFormatError::Base64Decode),
    }
}

/// CLOB_SHORT_TEXT, after the opening quote: ASCII with byte escapes.
fn take_clob_short_body(i: &str) -> TResult<'_, Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = i;
    loop {
        let c = match rest.chars().next() {
            Some(c) => c,
            None => return fail_format(i, TextFormatError::UnterminatedQuote),
        };
        match c {
            '"' => return Ok((&rest[1..], out)),
            '\\' => {
                let (r, escaped) = take_clob_escape(&rest[1..])?;
                if let Some(byte) = escaped {
                    out.push(byte);
                }
                rest = r;
            }
            '\n' | '\r' => return fail_format(rest, TextFormatError::UnterminatedQuote),
            c if c.is_ascii() => {
                out.push(c as u8);
                rest = &rest[1..];
            }
            _ => return fail_format(rest, TextFormatError::ClobEncoding),
        }
    }
}

/// CLOB_LONG_TEXT, after the opening `'''`.
fn take_clob_long_segment(i: &str) -> TResult<'_, Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = i;
    loop {
        if let Some(r) = rest.strip_prefix(LONG_QUOTE) {
            return Ok((r, out));
        }
        let c = match rest.chars().next() {
            Some(c) => c,
            None => return fail_format(i, TextFormatError::UnterminatedQuote),
        };
        match c {
            '\\' => {
                let (r, escaped) = take_clob_escape(&rest[1..])?;
                if let Some(byte) = escaped {
                    out.push(byte);
                }
                rest = r;
            }
            '\r' => {
                out.push(b'\n');
                rest = rest[1..].strip_prefix('\n').unwrap_or(&rest[1..]);
            }
            c if c.is_ascii() => {
                out.push(c as u8);
                rest = &rest[1..];
            }
            _ => return fail_format(rest, TextFormatError::ClobEncoding),
        }
    }
}

/// CLOB_ESCAPE: the common escapes plus `\xHH`; Unicode escapes do not
/// appear in clobs.
fn take_clob_escape(i: &str) -> TResult<'_, Option<u8>> {
    let c = match i.chars().next() {
        Some(c) => c,
        None => return fail_format(i, TextFormatError::UnterminatedQuote),
    };
    let rest = &i[c.len_utf8()..];
    let mapped: u8 = match c {
        '0' => 0x00,
        'a' => 0x07,
        'b' => 0x08,
        't' => b'\t',
        'n' => b'\n',
        'f' => 0x0C,
        'v' => 0x0B,
        'r' => b'\r',
        '\'' => b'\'',
        '"' => b'"',
        '?' => b'?',
        '\\' => b'\\',
        '/' => b'/',
        'x' => {
            if rest.len() < 2 || !rest.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit) {
                return fail_format(i, TextFormatError::InvalidEscape(c.to_string()));
            }
            let byte = u8::from_str_radix(&rest[..2], 16).expect("hex digits");
            return Ok((&rest[2..], Some(byte)));
        }
        '\n' => return Ok((rest, None)),
        '\r' => {
            let rest = rest.strip_prefix('\n').unwrap_or(rest);
            return Ok((rest, None));
        }
        other => return fail_format(i, TextFormatError::InvalidEscape(other.to_string())),
    };
    Ok((rest, Some(mapped)))
}

//
// Numbers
//

/// A run of digits in the given alphabet, with `_` separators permitted
/// between digits. Returns the digits with separators removed.
fn take_digit_run(i: &str, digit: fn(char) -> bool) -> TResult<'_, String> {
    let bytes = i.as_bytes();
    if bytes.is_empty() || !digit(bytes[0] as char) {
        return soft_error(i);
    }
    let mut clean = String::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if bytes[pos].is_ascii() && digit(c) {
            clean.push(c);
            pos += 1;
        } else if c == '_' {
            if pos + 1 < bytes.len() && bytes[pos + 1].is_ascii() && digit(bytes[pos + 1] as char)
            {
                pos += 1;
            } else {
                return fail_format(&i[pos..], TextFormatError::DigitSeparator);
            }
        } else {
            break;
        }
    }
    Ok((&i[pos..], clean))
}

fn is_dec_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn parse_biguint<'a>(at: &'a str, digits: &str, radix: u32) -> TResult<'a, BigUint> {
    match BigUint::from_str_radix(digits, radix) {
        Ok(value) => Ok((at, value)),
        Err(_) => fail_format(at, TextFormatError::Expected("digits")),
    }
}

fn int_data(negative: bool, magnitude: BigUint) -> Data {
    let sign = if magnitude.is_zero() {
        Sign::NoSign
    } else if negative {
        Sign::Minus
    } else {
        Sign::Plus
    };
    Data::Int(Some(BigInt::from_biguint(sign, magnitude)))
}

enum ExponentMarker {
    Float,
    Decimal,
}

/// BIN_INTEGER | DEC_INTEGER | HEX_INTEGER | FLOAT | DECIMAL
///
/// A number with no exponent marker and no decimal point is an integer;
/// `e`/`E` selects float, `d`/`D` (or a bare point) selects decimal, which
/// keeps the written digit count (`0.100` is coefficient 100, exponent -3).
fn take_number<'a>(i: &'a str, in_sexp: bool) -> TResult<'a, Data> {
    let (rest, sign) = opt(char('-'))(i)?;
    let negative = sign.is_some();

    if rest.starts_with("0x") || rest.starts_with("0X") {
        let (rest, digits) = commit(take_digit_run(&rest[2..], |c| c.is_ascii_hexdigit()))?;
        let (rest, _) = check_numeric_end(rest, in_sexp)?;
        let (_, magnitude) = parse_biguint(rest, &digits, 16)?;
        return Ok((rest, int_data(negative, magnitude)));
    }
    if rest.starts_with("0b") || rest.starts_with("0B") {
        let (rest, digits) = commit(take_digit_run(&rest[2..], |c| c == '0' || c == '1'))?;
        let (rest, _) = check_numeric_end(rest, in_sexp)?;
        let (_, magnitude) = parse_biguint(rest, &digits, 2)?;
        return Ok((rest, int_data(negative, magnitude)));
    }

    let (rest, int_digits) = take_digit_run(rest, is_dec_digit)?;
    if int_digits.len() > 1 && int_digits.starts_with('0') {
        return fail_format(i, TextFormatError::LeadingZero);
    }

    let (rest, fraction) = match rest.strip_prefix('.') {
        Some(after) => match take_digit_run(after, is_dec_digit) {
            Ok((r, digits)) => (r, Some(digits)),
            Err(Err::Error(_)) => (after, Some(String::new())),
            Err(failure) => return Err(failure),
        },
        None => (rest, None),
    };

    let (rest, exponent) = take_exponent(rest)?;

    // a bare run of digits is an integer
    if fraction.is_none() && exponent.is_none() {
        let (rest, _) = check_numeric_end(rest, in_sexp)?;
        let (_, magnitude) = parse_biguint(rest, &int_digits, 10)?;
        return Ok((rest, int_data(negative, magnitude)));
    }

    let (rest, _) = check_numeric_end(rest, in_sexp)?;

    match exponent {
        Some((ExponentMarker::Float, exponent_text)) => {
            let mut assembled = String::new();
            if negative {
                assembled.push('-');
            }
            assembled.push_str(&int_digits);
            if let Some(fraction) = &fraction {
                assembled.push('.');
                assembled.push_str(fraction);
            }
            assembled.push('e');
            assembled.push_str(&exponent_text);
            match lexical_core::parse::<f64>(assembled.as_bytes()) {
                Ok(value) => Ok((rest, Data::Float(Some(value)))),
                Err(_) => fail_format(i, TextFormatError::FloatParse(assembled)),
            }
        }
        marker => {
            let exponent_value: i64 = match &marker {
                Some((_, text)) => match text.parse() {
                    Ok(value) => value,
                    Err(_) => {
                        return fail_format(i, TextFormatError::Expected("decimal exponent"))
                    }
                },
                None => 0,
            };
            let fraction = fraction.unwrap_or_default();
            let mut digits = int_digits;
            digits.push_str(&fraction);
            let (_, coefficient) = parse_biguint(rest, &digits, 10)?;
            let exponent = exponent_value - fraction.len() as i64;
            if exponent < i64::from(i32::MIN) || exponent > i64::from(i32::MAX) {
                return fail_format(i, TextFormatError::Expected("decimal exponent"));
            }
            Ok((
                rest,
                Data::Decimal(Some(Decimal::from_sign_magnitude(
                    negative,
                    coefficient,
                    exponent as i32,
                ))),
            ))
        }
    }
}

/// FLOAT_EXP | DECIMAL_EXP: `[eE]` or `[dD]`, an optional sign, digits.
fn take_exponent(i: &str) -> TResult<'_, Option<(ExponentMarker, String)>> {
    let marker = match i.chars().next() {
        Some('e') | Some('E') => ExponentMarker::Float,
        Some('d') | Some('D') => ExponentMarker::Decimal,
        _ => return Ok((i, None)),
    };
    let rest = &i[1..];
    let (rest, sign) = opt(one_of("+-"))(rest)?;
    let (rest, digits) = match take_digit_run(rest, is_dec_digit) {
        Ok(parsed) => parsed,
        // `1dogs` is not a number with an exponent
        Err(Err::Error(_)) => return soft_error(i),
        Err(failure) => return Err(failure),
    };
    let mut text = String::new();
    if sign == Some('-') {
        text.push('-');
    }
    text.push_str(&digits);
    Ok((rest, Some((marker, text))))
}

//
// Timestamps
//

/// TIMESTAMP: DATE ('T' TIME?)? | YEAR '-' MONTH 'T' | YEAR 'T'
fn take_timestamp<'a>(i: &'a str, in_sexp: bool) -> TResult<'a, Data> {
    let (rest, year) = take_fixed_digits(i, 4)?;
    let year = year as u16;

    if let Some(rest) = strip_t(rest) {
        let (rest, _) = check_numeric_end(rest, in_sexp)?;
        return finish_timestamp(i, rest, Timestamp::year(year));
    }
    let rest = match rest.strip_prefix('-') {
        Some(rest) => rest,
        None => return soft_error(i),
    };
    let (rest, month) = take_fixed_digits(rest, 2)?;
    let month = month as u8;

    if let Some(rest) = strip_t(rest) {
        // Year-month must end at the T; a time may not follow.
        let (rest, _) = check_numeric_end(rest, in_sexp)?;
        return finish_timestamp(i, rest, Timestamp::month(year, month));
    }
    let rest = match rest.strip_prefix('-') {
        Some(rest) => rest,
        None => return soft_error(i),
    };
    let (rest, day) = take_fixed_digits(rest, 2)?;
    let day = day as u8;

    let rest = match strip_t(rest) {
        None => {
            let (rest, _) = check_numeric_end(rest, in_sexp)?;
            return finish_timestamp(i, rest, Timestamp::day(year, month, day));
        }
        Some(rest) => rest,
    };

    // A trailing T with no time is still day precision.
    let (rest, time) = match take_time(rest) {
        Ok((rest, time)) => (rest, Some(time)),
        Err(Err::Error(_)) => (rest, None),
        Err(failure) => return Err(failure),
    };
    let (rest, _) = check_numeric_end(rest, in_sexp)?;
    match time {
        None => finish_timestamp(i, rest, Timestamp::day(year, month, day)),
        Some(TimeParts {
            hour,
            minute,
            second: None,
            offset,
            ..
        }) => finish_timestamp(
            i,
            rest,
            Timestamp::minute(offset, year, month, day, hour, minute),
        ),
        Some(TimeParts {
            hour,
            minute,
            second: Some(second),
            fraction: None,
            offset,
        }) => finish_timestamp(
            i,
            rest,
            Timestamp::second(offset, year, month, day, hour, minute, second),
        ),
        Some(TimeParts {
            hour,
            minute,
            second: Some(second),
            fraction: Some((coefficient, exponent)),
            offset,
        }) => finish_timestamp(
            i,
            rest,
            Timestamp::fractional_second(
                offset,
                year,
                month,
                day,
                hour,
                minute,
                second,
                coefficient,
                exponent,
            ),
        ),
    }
}

fn finish_timestamp<'a>(
    at: &'a str,
    rest: &'a str,
    constructed: crate::error::Result<Timestamp>,
) -> TResult<'a, Data> {
    match constructed {
        Ok(timestamp) => Ok((rest, Data::Timestamp(Some(timestamp)))),
        Err(error) => fail_with(at, error),
    }
}

fn strip_t(i: &str) -> Option<&str> {
    i.strip_prefix('T').or_else(|| i.strip_prefix('t'))
}

struct TimeParts {
    hour: u8,
    minute: u8,
    second: Option<u8>,
    fraction: Option<(BigUint, i32)>,
    offset: Option<i16>,
}

/// TIME: HOUR ':' MINUTE (':' SECOND ('.' DIGITS)?)? OFFSET
fn take_time(i: &str) -> TResult<'_, TimeParts> {
    let (rest, hour) = take_fixed_digits(i, 2)?;
    let rest = match rest.strip_prefix(':') {
        Some(rest) => rest,
        None => return soft_error(i),
    };
    let (rest, minute) = take_fixed_digits(rest, 2)?;

    let (rest, second, fraction) = match rest.strip_prefix(':') {
        None => (rest, None, None),
        Some(after) => {
            let (rest, second) = commit(take_fixed_digits(after, 2))?;
            match rest.strip_prefix('.') {
                None => (rest, Some(second as u8), None),
                Some(after) => {
                    let (rest, digits) = commit(take_fraction_digits(after))?;
                    let exponent = -(digits.len() as i32);
                    let (_, coefficient) = parse_biguint(rest, &digits, 10)?;
                    (rest, Some(second as u8), Some((coefficient, exponent)))
                }
            }
        }
    };

    // local-time offsets are required on timestamps with time
    let (rest, offset) = commit(take_offset(rest))?;
    Ok((
        rest,
        TimeParts {
            hour: hour as u8,
            minute: minute as u8,
            second,
            fraction,
            offset,
        },
    ))
}

/// OFFSET: 'Z' | PLUS_OR_MINUS HOUR ':' MINUTE. `-00:00` is the unknown
/// local offset.
fn take_offset(i: &str) -> TResult<'_, Option<i16>> {
    if let Some(rest) = i.strip_prefix('Z').or_else(|| i.strip_prefix('z')) {
        return Ok((rest, Some(0)));
    }
    let (negative, rest) = match i.chars().next() {
        Some('+') => (false, &i[1..]),
        Some('-') => (true, &i[1..]),
        _ => return soft_error(i),
    };
    let (rest, hours) = take_fixed_digits(rest, 2)?;
    let rest = match rest.strip_prefix(':') {
        Some(rest) => rest,
        None => return soft_error(i),
    };
    let (rest, minutes) = take_fixed_digits(rest, 2)?;
    let total = (hours * 60 + minutes) as i16;
    let offset = if negative && total == 0 {
        None
    } else if negative {
        Some(-total)
    } else {
        Some(total)
    };
    Ok((rest, offset))
}

/// Exactly `count` decimal digits.
fn take_fixed_digits(i: &str, count: usize) -> TResult<'_, u32> {
    if i.len() < count || !i.as_bytes()[..count].iter().all(u8::is_ascii_digit) {
        return soft_error(i);
    }
    match i[..count].parse() {
        Ok(value) => Ok((&i[count..], value)),
        Err(_) => soft_error(i),
    }
}

/// One or more fraction digits (underscores are not part of the timestamp
/// grammar).
fn take_fraction_digits(i: &str) -> TResult<'_, String> {
    let end = i
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| i.len());
    if end == 0 {
        return soft_error(i);
    }
    Ok((&i[end..], i[..end].to_string()))
}
