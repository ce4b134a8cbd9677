use nom::Err;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::parse::{parse_top_level, Cause, TextError};
use crate::error::{ArgumentError, Error, Result, TextFormatError};
use crate::stream::{IonReader, StreamItem};
use crate::symbol_table::SymbolTable;
use crate::symbols::{SymbolToken, ION_SYMBOL_TABLE};
use crate::types::{Decimal, IonType, Timestamp};
use crate::value::{Data, Value};

/// A streaming reader over Ion text.
///
/// Parsing is eager at top-level granularity: each call that exhausts the
/// current value parses exactly one more top-level value from the input,
/// and an internal cursor then walks the materialized tree to serve the
/// same event sequence the binary reader produces. Version markers reset
/// the symbol table; `$ion_symbol_table` structs are folded into it and
/// never surface as events.
pub struct TextReader<'a> {
    input: &'a str,
    remaining: &'a str,
    symbols: SymbolTable,
    current: Option<Node>,
    frames: Vec<Frame>,
    failed: Option<Error>,
    closed: bool,
}

struct Node {
    field: Option<SymbolToken>,
    value: Value,
}

struct Frame {
    children: std::vec::IntoIter<(Option<SymbolToken>, Value)>,
}

fn event_for(value: &Value) -> StreamItem {
    let ion_type = value.ion_type();
    if value.data.is_null() {
        StreamItem::Null(ion_type)
    } else if ion_type.is_container() {
        StreamItem::ContainerStart(ion_type)
    } else {
        StreamItem::Value(ion_type)
    }
}

/// Recognizes a bare, unannotated `$ion_MAJOR_MINOR` symbol.
fn version_marker(value: &Value) -> Option<(u32, u32)> {
    if !value.annotations.is_empty() {
        return None;
    }
    let text = match &value.data {
        Data::Symbol(Some(SymbolToken::Known { text })) => text,
        _ => return None,
    };
    let rest = text.strip_prefix("$ion_")?;
    let mut parts = rest.splitn(2, '_');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

fn is_local_symbol_table(value: &Value) -> bool {
    matches!(&value.data, Data::Struct(Some(_)))
        && value
            .annotations
            .first()
            .map_or(false, |token| token.text() == Some(ION_SYMBOL_TABLE))
}

impl<'a> TextReader<'a> {
    pub fn new(input: &'a str) -> Self {
        TextReader {
            input,
            remaining: input,
            symbols: SymbolTable::system(),
            current: None,
            frames: Vec::new(),
            failed: None,
            closed: false,
        }
    }

    /// The symbol table as of the cursor's position.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    fn check_usable(&self) -> Result<()> {
        if let Some(error) = &self.failed {
            return Err(error.clone());
        }
        if self.closed {
            return Err(ArgumentError::ReaderClosed.into());
        }
        Ok(())
    }

    fn fail<T>(&mut self, error: Error) -> Result<T> {
        if error.is_fatal() {
            self.failed = Some(error.clone());
        }
        Err(error)
    }

    fn position_of(&self, remaining: &str) -> usize {
        self.input.len() - remaining.len()
    }

    fn map_parse_error(&self, error: Err<TextError<'a>>) -> Error {
        match error {
            Err::Error(e) | Err::Failure(e) => {
                let position = self.position_of(e.remaining);
                match e.cause {
                    Some(Cause::Complete(error)) => error,
                    Some(Cause::Format(format)) => Error::malformed(format, position),
                    None => Error::malformed(TextFormatError::Expected("value"), position),
                }
            }
            Err::Incomplete(_) => Error::UnexpectedEof,
        }
    }

    fn next_inner(&mut self) -> Result<StreamItem> {
        self.current = None;

        if let Some(frame) = self.frames.last_mut() {
            return Ok(match frame.children.next() {
                None => StreamItem::EndOfContainer,
                Some((field, value)) => {
                    let item = event_for(&value);
                    self.current = Some(Node { field, value });
                    item
                }
            });
        }

        loop {
            let parsed = parse_top_level(self.remaining, &self.symbols);
            let (rest, value) = match parsed {
                Ok(result) => result,
                Err(error) => return Err(self.map_parse_error(error)),
            };
            let value = match value {
                None => {
                    self.remaining = rest;
                    return Ok(StreamItem::EndOfStream);
                }
                Some(value) => value,
            };
            let at = self.position_of(self.remaining);
            self.remaining = rest;

            if let Some((major, minor)) = version_marker(&value) {
                if (major, minor) != (1, 0) {
                    return Err(Error::malformed(
                        TextFormatError::UnsupportedVersion(major, minor),
                        at,
                    ));
                }
                self.symbols.reset();
                return Ok(StreamItem::VersionMarker);
            }

            if is_local_symbol_table(&value) {
                if let Data::Struct(Some(table)) = &value.data {
                    self.symbols.process_local_table(table)?;
                }
                continue;
            }

            let item = event_for(&value);
            self.current = Some(Node { field: None, value });
            return Ok(item);
        }
    }

    fn current(&self) -> Result<&Node> {
        self.current
            .as_ref()
            .ok_or_else(|| ArgumentError::NoCurrentValue.into())
    }

    fn current_scalar(&self, expected: IonType) -> Result<&Value> {
        let node = self.current()?;
        let found = node.value.ion_type();
        if found != expected {
            return Err(ArgumentError::TypeMismatch { expected, found }.into());
        }
        if node.value.data.is_null() {
            return Err(ArgumentError::NullValue.into());
        }
        Ok(&node.value)
    }
}

impl<'a> IonReader for TextReader<'a> {
    fn next(&mut self) -> Result<StreamItem> {
        self.check_usable()?;
        match self.next_inner() {
            Ok(item) => Ok(item),
            Err(error) => self.fail(error),
        }
    }

    fn step_in(&mut self) -> Result<()> {
        self.check_usable()?;
        let node = self.current()?;
        if !node.value.ion_type().is_container() || node.value.data.is_null() {
            return Err(ArgumentError::NotAContainer.into());
        }
        let node = self.current.take().expect("checked above");
        let children: Vec<(Option<SymbolToken>, Value)> = match node.value.data {
            Data::List(Some(list)) => {
                list.values.into_iter().map(|value| (None, value)).collect()
            }
            Data::Sexp(Some(sexp)) => {
                sexp.values.into_iter().map(|value| (None, value)).collect()
            }
            Data::Struct(Some(fields)) => fields
                .fields
                .into_iter()
                .map(|(name, value)| (Some(name), value))
                .collect(),
            _ => unreachable!("checked container above"),
        };
        self.frames.push(Frame {
            children: children.into_iter(),
        });
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        self.check_usable()?;
        self.frames.pop().ok_or(ArgumentError::NotInContainer)?;
        self.current = None;
        Ok(())
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn ion_type(&self) -> Option<IonType> {
        self.current.as_ref().map(|node| node.value.ion_type())
    }

    fn is_null(&self) -> bool {
        self.current
            .as_ref()
            .map_or(false, |node| node.value.data.is_null())
    }

    fn field_name(&self) -> Result<Option<SymbolToken>> {
        self.check_usable()?;
        Ok(self.current()?.field.clone())
    }

    fn annotations(&self) -> Result<Vec<SymbolToken>> {
        self.check_usable()?;
        Ok(self.current()?.value.annotations.clone())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Bool)?.data {
            Data::Bool(Some(value)) => Ok(*value),
            _ => unreachable!("type checked"),
        }
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Int)?.data {
            Data::Int(Some(value)) => value.to_i64().ok_or(Error::Overflow),
            _ => unreachable!("type checked"),
        }
    }

    fn read_int(&mut self) -> Result<BigInt> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Int)?.data {
            Data::Int(Some(value)) => Ok(value.clone()),
            _ => unreachable!("type checked"),
        }
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Float)?.data {
            Data::Float(Some(value)) => Ok(*value),
            _ => unreachable!("type checked"),
        }
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Decimal)?.data {
            Data::Decimal(Some(value)) => Ok(value.clone()),
            _ => unreachable!("type checked"),
        }
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Timestamp)?.data {
            Data::Timestamp(Some(value)) => Ok(value.clone()),
            _ => unreachable!("type checked"),
        }
    }

    fn read_symbol(&mut self) -> Result<SymbolToken> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Symbol)?.data {
            Data::Symbol(Some(value)) => Ok(value.clone()),
            _ => unreachable!("type checked"),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        self.check_usable()?;
        match &self.current_scalar(IonType::String)?.data {
            Data::String(Some(value)) => Ok(value.clone()),
            _ => unreachable!("type checked"),
        }
    }

    fn read_clob(&mut self) -> Result<Vec<u8>> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Clob)?.data {
            Data::Clob(Some(value)) => Ok(value.data.clone()),
            _ => unreachable!("type checked"),
        }
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        self.check_usable()?;
        match &self.current_scalar(IonType::Blob)?.data {
            Data::Blob(Some(value)) => Ok(value.data.clone()),
            _ => unreachable!("type checked"),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        self.frames.clear();
        Ok(())
    }
}
