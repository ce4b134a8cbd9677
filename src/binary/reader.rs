use std::ops::Range;

use log::warn;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{FromPrimitive, Zero};

use super::subfield::{
    read_int_parts, read_uint, read_uint_u64, read_var_int, read_var_int_parts, read_var_uint,
};
use super::{TypeCode, BVM_1_0, LENGTH_CODE_NULL, LENGTH_CODE_VAR};
use crate::error::{ArgumentError, BinaryFormatError, Error, Result};
use crate::stream::{IonReader, StreamItem};
use crate::symbol_table::SymbolTable;
use crate::symbols::{SymbolToken, ION_SYMBOL_TABLE};
use crate::tree;
use crate::types::{Decimal, IonType, Timestamp};
use crate::value::Data;

/// A streaming reader over a complete binary Ion stream.
///
/// The reader keeps a position, a stack of container end positions, the
/// current symbol table, and a one-value lookahead describing the value the
/// cursor rests on. Values are decoded lazily: `next()` reads only headers,
/// and the typed accessors materialize bodies on demand, so big integers and
/// lobs are never touched unless asked for.
///
/// Top-level `$ion_symbol_table` structs and version markers are handled
/// internally; the application only ever sees user values (and
/// `StreamItem::VersionMarker`, since a version marker resets symbol
/// resolution for everything that follows).
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    containers: Vec<Frame>,
    symbols: SymbolTable,
    current: Option<Lookahead>,
    failed: Option<Error>,
    closed: bool,
}

#[derive(Debug)]
struct Frame {
    ion_type: IonType,
    end: usize,
    /// Set for structs flagged as sorted (length code 1), whose ascending
    /// field ids we must validate but never rely on.
    sorted: bool,
    last_field_sid: Option<u64>,
}

/// The decoded header of the value the cursor rests on.
#[derive(Debug)]
struct Lookahead {
    ion_type: IonType,
    type_code: TypeCode,
    length_code: u8,
    is_null: bool,
    field_sid: Option<u64>,
    annotations: Vec<u64>,
    /// The representation octets within `data`.
    body: Range<usize>,
    header_offset: usize,
}

struct Header {
    type_code: TypeCode,
    length_code: u8,
    is_null: bool,
    annotations: Vec<u64>,
    body: Range<usize>,
    header_offset: usize,
    /// A NOP pad rather than a value.
    is_pad: bool,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BinaryReader {
            data,
            pos: 0,
            containers: Vec::new(),
            symbols: SymbolTable::system(),
            current: None,
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

    fn limit(&self) -> usize {
        self.containers.last().map_or(self.data.len(), |f| f.end)
    }

    fn in_struct(&self) -> bool {
        matches!(
            self.containers.last(),
            Some(Frame {
                ion_type: IonType::Struct,
                ..
            })
        )
    }

    fn next_inner(&mut self) -> Result<StreamItem> {
        if let Some(current) = self.current.take() {
            self.pos = current.body.end;
        }
        loop {
            let limit = self.limit();
            if self.pos >= limit {
                return Ok(if self.containers.is_empty() {
                    StreamItem::EndOfStream
                } else {
                    StreamItem::EndOfContainer
                });
            }

            if self.containers.is_empty() && self.data[self.pos] == 0xE0 {
                self.read_version_marker()?;
                return Ok(StreamItem::VersionMarker);
            }

            let field_sid = if self.in_struct() {
                Some(read_var_uint(self.data, &mut self.pos)?)
            } else {
                None
            };

            let header = self.read_header(limit)?;
            if header.is_pad {
                self.pos = header.body.end;
                continue;
            }

            if let (Some(sid), Some(frame)) = (field_sid, self.containers.last_mut()) {
                if frame.sorted {
                    if frame.last_field_sid.map_or(false, |last| sid <= last) {
                        let at = header.header_offset;
                        return Err(Error::malformed(BinaryFormatError::StructUnordered, at));
                    }
                    frame.last_field_sid = Some(sid);
                }
            }

            // The header's type code is never Annotation (wrappers are
            // unwrapped by read_header) nor Reserved.
            let ion_type = header.type_code.ion_type().expect("scalar or container");
            let lookahead = Lookahead {
                ion_type,
                type_code: header.type_code,
                length_code: header.length_code,
                is_null: header.is_null,
                field_sid,
                annotations: header.annotations,
                body: header.body,
                header_offset: header.header_offset,
            };

            if self.containers.is_empty()
                && ion_type == IonType::Struct
                && !lookahead.is_null
                && self.is_symbol_table_annotation(&lookahead)?
            {
                self.current = Some(lookahead);
                self.apply_symbol_table()?;
                continue;
            }

            let item = if lookahead.is_null {
                StreamItem::Null(ion_type)
            } else if ion_type.is_container() {
                StreamItem::ContainerStart(ion_type)
            } else {
                StreamItem::Value(ion_type)
            };
            self.current = Some(lookahead);
            return Ok(item);
        }
    }

    fn is_symbol_table_annotation(&self, lookahead: &Lookahead) -> Result<bool> {
        let first = match lookahead.annotations.first() {
            Some(sid) => *sid,
            None => return Ok(false),
        };
        let sid = usize::try_from_u64(first).ok_or(Error::Overflow)?;
        match self.symbols.lookup(sid) {
            Ok(token) => Ok(token.text() == Some(ION_SYMBOL_TABLE)),
            Err(error) => Err(error.into()),
        }
    }

    /// Consumes the current value (an annotated struct) and folds it into
    /// the symbol table.
    fn apply_symbol_table(&mut self) -> Result<()> {
        let value = tree::read_current_value(self, StreamItem::ContainerStart(IonType::Struct))?;
        match value.data {
            Data::Struct(Some(table)) => self.symbols.process_local_table(&table)?,
            // null.struct is treated as an empty table declaration, which
            // resets to the system table.
            _ => self.symbols.reset(),
        }
        Ok(())
    }

    fn read_version_marker(&mut self) -> Result<()> {
        if self.pos + 4 > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        let marker = &self.data[self.pos..self.pos + 4];
        if marker[3] != 0xEA {
            return Err(Error::malformed(
                BinaryFormatError::BadVersionMarker,
                self.pos,
            ));
        }
        if marker[1] != 0x01 || marker[2] != 0x00 {
            return Err(Error::malformed(
                BinaryFormatError::UnsupportedVersion(marker[1], marker[2]),
                self.pos,
            ));
        }
        debug_assert_eq!(marker, BVM_1_0);
        self.pos += 4;
        self.symbols.reset();
        Ok(())
    }

    /// Reads a type descriptor (unwrapping an annotation wrapper if
    /// present) and computes the representation span. Leaves `pos` at the
    /// start of the representation.
    fn read_header(&mut self, limit: usize) -> Result<Header> {
        let header = self.read_bare_header(limit)?;
        if header.type_code != TypeCode::Annotation {
            return Ok(header);
        }

        let wrapper = header;
        let at = wrapper.header_offset;
        // Wrappers must have one annot_length field, at least one annot
        // field, and exactly one value field; L of 0-2 cannot hold that,
        // and null wrappers are illegal.
        if wrapper.length_code < 3 || wrapper.is_null {
            return Err(Error::malformed(
                BinaryFormatError::AnnotationLength(wrapper.length_code),
                at,
            ));
        }
        let wrapper_end = wrapper.body.end;
        self.pos = wrapper.body.start;
        let annotations_length = read_var_uint(self.data, &mut self.pos)? as usize;
        let annotations_end = self.pos + annotations_length;
        if annotations_end > wrapper_end {
            return Err(Error::malformed(BinaryFormatError::AnnotationShape, at));
        }
        let mut annotations = Vec::new();
        while self.pos < annotations_end {
            annotations.push(read_var_uint(self.data, &mut self.pos)?);
        }
        if self.pos != annotations_end || annotations.is_empty() {
            return Err(Error::malformed(BinaryFormatError::AnnotationShape, at));
        }

        let inner = self.read_bare_header(wrapper_end)?;
        if inner.type_code == TypeCode::Annotation {
            return Err(Error::malformed(BinaryFormatError::AnnotatedAnnotation, at));
        }
        if inner.is_pad {
            return Err(Error::malformed(BinaryFormatError::AnnotatedPadding, at));
        }
        if inner.body.end != wrapper_end {
            return Err(Error::malformed(BinaryFormatError::AnnotationShape, at));
        }
        Ok(Header {
            annotations,
            ..inner
        })
    }

    /// Reads one type descriptor with no annotation handling.
    fn read_bare_header(&mut self, limit: usize) -> Result<Header> {
        let header_offset = self.pos;
        if self.pos >= self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        let descriptor = self.data[self.pos];
        self.pos += 1;
        let type_code = TypeCode::from_u8(descriptor >> 4).expect("nibble");
        let length_code = descriptor & 0x0f;

        let mut is_null = false;
        let mut is_pad = false;
        let length: usize = match type_code {
            TypeCode::Reserved => {
                return Err(Error::malformed(
                    BinaryFormatError::ReservedTypeCode,
                    header_offset,
                ));
            }
            TypeCode::Null => match length_code {
                LENGTH_CODE_NULL => {
                    is_null = true;
                    0
                }
                code => {
                    is_pad = true;
                    self.read_length(code)?
                }
            },
            TypeCode::Bool => match length_code {
                0 | 1 => 0,
                LENGTH_CODE_NULL => {
                    is_null = true;
                    0
                }
                code => {
                    return Err(Error::malformed(
                        BinaryFormatError::BoolLength(code),
                        header_offset,
                    ));
                }
            },
            TypeCode::Float => match length_code {
                0 | 4 | 8 => length_code as usize,
                LENGTH_CODE_NULL => {
                    is_null = true;
                    0
                }
                code => {
                    return Err(Error::malformed(
                        BinaryFormatError::FloatLength(code),
                        header_offset,
                    ));
                }
            },
            TypeCode::Struct => match length_code {
                0 => 0,
                LENGTH_CODE_NULL => {
                    is_null = true;
                    0
                }
                // L of 1 flags ascending field ids; the length is always
                // in a VarUInt field and must be non-zero.
                1 => {
                    let length = read_var_uint(self.data, &mut self.pos)? as usize;
                    if length == 0 {
                        return Err(Error::malformed(
                            BinaryFormatError::StructEmpty,
                            header_offset,
                        ));
                    }
                    length
                }
                code => self.read_length(code)?,
            },
            _ => match length_code {
                LENGTH_CODE_NULL => {
                    is_null = true;
                    0
                }
                code => self.read_length(code)?,
            },
        };

        let body = self.pos..self.pos + length;
        if body.end > self.data.len() {
            return Err(Error::UnexpectedEof);
        }
        if body.end > limit {
            return Err(Error::malformed(
                BinaryFormatError::ContainerOverrun,
                header_offset,
            ));
        }
        Ok(Header {
            type_code,
            length_code,
            is_null,
            annotations: Vec::new(),
            body,
            header_offset,
            is_pad,
        })
    }

    fn read_length(&mut self, length_code: u8) -> Result<usize> {
        if length_code == LENGTH_CODE_VAR {
            Ok(read_var_uint(self.data, &mut self.pos)? as usize)
        } else {
            Ok(length_code as usize)
        }
    }

    fn current(&self) -> Result<&Lookahead> {
        self.current
            .as_ref()
            .ok_or_else(|| ArgumentError::NoCurrentValue.into())
    }

    fn current_scalar(&self, expected: IonType) -> Result<&Lookahead> {
        let current = self.current()?;
        if current.ion_type != expected {
            return Err(ArgumentError::TypeMismatch {
                expected,
                found: current.ion_type,
            }
            .into());
        }
        if current.is_null {
            return Err(ArgumentError::NullValue.into());
        }
        Ok(current)
    }

    fn body(&self, lookahead: &Lookahead) -> &'a [u8] {
        &self.data[lookahead.body.clone()]
    }

    fn int_parts(&self) -> Result<(bool, BigUint)> {
        let current = self.current_scalar(IonType::Int)?;
        let negative = current.type_code == TypeCode::NegInt;
        let magnitude = read_uint(self.body(current));
        if negative && magnitude.is_zero() {
            // Zero is always stored as positive; tolerate the encoding but
            // flag it.
            warn!(
                "negative-zero integer encoding at offset {}",
                current.header_offset
            );
        }
        Ok((negative, magnitude))
    }

    fn decode_timestamp(&self, lookahead: &Lookahead) -> Result<Timestamp> {
        let body = self.body(lookahead);
        let at = lookahead.header_offset;
        let mut pos = 0usize;

        let (offset_negative, offset_magnitude) = read_var_int_parts(body, &mut pos)?;
        let offset = if offset_negative && offset_magnitude == 0 {
            None
        } else if offset_magnitude <= 1439 {
            let minutes = offset_magnitude as i16;
            Some(if offset_negative { -minutes } else { minutes })
        } else {
            return Err(Error::Timestamp(
                crate::error::TimestampError::ComponentRange {
                    component: "offset",
                    value: offset_magnitude as i64,
                },
            ));
        };

        let mut component = |pos: &mut usize| -> Result<u64> { read_var_uint(body, pos) };

        let year = component(&mut pos)?;
        let year = if year <= u64::from(u16::MAX) {
            year as u16
        } else {
            return Err(Error::Overflow);
        };
        if pos == body.len() {
            if offset.is_some() {
                warn!("ignoring local offset on a year-precision timestamp");
            }
            return Ok(Timestamp::year(year)?);
        }

        let month = component(&mut pos)? as u8;
        if pos == body.len() {
            if offset.is_some() {
                warn!("ignoring local offset on a month-precision timestamp");
            }
            return Ok(Timestamp::month(year, month)?);
        }

        let day = component(&mut pos)? as u8;
        if pos == body.len() {
            if offset.is_some() {
                warn!("ignoring local offset on a day-precision timestamp");
            }
            return Ok(Timestamp::day(year, month, day)?);
        }

        // Hour and minute are a single component; an hour with no minute is
        // illegal.
        let hour = component(&mut pos)? as u8;
        if pos == body.len() {
            return Err(Error::malformed(BinaryFormatError::TimestampLength, at));
        }
        let minute = component(&mut pos)? as u8;
        if pos == body.len() {
            return Ok(Timestamp::minute(offset, year, month, day, hour, minute)?);
        }

        let second = component(&mut pos)? as u8;
        if pos == body.len() {
            return Ok(Timestamp::second(
                offset, year, month, day, hour, minute, second,
            )?);
        }

        let (exponent_negative, exponent_magnitude) = read_var_int_parts(body, &mut pos)?;
        if exponent_magnitude > i32::MAX as u64 {
            return Err(Error::Overflow);
        }
        let exponent = if exponent_negative {
            -(exponent_magnitude as i32)
        } else {
            exponent_magnitude as i32
        };
        let (coefficient_negative, coefficient) = read_int_parts(&body[pos..]);
        if coefficient_negative && !coefficient.is_zero() {
            return Err(Error::Timestamp(
                crate::error::TimestampError::FractionOutOfRange,
            ));
        }

        // Fractions with a zero coefficient and an exponent greater than -1
        // denote no fractional precision at all.
        if coefficient.is_zero() && exponent > -1 {
            return Ok(Timestamp::second(
                offset, year, month, day, hour, minute, second,
            )?);
        }

        Ok(Timestamp::fractional_second(
            offset, year, month, day, hour, minute, second, coefficient, exponent,
        )?)
    }
}

// usize::try_from on u64 spelled out for 32-bit targets.
trait TryFromU64: Sized {
    fn try_from_u64(value: u64) -> Option<Self>;
}

impl TryFromU64 for usize {
    fn try_from_u64(value: u64) -> Option<usize> {
        use std::convert::TryFrom;
        usize::try_from(value).ok()
    }
}

impl<'a> IonReader for BinaryReader<'a> {
    fn next(&mut self) -> Result<StreamItem> {
        self.check_usable()?;
        match self.next_inner() {
            Ok(item) => Ok(item),
            Err(error) => self.fail(error),
        }
    }

    fn step_in(&mut self) -> Result<()> {
        self.check_usable()?;
        let current = self.current()?;
        if !current.ion_type.is_container() || current.is_null {
            return Err(ArgumentError::NotAContainer.into());
        }
        let frame = Frame {
            ion_type: current.ion_type,
            end: current.body.end,
            sorted: current.ion_type == IonType::Struct && current.length_code == 1,
            last_field_sid: None,
        };
        self.pos = current.body.start;
        self.containers.push(frame);
        self.current = None;
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        self.check_usable()?;
        let frame = self
            .containers
            .pop()
            .ok_or(ArgumentError::NotInContainer)?;
        self.pos = frame.end;
        self.current = None;
        Ok(())
    }

    fn depth(&self) -> usize {
        self.containers.len()
    }

    fn ion_type(&self) -> Option<IonType> {
        self.current.as_ref().map(|current| current.ion_type)
    }

    fn is_null(&self) -> bool {
        self.current
            .as_ref()
            .map_or(false, |current| current.is_null)
    }

    fn field_name(&self) -> Result<Option<SymbolToken>> {
        self.check_usable()?;
        let current = self.current()?;
        match current.field_sid {
            None => Ok(None),
            Some(sid) => {
                let sid = usize::try_from_u64(sid).ok_or(Error::Overflow)?;
                Ok(Some(self.symbols.lookup(sid)?))
            }
        }
    }

    fn annotations(&self) -> Result<Vec<SymbolToken>> {
        self.check_usable()?;
        let current = self.current()?;
        current
            .annotations
            .iter()
            .map(|sid| {
                let sid = usize::try_from_u64(*sid).ok_or(Error::Overflow)?;
                Ok(self.symbols.lookup(sid)?)
            })
            .collect()
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Bool)?;
        Ok(current.length_code == 1)
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Int)?;
        let negative = current.type_code == TypeCode::NegInt;
        let magnitude = read_uint_u64(self.body(current)).ok_or(Error::Overflow)?;
        if negative {
            if magnitude > i64::MAX as u64 + 1 {
                return Err(Error::Overflow);
            }
            if magnitude == 0 {
                warn!(
                    "negative-zero integer encoding at offset {}",
                    current.header_offset
                );
            }
            Ok((magnitude as i64).wrapping_neg())
        } else {
            if magnitude > i64::MAX as u64 {
                return Err(Error::Overflow);
            }
            Ok(magnitude as i64)
        }
    }

    fn read_int(&mut self) -> Result<BigInt> {
        self.check_usable()?;
        let (negative, magnitude) = self.int_parts()?;
        let sign = if magnitude.is_zero() {
            Sign::NoSign
        } else if negative {
            Sign::Minus
        } else {
            Sign::Plus
        };
        Ok(BigInt::from_biguint(sign, magnitude))
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Float)?;
        let body = self.body(current);
        Ok(match body.len() {
            0 => 0e0,
            4 => {
                let mut bits = [0u8; 4];
                bits.copy_from_slice(body);
                f64::from(f32::from_bits(u32::from_be_bytes(bits)))
            }
            _ => {
                let mut bits = [0u8; 8];
                bits.copy_from_slice(body);
                f64::from_bits(u64::from_be_bytes(bits))
            }
        })
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Decimal)?;
        let body = self.body(current);
        if body.is_empty() {
            return Ok(Decimal::from_sign_magnitude(false, BigUint::zero(), 0));
        }
        let mut pos = 0usize;
        let exponent = read_var_int(body, &mut pos)?;
        if exponent < i64::from(i32::MIN) || exponent > i64::from(i32::MAX) {
            return Err(Error::Overflow);
        }
        let (negative, coefficient) = read_int_parts(&body[pos..]);
        Ok(Decimal::from_sign_magnitude(
            negative,
            coefficient,
            exponent as i32,
        ))
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Timestamp)?;
        if current.body.is_empty() {
            return Err(Error::malformed(
                BinaryFormatError::TimestampLength,
                current.header_offset,
            ));
        }
        // Split the borrow: decode_timestamp only reads.
        let lookahead = Lookahead {
            ion_type: current.ion_type,
            type_code: current.type_code,
            length_code: current.length_code,
            is_null: current.is_null,
            field_sid: current.field_sid,
            annotations: current.annotations.clone(),
            body: current.body.clone(),
            header_offset: current.header_offset,
        };
        match self.decode_timestamp(&lookahead) {
            Ok(timestamp) => Ok(timestamp),
            Err(error) => self.fail(error),
        }
    }

    fn read_symbol(&mut self) -> Result<SymbolToken> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Symbol)?;
        let body = self.body(current);
        let sid = read_uint_u64(body).ok_or(Error::Overflow)?;
        let sid = usize::try_from_u64(sid).ok_or(Error::Overflow)?;
        Ok(self.symbols.lookup(sid)?)
    }

    fn read_string(&mut self) -> Result<String> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::String)?;
        let at = current.header_offset;
        match std::str::from_utf8(self.body(current)) {
            Ok(text) => Ok(text.to_owned()),
            Err(_) => self.fail(Error::malformed(BinaryFormatError::StringEncoding, at)),
        }
    }

    fn read_clob(&mut self) -> Result<Vec<u8>> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Clob)?;
        Ok(self.body(current).to_vec())
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        self.check_usable()?;
        let current = self.current_scalar(IonType::Blob)?;
        Ok(self.body(current).to_vec())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        self.containers.clear();
        Ok(())
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use hex::decode;
    use pretty_assertions::assert_eq;

    use super::*;

    fn reader_over(body_hex: &str) -> Vec<u8> {
        let mut bytes = BVM_1_0.to_vec();
        bytes.extend(decode(body_hex).unwrap());
        bytes
    }

    fn single_item(body_hex: &str) -> (StreamItem, Vec<u8>) {
        let bytes = reader_over(body_hex);
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.next().unwrap(), StreamItem::VersionMarker);
        let item = reader.next().unwrap();
        (item, bytes)
    }

    #[test]
    fn empty_stream_is_just_eof() {
        let mut reader = BinaryReader::new(&BVM_1_0);
        assert_eq!(reader.next().unwrap(), StreamItem::VersionMarker);
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfStream);
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfStream);
    }

    #[test]
    fn missing_ivm_still_reads() {
        // A bare value with no version marker: tolerated for embedded use.
        let bytes = decode("111f").unwrap();
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Bool));
        assert_eq!(reader.read_bool().unwrap(), true);
        assert_eq!(reader.next().unwrap(), StreamItem::Null(IonType::Bool));
    }

    #[test]
    fn nulls_of_every_type() {
        for (hex, ion_type) in [
            ("0f", IonType::Null),
            ("1f", IonType::Bool),
            ("2f", IonType::Int),
            ("3f", IonType::Int),
            ("4f", IonType::Float),
            ("5f", IonType::Decimal),
            ("6f", IonType::Timestamp),
            ("7f", IonType::Symbol),
            ("8f", IonType::String),
            ("9f", IonType::Clob),
            ("af", IonType::Blob),
            ("bf", IonType::List),
            ("cf", IonType::Sexp),
            ("df", IonType::Struct),
        ]
        .iter()
        {
            let (item, _) = single_item(hex);
            assert_eq!(item, StreamItem::Null(*ion_type));
        }
    }

    #[test]
    fn reads_ints_through_both_accessors() {
        let bytes = reader_over("21ff");
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 255);
        assert_eq!(reader.read_int().unwrap(), BigInt::from(255));
    }

    #[test]
    fn zero_length_encodings() {
        let bytes = reader_over("20 40 50 80".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 0);
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Float));
        assert_eq!(reader.read_f64().unwrap(), 0e0);
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Decimal));
        assert_eq!(
            reader.read_decimal().unwrap(),
            Decimal::from_sign_magnitude(false, BigUint::zero(), 0)
        );
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::String));
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn skips_nop_padding() {
        // one-byte pad, two-byte pad, then true
        let bytes = reader_over("00 01fe 11".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Bool));
        assert_eq!(reader.read_bool().unwrap(), true);
    }

    #[test]
    fn nop_padding_inside_structs_is_not_a_field() {
        // a struct whose only content is a field-name sid 0 and a two-byte
        // pad; equivalent to {}
        let bytes = reader_over("d3 80 01 ac".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(
            reader.next().unwrap(),
            StreamItem::ContainerStart(IonType::Struct)
        );
        reader.step_in().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfContainer);
        reader.step_out().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfStream);
    }

    #[test]
    fn reads_containers() {
        // [true, 7]
        let bytes = reader_over("b4 11 2107".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(
            reader.next().unwrap(),
            StreamItem::ContainerStart(IonType::List)
        );
        reader.step_in().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Bool));
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 7);
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfContainer);
        reader.step_out().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfStream);
    }

    #[test]
    fn step_out_skips_unread_children() {
        let bytes = reader_over("b4 11 2107 20".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        reader.next().unwrap();
        reader.step_in().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Bool));
        reader.step_out().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Int));
        assert_eq!(reader.read_i64().unwrap(), 0);
    }

    #[test]
    fn reads_structs_with_field_names() {
        // {name: "x"} using system sid 4 ("name")
        let bytes = reader_over("d3 84 8178".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(
            reader.next().unwrap(),
            StreamItem::ContainerStart(IonType::Struct)
        );
        reader.step_in().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::String));
        assert_eq!(
            reader.field_name().unwrap(),
            Some(SymbolToken::known("name"))
        );
        assert_eq!(reader.read_string().unwrap(), "x");
        reader.step_out().unwrap();
    }

    #[test]
    fn reads_annotations() {
        // version::true  (system sid 5 is "version")
        let bytes = reader_over("e3 81 85 11".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Bool));
        assert_eq!(
            reader.annotations().unwrap(),
            vec![SymbolToken::known("version")]
        );
        assert_eq!(reader.read_bool().unwrap(), true);
    }

    #[test]
    fn rejects_annotated_annotation() {
        let bytes = reader_over("e6 81 85 e3818511".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        let error = reader.next().unwrap_err();
        assert!(matches!(
            error,
            Error::Malformed {
                error: crate::error::FormatError::Binary(
                    BinaryFormatError::AnnotatedAnnotation
                ),
                ..
            }
        ));
        // the failure is sticky
        assert_eq!(reader.next().unwrap_err(), error);
    }

    #[test]
    fn rejects_reserved_type_code() {
        let bytes = reader_over("f0");
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert!(matches!(
            reader.next().unwrap_err(),
            Error::Malformed { .. }
        ));
    }

    #[test]
    fn local_symbol_table_extends_resolution() {
        // $ion_symbol_table::{symbols: ["hello"]}  then  'hello' (sid 10)
        let lst = "ee8b 81 83 d8 87 b6 85 68656c6c6f".replace(' ', "");
        let value = "71 0a".replace(' ', "");
        let bytes = reader_over(&format!("{}{}", lst, value));
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.next().unwrap(), StreamItem::VersionMarker);
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Symbol));
        assert_eq!(reader.read_symbol().unwrap(), SymbolToken::known("hello"));
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfStream);
    }

    #[test]
    fn sid_zero_reads_as_symbol_zero() {
        let (item, bytes) = single_item("70");
        assert_eq!(item, StreamItem::Value(IonType::Symbol));
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        reader.next().unwrap();
        assert_eq!(reader.read_symbol().unwrap(), SymbolToken::Zero);
    }

    #[test]
    fn timestamp_doc_example() {
        // 2000-01-01T00:00:00Z with no fractional seconds
        let bytes = reader_over("68 80 0fd0 81 81 80 80 80".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        assert_eq!(
            reader.next().unwrap(),
            StreamItem::Value(IonType::Timestamp)
        );
        assert_eq!(
            reader.read_timestamp().unwrap(),
            Timestamp::second(Some(0), 2000, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn timestamp_fraction_digit_counts_are_distinct() {
        // 2000-01-01T00:00:00.0Z vs ...00.00Z (exponents -1 and -2)
        let bytes = reader_over("69 80 0fd0 81 81 80 80 80 c1 69 80 0fd0 81 81 80 80 80 c2"
            .replace(' ', "")
            .as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        reader.next().unwrap();
        let first = reader.read_timestamp().unwrap();
        reader.next().unwrap();
        let second = reader.read_timestamp().unwrap();
        assert_eq!(first.fractional_precision(), Some(1));
        assert_eq!(second.fractional_precision(), Some(2));
        assert_ne!(first, second);
    }

    #[test]
    fn container_overrun_is_malformed() {
        // list claims 2 bytes but holds an int that claims 2 more
        let bytes = reader_over("b2 22ff".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        reader.next().unwrap();
        reader.step_in().unwrap();
        assert!(matches!(
            reader.next().unwrap_err(),
            Error::Malformed { .. }
        ));
    }

    #[test]
    fn sorted_struct_flag_is_validated() {
        // L1 struct, fields name(4), version(5): ascending, accepted
        let bytes = reader_over("d1 84 84 11 85 11".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        reader.next().unwrap();
        reader.step_in().unwrap();
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Bool));
        assert_eq!(reader.next().unwrap(), StreamItem::Value(IonType::Bool));
        assert_eq!(reader.next().unwrap(), StreamItem::EndOfContainer);

        // descending field ids must be rejected
        let bytes = reader_over("d1 84 85 11 84 11".replace(' ', "").as_str());
        let mut reader = BinaryReader::new(&bytes);
        reader.next().unwrap();
        reader.next().unwrap();
        reader.step_in().unwrap();
        reader.next().unwrap();
        assert!(matches!(
            reader.next().unwrap_err(),
            Error::Malformed { .. }
        ));
    }
}
