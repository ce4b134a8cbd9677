use num_bigint::{BigInt, Sign};
use num_traits::Zero;

use super::subfield::{write_int_parts, write_var_int, write_var_int_parts, write_var_uint};
use super::BVM_1_0;
use crate::error::{ArgumentError, Error, Result, SymbolError};
use crate::stream::IonWriter;
use crate::symbol_table::SymbolTable;
use crate::symbols::{system_sid, SymbolToken};
use crate::types::{Decimal, IonType, Timestamp};

/// Configuration for a [`BinaryWriter`].
#[derive(Clone, Copy, Debug)]
pub struct BinaryWriterConfig {
    /// Whether to begin the stream with the version marker. Disabled for
    /// embedded or appendable output.
    pub include_ivm: bool,
}

impl Default for BinaryWriterConfig {
    fn default() -> Self {
        BinaryWriterConfig { include_ivm: true }
    }
}

/// A streaming writer producing the binary encoding.
///
/// Container children accumulate in per-frame scratch buffers which are
/// concatenated on close, so a container's length is known before its
/// descriptor is written and nothing is ever rewritten in place.
///
/// Symbols are interned into the local table as they are first written; at
/// `finish` the stream is assembled as version marker, a local symbol table
/// declaring the interned symbols (only when there are any), then the
/// buffered top-level values. Writing from one writer once therefore yields
/// a single symbol table with densely packed sids.
pub struct BinaryWriter {
    config: BinaryWriterConfig,
    /// Encoded top-level values.
    body: Vec<u8>,
    frames: Vec<Frame>,
    symbols: SymbolTable,
    field_name: Option<SymbolToken>,
    annotations: Vec<SymbolToken>,
    out: Vec<u8>,
    finished: bool,
    failed: Option<Error>,
}

struct Frame {
    ion_type: IonType,
    buffer: Vec<u8>,
    field_sid: Option<u64>,
    annotation_sids: Vec<u64>,
}

fn push_descriptor(buf: &mut Vec<u8>, type_code: u8, length: usize) {
    if length < 14 {
        buf.push(type_code << 4 | length as u8);
    } else {
        buf.push(type_code << 4 | 14);
        write_var_uint(buf, length as u64);
    }
}

/// Struct descriptors avoid the literal length nibble 1, which would flag
/// the fields as sorted.
fn push_struct_descriptor(buf: &mut Vec<u8>, length: usize) {
    if length == 1 {
        buf.push(0xde);
        write_var_uint(buf, 1);
    } else {
        push_descriptor(buf, 0xd, length);
    }
}

fn minimal_be_bytes(value: u64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_be_bytes();
    bytes[(value.leading_zeros() / 8) as usize..].to_vec()
}

fn wrap_annotations(annotation_sids: &[u64], value: &[u8]) -> Vec<u8> {
    let mut annotations = Vec::new();
    for sid in annotation_sids {
        write_var_uint(&mut annotations, *sid);
    }
    let mut body = Vec::with_capacity(annotations.len() + value.len() + 2);
    write_var_uint(&mut body, annotations.len() as u64);
    body.extend_from_slice(&annotations);
    body.extend_from_slice(value);
    let mut wrapped = Vec::with_capacity(body.len() + 2);
    push_descriptor(&mut wrapped, 0xe, body.len());
    wrapped.extend_from_slice(&body);
    wrapped
}

impl BinaryWriter {
    pub fn new() -> Self {
        BinaryWriter::with_config(BinaryWriterConfig::default())
    }

    pub fn with_config(config: BinaryWriterConfig) -> Self {
        BinaryWriter {
            config,
            body: Vec::new(),
            frames: Vec::new(),
            symbols: SymbolTable::system(),
            field_name: None,
            annotations: Vec::new(),
            out: Vec::new(),
            finished: false,
            failed: None,
        }
    }

    /// The assembled stream. Meaningful only after `finish`.
    pub fn bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    fn check_usable(&self) -> Result<()> {
        if let Some(error) = &self.failed {
            return Err(error.clone());
        }
        if self.finished {
            return Err(ArgumentError::WriterFinished.into());
        }
        Ok(())
    }

    fn in_struct(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(Frame {
                ion_type: IonType::Struct,
                ..
            })
        )
    }

    fn current_buffer(&mut self) -> &mut Vec<u8> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.buffer,
            None => &mut self.body,
        }
    }

    fn resolve_symbol(&mut self, token: &SymbolToken) -> Result<u64> {
        match token {
            SymbolToken::Known { text } => Ok(self.symbols.intern(text) as u64),
            SymbolToken::Zero => Ok(0),
            SymbolToken::Unknown { import_location } => Err(SymbolError::UnresolvedImport {
                name: import_location.name.clone(),
                sid: import_location.sid,
            }
            .into()),
        }
    }

    /// Resolves and clears the pending field name and annotations.
    fn take_value_prefix(&mut self) -> Result<(Option<u64>, Vec<u64>)> {
        let field_sid = if self.in_struct() {
            match self.field_name.take() {
                Some(token) => Some(self.resolve_symbol(&token)?),
                None => return Err(ArgumentError::MissingFieldName.into()),
            }
        } else {
            None
        };
        let annotations = std::mem::take(&mut self.annotations);
        let annotation_sids = annotations
            .iter()
            .map(|token| self.resolve_symbol(token))
            .collect::<Result<Vec<u64>>>()?;
        Ok((field_sid, annotation_sids))
    }

    /// Emits one complete value (descriptor already formed in `encoded`)
    /// with the pending field name and annotations applied.
    fn emit(&mut self, encoded: Vec<u8>) -> Result<()> {
        let (field_sid, annotation_sids) = self.take_value_prefix()?;
        let encoded = if annotation_sids.is_empty() {
            encoded
        } else {
            wrap_annotations(&annotation_sids, &encoded)
        };
        let buffer = self.current_buffer();
        if let Some(sid) = field_sid {
            write_var_uint(buffer, sid);
        }
        buffer.extend_from_slice(&encoded);
        Ok(())
    }

    fn emit_scalar(&mut self, type_code: u8, rep: &[u8]) -> Result<()> {
        let mut encoded = Vec::with_capacity(rep.len() + 2);
        push_descriptor(&mut encoded, type_code, rep.len());
        encoded.extend_from_slice(rep);
        self.emit(encoded)
    }

    fn timestamp_rep(timestamp: &Timestamp) -> Vec<u8> {
        let mut rep = Vec::new();
        let c = timestamp.components();
        match c.offset {
            // -0 denotes an unknown local offset; date precisions never
            // carry one.
            None => write_var_int_parts(&mut rep, true, 0),
            Some(minutes) => write_var_int(&mut rep, i64::from(minutes)),
        }
        write_var_uint(&mut rep, u64::from(c.year));
        if let Some(month) = c.month {
            write_var_uint(&mut rep, u64::from(month));
        }
        if let Some(day) = c.day {
            write_var_uint(&mut rep, u64::from(day));
        }
        if let Some(hour) = c.hour {
            write_var_uint(&mut rep, u64::from(hour));
            write_var_uint(&mut rep, u64::from(c.minute.unwrap_or(0)));
        }
        if let Some(second) = c.second {
            write_var_uint(&mut rep, u64::from(second));
        }
        if let Some((coefficient, exponent)) = c.fraction {
            write_var_int(&mut rep, i64::from(exponent));
            // A zero coefficient is implied by an empty Int field.
            write_int_parts(&mut rep, false, coefficient);
        }
        rep
    }

    /// Encodes the pending local symbol table declaration, if any local
    /// symbols were interned.
    fn symbol_table_bytes(&self) -> Option<Vec<u8>> {
        let mut list_body = Vec::new();
        let mut any = false;
        for text in self.symbols.exported_symbols() {
            any = true;
            match text {
                Some(text) => {
                    push_descriptor(&mut list_body, 0x8, text.len());
                    list_body.extend_from_slice(text.as_bytes());
                }
                // a slot with unknowable text is declared as null.symbol
                None => list_body.push(0x7f),
            }
        }
        if !any {
            return None;
        }
        let mut list = Vec::new();
        push_descriptor(&mut list, 0xb, list_body.len());
        list.extend_from_slice(&list_body);

        let mut struct_body = Vec::new();
        write_var_uint(&mut struct_body, system_sid::SYMBOLS as u64);
        struct_body.extend_from_slice(&list);

        let mut table = Vec::new();
        push_struct_descriptor(&mut table, struct_body.len());
        table.extend_from_slice(&struct_body);

        Some(wrap_annotations(
            &[system_sid::ION_SYMBOL_TABLE as u64],
            &table,
        ))
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        BinaryWriter::new()
    }
}

impl IonWriter for BinaryWriter {
    fn write_null(&mut self, ion_type: IonType) -> Result<()> {
        self.check_usable()?;
        let type_code: u8 = match ion_type {
            IonType::Null => 0x0,
            IonType::Bool => 0x1,
            IonType::Int => 0x2,
            IonType::Float => 0x4,
            IonType::Decimal => 0x5,
            IonType::Timestamp => 0x6,
            IonType::Symbol => 0x7,
            IonType::String => 0x8,
            IonType::Clob => 0x9,
            IonType::Blob => 0xa,
            IonType::List => 0xb,
            IonType::Sexp => 0xc,
            IonType::Struct => 0xd,
        };
        self.emit(vec![type_code << 4 | 0x0f])
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.check_usable()?;
        self.emit(vec![if value { 0x11 } else { 0x10 }])
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.check_usable()?;
        let type_code = if value < 0 { 0x3 } else { 0x2 };
        self.emit_scalar(type_code, &minimal_be_bytes(value.unsigned_abs()))
    }

    fn write_int(&mut self, value: &BigInt) -> Result<()> {
        self.check_usable()?;
        let (sign, magnitude) = value.to_bytes_be();
        // Zero is always stored as positive; negative zero is illegal.
        let type_code = if sign == Sign::Minus { 0x3 } else { 0x2 };
        let rep: &[u8] = if value.is_zero() { &[] } else { &magnitude };
        self.emit_scalar(type_code, rep)
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.check_usable()?;
        if value.to_bits() == 0 {
            // positive zero is 0e0, the empty representation
            self.emit_scalar(0x4, &[])
        } else {
            self.emit_scalar(0x4, &value.to_bits().to_be_bytes())
        }
    }

    fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.check_usable()?;
        if !value.is_negative() && value.is_zero() && value.exponent() == 0 {
            // 0d0 is the single byte 0x50
            return self.emit_scalar(0x5, &[]);
        }
        let mut rep = Vec::new();
        write_var_int(&mut rep, i64::from(value.exponent()));
        write_int_parts(&mut rep, value.is_negative(), value.coefficient());
        self.emit_scalar(0x5, &rep)
    }

    fn write_timestamp(&mut self, value: &Timestamp) -> Result<()> {
        self.check_usable()?;
        let rep = BinaryWriter::timestamp_rep(value);
        self.emit_scalar(0x6, &rep)
    }

    fn write_symbol(&mut self, value: &SymbolToken) -> Result<()> {
        self.check_usable()?;
        let sid = self.resolve_symbol(value)?;
        self.emit_scalar(0x7, &minimal_be_bytes(sid))
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.check_usable()?;
        self.emit_scalar(0x8, value.as_bytes())
    }

    fn write_clob(&mut self, value: &[u8]) -> Result<()> {
        self.check_usable()?;
        self.emit_scalar(0x9, value)
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.check_usable()?;
        self.emit_scalar(0xa, value)
    }

    fn start_container(&mut self, ion_type: IonType) -> Result<()> {
        self.check_usable()?;
        if !ion_type.is_container() {
            return Err(ArgumentError::NotAContainer.into());
        }
        let (field_sid, annotation_sids) = self.take_value_prefix()?;
        self.frames.push(Frame {
            ion_type,
            buffer: Vec::new(),
            field_sid,
            annotation_sids,
        });
        Ok(())
    }

    fn end_container(&mut self) -> Result<()> {
        self.check_usable()?;
        let frame = self.frames.pop().ok_or(ArgumentError::NotInContainer)?;
        let mut encoded = Vec::with_capacity(frame.buffer.len() + 4);
        match frame.ion_type {
            IonType::List => push_descriptor(&mut encoded, 0xb, frame.buffer.len()),
            IonType::Sexp => push_descriptor(&mut encoded, 0xc, frame.buffer.len()),
            _ => push_struct_descriptor(&mut encoded, frame.buffer.len()),
        }
        encoded.extend_from_slice(&frame.buffer);
        let encoded = if frame.annotation_sids.is_empty() {
            encoded
        } else {
            wrap_annotations(&frame.annotation_sids, &encoded)
        };
        let buffer = self.current_buffer();
        if let Some(sid) = frame.field_sid {
            write_var_uint(buffer, sid);
        }
        buffer.extend_from_slice(&encoded);
        Ok(())
    }

    fn set_field_name(&mut self, name: SymbolToken) -> Result<()> {
        self.check_usable()?;
        if !self.in_struct() {
            return Err(ArgumentError::FieldNameOutsideStruct.into());
        }
        self.field_name = Some(name);
        Ok(())
    }

    fn add_annotation(&mut self, annotation: SymbolToken) -> Result<()> {
        self.check_usable()?;
        self.annotations.push(annotation);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.check_usable()?;
        if !self.frames.is_empty() {
            return Err(ArgumentError::UnclosedContainers(self.frames.len()).into());
        }
        if self.config.include_ivm {
            self.out.extend_from_slice(&BVM_1_0);
        }
        if let Some(table) = self.symbol_table_bytes() {
            self.out.extend_from_slice(&table);
        }
        self.out.extend_from_slice(&self.body);
        self.body.clear();
        self.finished = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.finished && self.failed.is_none() {
            self.finish()?;
        }
        Ok(())
    }
}
