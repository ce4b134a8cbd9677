use std::fmt::Write as _;

use itertools::Itertools;
use num_bigint::BigInt;

use super::{is_identifier, ESCAPED_CODE_POINTS};
use crate::error::{ArgumentError, Error, Result, SymbolError};
use crate::stream::IonWriter;
use crate::symbols::{SymbolToken, ION_1_0};
use crate::types::{Decimal, IonType, Timestamp};

/// Configuration for a [`TextWriter`].
#[derive(Clone, Copy, Debug)]
pub struct TextWriterConfig {
    /// Pretty mode indents by depth and puts each container child on its
    /// own line; compact mode emits no optional whitespace.
    pub pretty: bool,
    /// Whether to begin the stream with `$ion_1_0`.
    pub include_ivm: bool,
}

impl Default for TextWriterConfig {
    fn default() -> Self {
        TextWriterConfig {
            pretty: false,
            include_ivm: true,
        }
    }
}

/// A streaming writer producing Ion text.
pub struct TextWriter {
    config: TextWriterConfig,
    out: String,
    frames: Vec<Frame>,
    field_name: Option<SymbolToken>,
    annotations: Vec<SymbolToken>,
    top_level_values: usize,
    finished: bool,
    failed: Option<Error>,
}

struct Frame {
    ion_type: IonType,
    children: usize,
}

const INDENT: &str = "  ";

/// Escapes `text` for a context quoted by `quote`. Control characters
/// outside the short forms become `\uXXXX`.
fn escape_text(out: &mut String, text: &str, quote: char) {
    for c in text.chars() {
        if c == quote {
            out.push('\\');
            out.push(quote);
        } else if let Some(escape) = ESCAPED_CODE_POINTS.get(&c) {
            out.push_str(escape);
        } else if (c as u32) < 0x20 || c == '\u{7f}' {
            write!(out, "\\u{:04x}", c as u32).expect("writing to a String");
        } else {
            out.push(c);
        }
    }
}

fn symbol_text(token: &SymbolToken) -> Result<String> {
    match token {
        SymbolToken::Zero => Ok("$0".to_string()),
        SymbolToken::Unknown { import_location } => Err(SymbolError::UnresolvedImport {
            name: import_location.name.clone(),
            sid: import_location.sid,
        }
        .into()),
        SymbolToken::Known { text } => {
            if is_identifier(text) {
                Ok(text.clone())
            } else {
                let mut quoted = String::with_capacity(text.len() + 2);
                quoted.push('\'');
                escape_text(&mut quoted, text, '\'');
                quoted.push('\'');
                Ok(quoted)
            }
        }
    }
}

fn float_text(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        // {:e} keeps the marker that distinguishes floats from ints and
        // decimals, and renders negative zero as -0e0
        format!("{:e}", value)
    }
}

impl TextWriter {
    pub fn new() -> Self {
        TextWriter::with_config(TextWriterConfig::default())
    }

    pub fn pretty() -> Self {
        TextWriter::with_config(TextWriterConfig {
            pretty: true,
            ..TextWriterConfig::default()
        })
    }

    pub fn with_config(config: TextWriterConfig) -> Self {
        let mut writer = TextWriter {
            config,
            out: String::new(),
            frames: Vec::new(),
            field_name: None,
            annotations: Vec::new(),
            top_level_values: 0,
            finished: false,
            failed: None,
        };
        if config.include_ivm {
            writer.out.push_str(ION_1_0);
            writer.top_level_values = 1;
        }
        writer
    }

    /// The text produced so far; complete once `finish` has succeeded.
    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
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

    fn newline_indent(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }

    /// Separators, the field name, and any annotations, ahead of a value.
    fn value_prefix(&mut self) -> Result<()> {
        let field_name = self.field_name.take();
        if self.frames.is_empty() {
            if self.top_level_values > 0 {
                self.out.push('\n');
            }
            self.top_level_values += 1;
        } else {
            let depth = self.frames.len();
            let frame = self.frames.last_mut().expect("not empty");
            let separate = frame.children > 0;
            let in_sexp = frame.ion_type == IonType::Sexp;
            frame.children += 1;
            // sexp children are whitespace-separated; everything else
            // takes a comma
            if separate && !in_sexp {
                self.out.push(',');
            }
            if self.config.pretty {
                self.newline_indent(depth);
            } else if separate && in_sexp {
                self.out.push(' ');
            }
        }

        if self.in_struct() {
            let name = field_name.ok_or(ArgumentError::MissingFieldName)?;
            let text = symbol_text(&name)?;
            self.out.push_str(&text);
            self.out.push(':');
            if self.config.pretty {
                self.out.push(' ');
            }
        }

        if !self.annotations.is_empty() {
            let annotations = std::mem::take(&mut self.annotations);
            let rendered: Vec<String> = annotations
                .iter()
                .map(symbol_text)
                .collect::<Result<Vec<String>>>()?;
            let joined = rendered.iter().join("::");
            self.out.push_str(&joined);
            self.out.push_str("::");
        }
        Ok(())
    }

    fn write_scalar(&mut self, text: &str) -> Result<()> {
        self.value_prefix()?;
        self.out.push_str(text);
        Ok(())
    }
}

impl Default for TextWriter {
    fn default() -> Self {
        TextWriter::new()
    }
}

impl IonWriter for TextWriter {
    fn write_null(&mut self, ion_type: IonType) -> Result<()> {
        self.check_usable()?;
        let text = match ion_type {
            IonType::Null => "null.null".to_string(),
            other => format!("null.{}", other),
        };
        self.write_scalar(&text)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.check_usable()?;
        self.write_scalar(if value { "true" } else { "false" })
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.check_usable()?;
        self.write_scalar(&value.to_string())
    }

    fn write_int(&mut self, value: &BigInt) -> Result<()> {
        self.check_usable()?;
        self.write_scalar(&value.to_str_radix(10))
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.check_usable()?;
        self.write_scalar(&float_text(value))
    }

    fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        self.check_usable()?;
        self.write_scalar(&value.to_string())
    }

    fn write_timestamp(&mut self, value: &Timestamp) -> Result<()> {
        self.check_usable()?;
        self.write_scalar(&value.to_string())
    }

    fn write_symbol(&mut self, value: &SymbolToken) -> Result<()> {
        self.check_usable()?;
        let text = symbol_text(value)?;
        self.write_scalar(&text)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.check_usable()?;
        self.value_prefix()?;
        self.out.push('"');
        let mut escaped = String::with_capacity(value.len());
        escape_text(&mut escaped, value, '"');
        self.out.push_str(&escaped);
        self.out.push('"');
        Ok(())
    }

    fn write_clob(&mut self, value: &[u8]) -> Result<()> {
        self.check_usable()?;
        self.value_prefix()?;
        self.out.push_str("{{\"");
        for byte in value {
            match byte {
                b'"' => self.out.push_str("\\\""),
                b'\\' => self.out.push_str("\\\\"),
                b'\t' => self.out.push_str("\\t"),
                b'\n' => self.out.push_str("\\n"),
                b'\r' => self.out.push_str("\\r"),
                0x20..=0x7e => self.out.push(*byte as char),
                other => {
                    write!(self.out, "\\x{:02x}", other).expect("writing to a String");
                }
            }
        }
        self.out.push_str("\"}}");
        Ok(())
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.check_usable()?;
        self.value_prefix()?;
        write!(self.out, "{{{{{}}}}}", base64::encode(value)).expect("writing to a String");
        Ok(())
    }

    fn start_container(&mut self, ion_type: IonType) -> Result<()> {
        self.check_usable()?;
        let bracket = match ion_type {
            IonType::List => '[',
            IonType::Sexp => '(',
            IonType::Struct => '{',
            _ => return Err(ArgumentError::NotAContainer.into()),
        };
        self.value_prefix()?;
        self.out.push(bracket);
        self.frames.push(Frame {
            ion_type,
            children: 0,
        });
        Ok(())
    }

    fn end_container(&mut self) -> Result<()> {
        self.check_usable()?;
        let frame = self.frames.pop().ok_or(ArgumentError::NotInContainer)?;
        if self.config.pretty && frame.children > 0 {
            self.newline_indent(self.frames.len());
        }
        self.out.push(match frame.ion_type {
            IonType::List => ']',
            IonType::Sexp => ')',
            _ => '}',
        });
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
