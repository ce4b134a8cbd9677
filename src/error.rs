use thiserror::Error;

use crate::types::IonType;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type shared by every reader, writer, and constructor in the
/// crate. Variants correspond to semantic categories rather than to the
/// module that detected the problem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A structural violation of the binary or text grammar. The position is
    /// a byte offset (binary) or character offset (text) into the input.
    /// Non-recoverable: the originating reader is permanently failed.
    #[error("malformed input at offset {position}: {error}")]
    Malformed { error: FormatError, position: usize },
    /// The caller supplied a value or drove the cursor in a way that violates
    /// an invariant.
    #[error("invalid argument: {0}")]
    InvalidArgument(ArgumentError),
    /// Timestamp-specific invariant violations (precision/fraction/offset).
    #[error("invalid timestamp: {0}")]
    Timestamp(TimestampError),
    /// Symbol resolution failures.
    #[error("invalid symbol: {0}")]
    Symbol(SymbolError),
    /// A numeric value does not fit in the requested native width. Use the
    /// arbitrary-precision accessor instead.
    #[error("value does not fit in the requested native width")]
    Overflow,
    /// The input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// The underlying source or sink failed. Non-recoverable.
    #[error("i/o error: {0}")]
    Io(String),
}

impl Error {
    pub(crate) fn malformed(error: impl Into<FormatError>, position: usize) -> Self {
        Error::Malformed {
            error: error.into(),
            position,
        }
    }

    /// Errors that permanently fail the reader or writer that produced them.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Malformed { .. } | Error::Io(_) | Error::UnexpectedEof
        )
    }
}

impl From<ArgumentError> for Error {
    fn from(error: ArgumentError) -> Self {
        Error::InvalidArgument(error)
    }
}

impl From<TimestampError> for Error {
    fn from(error: TimestampError) -> Self {
        Error::Timestamp(error)
    }
}

impl From<SymbolError> for Error {
    fn from(error: SymbolError) -> Self {
        Error::Symbol(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("a field name may only be set directly inside a struct")]
    FieldNameOutsideStruct,
    #[error("a value written inside a struct requires a field name")]
    MissingFieldName,
    #[error("the current value is not a container")]
    NotAContainer,
    #[error("the cursor is not inside a container")]
    NotInContainer,
    #[error("no current value to read; call next() first")]
    NoCurrentValue,
    #[error("requested {expected} but the current value is {found}")]
    TypeMismatch { expected: IonType, found: IonType },
    #[error("the current value is null")]
    NullValue,
    #[error("cannot finish with {0} unclosed container(s)")]
    UnclosedContainers(usize),
    #[error("the writer is already finished")]
    WriterFinished,
    #[error("the reader is closed")]
    ReaderClosed,
    #[error("a decimal cannot represent NaN or infinity")]
    NonFiniteDecimal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymbolError {
    #[error("symbol id {symbol_id} is greater than the table max_id {max_id}")]
    AboveMaxId { max_id: usize, symbol_id: usize },
    #[error("the text for symbol id {0} is unknown")]
    UnknownSymbolText(usize),
    #[error("symbol refers to unresolved import {name:?} (sid {sid} within the import)")]
    UnresolvedImport { name: String, sid: usize },
    #[error("the provided symbol table is invalid")]
    InvalidSymbolTable,
    #[error("invalid max_id for import in symbol table: {0}")]
    InvalidMaxId(String),
    #[error("symbol id is outside the numeric range: {0}")]
    SidTooLarge(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimestampError {
    #[error("{component} {value} is out of range")]
    ComponentRange {
        component: &'static str,
        value: i64,
    },
    #[error("day {day} does not exist in {year:04}-{month:02}")]
    DayOutOfRange { year: u16, month: u8, day: u8 },
    #[error("fractional seconds must have a negative exponent, got {0}")]
    FractionExponent(i32),
    #[error("fractional seconds must lie in [0, 1)")]
    FractionOutOfRange,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("{0}")]
    Binary(BinaryFormatError),
    #[error("{0}")]
    Text(TextFormatError),
}

impl From<BinaryFormatError> for FormatError {
    fn from(error: BinaryFormatError) -> Self {
        FormatError::Binary(error)
    }
}

impl From<TextFormatError> for FormatError {
    fn from(error: TextFormatError) -> Self {
        FormatError::Text(error)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BinaryFormatError {
    #[error("the type code 15 is reserved")]
    ReservedTypeCode,
    #[error("0xE0 must begin a four-byte version marker")]
    BadVersionMarker,
    #[error("unsupported Ion version {0}.{1}")]
    UnsupportedVersion(u8, u8),
    #[error("it is illegal for an annotation to wrap another annotation atomically")]
    AnnotatedAnnotation,
    #[error("it is illegal for an annotation to wrap a NOP pad")]
    AnnotatedPadding,
    #[error("annotation length code of {0} is not allowed")]
    AnnotationLength(u8),
    #[error("an annotation wrapper must end exactly where its value ends")]
    AnnotationShape,
    #[error("bool length code {0} is not allowed")]
    BoolLength(u8),
    #[error("floats may only be 0, 4, or 8 bytes long, length code {0} is not allowed")]
    FloatLength(u8),
    #[error("a timestamp must contain at least an offset and a year")]
    TimestampLength,
    #[error("strings must be encoded as UTF-8")]
    StringEncoding,
    #[error("a struct flagged as sorted cannot be empty")]
    StructEmpty,
    #[error("a struct flagged as sorted must have ascending field ids")]
    StructUnordered,
    #[error("a variable-length integer ran past {0} bytes")]
    VarIntTooLarge(usize),
    #[error("value runs past the end of its enclosing container")]
    ContainerOverrun,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextFormatError {
    #[error("syntax error: expected {0}")]
    Expected(&'static str),
    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),
    #[error("escaped code point {0:#x} is not a Unicode scalar value")]
    EscapedCodePoint(u32),
    #[error("unterminated quoted text")]
    UnterminatedQuote,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unable to decode base64 blob")]
    Base64Decode,
    #[error("unable to parse float value: {0}")]
    FloatParse(String),
    #[error("integers may not have leading zeros")]
    LeadingZero,
    #[error("misplaced digit separator")]
    DigitSeparator,
    #[error("unsupported Ion version {0}.{1}")]
    UnsupportedVersion(u32, u32),
    #[error("a numeric value must be followed by a delimiter")]
    UnterminatedNumeric,
    #[error("clobs may only contain ASCII text")]
    ClobEncoding,
    #[error("trailing data after value")]
    TrailingData,
}
