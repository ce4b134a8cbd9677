use num_bigint::BigInt;

use crate::error::Result;
use crate::symbols::SymbolToken;
use crate::types::{Decimal, IonType, Timestamp};

/// What a reader's cursor is positioned over after a call to `next()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamItem {
    /// An Ion version marker. The symbol table has been reset.
    VersionMarker,
    /// A non-null scalar of the given type; a typed accessor may be called.
    Value(IonType),
    /// A null of the given type.
    Null(IonType),
    /// A non-null container; `step_in` descends into it.
    ContainerStart(IonType),
    /// The end of the container entered by the matching `step_in`.
    EndOfContainer,
    /// The end of the top-level value stream.
    EndOfStream,
}

/// A streaming Ion reader: a single cursor positioned between values,
/// advanced with `next()` and moved through containers with `step_in` /
/// `step_out`.
///
/// Typed accessors are valid only between a `next()` that reported a
/// matching `Value(_)` and the following `next()`/`step_in`/`step_out`.
/// Readers are single-threaded; after a `Malformed`, `UnexpectedEof`, or
/// `Io` error the reader is permanently failed and returns that error from
/// every subsequent operation.
pub trait IonReader {
    /// Advances past the current value to the next event, without entering
    /// containers.
    fn next(&mut self) -> Result<StreamItem>;

    /// Positions the cursor before the first child of the current container.
    fn step_in(&mut self) -> Result<()>;

    /// Abandons the current container, discarding any unread children.
    fn step_out(&mut self) -> Result<()>;

    /// How many containers the cursor is nested within.
    fn depth(&self) -> usize;

    /// The type of the current value, if the cursor is on one.
    fn ion_type(&self) -> Option<IonType>;

    fn is_null(&self) -> bool;

    /// The field name of the current value, when directly inside a struct.
    fn field_name(&self) -> Result<Option<SymbolToken>>;

    /// The annotations of the current value, outermost first.
    fn annotations(&self) -> Result<Vec<SymbolToken>>;

    fn read_bool(&mut self) -> Result<bool>;

    /// The current int, failing with `Overflow` when it does not fit.
    fn read_i64(&mut self) -> Result<i64>;

    fn read_int(&mut self) -> Result<BigInt>;

    fn read_f64(&mut self) -> Result<f64>;

    fn read_decimal(&mut self) -> Result<Decimal>;

    fn read_timestamp(&mut self) -> Result<Timestamp>;

    fn read_symbol(&mut self) -> Result<SymbolToken>;

    fn read_string(&mut self) -> Result<String>;

    fn read_clob(&mut self) -> Result<Vec<u8>>;

    fn read_blob(&mut self) -> Result<Vec<u8>>;

    /// Releases the reader's input. Every later operation fails.
    fn close(&mut self) -> Result<()>;
}

/// A streaming Ion writer, driven symmetrically to [`IonReader`]:
/// `set_field_name`/`add_annotation` apply to the next value written, and
/// containers are opened and closed explicitly.
///
/// `finish` seals the stream, flushing any pending container back-patches
/// and emitting the version marker (and, for binary, the local symbol
/// table) if not yet emitted.
pub trait IonWriter {
    /// The null of the given type (`IonType::Null` for plain `null`).
    fn write_null(&mut self, ion_type: IonType) -> Result<()>;

    fn write_bool(&mut self, value: bool) -> Result<()>;

    fn write_i64(&mut self, value: i64) -> Result<()>;

    fn write_int(&mut self, value: &BigInt) -> Result<()>;

    fn write_f64(&mut self, value: f64) -> Result<()>;

    fn write_decimal(&mut self, value: &Decimal) -> Result<()>;

    fn write_timestamp(&mut self, value: &Timestamp) -> Result<()>;

    fn write_symbol(&mut self, value: &SymbolToken) -> Result<()>;

    fn write_string(&mut self, value: &str) -> Result<()>;

    fn write_clob(&mut self, value: &[u8]) -> Result<()>;

    fn write_blob(&mut self, value: &[u8]) -> Result<()>;

    fn start_container(&mut self, ion_type: IonType) -> Result<()>;

    fn end_container(&mut self) -> Result<()>;

    /// Names the next value written. Valid only directly inside a struct.
    fn set_field_name(&mut self, name: SymbolToken) -> Result<()>;

    /// Queues an annotation for the next value written.
    fn add_annotation(&mut self, annotation: SymbolToken) -> Result<()>;

    fn finish(&mut self) -> Result<()>;

    /// Seals the stream (finishing it first if needed) and releases the
    /// sink. Every later operation fails.
    fn close(&mut self) -> Result<()>;
}
