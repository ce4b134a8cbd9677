//! A streaming reader/writer pair for the Amazon Ion data format.
//!
//! Ion is a richly-typed, self-describing serialization format with two
//! isomorphic encodings: a human-readable text form and a compact binary
//! form. This crate implements the core codec for Ion 1.0: cursor-style
//! readers and writers for both encodings, symbol-table management, and
//! exact-precision numerics (arbitrary-magnitude integers, decimals that
//! preserve their coefficient digits, timestamps with declared precision
//! and local offsets).
//!
//! Readers are driven by pulling typed events ([`StreamItem`]) and entering
//! containers explicitly; writers are driven symmetrically. The tree model
//! ([`Value`]) sits on top via [`load`] and [`dump`].
//!
//! ```
//! use ion_codec::{dump, load, BinaryWriter, IonWriter, TextReader};
//!
//! let mut reader = TextReader::new("{greeting: \"hello\", audience: world}");
//! let values = load(&mut reader).unwrap();
//!
//! let mut writer = BinaryWriter::new();
//! dump(&values, &mut writer).unwrap();
//! writer.finish().unwrap();
//! assert_eq!(&writer.bytes()[..4], &[0xE0, 0x01, 0x00, 0xEA]);
//! ```

pub mod binary;
mod error;
mod stream;
mod symbol_table;
mod symbols;
pub mod text;
mod tree;
pub mod types;
mod value;

pub use crate::binary::{BinaryReader, BinaryWriter, BinaryWriterConfig};
pub use crate::error::{
    ArgumentError, BinaryFormatError, Error, FormatError, Result, SymbolError, TextFormatError,
    TimestampError,
};
pub use crate::stream::{IonReader, IonWriter, StreamItem};
pub use crate::symbol_table::SymbolTable;
pub use crate::symbols::{ImportLocation, SymbolToken, SYSTEM_MAX_ID, SYSTEM_SYMBOLS};
pub use crate::text::{TextReader, TextWriter, TextWriterConfig};
pub use crate::tree::{dump, load};
pub use crate::types::{Decimal, IonType, Precision, Timestamp};
pub use crate::value::{Blob, Clob, Data, List, Sexp, Struct, Value};

#[cfg(test)]
mod tests;
