use std::fmt;

use num_bigint::BigInt;

use crate::symbols::SymbolToken;
use crate::text::{TextWriter, TextWriterConfig};
use crate::types::{Decimal, IonType, Timestamp};

/// An element of the Ion data model: a datum plus its annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub data: Data,
    // Annotations are denoted by non-null symbol tokens in the text format,
    // and the two formats are semantically isomorphic, so this is a
    // Vec<SymbolToken> rather than a Vec<Option<SymbolToken>>.
    pub annotations: Vec<SymbolToken>,
}

impl Value {
    pub fn new(data: Data, annotations: Vec<SymbolToken>) -> Self {
        Value { data, annotations }
    }

    pub fn ion_type(&self) -> IonType {
        self.data.ion_type()
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Self {
        Value {
            data,
            annotations: vec![],
        }
    }
}

/// The datum of a value, one variant per Ion type.
///
/// Rather than giving each type its own null variant, nullable types (every
/// type other than null itself) are represented with an Option, the typed
/// null being `None`. This keeps null-handling out of the way when the
/// element is known to be non-null.
#[derive(Clone, Debug)]
pub enum Data {
    // null - A generic null value
    Null,
    // bool - Boolean values
    Bool(Option<bool>),
    // int - Signed integers of arbitrary size
    Int(Option<BigInt>),
    // float - Binary-encoded floating point numbers (IEEE 64-bit)
    Float(Option<f64>),
    // decimal - Decimal-encoded real numbers of arbitrary precision
    Decimal(Option<Decimal>),
    // timestamp - Date/time/timezone moments of arbitrary precision
    Timestamp(Option<Timestamp>),
    // string - Unicode text literals
    String(Option<String>),
    // symbol - Interned, Unicode symbolic atoms (aka identifiers)
    Symbol(Option<SymbolToken>),
    // clob - Text data of user-defined encoding
    Clob(Option<Clob>),
    // blob - Binary data of user-defined encoding
    Blob(Option<Blob>),
    // list - Ordered collections of values
    List(Option<List>),
    // sexp - Ordered collections of values with application-defined semantics
    Sexp(Option<Sexp>),
    // struct - Collections of values with user-defined field names
    Struct(Option<Struct>),
}

impl Data {
    pub fn ion_type(&self) -> IonType {
        match self {
            Data::Null => IonType::Null,
            Data::Bool(_) => IonType::Bool,
            Data::Int(_) => IonType::Int,
            Data::Float(_) => IonType::Float,
            Data::Decimal(_) => IonType::Decimal,
            Data::Timestamp(_) => IonType::Timestamp,
            Data::String(_) => IonType::String,
            Data::Symbol(_) => IonType::Symbol,
            Data::Clob(_) => IonType::Clob,
            Data::Blob(_) => IonType::Blob,
            Data::List(_) => IonType::List,
            Data::Sexp(_) => IonType::Sexp,
            Data::Struct(_) => IonType::Struct,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Data::Null => true,
            Data::Bool(v) => v.is_none(),
            Data::Int(v) => v.is_none(),
            Data::Float(v) => v.is_none(),
            Data::Decimal(v) => v.is_none(),
            Data::Timestamp(v) => v.is_none(),
            Data::String(v) => v.is_none(),
            Data::Symbol(v) => v.is_none(),
            Data::Clob(v) => v.is_none(),
            Data::Blob(v) => v.is_none(),
            Data::List(v) => v.is_none(),
            Data::Sexp(v) => v.is_none(),
            Data::Struct(v) => v.is_none(),
        }
    }

    /// The typed null of the given type.
    pub fn null_of(ion_type: IonType) -> Data {
        match ion_type {
            IonType::Null => Data::Null,
            IonType::Bool => Data::Bool(None),
            IonType::Int => Data::Int(None),
            IonType::Float => Data::Float(None),
            IonType::Decimal => Data::Decimal(None),
            IonType::Timestamp => Data::Timestamp(None),
            IonType::String => Data::String(None),
            IonType::Symbol => Data::Symbol(None),
            IonType::Clob => Data::Clob(None),
            IonType::Blob => Data::Blob(None),
            IonType::List => Data::List(None),
            IonType::Sexp => Data::Sexp(None),
            IonType::Struct => Data::Struct(None),
        }
    }
}

/// Structural, precision-exact equality. Floats compare by bit pattern so
/// that NaN equals itself and `0e0` differs from `-0e0`; everything else is
/// field-for-field.
impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Data::Null, Data::Null) => true,
            (Data::Bool(a), Data::Bool(b)) => a == b,
            (Data::Int(a), Data::Int(b)) => a == b,
            (Data::Float(a), Data::Float(b)) => match (a, b) {
                (Some(a), Some(b)) => a.to_bits() == b.to_bits(),
                (None, None) => true,
                _ => false,
            },
            (Data::Decimal(a), Data::Decimal(b)) => a == b,
            (Data::Timestamp(a), Data::Timestamp(b)) => a == b,
            (Data::String(a), Data::String(b)) => a == b,
            (Data::Symbol(a), Data::Symbol(b)) => a == b,
            (Data::Clob(a), Data::Clob(b)) => a == b,
            (Data::Blob(a), Data::Blob(b)) => a == b,
            (Data::List(a), Data::List(b)) => a == b,
            (Data::Sexp(a), Data::Sexp(b)) => a == b,
            (Data::Struct(a), Data::Struct(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! data_promotions {
    ($($native:ty => $variant:expr,)*) => {
        $(
            impl From<$native> for Data {
                fn from(value: $native) -> Self {
                    $variant(Some(value))
                }
            }

            impl From<$native> for Value {
                fn from(value: $native) -> Self {
                    Value::from($variant(Some(value)))
                }
            }
        )*
    };
}

data_promotions! {
    bool => Data::Bool,
    BigInt => Data::Int,
    f64 => Data::Float,
    Decimal => Data::Decimal,
    Timestamp => Data::Timestamp,
    String => Data::String,
    SymbolToken => Data::Symbol,
    Clob => Data::Clob,
    Blob => Data::Blob,
    List => Data::List,
    Sexp => Data::Sexp,
    Struct => Data::Struct,
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Data::Int(Some(BigInt::from(value)))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::from(Data::from(value))
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::String(Some(value.to_owned()))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::from(Data::from(value))
    }
}

/// The compact text form of the value, without a version marker.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = TextWriter::with_config(TextWriterConfig {
            pretty: false,
            include_ivm: false,
        });
        // unresolvable sid-only symbols have no text form
        crate::tree::write_value(self, &mut writer).map_err(|_| fmt::Error)?;
        f.write_str(writer.output())
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Value::from(self.clone()).fmt(f)
    }
}

// blob - Binary data of user-defined encoding
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    pub data: Vec<u8>,
}

// clob - Text data of user-defined encoding
#[derive(Clone, Debug, PartialEq)]
pub struct Clob {
    pub data: Vec<u8>,
}

// list - Ordered collections of values
#[derive(Clone, Debug, PartialEq, Default)]
pub struct List {
    pub values: Vec<Value>,
}

// sexp - Ordered collections of values with application-defined semantics
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Sexp {
    pub values: Vec<Value>,
}

// struct - Collections of values with user-defined field names.
// When two fields in the same struct have the same name we say they are
// "repeated fields". Repeated fields are preserved in order, so this is a
// Vec of pairs rather than a map.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Struct {
    pub fields: Vec<(SymbolToken, Value)>,
}

impl Struct {
    /// The value of the first field with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(token, _)| token.text() == Some(name))
            .map(|(_, value)| value)
    }
}

impl IntoIterator for List {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl IntoIterator for Sexp {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
