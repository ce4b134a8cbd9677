//! The Ion 1.0 binary encoding: type descriptors, variable-length fields,
//! and the streaming reader and writer built on them.
//!
//! A binary value is a one-octet type descriptor — a four-bit type code and
//! a four-bit length code — possibly followed by a VarUInt length, possibly
//! followed by a representation. Documentation throughout this module draws
//! on <https://amzn.github.io/ion-docs/docs/binary.html>.

mod reader;
mod subfield;
mod writer;

pub use self::reader::BinaryReader;
pub use self::writer::{BinaryWriter, BinaryWriterConfig};

use num_derive::FromPrimitive;

use crate::types::IonType;

/// The binary version marker for Ion 1.0: `E0 01 00 EA`. Appears at the
/// start of every stream and may reappear between top-level values, where it
/// resets the symbol table.
pub const BVM_1_0: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];

/// Length-code 14: the representation length follows as a VarUInt.
pub(crate) const LENGTH_CODE_VAR: u8 = 14;
/// Length-code 15: the value is the typed null.
pub(crate) const LENGTH_CODE_NULL: u8 = 15;

/// The high nibble of a type descriptor octet.
///
/// Other code relies via the FromPrimitive derivation on there being exactly
/// 16 variants in descriptor order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub(crate) enum TypeCode {
    Null = 0,
    Bool = 1,
    PosInt = 2,
    NegInt = 3,
    Float = 4,
    Decimal = 5,
    Timestamp = 6,
    Symbol = 7,
    String = 8,
    Clob = 9,
    Blob = 10,
    List = 11,
    Sexp = 12,
    Struct = 13,
    Annotation = 14,
    Reserved = 15,
}

impl TypeCode {
    pub(crate) fn ion_type(self) -> Option<IonType> {
        match self {
            TypeCode::Null => Some(IonType::Null),
            TypeCode::Bool => Some(IonType::Bool),
            TypeCode::PosInt | TypeCode::NegInt => Some(IonType::Int),
            TypeCode::Float => Some(IonType::Float),
            TypeCode::Decimal => Some(IonType::Decimal),
            TypeCode::Timestamp => Some(IonType::Timestamp),
            TypeCode::Symbol => Some(IonType::Symbol),
            TypeCode::String => Some(IonType::String),
            TypeCode::Clob => Some(IonType::Clob),
            TypeCode::Blob => Some(IonType::Blob),
            TypeCode::List => Some(IonType::List),
            TypeCode::Sexp => Some(IonType::Sexp),
            TypeCode::Struct => Some(IonType::Struct),
            TypeCode::Annotation | TypeCode::Reserved => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use num_traits::FromPrimitive;

    use super::*;

    #[test]
    fn type_code_covers_every_nibble() {
        for nibble in 0u8..=15 {
            assert!(TypeCode::from_u8(nibble).is_some());
        }
        assert_eq!(TypeCode::from_u8(15), Some(TypeCode::Reserved));
        assert_eq!(TypeCode::from_u8(16), None);
    }
}
