use std::fmt;

/// symbol - Interned, Unicode symbolic atoms (aka identifiers).
///
/// A symbol token is a pair of (text, symbol id) where either side may be
/// absent, but not both. Tokens with known text are equivalent by text alone.
/// A token with no text and no import location is the special symbol zero
/// (`$0`), which denotes unknown text in any symbol table and is equivalent
/// only to other symbol-zero tokens. A token with no text but a resolvable
/// import location arises when a shared table declared by the stream is not
/// available; such tokens compare by their import location.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolToken {
    Known { text: String },
    Unknown { import_location: ImportLocation },
    Zero,
}

impl SymbolToken {
    pub fn known(text: impl Into<String>) -> Self {
        SymbolToken::Known { text: text.into() }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            SymbolToken::Known { text } => Some(text),
            SymbolToken::Unknown { .. } | SymbolToken::Zero => None,
        }
    }
}

impl From<&str> for SymbolToken {
    fn from(text: &str) -> Self {
        SymbolToken::known(text)
    }
}

impl fmt::Display for SymbolToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolToken::Known { text } => f.write_str(text),
            SymbolToken::Unknown { import_location } => {
                write!(f, "{}#{}", import_location.name, import_location.sid)
            }
            SymbolToken::Zero => f.write_str("$0"),
        }
    }
}

/// The position of a symbol within a named shared-table import, used to give
/// identity to symbols whose text cannot be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImportLocation {
    pub name: String,
    /// One-based position within the imported table.
    pub sid: usize,
}

/// The Ion 1.0 system symbols, occupying sids 1 through 9 of every stream.
pub const SYSTEM_SYMBOLS: [&str; 9] = [
    "$ion",
    "$ion_1_0",
    "$ion_symbol_table",
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    "$ion_shared_symbol_table",
];

pub const SYSTEM_MAX_ID: usize = SYSTEM_SYMBOLS.len();

/// Well-known sids within the system table.
pub(crate) mod system_sid {
    pub const ION_SYMBOL_TABLE: usize = 3;
    pub const SYMBOLS: usize = 7;
}

pub(crate) const ION_SYMBOL_TABLE: &str = "$ion_symbol_table";
pub(crate) const ION_1_0: &str = "$ion_1_0";
