use std::collections::HashMap;

use lazy_static::lazy_static;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::SymbolError;
use crate::symbols::{ImportLocation, SymbolToken, ION_SYMBOL_TABLE, SYSTEM_SYMBOLS};
use crate::value::{Data, List, Struct};

/// The symbol table of a single stream: the fixed system slots, then any
/// imported slots, then local slots appended by the stream or by a writer.
///
/// Slots are indexed from 1; sid 0 is reserved for the unresolvable symbol
/// `$0` and never occupies a slot. Sids are never recycled within a stream.
/// Text-to-sid resolution returns the lowest sid carrying that text, so
/// system symbols can never be shadowed.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolTable {
    slots: Vec<Slot>,
    by_text: HashMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq)]
enum Slot {
    Text(String),
    /// A slot belonging to an import we could not resolve.
    Import(ImportLocation),
    /// A null or non-string entry in a `symbols` list; equivalent to `$0`.
    Null,
}

lazy_static! {
    static ref SYSTEM_TABLE: SymbolTable = {
        let mut table = SymbolTable {
            slots: Vec::with_capacity(SYSTEM_SYMBOLS.len()),
            by_text: HashMap::new(),
        };
        for text in SYSTEM_SYMBOLS.iter() {
            table.push_text(text.to_string());
        }
        table
    };
}

impl SymbolTable {
    /// A fresh table holding only the system symbols.
    pub fn system() -> Self {
        SYSTEM_TABLE.clone()
    }

    /// The highest assigned sid.
    pub fn max_id(&self) -> usize {
        self.slots.len()
    }

    pub fn is_system(&self) -> bool {
        self.slots.len() == SYSTEM_SYMBOLS.len()
    }

    fn push_text(&mut self, text: String) -> usize {
        self.slots.push(Slot::Text(text.clone()));
        let sid = self.slots.len();
        // Lowest sid wins for text lookups.
        self.by_text.entry(text).or_insert(sid);
        sid
    }

    /// Returns the sid already carrying this text, or appends a new local
    /// slot. Writer-side interning.
    pub fn intern(&mut self, text: &str) -> usize {
        match self.by_text.get(text) {
            Some(sid) => *sid,
            None => self.push_text(text.to_string()),
        }
    }

    pub fn sid_for(&self, text: &str) -> Option<usize> {
        self.by_text.get(text).copied()
    }

    /// Reader-side resolution of a sid to a token. Sid 0 resolves to the
    /// symbol zero; sids past `max_id` are errors.
    pub fn lookup(&self, sid: usize) -> Result<SymbolToken, SymbolError> {
        if sid == 0 {
            return Ok(SymbolToken::Zero);
        }
        match self.slots.get(sid - 1) {
            Some(Slot::Text(text)) => Ok(SymbolToken::Known { text: text.clone() }),
            Some(Slot::Import(location)) => Ok(SymbolToken::Unknown {
                import_location: location.clone(),
            }),
            Some(Slot::Null) => Ok(SymbolToken::Zero),
            None => Err(SymbolError::AboveMaxId {
                max_id: self.max_id(),
                symbol_id: sid,
            }),
        }
    }

    /// Forget everything but the system symbols. Performed on every IVM.
    pub fn reset(&mut self) {
        *self = SymbolTable::system();
    }

    /// Texts of the slots past the system range, in sid order, as a writer
    /// must declare them in a local symbol table struct. Unresolvable slots
    /// surface as `None`.
    pub(crate) fn exported_symbols(&self) -> impl Iterator<Item = Option<&str>> {
        self.slots[SYSTEM_SYMBOLS.len()..].iter().map(|slot| match slot {
            Slot::Text(text) => Some(text.as_str()),
            Slot::Import(_) | Slot::Null => None,
        })
    }

    /// Interprets a top-level struct annotated with `$ion_symbol_table`.
    ///
    /// The `imports` field selects the base: the symbol `$ion_symbol_table`
    /// keeps the current table (append semantics); a list of import
    /// descriptors, or an absent field, resets to the system table first
    /// (with the descriptors' slots allocated in order). The `symbols` field
    /// then contributes local slots in order; entries that are not strings
    /// occupy a slot but resolve like `$0`.
    pub fn process_local_table(&mut self, table: &Struct) -> Result<(), SymbolError> {
        enum Base {
            Append,
            Reset(Vec<Struct>),
        }

        let base = match table.get("imports").map(|value| &value.data) {
            Some(Data::Symbol(Some(token))) if token.text() == Some(ION_SYMBOL_TABLE) => {
                Base::Append
            }
            Some(Data::List(Some(List { values }))) => Base::Reset(
                values
                    .iter()
                    // each element must be a struct; elements that are null
                    // or not structs are ignored
                    .filter_map(|value| match &value.data {
                        Data::Struct(Some(import)) => Some(import.clone()),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => Base::Reset(vec![]),
        };

        let symbols: Vec<Slot> = match table.get("symbols").map(|value| &value.data) {
            Some(Data::List(Some(List { values }))) => values
                .iter()
                .map(|value| match &value.data {
                    Data::String(Some(text)) => Slot::Text(text.clone()),
                    _ => Slot::Null,
                })
                .collect(),
            // missing or of any other type: treated as an empty list
            _ => vec![],
        };

        match base {
            Base::Append => {}
            Base::Reset(imports) => {
                self.reset();
                for import in &imports {
                    self.allocate_import(import)?;
                }
            }
        }

        for slot in symbols {
            if let Slot::Text(text) = &slot {
                // keep the lowest-sid mapping intact for repeated text
                let sid = self.slots.len() + 1;
                self.by_text.entry(text.clone()).or_insert(sid);
            }
            self.slots.push(slot);
        }

        Ok(())
    }

    /// Allocates `max_id` slots for one import descriptor. Without a catalog
    /// the texts are unknowable, so the slots carry their import location.
    fn allocate_import(&mut self, import: &Struct) -> Result<(), SymbolError> {
        let name = match import.get("name").map(|value| &value.data) {
            Some(Data::String(Some(name))) if !name.is_empty() && name != "$ion" => name.clone(),
            // unusable name: the import clause is ignored
            _ => return Ok(()),
        };

        let max_id = match import.get("max_id").map(|value| &value.data) {
            Some(Data::Int(Some(value))) => {
                if value < &BigInt::from(0) {
                    return Err(SymbolError::InvalidMaxId(value.to_string()));
                }
                value
                    .to_usize()
                    .ok_or_else(|| SymbolError::InvalidMaxId(value.to_string()))?
            }
            // Without a catalog to consult, an import with no usable max_id
            // cannot be sized and processing must halt.
            _ => return Err(SymbolError::InvalidMaxId("undefined".to_string())),
        };

        for position in 1..=max_id {
            self.slots.push(Slot::Import(ImportLocation {
                name: name.clone(),
                sid: position,
            }));
        }
        Ok(())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::system()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::value::Value;

    fn lst(fields: Vec<(&str, Data)>) -> Struct {
        Struct {
            fields: fields
                .into_iter()
                .map(|(name, data)| (SymbolToken::known(name), Value::from(data)))
                .collect(),
        }
    }

    fn string_list(texts: &[&str]) -> Data {
        Data::List(Some(List {
            values: texts.iter().map(|text| Value::from(*text)).collect(),
        }))
    }

    #[test]
    fn system_table_resolves_fixed_sids() {
        let table = SymbolTable::system();
        assert_eq!(table.max_id(), 9);
        assert_eq!(table.lookup(0).unwrap(), SymbolToken::Zero);
        assert_eq!(table.lookup(1).unwrap(), SymbolToken::known("$ion"));
        assert_eq!(table.lookup(4).unwrap(), SymbolToken::known("name"));
        assert_eq!(
            table.lookup(10),
            Err(SymbolError::AboveMaxId {
                max_id: 9,
                symbol_id: 10
            })
        );
    }

    #[test]
    fn intern_reuses_lowest_sid() {
        let mut table = SymbolTable::system();
        assert_eq!(table.intern("name"), 4);
        let sid = table.intern("fresh");
        assert_eq!(sid, 10);
        assert_eq!(table.intern("fresh"), 10);
        assert_eq!(table.max_id(), 10);
    }

    #[test]
    fn absent_imports_resets() {
        let mut table = SymbolTable::system();
        table.intern("stale");
        table
            .process_local_table(&lst(vec![("symbols", string_list(&["fresh"]))]))
            .unwrap();
        assert_eq!(table.max_id(), 10);
        assert_eq!(table.lookup(10).unwrap(), SymbolToken::known("fresh"));
        assert_eq!(table.sid_for("stale"), None);
    }

    #[test]
    fn symbol_table_import_appends() {
        let mut table = SymbolTable::system();
        table
            .process_local_table(&lst(vec![("symbols", string_list(&["one"]))]))
            .unwrap();
        table
            .process_local_table(&lst(vec![
                (
                    "imports",
                    Data::Symbol(Some(SymbolToken::known(ION_SYMBOL_TABLE))),
                ),
                ("symbols", string_list(&["two"])),
            ]))
            .unwrap();
        assert_eq!(table.lookup(10).unwrap(), SymbolToken::known("one"));
        assert_eq!(table.lookup(11).unwrap(), SymbolToken::known("two"));
    }

    #[test]
    fn non_string_symbols_occupy_unresolvable_slots() {
        let mut table = SymbolTable::system();
        let symbols = Data::List(Some(List {
            values: vec![
                Value::from("a"),
                Value::from(Data::Int(Some(BigInt::from(7)))),
                Value::from("b"),
            ],
        }));
        table
            .process_local_table(&lst(vec![("symbols", symbols)]))
            .unwrap();
        assert_eq!(table.lookup(10).unwrap(), SymbolToken::known("a"));
        assert_eq!(table.lookup(11).unwrap(), SymbolToken::Zero);
        assert_eq!(table.lookup(12).unwrap(), SymbolToken::known("b"));
    }

    #[test]
    fn imports_allocate_placeholder_slots() {
        let mut table = SymbolTable::system();
        let import = Data::Struct(Some(lst(vec![
            ("name", Data::from("shared.table")),
            ("max_id", Data::from(2i64)),
        ])));
        table
            .process_local_table(&lst(vec![
                ("imports", Data::List(Some(List {
                    values: vec![Value::from(import)],
                }))),
                ("symbols", string_list(&["local"])),
            ]))
            .unwrap();
        assert_eq!(
            table.lookup(10).unwrap(),
            SymbolToken::Unknown {
                import_location: ImportLocation {
                    name: "shared.table".to_string(),
                    sid: 1
                }
            }
        );
        assert_eq!(table.lookup(12).unwrap(), SymbolToken::known("local"));
    }
}
