//! Sorted symbol table. Category is kept as the raw numeric code the
//! expression evaluator bit-tests against (see `expr::scan_label`), rather
//! than an enum, since several rules key off `cat & 14` / `cat & 1` directly.

/// Symbol categories, numbered exactly as the reference assembler's
/// `symrecord.cat` field.
pub mod cat {
    pub const CONSTANT: u8 = 0;
    pub const VARIABLE: u8 = 1;
    pub const ADDRESS: u8 = 2;
    pub const VARIABLE_ADDRESS: u8 = 3;
    pub const EXTERN: u8 = 4;
    pub const VARIABLE_EXTERN: u8 = 5;
    pub const UNRESOLVED: u8 = 6;
    pub const VARIABLE_UNRESOLVED: u8 = 7;
    pub const PUBLIC: u8 = 8;
    pub const MACRO: u8 = 9;
    pub const PUBLIC_UNDEFINED: u8 = 10;
    pub const PARAMETER: u8 = 11;
    pub const LOCAL: u8 = 12;
    pub const EMPTY: u8 = 13;
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub cat: u8,
    pub value: u16,
}

/// Symbols kept sorted by name; duplicate insertions return the existing
/// entry rather than creating a second one.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a symbol by name, inserting an `EMPTY` placeholder if absent.
    pub fn find_or_insert(&mut self, name: &str) -> usize {
        match self.symbols.binary_search_by(|s| s.name.as_str().cmp(name)) {
            Ok(idx) => idx,
            Err(idx) => {
                self.symbols.insert(idx, Symbol { name: name.to_string(), cat: cat::EMPTY, value: 0 });
                idx
            }
        }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.symbols.binary_search_by(|s| s.name.as_str().cmp(name)).ok()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> &Symbol {
        &self.symbols[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Symbol {
        &mut self.symbols[idx]
    }

    /// All defined (non-`EMPTY`) symbols, for a symbol table listing.
    pub fn defined(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.cat != cat::EMPTY)
    }
}
