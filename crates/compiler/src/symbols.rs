//! Symbol tables.
//!
//! A table is an array of rows, each carrying a type bitset, a name and
//! an optional literal payload. Lookup deduplicates on (type, name) and,
//! for literal rows, on (type, value). Rows registered without a name —
//! compiler temporaries and literals — receive generated `_t<N>` names
//! with a per-table monotone counter.

use num_complex::Complex64;

use crate::token::Tok;

/// Symbol classification bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolType(u32);

impl SymbolType {
    pub const ANY: SymbolType = SymbolType(0);

    pub const VAR: SymbolType = SymbolType(1 << 0);
    pub const ARGIN: SymbolType = SymbolType(1 << 1);
    pub const ARGOUT: SymbolType = SymbolType(1 << 2);
    pub const FUNC: SymbolType = SymbolType(1 << 3);
    pub const CLASS: SymbolType = SymbolType(1 << 4);

    pub const INT: SymbolType = SymbolType(1 << 5);
    pub const FLOAT: SymbolType = SymbolType(1 << 6);
    pub const COMPLEX: SymbolType = SymbolType(1 << 7);
    pub const STRING: SymbolType = SymbolType(1 << 8);

    pub const GLOBAL: SymbolType = SymbolType(1 << 9);
    pub const STATIC: SymbolType = SymbolType(1 << 10);
    pub const TEMP: SymbolType = SymbolType(1 << 11);

    pub const LITERAL: SymbolType =
        SymbolType(Self::INT.0 | Self::FLOAT.0 | Self::COMPLEX.0 | Self::STRING.0);

    pub const TEMP_VAR: SymbolType = SymbolType(Self::TEMP.0 | Self::VAR.0);
    pub const GLOBAL_VAR: SymbolType = SymbolType(Self::GLOBAL.0 | Self::VAR.0);
    pub const STATIC_VAR: SymbolType = SymbolType(Self::STATIC.0 | Self::VAR.0);
    pub const GLOBAL_FUNC: SymbolType = SymbolType(Self::GLOBAL.0 | Self::FUNC.0);
    pub const GLOBAL_CLASS: SymbolType = SymbolType(Self::GLOBAL.0 | Self::CLASS.0);
    pub const GLOBAL_INT: SymbolType = SymbolType(Self::GLOBAL.0 | Self::INT.0);

    /// Whether any bit of `other` is set in `self`.
    pub fn has(self, other: SymbolType) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_any(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for SymbolType {
    type Output = SymbolType;

    fn bitor(self, rhs: SymbolType) -> SymbolType {
        SymbolType(self.0 | rhs.0)
    }
}

/// Literal payload of a symbol row.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SymbolData {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Complex(Complex64),
    Str(String),
}

impl SymbolData {
    /// Value-sensitive equality for literal dedup. Floats and the
    /// components of complex values compare bitwise.
    fn matches(&self, other: &SymbolData) -> bool {
        match (self, other) {
            (SymbolData::Int(a), SymbolData::Int(b)) => a == b,
            (SymbolData::Float(a), SymbolData::Float(b)) => a.to_bits() == b.to_bits(),
            (SymbolData::Complex(a), SymbolData::Complex(b)) => {
                a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits()
            }
            (SymbolData::Str(a), SymbolData::Str(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SymbolData::None)
    }

    /// Symbol type bit carried by this payload's literal class.
    pub fn literal_type(tok: Tok) -> Option<SymbolType> {
        match tok {
            Tok::Int => Some(SymbolType::INT),
            Tok::Float => Some(SymbolType::FLOAT),
            Tok::Complex => Some(SymbolType::COMPLEX),
            Tok::Str => Some(SymbolType::STRING),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub ty: SymbolType,
    pub name: String,
    pub data: SymbolData,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    rows: Vec<Symbol>,
    temps: usize,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> &Symbol {
        &self.rows[index]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.rows[index].name
    }

    pub fn rows(&self) -> impl Iterator<Item = &Symbol> {
        self.rows.iter()
    }

    /// Look up a symbol. Literal payloads search by value within the
    /// requested type class; named lookups match on name plus type
    /// overlap (or any type for `SymbolType::ANY`).
    pub fn find(
        &self,
        stype: SymbolType,
        name: Option<&str>,
        data: Option<&SymbolData>,
    ) -> Option<usize> {
        if stype.has(SymbolType::LITERAL) {
            if let Some(data) = data {
                return self
                    .rows
                    .iter()
                    .position(|row| row.ty.has(stype) && row.data.matches(data));
            }
        }

        let name = name?;
        self.rows
            .iter()
            .position(|row| (stype.is_any() || row.ty.has(stype)) && row.name == name)
    }

    /// Register a symbol, returning the index of the new or pre-existing
    /// row. Anonymous rows (temporaries, literals) get `_t<N>` names.
    pub fn add(&mut self, stype: SymbolType, name: Option<&str>, data: SymbolData) -> usize {
        let payload = if data.is_none() { None } else { Some(&data) };
        if let Some(index) = self.find(stype, name, payload) {
            return index;
        }

        let name = match name {
            Some(name) if !stype.has(SymbolType::TEMP) => name.to_owned(),
            _ => {
                let generated = format!("_t{}", self.temps);
                self.temps += 1;
                generated
            }
        };

        self.rows.push(Symbol { ty: stype, name, data });
        self.rows.len() - 1
    }
}
