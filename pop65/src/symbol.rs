//! Symbol table for labels and constants

use std::collections::HashMap;

use crate::error::{AsmError, ErrorKind, Result};

/// Which traversal of the source is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolOrigin {
    Label,
    /// `name = e` or `name .equ e`
    Assignment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: u16,
    pub origin: SymbolOrigin,
    seen_in_pass2: bool,
}

/// Symbols accumulate across both passes and are never removed. Pass 2
/// re-defines every symbol and checks it against the pass 1 value.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    order: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.order.clear();
    }

    pub fn define(&mut self, name: &str, value: u16, origin: SymbolOrigin, pass: Pass) -> Result<()> {
        match pass {
            Pass::One => {
                if self.symbols.contains_key(name) {
                    return Err(AsmError::new(
                        ErrorKind::DuplicateSymbol,
                        format!("'{}' is already defined", name),
                    ));
                }
                self.symbols.insert(
                    name.to_string(),
                    Symbol {
                        name: name.to_string(),
                        value,
                        origin,
                        seen_in_pass2: false,
                    },
                );
                self.order.push(name.to_string());
                Ok(())
            }
            Pass::Two => {
                let Some(sym) = self.symbols.get_mut(name) else {
                    return Err(AsmError::new(
                        ErrorKind::Phase,
                        format!("'{}' was not defined in pass 1", name),
                    ));
                };
                if sym.seen_in_pass2 {
                    return Err(AsmError::new(
                        ErrorKind::DuplicateSymbol,
                        format!("'{}' is already defined", name),
                    ));
                }
                if sym.value != value {
                    return Err(AsmError::new(
                        ErrorKind::Phase,
                        format!(
                            "'{}' changed from ${:04X} in pass 1 to ${:04X}",
                            name, sym.value, value
                        ),
                    ));
                }
                sym.seen_in_pass2 = true;
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn lookup(&self, name: &str) -> Result<u16> {
        self.symbols
            .get(name)
            .map(|sym| sym.value)
            .ok_or_else(|| AsmError::new(ErrorKind::UndefinedSymbol, format!("'{}'", name)))
    }

    /// Whether `name` has been defined so far in the given pass, i.e. is not
    /// a forward reference.
    pub fn is_defined_in(&self, name: &str, pass: Pass) -> bool {
        match (self.symbols.get(name), pass) {
            (Some(_), Pass::One) => true,
            (Some(sym), Pass::Two) => sym.seen_in_pass2,
            (None, _) => false,
        }
    }

    /// A pass 1 symbol that pass 2 never reached, if any.
    pub fn first_missing_in_pass2(&self) -> Option<&Symbol> {
        self.iter().find(|sym| !sym.seen_in_pass2)
    }

    /// All symbols in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter().filter_map(|name| self.symbols.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let mut symbols = SymbolTable::new();
        symbols.define("start", 0x8000, SymbolOrigin::Label, Pass::One).unwrap();
        assert_eq!(symbols.lookup("start").unwrap(), 0x8000);
        assert_eq!(
            symbols.lookup("Start").unwrap_err().kind(),
            ErrorKind::UndefinedSymbol
        );
    }

    #[test]
    fn test_duplicate_in_pass1() {
        let mut symbols = SymbolTable::new();
        symbols.define("a", 1, SymbolOrigin::Assignment, Pass::One).unwrap();
        let err = symbols.define("a", 1, SymbolOrigin::Label, Pass::One).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateSymbol);
    }

    #[test]
    fn test_pass2_checks() {
        let mut symbols = SymbolTable::new();
        symbols.define("a", 1, SymbolOrigin::Label, Pass::One).unwrap();
        symbols.define("b", 2, SymbolOrigin::Label, Pass::One).unwrap();

        assert!(!symbols.is_defined_in("a", Pass::Two));
        symbols.define("a", 1, SymbolOrigin::Label, Pass::Two).unwrap();
        assert!(symbols.is_defined_in("a", Pass::Two));

        let err = symbols.define("a", 1, SymbolOrigin::Label, Pass::Two).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateSymbol);

        let err = symbols.define("b", 3, SymbolOrigin::Label, Pass::Two).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);

        let err = symbols.define("c", 3, SymbolOrigin::Label, Pass::Two).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);

        assert_eq!(symbols.first_missing_in_pass2().map(|s| s.name.as_str()), Some("b"));
    }

    #[test]
    fn test_iter_in_definition_order() {
        let mut symbols = SymbolTable::new();
        for (i, name) in ["z", "m", "a"].iter().enumerate() {
            symbols.define(name, i as u16, SymbolOrigin::Assignment, Pass::One).unwrap();
        }
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["z", "m", "a"]);
        assert_eq!(symbols.len(), 3);
    }
}
