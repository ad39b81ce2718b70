//! Symbol ids and per-symbol metadata

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Parse state id
pub type StateId = u16;

/// Field id (index into the field name table)
pub type FieldId = u16;

/// A grammar symbol (terminal or non-terminal).
///
/// Id 0 is always the end-of-input terminal. [`Symbol::ERROR`] is reserved for
/// error nodes and never appears in the tables.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Symbol(pub u16);

impl Symbol {
    /// End of input
    pub const END: Symbol = Symbol(0);
    /// Error nodes synthesized during recovery
    pub const ERROR: Symbol = Symbol(u16::MAX);

    #[inline]
    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Metadata stored per symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: SmolStr,
    /// Hidden symbols are transparent when inspecting a tree
    pub visible: bool,
    /// Named symbols (as opposed to anonymous literal tokens like `"{"`)
    pub named: bool,
    /// Auxiliary repetition symbol of the form `R → R R | …`; such chains are
    /// rebalanced after parsing
    pub repeat: bool,
}

impl SymbolInfo {
    pub fn named(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            named: true,
            repeat: false,
        }
    }

    pub fn anonymous(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            named: false,
            repeat: false,
        }
    }

    pub fn hidden(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            visible: false,
            named: false,
            repeat: false,
        }
    }

    pub fn repeat(name: impl Into<SmolStr>) -> Self {
        Self {
            repeat: true,
            ..Self::hidden(name)
        }
    }
}

/// Lexer configuration of a parse state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LexMode {
    /// DFA start state
    pub lex_state: u16,
    /// Row of the external valid-token table; 0 means no external token is valid
    pub external_lex_state: u16,
}

impl LexMode {
    pub const fn new(lex_state: u16, external_lex_state: u16) -> Self {
        Self {
            lex_state,
            external_lex_state,
        }
    }
}

/// Associativity attached to a reduce action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Associativity {
    #[default]
    None,
    Left,
    Right,
}
