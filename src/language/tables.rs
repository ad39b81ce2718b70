//! Compiled grammar tables
//!
//! The tables are produced offline by a grammar compiler and loaded read-only.
//! Lookups are binary searches over per-state sorted entry lists, the same
//! layout tree-sitter uses for its "small" parse states.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::error::LoadError;
use super::symbol::{Associativity, FieldId, LexMode, StateId, Symbol, SymbolInfo};

/// One parse table action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseAction {
    Shift {
        state: StateId,
        precedence: i16,
    },
    /// Shift the token as an extra (whitespace, comment) without changing state
    ShiftExtra,
    Reduce {
        symbol: Symbol,
        child_count: u8,
        production_id: u16,
        precedence: i16,
        associativity: Associativity,
    },
    Accept,
}

/// Actions and gotos of a single parse state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStateTable {
    /// Terminal → actions, sorted by symbol
    pub actions: Vec<(Symbol, Vec<ParseAction>)>,
    /// Non-terminal → next state, sorted by symbol
    pub gotos: Vec<(Symbol, StateId)>,
}

/// Inclusive character range transition of the lexer DFA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
    pub start: u32,
    pub end: u32,
    pub next: u16,
}

impl CharRange {
    #[inline]
    pub fn contains(&self, c: char) -> bool {
        let c = c as u32;
        self.start <= c && c <= self.end
    }
}

/// A lexer DFA state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexState {
    /// Symbols accepted in this state, in rule declaration order
    pub accept: Vec<Symbol>,
    pub transitions: Vec<CharRange>,
}

impl LexState {
    pub fn next(&self, c: char) -> Option<u16> {
        self.transitions
            .iter()
            .find(|range| range.contains(c))
            .map(|range| range.next)
    }
}

/// Per-production metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    /// (structural child index, field) pairs
    pub field_map: Vec<(u16, FieldId)>,
}

/// Immutable grammar tables of one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarTables {
    pub(crate) symbols: Vec<SymbolInfo>,
    pub(crate) token_count: u16,
    pub(crate) external_tokens: Vec<Symbol>,
    pub(crate) external_lex_states: Vec<Vec<bool>>,
    pub(crate) states: Vec<ParseStateTable>,
    pub(crate) lex_modes: Vec<LexMode>,
    pub(crate) lex_states: Vec<LexState>,
    pub(crate) productions: Vec<Production>,
    pub(crate) field_names: Vec<SmolStr>,
    pub(crate) start_state: StateId,
}

const NO_ACTIONS: &[ParseAction] = &[];
const NO_EXTERNAL_TOKENS: &[bool] = &[];

impl GrammarTables {
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn token_count(&self) -> usize {
        self.token_count as usize
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn start_state(&self) -> StateId {
        self.start_state
    }

    pub fn external_token_count(&self) -> usize {
        self.external_tokens.len()
    }

    #[inline]
    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol.0 < self.token_count
    }

    pub fn symbol_info(&self, symbol: Symbol) -> Option<&SymbolInfo> {
        self.symbols.get(symbol.index())
    }

    /// Display name of a symbol; `ERROR` for error nodes
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        if symbol.is_error() {
            return "ERROR";
        }
        self.symbol_info(symbol)
            .map(|info| info.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn is_visible(&self, symbol: Symbol) -> bool {
        symbol.is_error() || self.symbol_info(symbol).is_some_and(|info| info.visible)
    }

    pub fn is_named(&self, symbol: Symbol) -> bool {
        symbol.is_error() || self.symbol_info(symbol).is_some_and(|info| info.named)
    }

    pub fn is_repeat(&self, symbol: Symbol) -> bool {
        self.symbol_info(symbol).is_some_and(|info| info.repeat)
    }

    /// Actions for a terminal in a state (empty when there are none)
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction] {
        let Some(table) = self.states.get(state as usize) else {
            return NO_ACTIONS;
        };
        match table.actions.binary_search_by_key(&symbol, |(s, _)| *s) {
            Ok(idx) => &table.actions[idx].1,
            Err(_) => NO_ACTIONS,
        }
    }

    /// Whether the terminal has any non-extra action in the state
    pub fn accepts(&self, state: StateId, symbol: Symbol) -> bool {
        self.actions(state, symbol)
            .iter()
            .any(|action| !matches!(action, ParseAction::ShiftExtra))
    }

    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        let table = self.states.get(state as usize)?;
        table
            .gotos
            .binary_search_by_key(&symbol, |(s, _)| *s)
            .ok()
            .map(|idx| table.gotos[idx].1)
    }

    /// State reached by shifting `symbol` (terminal or non-terminal) in `state`
    pub fn next_state(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        if self.is_terminal(symbol) {
            self.actions(state, symbol).iter().find_map(|action| match action {
                ParseAction::Shift { state, .. } => Some(*state),
                _ => None,
            })
        } else {
            self.goto(state, symbol)
        }
    }

    /// Terminals that can be shifted in `state`, with their target states
    pub fn shiftable_terminals(
        &self,
        state: StateId,
    ) -> impl Iterator<Item = (Symbol, StateId)> + '_ {
        self.states
            .get(state as usize)
            .into_iter()
            .flat_map(|table| table.actions.iter())
            .filter_map(|(symbol, actions)| {
                actions.iter().find_map(|action| match action {
                    ParseAction::Shift { state, .. } if *symbol != Symbol::END => {
                        Some((*symbol, *state))
                    }
                    _ => None,
                })
            })
    }

    pub fn lex_mode(&self, state: StateId) -> LexMode {
        self.lex_modes.get(state as usize).copied().unwrap_or_default()
    }

    pub(crate) fn lex_state(&self, index: u16) -> Option<&LexState> {
        self.lex_states.get(index as usize)
    }

    /// Valid external tokens for an external lex state, indexed by external token index
    pub fn valid_external_tokens(&self, external_lex_state: u16) -> &[bool] {
        self.external_lex_states
            .get(external_lex_state as usize)
            .map(Vec::as_slice)
            .unwrap_or(NO_EXTERNAL_TOKENS)
    }

    pub fn external_symbol(&self, index: usize) -> Option<Symbol> {
        self.external_tokens.get(index).copied()
    }

    pub fn field_map(&self, production_id: u16) -> &[(u16, FieldId)] {
        self.productions
            .get(production_id as usize)
            .map(|production| production.field_map.as_slice())
            .unwrap_or(&[])
    }

    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        self.field_names.get(field as usize).map(SmolStr::as_str)
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        self.field_names
            .iter()
            .position(|field| field == name)
            .map(|idx| idx as FieldId)
    }

    /// Check the structural consistency of the tables.
    ///
    /// Every index stored in the tables must point inside its target table so
    /// that the interpreter never has to bounds-check on the hot path.
    pub fn validate(&self) -> Result<(), LoadError> {
        let symbol_count = self.symbols.len();
        let state_count = self.states.len();

        if symbol_count == 0 || symbol_count >= Symbol::ERROR.index() {
            return Err(LoadError::malformed(format!("invalid symbol count {symbol_count}")));
        }
        if self.token_count == 0 || self.token_count as usize > symbol_count {
            return Err(LoadError::malformed(format!(
                "token count {} outside 1..={symbol_count}",
                self.token_count
            )));
        }
        if state_count == 0 || state_count > StateId::MAX as usize {
            return Err(LoadError::malformed(format!("invalid state count {state_count}")));
        }
        if self.start_state as usize >= state_count {
            return Err(LoadError::malformed(format!(
                "start state {} out of range",
                self.start_state
            )));
        }
        if self.lex_modes.len() != state_count {
            return Err(LoadError::malformed(format!(
                "{} lex modes for {state_count} parse states",
                self.lex_modes.len()
            )));
        }
        if self.lex_states.is_empty() {
            return Err(LoadError::malformed("lexer automaton has no states"));
        }
        for (idx, info) in self.symbols.iter().enumerate() {
            if info.repeat && idx < self.token_count as usize {
                return Err(LoadError::malformed(format!(
                    "terminal `{}` marked as repetition",
                    info.name
                )));
            }
        }

        let external_count = self.external_tokens.len();
        for symbol in &self.external_tokens {
            if !self.is_terminal(*symbol) || *symbol == Symbol::END {
                return Err(LoadError::malformed(format!(
                    "external token {symbol:?} is not a terminal"
                )));
            }
        }
        for (idx, row) in self.external_lex_states.iter().enumerate() {
            if row.len() != external_count {
                return Err(LoadError::malformed(format!(
                    "external lex state {idx} has {} entries, expected {external_count}",
                    row.len()
                )));
            }
        }

        for (state, mode) in self.lex_modes.iter().enumerate() {
            if mode.lex_state as usize >= self.lex_states.len() {
                return Err(LoadError::malformed(format!(
                    "state {state}: lex state {} out of range",
                    mode.lex_state
                )));
            }
            let external = mode.external_lex_state as usize;
            if external != 0 && external >= self.external_lex_states.len() {
                return Err(LoadError::malformed(format!(
                    "state {state}: external lex state {} out of range",
                    mode.external_lex_state
                )));
            }
        }

        for (idx, lex_state) in self.lex_states.iter().enumerate() {
            for symbol in &lex_state.accept {
                if !self.is_terminal(*symbol) {
                    return Err(LoadError::malformed(format!(
                        "lex state {idx} accepts non-terminal {symbol:?}"
                    )));
                }
            }
            for range in &lex_state.transitions {
                if range.start > range.end || range.next as usize >= self.lex_states.len() {
                    return Err(LoadError::malformed(format!(
                        "lex state {idx} has an invalid transition"
                    )));
                }
            }
        }

        for (idx, production) in self.productions.iter().enumerate() {
            for (_, field) in &production.field_map {
                if *field as usize >= self.field_names.len() {
                    return Err(LoadError::malformed(format!(
                        "production {idx} references unknown field {field}"
                    )));
                }
            }
        }

        for (idx, table) in self.states.iter().enumerate() {
            self.validate_state(idx, table)?;
        }
        Ok(())
    }

    fn validate_state(&self, idx: usize, table: &ParseStateTable) -> Result<(), LoadError> {
        let state_count = self.states.len();
        if !table.actions.windows(2).all(|pair| pair[0].0 < pair[1].0) {
            return Err(LoadError::malformed(format!("state {idx}: action entries not sorted")));
        }
        if !table.gotos.windows(2).all(|pair| pair[0].0 < pair[1].0) {
            return Err(LoadError::malformed(format!("state {idx}: goto entries not sorted")));
        }
        for (symbol, actions) in &table.actions {
            if !self.is_terminal(*symbol) {
                return Err(LoadError::malformed(format!(
                    "state {idx}: action on non-terminal {symbol:?}"
                )));
            }
            for action in actions {
                match *action {
                    ParseAction::Shift { state, .. } if state as usize >= state_count => {
                        return Err(LoadError::malformed(format!(
                            "state {idx}: shift to missing state {state}"
                        )));
                    }
                    ParseAction::Reduce {
                        symbol, production_id, ..
                    } => {
                        if self.is_terminal(symbol) || symbol.index() >= self.symbols.len() {
                            return Err(LoadError::malformed(format!(
                                "state {idx}: reduce to invalid symbol {symbol:?}"
                            )));
                        }
                        if production_id as usize >= self.productions.len().max(1) {
                            return Err(LoadError::malformed(format!(
                                "state {idx}: unknown production {production_id}"
                            )));
                        }
                    }
                    _ => {}
                }
            }
        }
        for (symbol, target) in &table.gotos {
            if self.is_terminal(*symbol) || symbol.index() >= self.symbols.len() {
                return Err(LoadError::malformed(format!(
                    "state {idx}: goto on terminal {symbol:?}"
                )));
            }
            if *target as usize >= state_count {
                return Err(LoadError::malformed(format!(
                    "state {idx}: goto to missing state {target}"
                )));
            }
        }
        Ok(())
    }
}
