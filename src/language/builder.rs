//! Programmatic construction of grammar tables
//!
//! The builder records tables that were computed elsewhere (by a grammar
//! compiler, or by hand in tests); it does not derive tables from rules.
//!
//! Tokens must be declared before non-terminals so that every terminal id is
//! below every non-terminal id.
//!
//! # Example
//! ```
//! use grove::language::{LanguageBuilder, LexMode, SymbolInfo};
//!
//! let mut b = LanguageBuilder::new();
//! let x = b.token(SymbolInfo::anonymous("x"));
//! let doc = b.non_terminal(SymbolInfo::named("doc"));
//!
//! let lex_start = b.lex_state(&[]);
//! let lex_x = b.lex_state(&[x]);
//! b.lex_transition(lex_start, 'x', 'x', lex_x);
//!
//! let s0 = b.state(LexMode::default());
//! let s1 = b.state(LexMode::default());
//! let s2 = b.state(LexMode::default());
//! b.shift(s0, x, s1);
//! b.reduce(s1, grove::Symbol::END, doc, 1);
//! b.goto(s0, doc, s2);
//! b.accept(s2);
//!
//! let language = b.build().unwrap();
//! assert!(!grove::parse(&language, "x", None).has_error());
//! ```

use std::collections::BTreeMap;

use smol_str::SmolStr;

use super::error::LoadError;
use super::format;
use super::symbol::{Associativity, FieldId, LexMode, StateId, Symbol, SymbolInfo};
use super::tables::{CharRange, GrammarTables, LexState, ParseAction, ParseStateTable, Production};
use super::Language;

/// Reduce action parameters beyond the basic (symbol, child count) pair
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceOptions {
    pub production_id: u16,
    pub precedence: i16,
    pub associativity: Associativity,
}

#[derive(Debug, Default)]
struct StateBuilder {
    actions: BTreeMap<Symbol, Vec<ParseAction>>,
    gotos: BTreeMap<Symbol, StateId>,
    mode: LexMode,
}

/// Incremental builder for [`GrammarTables`]
#[derive(Debug)]
pub struct LanguageBuilder {
    symbols: Vec<SymbolInfo>,
    token_count: u16,
    tokens_sealed: bool,
    late_tokens: Vec<SmolStr>,
    external_tokens: Vec<Symbol>,
    external_lex_states: Vec<Vec<Symbol>>,
    states: Vec<StateBuilder>,
    lex_states: Vec<LexState>,
    productions: Vec<Production>,
    field_names: Vec<SmolStr>,
    start_state: StateId,
}

impl Default for LanguageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBuilder {
    pub fn new() -> Self {
        Self {
            symbols: vec![SymbolInfo::hidden("end")],
            token_count: 1,
            tokens_sealed: false,
            late_tokens: Vec::new(),
            external_tokens: Vec::new(),
            external_lex_states: Vec::new(),
            states: Vec::new(),
            lex_states: Vec::new(),
            productions: vec![Production::default()],
            field_names: Vec::new(),
            start_state: 0,
        }
    }

    fn push_symbol(&mut self, info: SymbolInfo) -> Symbol {
        let symbol = Symbol(self.symbols.len() as u16);
        self.symbols.push(info);
        symbol
    }

    /// Declare a terminal
    pub fn token(&mut self, info: SymbolInfo) -> Symbol {
        if self.tokens_sealed {
            self.late_tokens.push(info.name.clone());
        }
        let symbol = self.push_symbol(info);
        self.token_count = self.token_count.max(symbol.0 + 1);
        symbol
    }

    /// Declare a terminal produced by the external scanner.
    ///
    /// External token indices follow declaration order.
    pub fn external_token(&mut self, info: SymbolInfo) -> Symbol {
        let symbol = self.token(info);
        self.external_tokens.push(symbol);
        symbol
    }

    /// Declare a non-terminal
    pub fn non_terminal(&mut self, info: SymbolInfo) -> Symbol {
        self.tokens_sealed = true;
        self.push_symbol(info)
    }

    pub fn field(&mut self, name: impl Into<SmolStr>) -> FieldId {
        let name = name.into();
        if let Some(idx) = self.field_names.iter().position(|field| *field == name) {
            return idx as FieldId;
        }
        self.field_names.push(name);
        (self.field_names.len() - 1) as FieldId
    }

    /// Register a production's field map; returns its production id
    pub fn production(&mut self, field_map: &[(u16, FieldId)]) -> u16 {
        self.productions.push(Production {
            field_map: field_map.to_vec(),
        });
        (self.productions.len() - 1) as u16
    }

    /// Add a lexer DFA state accepting `accept` (declaration order)
    pub fn lex_state(&mut self, accept: &[Symbol]) -> u16 {
        self.lex_states.push(LexState {
            accept: accept.to_vec(),
            transitions: Vec::new(),
        });
        (self.lex_states.len() - 1) as u16
    }

    pub fn lex_transition(&mut self, from: u16, low: char, high: char, to: u16) {
        if let Some(state) = self.lex_states.get_mut(from as usize) {
            state.transitions.push(CharRange {
                start: low as u32,
                end: high as u32,
                next: to,
            });
        }
    }

    /// Register a set of valid external tokens; returns the external lex state id (≥ 1)
    pub fn external_lex_state(&mut self, valid: &[Symbol]) -> u16 {
        self.external_lex_states.push(valid.to_vec());
        self.external_lex_states.len() as u16
    }

    /// Add a parse state
    pub fn state(&mut self, mode: LexMode) -> StateId {
        self.states.push(StateBuilder {
            mode,
            ..StateBuilder::default()
        });
        (self.states.len() - 1) as StateId
    }

    pub fn start_state(&mut self, state: StateId) {
        self.start_state = state;
    }

    fn push_action(&mut self, state: StateId, symbol: Symbol, action: ParseAction) {
        if let Some(entry) = self.states.get_mut(state as usize) {
            entry.actions.entry(symbol).or_default().push(action);
        }
    }

    pub fn shift(&mut self, state: StateId, symbol: Symbol, to: StateId) {
        self.shift_with_precedence(state, symbol, to, 0);
    }

    pub fn shift_with_precedence(
        &mut self,
        state: StateId,
        symbol: Symbol,
        to: StateId,
        precedence: i16,
    ) {
        self.push_action(state, symbol, ParseAction::Shift { state: to, precedence });
    }

    /// Shift `symbol` as an extra in `state`
    pub fn shift_extra(&mut self, state: StateId, symbol: Symbol) {
        self.push_action(state, symbol, ParseAction::ShiftExtra);
    }

    /// Shift `symbol` as an extra in every state declared so far
    pub fn extra_everywhere(&mut self, symbol: Symbol) {
        for state in 0..self.states.len() {
            self.shift_extra(state as StateId, symbol);
        }
    }

    pub fn reduce(&mut self, state: StateId, lookahead: Symbol, symbol: Symbol, child_count: u8) {
        self.reduce_with(state, lookahead, symbol, child_count, ReduceOptions::default());
    }

    pub fn reduce_with(
        &mut self,
        state: StateId,
        lookahead: Symbol,
        symbol: Symbol,
        child_count: u8,
        options: ReduceOptions,
    ) {
        self.push_action(
            state,
            lookahead,
            ParseAction::Reduce {
                symbol,
                child_count,
                production_id: options.production_id,
                precedence: options.precedence,
                associativity: options.associativity,
            },
        );
    }

    /// Accept on end of input
    pub fn accept(&mut self, state: StateId) {
        self.push_action(state, Symbol::END, ParseAction::Accept);
    }

    pub fn goto(&mut self, state: StateId, symbol: Symbol, to: StateId) {
        if let Some(entry) = self.states.get_mut(state as usize) {
            entry.gotos.insert(symbol, to);
        }
    }

    /// Freeze the recorded tables and validate them
    pub fn build_tables(&self) -> Result<GrammarTables, LoadError> {
        if let Some(name) = self.late_tokens.first() {
            return Err(LoadError::malformed(format!(
                "token `{name}` declared after a non-terminal"
            )));
        }

        let external_count = self.external_tokens.len();
        let mut external_lex_states = vec![vec![false; external_count]];
        for valid in &self.external_lex_states {
            let row = self
                .external_tokens
                .iter()
                .map(|symbol| valid.contains(symbol))
                .collect();
            external_lex_states.push(row);
        }

        let states = self
            .states
            .iter()
            .map(|state| ParseStateTable {
                actions: state
                    .actions
                    .iter()
                    .map(|(symbol, actions)| (*symbol, actions.clone()))
                    .collect(),
                gotos: state.gotos.iter().map(|(symbol, to)| (*symbol, *to)).collect(),
            })
            .collect();

        let tables = GrammarTables {
            symbols: self.symbols.clone(),
            token_count: self.token_count,
            external_tokens: self.external_tokens.clone(),
            external_lex_states,
            states,
            lex_modes: self.states.iter().map(|state| state.mode).collect(),
            lex_states: self.lex_states.clone(),
            productions: self.productions.clone(),
            field_names: self.field_names.clone(),
            start_state: self.start_state,
        };
        tables.validate()?;
        Ok(tables)
    }

    /// Serialize the tables in the current blob format
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoadError> {
        format::encode(&self.build_tables()?)
    }

    pub fn build(&self) -> Result<Language, LoadError> {
        Language::from_tables(self.build_tables()?)
    }
}
