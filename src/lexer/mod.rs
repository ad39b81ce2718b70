//! Table-driven lexer engine
//!
//! Runs the grammar's DFA over the source text, one token at a time, starting
//! from the lex state configured for the current parse state. Lexing never
//! fails: input no rule matches becomes a one-character error token.
//!
//! ```text
//! external scanner (if the parse state allows external tokens)
//!     ↓ no token
//! DFA from the state's lex state (longest match, declaration order on ties)
//!     ↓ no match
//! DFA from lex state 0 (context-free retry)
//!     ↓ no match
//! single-character error token
//! ```

mod external;
mod talon;

pub use external::{ExternalScanner, ExternalScannerFactory, ScanInput};
pub use talon::{TalonScanner, TalonToken};

use std::sync::Arc;

use crate::base::Length;
use crate::language::{GrammarTables, LexMode, Symbol};

/// A lexed token, relative to the position it was lexed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub symbol: Symbol,
    pub size: Length,
    pub lookahead_bytes: u32,
    pub mode: LexMode,
    /// Scanner state after this token, for tokens produced by the external scanner
    pub external_state: Option<Arc<[u8]>>,
    /// No lexer rule matched
    pub is_error: bool,
}

/// External scanner context for one lex call
pub(crate) struct ExternalLex<'a> {
    pub scanner: &'a mut dyn ExternalScanner,
    /// Scanner state left by the last external token before this position
    pub previous_state: &'a [u8],
    /// Whether a zero-width token with unchanged scanner state may be returned
    pub allow_empty: bool,
}

/// Lexer over one source text
pub(crate) struct Lexer<'a> {
    tables: &'a GrammarTables,
    text: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(tables: &'a GrammarTables, text: &'a str) -> Self {
        Self { tables, text }
    }

    /// Lex one token starting at `start`.
    ///
    /// `valid` reports whether a symbol has an action in the current parse
    /// state; it only breaks ties between rules that match the same text.
    pub fn lex(
        &self,
        start: Length,
        mode: LexMode,
        valid: impl Fn(Symbol) -> bool,
        external: Option<ExternalLex<'_>>,
    ) -> Token {
        let offset = start.byte_len() as usize;

        if mode.external_lex_state != 0 {
            if let Some(external) = external {
                if let Some(token) = self.lex_external(offset, mode, external) {
                    return token;
                }
            }
        }

        if offset >= self.text.len() {
            return Token {
                symbol: Symbol::END,
                size: Length::ZERO,
                lookahead_bytes: 1,
                mode,
                external_state: None,
                is_error: false,
            };
        }

        let matched = self
            .run_dfa(offset, mode.lex_state, &valid)
            .or_else(|| (mode.lex_state != 0).then(|| self.run_dfa(offset, 0, &valid)).flatten());

        match matched {
            Some((symbol, end, examined)) => Token {
                symbol,
                size: Length::of(&self.text[offset..end]),
                lookahead_bytes: (examined - end) as u32,
                mode,
                external_state: None,
                is_error: false,
            },
            None => {
                let width = self.text[offset..].chars().next().map_or(1, char::len_utf8);
                tracing::trace!(offset, "no lexer rule matched, emitting error token");
                Token {
                    symbol: Symbol::ERROR,
                    size: Length::of(&self.text[offset..offset + width]),
                    lookahead_bytes: 1,
                    mode,
                    external_state: None,
                    is_error: true,
                }
            }
        }
    }

    fn lex_external(
        &self,
        offset: usize,
        mode: LexMode,
        external: ExternalLex<'_>,
    ) -> Option<Token> {
        let valid = self.tables.valid_external_tokens(mode.external_lex_state);
        if !valid.iter().any(|v| *v) {
            return None;
        }

        let ExternalLex {
            scanner,
            previous_state,
            allow_empty,
        } = external;
        scanner.deserialize(previous_state);
        let mut input = ScanInput::new(self.text, offset);
        let index = scanner.scan(&mut input, valid)?;
        if !valid.get(index).copied().unwrap_or(false) {
            tracing::warn!(index, "external scanner returned a token that is not valid here");
            return None;
        }
        let symbol = self.tables.external_symbol(index)?;

        let mut state = Vec::new();
        scanner.serialize(&mut state);
        let end = input.token_end().clamp(input.start(), self.text.len());
        if end == offset && !allow_empty && state.as_slice() == previous_state {
            tracing::trace!(offset, "rejecting empty external token with unchanged state");
            return None;
        }

        Some(Token {
            symbol,
            size: Length::of(&self.text[offset..end]),
            lookahead_bytes: (input.examined_end() - end) as u32,
            mode,
            external_state: Some(Arc::from(state)),
            is_error: false,
        })
    }

    /// Longest DFA match from `offset`; returns (symbol, token end, examined end)
    fn run_dfa(
        &self,
        offset: usize,
        lex_state: u16,
        valid: &impl Fn(Symbol) -> bool,
    ) -> Option<(Symbol, usize, usize)> {
        let mut state = self.tables.lex_state(lex_state)?;
        let mut position = offset;
        let mut examined;
        let mut best = None;

        loop {
            if position > offset && !state.accept.is_empty() {
                let symbol = state
                    .accept
                    .iter()
                    .copied()
                    .find(|symbol| valid(*symbol))
                    .unwrap_or(state.accept[0]);
                best = Some((symbol, position));
            }

            let Some(c) = self.text[position..].chars().next() else {
                examined = position + 1;
                break;
            };
            examined = position + c.len_utf8();
            match state.next(c).and_then(|next| self.tables.lex_state(next)) {
                Some(next) => {
                    state = next;
                    position += c.len_utf8();
                }
                None => break,
            }
        }

        best.map(|(symbol, end)| (symbol, end, examined))
    }
}
