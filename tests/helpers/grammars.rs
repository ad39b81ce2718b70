//! Hand-compiled grammars shared by the integration tests.
//!
//! Each grammar is written the way a grammar compiler would emit it: lexer
//! DFA states, LR parse states with actions and gotos.

use grove::Symbol;
use grove::language::{Associativity, Language, LanguageBuilder, LexMode, ReduceOptions, SymbolInfo};
use grove::lexer::{ExternalScanner, TalonScanner};

use super::init_tracing;

/// Lex `[a-z]+` as `word`, from `start`
fn word_lexer(b: &mut LanguageBuilder, start: u16, word: Symbol) {
    let in_word = b.lex_state(&[word]);
    b.lex_transition(start, 'a', 'z', in_word);
    b.lex_transition(in_word, 'a', 'z', in_word);
}

/// Lex runs of spaces and newlines as `ws`, from `start`
fn whitespace_lexer(b: &mut LanguageBuilder, start: u16, ws: Symbol) {
    let in_ws = b.lex_state(&[ws]);
    for c in [' ', '\n'] {
        b.lex_transition(start, c, c, in_ws);
        b.lex_transition(in_ws, c, c, in_ws);
    }
}

/// Statements separated by whitespace:
///
/// ```text
/// doc   → _rep
/// _rep  → _rep _rep | stmt      (repetition, left associative)
/// stmt  → word ";"
/// ```
pub fn statements() -> Language {
    statements_builder().build().unwrap()
}

/// The recorded tables of [`statements`], for serializing
pub fn statements_builder() -> LanguageBuilder {
    init_tracing();
    let mut b = LanguageBuilder::new();
    let word = b.token(SymbolInfo::named("word"));
    let semi = b.token(SymbolInfo::anonymous(";"));
    let ws = b.token(SymbolInfo::hidden("_ws"));
    let doc = b.non_terminal(SymbolInfo::named("doc"));
    let stmt = b.non_terminal(SymbolInfo::named("stmt"));
    let rep = b.non_terminal(SymbolInfo::repeat("doc_repeat1"));

    let start = b.lex_state(&[]);
    word_lexer(&mut b, start, word);
    whitespace_lexer(&mut b, start, ws);
    let lex_semi = b.lex_state(&[semi]);
    b.lex_transition(start, ';', ';', lex_semi);

    let mode = LexMode::default();
    let s0 = b.state(mode);
    let after_word = b.state(mode);
    let after_semi = b.state(mode);
    let after_stmt = b.state(mode);
    let after_rep = b.state(mode);
    let after_reps = b.state(mode);
    let after_doc = b.state(mode);

    for state in [s0, after_rep, after_reps] {
        b.shift(state, word, after_word);
        b.goto(state, stmt, after_stmt);
    }
    b.goto(s0, rep, after_rep);
    b.goto(s0, doc, after_doc);
    b.goto(after_rep, rep, after_reps);
    b.goto(after_reps, rep, after_reps);

    b.shift(after_word, semi, after_semi);
    for lookahead in [word, Symbol::END] {
        b.reduce(after_semi, lookahead, stmt, 2);
        b.reduce(after_stmt, lookahead, rep, 1);
        b.reduce_with(
            after_reps,
            lookahead,
            rep,
            2,
            ReduceOptions {
                associativity: Associativity::Left,
                ..ReduceOptions::default()
            },
        );
    }
    b.reduce(after_rep, Symbol::END, doc, 1);
    b.accept(after_doc);
    b.extra_everywhere(ws);
    b
}

/// `n` lines of statements, one statement per line
pub fn statements_text(n: usize) -> String {
    let mut text = String::with_capacity(n * 6);
    for i in 0..n {
        let letter = char::from(b'a' + (i % 26) as u8);
        text.push(letter);
        text.push(letter);
        text.push_str(";\n");
    }
    text
}

/// A single assignment with fields:
///
/// ```text
/// doc        → assignment
/// assignment → left: word "=" right: number
/// ```
pub fn assignment() -> Language {
    init_tracing();
    let mut b = LanguageBuilder::new();
    let word = b.token(SymbolInfo::named("identifier"));
    let eq = b.token(SymbolInfo::anonymous("="));
    let number = b.token(SymbolInfo::named("number"));
    let ws = b.token(SymbolInfo::hidden("_ws"));
    let doc = b.non_terminal(SymbolInfo::named("doc"));
    let assignment = b.non_terminal(SymbolInfo::named("assignment"));
    let left = b.field("left");
    let right = b.field("right");
    let production = b.production(&[(0, left), (2, right)]);

    let start = b.lex_state(&[]);
    word_lexer(&mut b, start, word);
    whitespace_lexer(&mut b, start, ws);
    let lex_eq = b.lex_state(&[eq]);
    b.lex_transition(start, '=', '=', lex_eq);
    let in_number = b.lex_state(&[number]);
    b.lex_transition(start, '0', '9', in_number);
    b.lex_transition(in_number, '0', '9', in_number);

    let mode = LexMode::default();
    let s0 = b.state(mode);
    let after_word = b.state(mode);
    let after_eq = b.state(mode);
    let after_number = b.state(mode);
    let after_assignment = b.state(mode);
    let after_doc = b.state(mode);

    b.shift(s0, word, after_word);
    b.goto(s0, assignment, after_assignment);
    b.goto(s0, doc, after_doc);
    b.shift(after_word, eq, after_eq);
    b.shift(after_eq, number, after_number);
    b.reduce_with(
        after_number,
        Symbol::END,
        assignment,
        3,
        ReduceOptions {
            production_id: production,
            ..ReduceOptions::default()
        },
    );
    b.reduce(after_assignment, Symbol::END, doc, 1);
    b.accept(after_doc);
    b.extra_everywhere(ws);
    b.build().unwrap()
}

/// Balanced parentheses around a single atom:
///
/// ```text
/// doc  → expr
/// expr → "(" expr ")" | atom
/// atom → "x"
/// ```
pub fn nested() -> Language {
    init_tracing();
    let mut b = LanguageBuilder::new();
    let open = b.token(SymbolInfo::anonymous("("));
    let close = b.token(SymbolInfo::anonymous(")"));
    let atom = b.token(SymbolInfo::named("atom"));
    let doc = b.non_terminal(SymbolInfo::named("doc"));
    let expr = b.non_terminal(SymbolInfo::named("expr"));

    let start = b.lex_state(&[]);
    for (c, token) in [('(', open), (')', close), ('x', atom)] {
        let accept = b.lex_state(&[token]);
        b.lex_transition(start, c, c, accept);
    }

    let mode = LexMode::default();
    let s0 = b.state(mode);
    let after_open = b.state(mode);
    let after_atom = b.state(mode);
    let after_inner = b.state(mode);
    let after_close = b.state(mode);
    let after_expr = b.state(mode);
    let after_doc = b.state(mode);

    for state in [s0, after_open] {
        b.shift(state, open, after_open);
        b.shift(state, atom, after_atom);
    }
    b.goto(s0, expr, after_expr);
    b.goto(s0, doc, after_doc);
    b.goto(after_open, expr, after_inner);
    b.shift(after_inner, close, after_close);
    for lookahead in [close, Symbol::END] {
        b.reduce(after_atom, lookahead, expr, 1);
        b.reduce(after_close, lookahead, expr, 3);
    }
    b.reduce(after_expr, Symbol::END, doc, 1);
    b.accept(after_doc);
    b.build().unwrap()
}

/// Two keywords that the lexer only tells apart from an identifier when
/// whitespace separates them:
///
/// ```text
/// pair → "a" "b"
/// ```
pub fn separated_pair() -> Language {
    init_tracing();
    let mut b = LanguageBuilder::new();
    let a = b.token(SymbolInfo::anonymous("a"));
    let b_token = b.token(SymbolInfo::anonymous("b"));
    let identifier = b.token(SymbolInfo::named("identifier"));
    let ws = b.token(SymbolInfo::hidden("_ws"));
    let pair = b.non_terminal(SymbolInfo::named("pair"));

    let start = b.lex_state(&[]);
    whitespace_lexer(&mut b, start, ws);
    let in_identifier = b.lex_state(&[identifier]);
    b.lex_transition(in_identifier, 'a', 'z', in_identifier);
    for (c, keyword) in [('a', a), ('b', b_token)] {
        let after_keyword = b.lex_state(&[keyword, identifier]);
        b.lex_transition(start, c, c, after_keyword);
        b.lex_transition(after_keyword, 'a', 'z', in_identifier);
    }

    let mode = LexMode::default();
    let s0 = b.state(mode);
    let after_a = b.state(mode);
    let after_b = b.state(mode);
    let after_pair = b.state(mode);
    b.shift(s0, a, after_a);
    b.shift(after_a, b_token, after_b);
    b.reduce(after_b, Symbol::END, pair, 2);
    b.goto(s0, pair, after_pair);
    b.accept(after_pair);
    b.extra_everywhere(ws);
    b.build().unwrap()
}

/// Lines terminated by the Talon scanner's NEWLINE token:
///
/// ```text
/// doc    → _lines
/// _lines → _lines line | line
/// line   → word newline
/// ```
///
/// Spaces inside a line are extras; line breaks belong to `newline`.
pub fn lines() -> Language {
    lines_without_scanner()
        .with_external_scanner(|| Box::new(TalonScanner::new()) as Box<dyn ExternalScanner>)
}

/// The tables of [`lines`] with no scanner attached
pub fn lines_without_scanner() -> Language {
    init_tracing();
    let mut b = LanguageBuilder::new();
    let word = b.token(SymbolInfo::named("word"));
    let space = b.token(SymbolInfo::hidden("_space"));
    let newline = b.external_token(SymbolInfo::named("newline"));
    let hidden = [
        "_indent",
        "_dedent",
        "_string_start",
        "_string_content",
        "_string_end",
        "comment",
    ];
    for name in hidden {
        b.external_token(SymbolInfo::hidden(name));
    }
    let doc = b.non_terminal(SymbolInfo::named("doc"));
    let line = b.non_terminal(SymbolInfo::named("line"));
    let lines = b.non_terminal(SymbolInfo::hidden("_lines"));

    let start = b.lex_state(&[]);
    word_lexer(&mut b, start, word);
    let in_space = b.lex_state(&[space]);
    b.lex_transition(start, ' ', ' ', in_space);
    b.lex_transition(in_space, ' ', ' ', in_space);
    let expects_newline = b.external_lex_state(&[newline]);

    let mode = LexMode::default();
    let s0 = b.state(mode);
    let after_word = b.state(LexMode::new(0, expects_newline));
    let after_newline = b.state(mode);
    let after_line = b.state(mode);
    let after_lines = b.state(mode);
    let after_more = b.state(mode);
    let after_doc = b.state(mode);

    b.shift(s0, word, after_word);
    b.goto(s0, line, after_line);
    b.goto(s0, lines, after_lines);
    b.goto(s0, doc, after_doc);
    b.shift(after_word, newline, after_newline);
    b.shift(after_lines, word, after_word);
    b.goto(after_lines, line, after_more);
    for lookahead in [word, Symbol::END] {
        b.reduce(after_newline, lookahead, line, 2);
        b.reduce(after_line, lookahead, lines, 1);
        b.reduce(after_more, lookahead, lines, 2);
    }
    b.reduce(after_lines, Symbol::END, doc, 1);
    b.accept(after_doc);
    b.extra_everywhere(space);
    b.build().unwrap()
}
