//! # grove
//!
//! Embeddable incremental GLR parser runtime. Grammars arrive as compiled
//! parse and lex tables; grove turns source text into concrete syntax trees
//! and keeps them up to date as the text is edited.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! parser    → GLR table interpreter, incremental reuse, error recovery
//!   ↓
//! tree      → Shared subtrees, SyntaxTree/Node/TreeCursor, edits, rowan export
//!   ↓
//! lexer     → Table-driven lexer, external scanner interface
//!   ↓
//! language  → Grammar tables, blob format, builder, registry
//!   ↓
//! base      → Positions, lengths, input edits
//! ```
//!
//! ## Example
//!
//! ```
//! use grove::language::{LanguageBuilder, LexMode, SymbolInfo};
//! use grove::Symbol;
//!
//! // doc → "a"
//! let mut b = LanguageBuilder::new();
//! let a = b.token(SymbolInfo::named("a"));
//! let doc = b.non_terminal(SymbolInfo::named("doc"));
//! let start = b.lex_state(&[]);
//! let accept_a = b.lex_state(&[a]);
//! b.lex_transition(start, 'a', 'a', accept_a);
//!
//! let s0 = b.state(LexMode::default());
//! let after_a = b.state(LexMode::default());
//! let after_doc = b.state(LexMode::default());
//! b.shift(s0, a, after_a);
//! b.reduce(after_a, Symbol::END, doc, 1);
//! b.goto(s0, doc, after_doc);
//! b.accept(after_doc);
//! let language = b.build().unwrap();
//!
//! let tree = grove::parse(&language, "a", None);
//! assert_eq!(tree.root_node().to_sexp(), "(doc (a))");
//! ```

// ============================================================================
// MODULES (dependency order: base → language → lexer → tree → parser)
// ============================================================================

/// Foundation types: Point, Length, InputEdit, TextRange
pub mod base;

/// Grammar tables: symbols, actions, lex states, loading and registry
pub mod language;

/// Table-driven lexer and external scanners
pub mod lexer;

/// Syntax trees: storage, navigation, editing, diffing
pub mod tree;

/// GLR parser: versions, reuse, recovery, configuration
pub mod parser;

// Re-export foundation types
pub use base::{InputEdit, Length, Point, TextRange, TextSize};

// Re-export the embedding surface
pub use language::{Language, LanguageRegistry, LoadError, Symbol};
pub use parser::{
    CancellationFlag, ParseError, ParseStats, Parser, ParserConfig, parse, parse_batch,
};
pub use tree::{Node, SyntaxTree, TreeCursor};
