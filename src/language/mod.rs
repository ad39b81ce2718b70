//! Language handles
//!
//! A [`Language`] wraps the immutable grammar tables of one language plus an
//! optional external scanner factory. Handles are cheap to clone and shared
//! freely between threads and trees.
//!
//! ```text
//! blob bytes ──format::decode──▶ GrammarTables ──▶ Language ──▶ LanguageRegistry
//!                                      ▲
//!                        LanguageBuilder (hand-built tables)
//! ```

mod builder;
mod error;
pub mod format;
mod registry;
mod symbol;
mod tables;

pub use builder::{LanguageBuilder, ReduceOptions};
pub use error::LoadError;
pub use format::{LANGUAGE_VERSION, MIN_COMPATIBLE_LANGUAGE_VERSION};
pub use registry::LanguageRegistry;
pub use symbol::{Associativity, FieldId, LexMode, StateId, Symbol, SymbolInfo};
pub use tables::{CharRange, GrammarTables, LexState, ParseAction, ParseStateTable, Production};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::lexer::{ExternalScanner, ExternalScannerFactory};

#[derive(Clone)]
struct LanguageInner {
    tables: GrammarTables,
    version: u32,
    scanner: Option<Arc<dyn ExternalScannerFactory>>,
}

/// Shared, immutable handle to a loaded grammar
#[derive(Clone)]
pub struct Language(Arc<LanguageInner>);

impl Language {
    /// Load a language from a compiled table blob
    pub fn load(bytes: &[u8]) -> Result<Self, LoadError> {
        let (version, tables) = format::decode(bytes)?;
        tracing::debug!(
            version,
            symbols = tables.symbol_count(),
            states = tables.state_count(),
            "loaded grammar tables"
        );
        Ok(Self::new(tables, version))
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::load(&bytes)
    }

    /// Wrap tables built in memory, validating them first
    pub fn from_tables(tables: GrammarTables) -> Result<Self, LoadError> {
        tables.validate()?;
        Ok(Self::new(tables, LANGUAGE_VERSION))
    }

    fn new(tables: GrammarTables, version: u32) -> Self {
        Self(Arc::new(LanguageInner {
            tables,
            version,
            scanner: None,
        }))
    }

    /// Attach the external scanner used for the grammar's external tokens
    pub fn with_external_scanner(self, factory: impl ExternalScannerFactory + 'static) -> Self {
        let mut inner = Arc::unwrap_or_clone(self.0);
        inner.scanner = Some(Arc::new(factory));
        Self(Arc::new(inner))
    }

    /// Format version of the blob this language was loaded from
    pub fn version(&self) -> u32 {
        self.0.version
    }

    pub fn tables(&self) -> &GrammarTables {
        &self.0.tables
    }

    pub fn symbol_count(&self) -> usize {
        self.0.tables.symbol_count()
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.0.tables.symbol_name(symbol)
    }

    /// Look up a symbol by name; `named` distinguishes `identifier` from the
    /// anonymous literal token `"identifier"`
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<Symbol> {
        if named && name == "ERROR" {
            return Some(Symbol::ERROR);
        }
        self.0
            .tables
            .symbols
            .iter()
            .position(|info| info.name == name && info.named == named && info.visible)
            .map(|idx| Symbol(idx as u16))
    }

    pub fn is_named(&self, symbol: Symbol) -> bool {
        self.0.tables.is_named(symbol)
    }

    pub fn is_visible(&self, symbol: Symbol) -> bool {
        self.0.tables.is_visible(symbol)
    }

    pub fn field_count(&self) -> usize {
        self.0.tables.field_names.len()
    }

    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        self.0.tables.field_name(field)
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        self.0.tables.field_id_for_name(name)
    }

    pub fn has_external_scanner(&self) -> bool {
        self.0.scanner.is_some()
    }

    /// A fresh scanner for one parse invocation
    pub(crate) fn create_scanner(&self) -> Option<Box<dyn ExternalScanner>> {
        self.0.scanner.as_ref().map(|factory| factory.create())
    }

    /// Whether both handles refer to the same loaded language
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("version", &self.0.version)
            .field("symbols", &self.0.tables.symbol_count())
            .field("states", &self.0.tables.state_count())
            .field("external_scanner", &self.0.scanner.is_some())
            .finish()
    }
}
