//! Process-wide language cache
//!
//! Loading a language decodes and validates its tables, so hosts keep one
//! registry and look languages up by name. Initialisation is one-time per name:
//! concurrent `get_or_load` calls for the same name run the loader at most once
//! per successful load.

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;

use super::Language;
use super::error::LoadError;

/// Name → language map preserving load order
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    languages: RwLock<IndexMap<SmolStr, Language>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Language> {
        self.languages.read().get(name).cloned()
    }

    /// Return the cached language, or load and cache it.
    ///
    /// The loader runs under the write lock, so it must not call back into the
    /// same registry. A failed load caches nothing.
    pub fn get_or_load<F>(&self, name: &str, loader: F) -> Result<Language, LoadError>
    where
        F: FnOnce() -> Result<Language, LoadError>,
    {
        if let Some(language) = self.get(name) {
            return Ok(language);
        }

        let mut languages = self.languages.write();
        // Another thread may have loaded it between the two locks
        if let Some(language) = languages.get(name) {
            return Ok(language.clone());
        }
        let language = loader()?;
        tracing::debug!(name, "registered language");
        languages.insert(SmolStr::new(name), language.clone());
        Ok(language)
    }

    /// Register a language under `name`, replacing any previous entry
    pub fn insert(&self, name: &str, language: Language) -> Option<Language> {
        self.languages.write().insert(SmolStr::new(name), language)
    }

    /// Names in load order
    pub fn names(&self) -> Vec<SmolStr> {
        self.languages.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.languages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.read().is_empty()
    }
}
