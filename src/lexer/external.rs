//! External scanner capability
//!
//! Grammars with context-sensitive tokens (indentation, heredocs, string
//! interpolation) supply an [`ExternalScanner`]. The lexer engine calls it
//! before running the DFA whenever the current parse state accepts at least one
//! external token. Scanner state is serialized after every external token so
//! that an incremental re-parse can resume lexing from any token boundary.

use std::fmt;

/// Stateful scanner for external tokens
pub trait ExternalScanner: Send {
    /// Try to recognise one of the valid external tokens at the current input
    /// position. `valid` is indexed by external token index. Returns the index
    /// of the recognised token.
    fn scan(&mut self, input: &mut ScanInput<'_>, valid: &[bool]) -> Option<usize>;

    /// Write the scanner state into `buffer`.
    fn serialize(&self, buffer: &mut Vec<u8>);

    /// Restore the scanner state. An empty slice means the initial state.
    fn deserialize(&mut self, state: &[u8]);
}

/// Creates one scanner per parse invocation
pub trait ExternalScannerFactory: Send + Sync {
    fn create(&self) -> Box<dyn ExternalScanner>;
}

impl<F> ExternalScannerFactory for F
where
    F: Fn() -> Box<dyn ExternalScanner> + Send + Sync,
{
    fn create(&self) -> Box<dyn ExternalScanner> {
        self()
    }
}

impl fmt::Debug for dyn ExternalScannerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExternalScannerFactory")
    }
}

/// Input cursor handed to external scanners
///
/// Characters consumed with [`ScanInput::advance`] belong to the token up to
/// the last [`ScanInput::mark_end`] call (or the current position when
/// `mark_end` is never called). Anything examined beyond the token end counts
/// as lookahead for incremental invalidation.
pub struct ScanInput<'s> {
    text: &'s str,
    start: usize,
    position: usize,
    marked_end: Option<usize>,
    examined_end: usize,
}

impl<'s> ScanInput<'s> {
    pub fn new(text: &'s str, start: usize) -> Self {
        Self {
            text,
            start,
            position: start,
            marked_end: None,
            examined_end: start,
        }
    }

    /// The next character, or `None` at end of input
    pub fn lookahead(&mut self) -> Option<char> {
        let c = self.text[self.position..].chars().next();
        let reach = self.position + c.map_or(1, char::len_utf8);
        self.examined_end = self.examined_end.max(reach);
        c
    }

    /// Consume the next character
    pub fn advance(&mut self) {
        if let Some(c) = self.lookahead() {
            self.position += c.len_utf8();
        }
    }

    /// Mark the current position as the end of the token
    pub fn mark_end(&mut self) {
        self.marked_end = Some(self.position);
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.text.len()
    }

    /// Byte column of the current position
    pub fn column(&self) -> u32 {
        let line_start = self.text[..self.position].rfind('\n').map_or(0, |idx| idx + 1);
        (self.position - line_start) as u32
    }

    pub(crate) fn start(&self) -> usize {
        self.start
    }

    pub(crate) fn token_end(&self) -> usize {
        self.marked_end.unwrap_or(self.position)
    }

    pub(crate) fn examined_end(&self) -> usize {
        self.examined_end.max(self.token_end() + 1)
    }
}
