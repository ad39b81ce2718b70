//! Text edits applied to parsed trees
//!
//! An [`InputEdit`] describes the replacement of `[start, old_end)` in the old
//! text by new text ending at `new_end`. Points are carried alongside bytes so
//! that row/column positions of shifted nodes stay correct.

use text_size::{TextRange, TextSize};

use super::position::{Length, Point};

/// A single text edit, in both byte offsets and points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEdit {
    pub start_byte: u32,
    pub old_end_byte: u32,
    pub new_end_byte: u32,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

impl InputEdit {
    /// Build an edit from the old text, the replaced range, and the replacement.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds for `old_text`, is reversed, or does
    /// not fall on char boundaries.
    ///
    /// # Example
    /// ```
    /// use grove::InputEdit;
    ///
    /// let edit = InputEdit::from_text("let x\nfoo", 6..9, "ba\nr");
    /// assert_eq!(edit.old_end_byte, 9);
    /// assert_eq!(edit.new_end_byte, 10);
    /// assert_eq!(edit.new_end_position.row, 2);
    /// ```
    pub fn from_text(old_text: &str, range: std::ops::Range<usize>, replacement: &str) -> Self {
        let start = Length::of(&old_text[..range.start]);
        let old_end = start + Length::of(&old_text[range.start..range.end]);
        let new_end = start + Length::of(replacement);
        Self::from_lengths(start, old_end, new_end)
    }

    /// Insertion of `text` at byte `at` of `old_text`
    ///
    /// Panics under the same conditions as [`InputEdit::from_text`].
    pub fn insert(old_text: &str, at: usize, text: &str) -> Self {
        Self::from_text(old_text, at..at, text)
    }

    /// Deletion of `range` from `old_text`
    ///
    /// Panics under the same conditions as [`InputEdit::from_text`].
    pub fn delete(old_text: &str, range: std::ops::Range<usize>) -> Self {
        Self::from_text(old_text, range, "")
    }

    /// Replacement of `range` in `old_text` by `text`
    ///
    /// Panics under the same conditions as [`InputEdit::from_text`].
    pub fn replace(old_text: &str, range: std::ops::Range<usize>, text: &str) -> Self {
        Self::from_text(old_text, range, text)
    }

    pub(crate) fn from_lengths(start: Length, old_end: Length, new_end: Length) -> Self {
        Self {
            start_byte: start.byte_len(),
            old_end_byte: old_end.byte_len(),
            new_end_byte: new_end.byte_len(),
            start_position: start.extent,
            old_end_position: old_end.extent,
            new_end_position: new_end.extent,
        }
    }

    /// Start of the edit as an absolute length from the beginning of the text
    pub(crate) fn start(&self) -> Length {
        Length::new(self.start_byte, self.start_position)
    }

    pub(crate) fn old_end(&self) -> Length {
        Length::new(self.old_end_byte, self.old_end_position)
    }

    pub(crate) fn new_end(&self) -> Length {
        Length::new(self.new_end_byte, self.new_end_position)
    }

    /// The replaced range in the old text
    pub fn old_range(&self) -> TextRange {
        TextRange::new(TextSize::new(self.start_byte), TextSize::new(self.old_end_byte))
    }

    /// The inserted range in the new text
    pub fn new_range(&self) -> TextRange {
        TextRange::new(TextSize::new(self.start_byte), TextSize::new(self.new_end_byte))
    }

    /// Net change in document length
    pub fn delta(&self) -> i64 {
        i64::from(self.new_end_byte) - i64::from(self.old_end_byte)
    }

    /// Check whether the edit changes nothing
    pub fn is_noop(&self) -> bool {
        self.start_byte == self.old_end_byte && self.start_byte == self.new_end_byte
    }

    /// Apply the edit to the old text, producing the new text
    ///
    /// # Panics
    ///
    /// Panics if the edited range does not lie on char boundaries of
    /// `old_text`, e.g. when the edit was built from a different text.
    pub fn apply(&self, old_text: &str, replacement: &str) -> String {
        let mut text = String::with_capacity(old_text.len() + replacement.len());
        text.push_str(&old_text[..self.start_byte as usize]);
        text.push_str(replacement);
        text.push_str(&old_text[self.old_end_byte as usize..]);
        text
    }
}
