//! Foundation types for the grove runtime.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`Point`], [`Length`] - Row/column positions and relative text lengths
//! - [`InputEdit`] - Text edits applied to parsed trees
//! - [`TextRange`], [`TextSize`] - Byte offsets (re-exported from text-size)
//!
//! This module has NO dependencies on other grove modules.

mod edit;
mod position;

pub use edit::InputEdit;
pub use position::{Length, Point};

// Re-export text-size types for convenience
pub use text_size::{self, TextRange, TextSize};
