//! Position tracking for tokens and nodes
//!
//! Nodes never store absolute positions. Every subtree stores its [`Length`]
//! (bytes plus row/column extent) and absolute positions are recovered by
//! summing lengths while walking from the root. Shifting everything after an
//! edit is therefore free.

use std::fmt;
use std::ops::{Add, Sub};

use text_size::TextSize;

/// A row/column position in source text (0-indexed, column counted in bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };

    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A span of source text measured both in bytes and in rows/columns.
///
/// `extent` is relative: when `extent.row > 0` the column is the column of the
/// end position on the last row, otherwise it is the number of bytes on the
/// single row covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Length {
    pub bytes: TextSize,
    pub extent: Point,
}

impl Length {
    pub const ZERO: Length = Length {
        bytes: TextSize::new(0),
        extent: Point::ZERO,
    };

    pub const fn new(bytes: u32, extent: Point) -> Self {
        Self {
            bytes: TextSize::new(bytes),
            extent,
        }
    }

    /// Measure a piece of text
    pub fn of(text: &str) -> Self {
        let mut len = Length::ZERO;
        for c in text.chars() {
            len.advance(c);
        }
        len
    }

    /// Extend this length by one character
    #[inline]
    pub fn advance(&mut self, c: char) {
        let width = c.len_utf8() as u32;
        self.bytes += TextSize::new(width);
        if c == '\n' {
            self.extent.row += 1;
            self.extent.column = 0;
        } else {
            self.extent.column += width;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == TextSize::new(0)
    }

    /// Byte count as `u32`
    #[inline]
    pub fn byte_len(&self) -> u32 {
        self.bytes.into()
    }

    /// `self - other`, clamped at zero instead of underflowing
    pub fn saturating_sub(self, other: Length) -> Length {
        if self.bytes > other.bytes {
            self - other
        } else {
            Length::ZERO
        }
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        let extent = if rhs.extent.row > 0 {
            Point::new(self.extent.row + rhs.extent.row, rhs.extent.column)
        } else {
            Point::new(self.extent.row, self.extent.column + rhs.extent.column)
        };
        Length {
            bytes: self.bytes + rhs.bytes,
            extent,
        }
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        let extent = if self.extent.row > rhs.extent.row {
            Point::new(self.extent.row - rhs.extent.row, self.extent.column)
        } else {
            Point::new(0, self.extent.column.saturating_sub(rhs.extent.column))
        };
        Length {
            bytes: self.bytes.checked_sub(rhs.bytes).unwrap_or_default(),
            extent,
        }
    }
}
