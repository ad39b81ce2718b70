//! External scanner for the Talon language
//!
//! Talon is indentation-sensitive and has interpolated strings, neither of
//! which a DFA can lex. This scanner produces the layout tokens (newline,
//! indent, dedent) and the string delimiters/content.
//!
//! Whitespace and `#` comments consumed while looking for a layout token are
//! part of that token, so trees built with this scanner stay lossless.

use super::external::{ExternalScanner, ScanInput};

/// External tokens in the order the Talon tables declare them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum TalonToken {
    Newline = 0,
    Indent,
    Dedent,
    StringStart,
    StringContent,
    StringEnd,
    Comment,
}

impl TalonToken {
    pub const COUNT: usize = 7;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Some(match index {
            0 => Self::Newline,
            1 => Self::Indent,
            2 => Self::Dedent,
            3 => Self::StringStart,
            4 => Self::StringContent,
            5 => Self::StringEnd,
            6 => Self::Comment,
            _ => return None,
        })
    }
}

/// Tabs count as this many columns of indentation
const TAB_WIDTH: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Single,
    Double,
}

impl Delimiter {
    const SINGLE_QUOTE: u8 = 1 << 0;
    const DOUBLE_QUOTE: u8 = 1 << 1;

    fn for_char(c: char) -> Option<Self> {
        match c {
            '\'' => Some(Self::Single),
            '"' => Some(Self::Double),
            _ => None,
        }
    }

    fn end_char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }

    fn flags(self) -> u8 {
        match self {
            Self::Single => Self::SINGLE_QUOTE,
            Self::Double => Self::DOUBLE_QUOTE,
        }
    }

    fn from_flags(flags: u8) -> Option<Self> {
        if flags & Self::SINGLE_QUOTE != 0 {
            Some(Self::Single)
        } else if flags & Self::DOUBLE_QUOTE != 0 {
            Some(Self::Double)
        } else {
            None
        }
    }
}

/// Scanner state: indentation of the current block and open string delimiters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TalonScanner {
    previous_indent: u16,
    delimiters: Vec<Delimiter>,
}

impl TalonScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indentation of the current block, in columns
    pub fn indent(&self) -> u16 {
        self.previous_indent
    }

    /// Number of strings currently open
    pub fn open_strings(&self) -> usize {
        self.delimiters.len()
    }

    fn scan_string_content(
        &mut self,
        input: &mut ScanInput<'_>,
        end_char: char,
    ) -> Option<TalonToken> {
        let mut has_content = false;
        while let Some(c) = input.lookahead() {
            if c == '{' || c == '}' || c == '\\' {
                input.mark_end();
                return has_content.then_some(TalonToken::StringContent);
            }
            if c == end_char {
                let token = if has_content {
                    TalonToken::StringContent
                } else {
                    input.advance();
                    self.delimiters.pop();
                    TalonToken::StringEnd
                };
                input.mark_end();
                return Some(token);
            }
            if c == '\n' && has_content {
                return None;
            }
            input.advance();
            has_content = true;
        }
        None
    }
}

fn advance_line(input: &mut ScanInput<'_>) {
    while input.lookahead().is_some_and(|c| c != '\n') {
        input.advance();
    }
    input.advance();
}

impl ExternalScanner for TalonScanner {
    fn scan(&mut self, input: &mut ScanInput<'_>, valid: &[bool]) -> Option<usize> {
        let is_valid = |token: TalonToken| valid.get(token.index()).copied().unwrap_or(false);

        if is_valid(TalonToken::StringContent) {
            if let Some(end_char) = self.delimiters.last().map(|d| d.end_char()) {
                if let Some(token) = self.scan_string_content(input, end_char) {
                    return Some(token.index());
                }
                if !input.is_eof() {
                    return None;
                }
            }
        }

        let mut found_end_of_line = false;
        let mut indent: u32 = 0;
        let mut first_comment_indent: Option<u32> = None;

        loop {
            match input.lookahead() {
                Some('\n') => {
                    found_end_of_line = true;
                    indent = 0;
                    input.advance();
                }
                Some(' ') => {
                    indent += 1;
                    input.advance();
                }
                Some('\t') => {
                    indent += TAB_WIDTH;
                    input.advance();
                }
                Some('\r' | '\x0c') => {
                    indent = 0;
                    input.advance();
                }
                Some('#') => {
                    first_comment_indent.get_or_insert(indent);
                    advance_line(input);
                    indent = 0;
                }
                Some(_) => break,
                None => {
                    indent = 0;
                    found_end_of_line = true;
                    break;
                }
            }
        }
        input.mark_end();

        if found_end_of_line {
            if is_valid(TalonToken::Indent) && self.previous_indent == 0 && indent > 0 {
                self.previous_indent = indent.min(u16::MAX as u32) as u16;
                return Some(TalonToken::Indent.index());
            }

            // Dedent only after comments indented like the block have been consumed
            let previous = u32::from(self.previous_indent);
            if is_valid(TalonToken::Dedent)
                && previous > 0
                && indent == 0
                && first_comment_indent.is_none_or(|comment| comment < previous)
            {
                self.previous_indent = 0;
                return Some(TalonToken::Dedent.index());
            }

            if is_valid(TalonToken::Newline) {
                return Some(TalonToken::Newline.index());
            }
        }

        if first_comment_indent.is_none() && is_valid(TalonToken::StringStart) {
            if let Some(delimiter) = input.lookahead().and_then(Delimiter::for_char) {
                input.advance();
                input.mark_end();
                self.delimiters.push(delimiter);
                return Some(TalonToken::StringStart.index());
            }
        }

        None
    }

    fn serialize(&self, buffer: &mut Vec<u8>) {
        let count = self.delimiters.len().min(u8::MAX as usize);
        buffer.push(count as u8);
        buffer.extend(self.delimiters[..count].iter().map(|d| d.flags()));
        buffer.push(self.previous_indent.min(u8::MAX as u16) as u8);
    }

    fn deserialize(&mut self, state: &[u8]) {
        self.previous_indent = 0;
        self.delimiters.clear();

        let Some((&count, rest)) = state.split_first() else {
            return;
        };
        let count = (count as usize).min(rest.len());
        self.delimiters
            .extend(rest[..count].iter().filter_map(|flags| Delimiter::from_flags(*flags)));
        if let Some(&indent) = rest.get(count) {
            self.previous_indent = u16::from(indent);
        }
    }
}
