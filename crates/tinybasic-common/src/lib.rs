use codespan_reporting::files::SimpleFiles;

pub mod symbols;
pub mod value;

pub use symbols::{Slot, SymbolTable};
pub use value::{ArithOp, RelOp, Value, ValueError};

/// Byte offset into source text.
pub type ByteOffset = usize;

/// A TinyBasic line number, as written at the start of each program line.
pub type LineNumber = u32;

/// Half-open byte range `start..end` into the program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: ByteOffset,
    pub end: ByteOffset,
}

impl Span {
    pub fn new(start: ByteOffset, end: ByteOffset) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn to_range(self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span {
            start: range.start,
            end: range.end,
        }
    }
}

/// Handle of a file registered in a [`SourceDb`].
pub type FileId = usize;

/// Source files that diagnostics are rendered against.
pub type SourceDb = SimpleFiles<String, String>;
