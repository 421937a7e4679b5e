//! Zero-based source positions and ranges.
//!
//! LSP serializes a position as `{line, character}`; internally the column
//! field is called `col`. Both are zero-based, matching the wire protocol.

use serde::{Deserialize, Serialize};

/// A zero-based `(line, column)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    #[serde(rename = "character")]
    pub col: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// A half-open source span between two positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `pos` falls inside this range, bounds included.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}
