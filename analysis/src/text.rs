//! Byte-offset to line/column mapping.

use hxlink_types::Position;

/// Precomputed line starts for a piece of source text.
///
/// Columns are byte columns within the line, which matches how the template
/// and routes scanners measure attribute offsets.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Zero-based position of a byte offset.
    ///
    /// Offsets past the end of the text clamp to the final line.
    #[must_use]
    pub fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let col = offset - self.line_starts[line];
        Position::new(line as u32, col as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let idx = LineIndex::new("hello");
        assert_eq!(idx.position(0), Position::new(0, 0));
        assert_eq!(idx.position(4), Position::new(0, 4));
    }

    #[test]
    fn test_line_boundaries() {
        let idx = LineIndex::new("ab\ncd\n");
        assert_eq!(idx.position(2), Position::new(0, 2));
        assert_eq!(idx.position(3), Position::new(1, 0));
        assert_eq!(idx.position(5), Position::new(1, 2));
        assert_eq!(idx.position(6), Position::new(2, 0));
    }

    #[test]
    fn test_empty_text() {
        let idx = LineIndex::new("");
        assert_eq!(idx.position(0), Position::new(0, 0));
    }
}
