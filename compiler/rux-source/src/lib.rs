//! Source representation for the Rux compiler: byte spans into the
//! current compilation's source text, and the [SourceMap] that turns
//! them back into row/column positions for diagnostics.
pub mod location;

pub use location::{RowCol, Span};

/// The name given to a source read from standard input.
pub const STDIN_NAME: &str = "<stdin>";

/// An identifier as it appears in the source. The compiler is
/// single-module, so plain strings are cheap enough; everything
/// downstream borrows or clones these.
pub type Identifier = String;

/// Holds the contents of the source being compiled together with a
/// pre-computed table of line start offsets.
#[derive(Debug)]
pub struct SourceMap {
    /// Display name of the source, either a path or [STDIN_NAME].
    name: String,

    /// The raw contents of the source.
    contents: String,

    /// Byte offset of the start of every line, in ascending order.
    /// The first entry is always `0`.
    line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        let contents = contents.into();

        let mut line_starts = vec![0];
        for (offset, byte) in contents.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }

        Self { name: name.into(), contents, line_starts }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Resolve a byte offset into a zero-based row/column pair.
    pub fn row_col(&self, offset: u32) -> RowCol {
        let row = match self.line_starts.binary_search(&offset) {
            Ok(row) => row,
            Err(next_row) => next_row - 1,
        };

        RowCol { row: row as u32, col: offset - self.line_starts[row] }
    }

    /// The full text of the given zero-based row, without its line
    /// terminator.
    pub fn line(&self, row: u32) -> &str {
        let start = self.line_starts[row as usize] as usize;
        let end = self
            .line_starts
            .get(row as usize + 1)
            .map(|offset| *offset as usize)
            .unwrap_or(self.contents.len());

        self.contents[start..end].trim_end_matches(['\n', '\r'])
    }

    /// The slice of source text covered by the span.
    pub fn span_text(&self, span: Span) -> &str {
        &self.contents[span.start() as usize..span.end() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_col_resolution() {
        let map = SourceMap::new("<test>", "fn main() {\n    1\n}\n");

        assert_eq!(map.row_col(0), RowCol { row: 0, col: 0 });
        assert_eq!(map.row_col(12), RowCol { row: 1, col: 0 });
        assert_eq!(map.row_col(16), RowCol { row: 1, col: 4 });
        assert_eq!(map.line(1), "    1");
    }
}
