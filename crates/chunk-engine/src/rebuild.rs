//! Turning windows back into exact source slices.

use crate::error::{ChunkerError, Result};
use crate::syntax::SyntaxNode;
use crate::types::{ByteRange, LineRange};
use crate::window::Window;

/// Byte offset of every line start, for line/byte conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            starts,
            len: text.len(),
        }
    }

    /// Number of lines; a trailing newline opens an empty last line
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Byte offset where `line` begins, clamped to the text length
    #[must_use]
    pub fn line_start(&self, line: usize) -> usize {
        self.starts.get(line).copied().unwrap_or(self.len)
    }

    /// Byte offset just past `line`, including its newline
    #[must_use]
    pub fn line_end(&self, line: usize) -> usize {
        self.starts.get(line + 1).copied().unwrap_or(self.len)
    }

    /// Line containing `offset` (binary search)
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        }
    }
}

/// The reconstructed slice for one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rebuilt {
    pub text: String,
    pub byte_range: ByteRange,
    pub line_range: LineRange,
}

/// Rebuild the text of a window.
///
/// Normal windows span from the first node's start to the last node's end.
/// Partial windows use their line ranges, clamped to the split node's bytes.
pub(crate) fn rebuild_window<N: SyntaxNode>(
    source: &str,
    lines: &LineIndex,
    window: &Window<N>,
) -> Result<Rebuilt> {
    let (Some(first), Some(last)) = (window.nodes.first(), window.nodes.last()) else {
        return Err(ChunkerError::internal("empty window reached the text rebuilder"));
    };

    let (byte_range, line_range) = if window.is_partial {
        partial_span(lines, window, first, last)?
    } else {
        let start_row = first.start_point().row;
        let end = last.end_point();
        // a node that swallows its trailing newline ends at column 0 of the next row
        let end_row = if end.column == 0 && end.row > start_row {
            end.row - 1
        } else {
            end.row
        };
        (
            ByteRange::new(first.start_byte(), last.end_byte()),
            LineRange::new(start_row, end_row),
        )
    };

    let text = source
        .get(byte_range.start..byte_range.end)
        .ok_or_else(|| {
            ChunkerError::internal(format!(
                "window bytes {}..{} do not slice the source ({} bytes)",
                byte_range.start,
                byte_range.end,
                source.len()
            ))
        })?
        .to_string();

    Ok(Rebuilt {
        text,
        byte_range,
        line_range,
    })
}

fn partial_span<N: SyntaxNode>(
    lines: &LineIndex,
    window: &Window<N>,
    first: &N,
    last: &N,
) -> Result<(ByteRange, LineRange)> {
    let start_line = window.line_ranges.iter().map(|r| r.start).min();
    let end_line = window.line_ranges.iter().map(|r| r.end).max();
    let (Some(start_line), Some(end_line)) = (start_line, end_line) else {
        return Err(ChunkerError::internal("partial window without line ranges"));
    };

    let start = lines.line_start(start_line).max(first.start_byte());
    let end = lines.line_end(end_line).min(last.end_byte());
    if start > end {
        return Err(ChunkerError::internal(format!(
            "partial window lines {start_line}..={end_line} fall outside their node"
        )));
    }

    Ok((ByteRange::new(start, end), LineRange::new(start_line, end_line)))
}
