//! Non-whitespace (NWS) size accounting.
//!
//! Budgets are expressed in NWS characters: every character whose code point
//! is greater than 32. The threshold is fixed and ASCII-centric: Unicode
//! whitespace above it (NBSP, ideographic space) counts as NWS.

/// Code points at or below this value count as whitespace.
const WHITESPACE_CEILING: u8 = 32;

/// Prefix-sum table of NWS characters, indexed by byte offset.
///
/// `table[i]` is the number of NWS characters in `text[..i]`. A multi-byte
/// character is counted at its leading byte, so any range that starts and
/// ends on char boundaries gets an exact character count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeModel {
    table: Vec<usize>,
}

impl SizeModel {
    /// Build the cumulative table for `text` in one pass
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut table = Vec::with_capacity(text.len() + 1);
        let mut running = 0usize;
        table.push(running);
        for &byte in text.as_bytes() {
            if counts_as_nws(byte) {
                running += 1;
            }
            table.push(running);
        }
        Self { table }
    }

    /// NWS characters in `[start, end)`, O(1).
    ///
    /// Offsets past the end of the text are clamped; an inverted range is empty.
    #[must_use]
    pub fn query(&self, start: usize, end: usize) -> usize {
        let last = self.table.len() - 1;
        let end = end.min(last);
        let start = start.min(end);
        self.table[end] - self.table[start]
    }

    /// NWS characters in the whole text
    #[must_use]
    pub fn total(&self) -> usize {
        self.table.last().copied().unwrap_or(0)
    }

    /// Length of the indexed text in bytes
    #[must_use]
    pub fn text_len(&self) -> usize {
        self.table.len() - 1
    }
}

/// Count the NWS characters of a string directly.
#[must_use]
pub fn nws_count(text: &str) -> usize {
    text.bytes().filter(|&b| counts_as_nws(b)).count()
}

// UTF-8 continuation bytes (10xxxxxx) never start a character.
const fn counts_as_nws(byte: u8) -> bool {
    byte > WHITESPACE_CEILING && (byte & 0b1100_0000) != 0b1000_0000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_ascii_non_whitespace() {
        let model = SizeModel::new("fn a() {}\n");
        assert_eq!(model.total(), 7);
        assert_eq!(model.query(0, 2), 2);
        assert_eq!(model.query(2, 3), 0);
        assert_eq!(model.text_len(), 10);
    }

    #[test]
    fn control_characters_are_whitespace() {
        // \x1f and \x0b are <= 32 and therefore whitespace under the fixed threshold
        assert_eq!(nws_count("a\x1fb\x0bc\t\r\n d"), 4);
    }

    #[test]
    fn non_ascii_whitespace_is_counted() {
        // U+00A0 and U+3000 are Unicode whitespace but above the threshold
        let text = "a\u{00A0}b\u{3000}";
        assert_eq!(nws_count(text), 4);
        assert_eq!(SizeModel::new(text).total(), 4);
    }

    #[test]
    fn multibyte_characters_count_once() {
        let text = "é日本";
        let model = SizeModel::new(text);
        assert_eq!(model.total(), 3);
        assert_eq!(model.query(0, "é".len()), 1);
    }

    #[test]
    fn query_clamps_out_of_range() {
        let model = SizeModel::new("abc");
        assert_eq!(model.query(1, 99), 2);
        assert_eq!(model.query(3, 1), 0);
        assert_eq!(model.query(0, 0), 0);
    }

    #[test]
    fn empty_text() {
        let model = SizeModel::new("");
        assert_eq!(model.total(), 0);
        assert_eq!(model.query(0, 10), 0);
    }
}
