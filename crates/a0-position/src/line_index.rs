//! Line index for converting byte offsets to 1-based line/column pairs.

/// Caches line-start byte offsets for a piece of source text so that
/// repeated offset→(line, column) conversions (one per token, one per
/// diagnostic) don't each re-scan the whole source.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts, len: text.len() }
    }

    /// Converts a byte offset into a 1-based `(line, column)` pair.
    /// Column counts Unicode scalar values, not bytes.
    pub fn offset_to_line_col(&self, text: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        let col = text.get(line_start..offset).map(|s| s.chars().count()).unwrap_or(0);
        (line as u32 + 1, col as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_first_column() {
        let text = "hello\nworld";
        let idx = LineIndex::new(text);
        assert_eq!(idx.offset_to_line_col(text, 0), (1, 1));
    }

    #[test]
    fn second_line() {
        let text = "hello\nworld";
        let idx = LineIndex::new(text);
        assert_eq!(idx.offset_to_line_col(text, 6), (2, 1));
        assert_eq!(idx.offset_to_line_col(text, 9), (2, 4));
    }

    #[test]
    fn unicode_columns_count_chars_not_bytes() {
        let text = "é = 1\nok";
        let idx = LineIndex::new(text);
        // 'é' is 2 bytes but 1 column; offset 2 is just after 'é'
        assert_eq!(idx.offset_to_line_col(text, 2), (1, 2));
    }

    #[test]
    fn offset_past_end_clamped() {
        let text = "abc";
        let idx = LineIndex::new(text);
        assert_eq!(idx.offset_to_line_col(text, 100), (1, 4));
    }
}
