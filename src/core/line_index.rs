/// Byte offset to 1-based line number mapping for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = Vec::with_capacity(source.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// Line containing `offset`, or `None` past the end of the text.
    pub fn line_of(&self, offset: usize) -> Option<usize> {
        if offset > self.len {
            return None;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        Some(line + 1)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_offsets_to_lines() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_of(0), Some(1));
        assert_eq!(index.line_of(2), Some(1));
        assert_eq!(index.line_of(3), Some(2));
        assert_eq!(index.line_of(6), Some(3));
        assert_eq!(index.line_of(7), Some(4));
        assert_eq!(index.line_of(9), Some(4));
        assert_eq!(index.line_of(10), None);
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn empty_source_has_one_line() {
        let index = LineIndex::new("");
        assert_eq!(index.line_of(0), Some(1));
        assert_eq!(index.line_of(1), None);
    }
}
