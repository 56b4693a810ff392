//! Scroll-insensitive cursor over materialized results.

/// A cursor over rows read ahead of time.
///
/// The cursor starts before the first row. Moving past either end leaves
/// it just outside the rows, where [`get`](Self::get) returns `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollableResults<R> {
    rows: Vec<R>,
    // -1 is before the first row, rows.len() after the last
    cursor: isize,
}

impl<R> ScrollableResults<R> {
    #[must_use]
    pub const fn new(rows: Vec<R>) -> Self {
        Self { rows, cursor: -1 }
    }

    fn end(&self) -> isize {
        isize::try_from(self.rows.len()).unwrap_or(isize::MAX)
    }

    fn on_row(&self) -> bool {
        self.cursor >= 0 && self.cursor < self.end()
    }

    /// Moves to the next row.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.cursor < self.end() {
            self.cursor += 1;
        }
        self.on_row()
    }

    /// Moves to the previous row.
    pub fn previous(&mut self) -> bool {
        if self.cursor >= 0 {
            self.cursor -= 1;
        }
        self.on_row()
    }

    pub fn first(&mut self) -> bool {
        self.cursor = if self.rows.is_empty() { -1 } else { 0 };
        self.on_row()
    }

    pub fn last(&mut self) -> bool {
        self.cursor = self.end() - 1;
        self.on_row()
    }

    /// Moves `offset` rows relative to the current position.
    pub fn scroll(&mut self, offset: isize) -> bool {
        self.cursor = self.cursor.saturating_add(offset).clamp(-1, self.end());
        self.on_row()
    }

    /// Zero-based index of the current row.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        if self.on_row() {
            usize::try_from(self.cursor).ok()
        } else {
            None
        }
    }

    /// The current row.
    #[must_use]
    pub fn get(&self) -> Option<&R> {
        self.position().and_then(|i| self.rows.get(i))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remaining rows are dropped with the cursor.
    #[must_use]
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_positioning() {
        let mut results = ScrollableResults::new(vec!["other", "value"]);

        assert!(!results.previous());
        assert!(results.next());
        assert_eq!(results.get(), Some(&"other"));
        assert!(results.next());
        assert_eq!(results.get(), Some(&"value"));
        assert!(!results.next());
        assert_eq!(results.get(), None);

        assert!(results.previous());
        assert_eq!(results.get(), Some(&"value"));
        assert!(results.previous());
        assert_eq!(results.get(), Some(&"other"));
        assert!(!results.previous());
        assert!(!results.previous());

        assert!(results.last());
        assert_eq!(results.get(), Some(&"value"));
        assert!(results.first());
        assert_eq!(results.position(), Some(0));
        assert!(results.scroll(1));
        assert_eq!(results.get(), Some(&"value"));
        assert!(results.scroll(-1));
        assert_eq!(results.get(), Some(&"other"));
        assert!(!results.scroll(5));
        assert!(results.previous());
        assert_eq!(results.get(), Some(&"value"));
    }

    #[test]
    fn test_empty() {
        let mut results = ScrollableResults::<i64>::new(Vec::new());
        assert!(!results.first());
        assert!(!results.last());
        assert!(!results.next());
        assert_eq!(results.position(), None);
        assert!(results.is_empty());
    }
}
