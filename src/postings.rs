//! Cursor over a materialized postings list.

use crate::types::SeriesRef;

/// Series references for one `name=value` pair, in stored order.
///
/// The cursor starts before the first element; call [`ListPostings::advance`] (or iterate)
/// to move onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPostings {
    list: Vec<SeriesRef>,
    // Index of the current element; `None` until the first advance.
    cursor: Option<usize>,
}

impl ListPostings {
    pub fn new(list: Vec<SeriesRef>) -> Self {
        Self { list, cursor: None }
    }

    /// Moves to the next element. Returns false once the list is exhausted.
    pub fn advance(&mut self) -> bool {
        let n = self.cursor.map_or(0, |c| c + 1).min(self.list.len());
        self.cursor = Some(n);
        n < self.list.len()
    }

    /// The current element, if positioned on one.
    pub fn at(&self) -> Option<SeriesRef> {
        self.cursor.and_then(|c| self.list.get(c).copied())
    }

    /// Advances to the first element `>= x` and reports whether one exists.
    ///
    /// Never moves backwards: if the current element already satisfies `x` it stays put.
    /// The remainder is binary searched, which assumes it is ascending.
    pub fn seek(&mut self, x: SeriesRef) -> bool {
        if let Some(cur) = self.at() {
            if cur >= x {
                return true;
            }
        }
        let from = self.cursor.map_or(0, |c| (c + 1).min(self.list.len()));
        let i = from + self.list[from..].partition_point(|&v| v < x);
        self.cursor = Some(i);
        i < self.list.len()
    }

    /// Total number of references, independent of the cursor.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn into_vec(self) -> Vec<SeriesRef> {
        self.list
    }
}

impl Iterator for ListPostings {
    type Item = SeriesRef;

    fn next(&mut self) -> Option<SeriesRef> {
        if self.advance() {
            self.at()
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let consumed = self.cursor.map_or(0, |c| (c + 1).min(self.list.len()));
        let left = self.list.len() - consumed;
        (left, Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_before_first_element() {
        let mut p = ListPostings::new(vec![4, 8]);
        assert_eq!(p.at(), None);
        assert!(p.advance());
        assert_eq!(p.at(), Some(4));
        assert!(p.advance());
        assert_eq!(p.at(), Some(8));
        assert!(!p.advance());
        assert_eq!(p.at(), None);
        assert!(!p.advance());
    }

    #[test]
    fn iterates_in_stored_order_without_dedup() {
        let p = ListPostings::new(vec![3, 1, 4, 1, 5, 9]);
        assert_eq!(p.len(), 6);
        assert_eq!(p.collect::<Vec<_>>(), vec![3, 1, 4, 1, 5, 9]);
    }

    #[test]
    fn seek_never_moves_backwards() {
        let mut p = ListPostings::new(vec![2, 4, 6, 8, 10]);
        assert!(p.seek(5));
        assert_eq!(p.at(), Some(6));
        assert!(p.seek(3));
        assert_eq!(p.at(), Some(6));
        assert!(p.seek(8));
        assert_eq!(p.at(), Some(8));
        assert_eq!(p.next(), Some(10));
        assert!(!p.seek(11));
        assert_eq!(p.at(), None);
        assert!(!p.seek(0));
    }

    #[test]
    fn seek_from_start_includes_first_element() {
        let mut p = ListPostings::new(vec![7, 9]);
        assert!(p.seek(7));
        assert_eq!(p.at(), Some(7));

        let mut empty = ListPostings::new(Vec::new());
        assert!(!empty.seek(0));
        assert!(!empty.advance());
        assert_eq!(empty.size_hint(), (0, Some(0)));
    }

    #[test]
    fn size_hint_tracks_cursor() {
        let mut p = ListPostings::new(vec![1, 2, 3]);
        assert_eq!(p.size_hint(), (3, Some(3)));
        p.next();
        assert_eq!(p.size_hint(), (2, Some(2)));
        p.by_ref().for_each(drop);
        assert_eq!(p.size_hint(), (0, Some(0)));
    }
}
