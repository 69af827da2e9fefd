use serde::Serialize;

/// Offset-paged result envelope. `total_rows` comes from the query's window
/// count, so one round trip produces both the page and its bounds.
#[derive(Serialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows();
        }

        let next_offset = (current_offset + page_size < total_rows)
            .then_some(current_offset + page_size);
        let prev_offset = (current_offset > 0).then(|| (current_offset - page_size).max(0));

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: None,
            prev_offset: None,
        }
    }

    /// Swaps the page body while keeping the paging bounds, for result sets
    /// that are post-processed row by row.
    pub fn map_rows<U>(self, rows: Vec<U>) -> PageContext<U> {
        PageContext {
            rows,
            total_rows: self.total_rows,
            next_offset: self.next_offset,
            prev_offset: self.prev_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_links_both_ways() {
        let page = PageContext::from_rows(vec![1, 2, 3], 30, 3, 3);
        assert_eq!(page.next_offset, Some(6));
        assert_eq!(page.prev_offset, Some(0));
        assert_eq!(page.total_rows, 30);
    }

    #[test]
    fn first_page_has_no_prev() {
        let page = PageContext::from_rows(vec![1, 2, 3], 30, 3, 0);
        assert_eq!(page.prev_offset, None);
        assert_eq!(page.next_offset, Some(3));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = PageContext::from_rows(vec![1, 2, 3], 9, 3, 6);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(3));
    }

    #[test]
    fn empty_result_collapses() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, 3, 0);
        assert_eq!(page.total_rows, 0);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn map_rows_keeps_bounds() {
        let page = PageContext::from_rows(vec![1, 2, 3], 30, 3, 3);
        let mapped = page.map_rows(vec!["a", "b", "c"]);
        assert_eq!(mapped.next_offset, Some(6));
        assert_eq!(mapped.total_rows, 30);
    }
}
