//! Page-number pagination over ordered result sets.
//!
//! Out-of-range page numbers never fail: anything below 1 serves page 1,
//! anything past the end serves the last page, and a missing or non-numeric
//! page number serves page 1. An empty sequence still has one (empty) page.

use serde::{Deserialize, Serialize};

/// Items per page when configuration does not say otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// `?page=` query parameter, kept as raw text so junk input degrades to page 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> i64 {
        parse_page_number(self.page.as_deref())
    }
}

/// Integers too large for `i64` saturate so they still clamp to the last
/// (or first) page; anything else non-numeric means page 1.
pub fn parse_page_number(raw: Option<&str>) -> i64 {
    let Some(value) = raw.map(str::trim) else {
        return 1;
    };

    match value.parse::<i64>() {
        Ok(number) => number,
        Err(_) => {
            let (negative, digits) = match value.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, value.strip_prefix('+').unwrap_or(value)),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                1
            } else if negative {
                i64::MIN
            } else {
                i64::MAX
            }
        }
    }
}

/// The resolved position of one page inside a result set of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl PageWindow {
    pub fn resolve(total_items: usize, requested: i64, size: usize) -> Self {
        let size = size.max(1);
        let total_pages = total_items.div_ceil(size).max(1);
        let number = if requested < 1 {
            1
        } else {
            usize::try_from(requested)
                .unwrap_or(usize::MAX)
                .min(total_pages)
        };

        Self {
            number,
            size,
            total_items,
            total_pages,
        }
    }

    pub fn offset(&self) -> usize {
        (self.number - 1) * self.size
    }

    /// Number of items this page actually holds.
    pub fn len(&self) -> usize {
        self.total_items
            .saturating_sub(self.offset())
            .min(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn from_window(items: Vec<T>, window: PageWindow) -> Self {
        debug_assert!(items.len() <= window.size);
        Self {
            items,
            number: window.number,
            page_size: window.size,
            total_items: window.total_items,
            total_pages: window.total_pages,
            has_previous: window.number > 1,
            has_next: window.number < window.total_pages,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous.then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next.then(|| self.number + 1)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

/// Slice an in-memory sequence. The source is only read.
pub fn paginate<T: Clone>(items: &[T], requested: i64, size: usize) -> Page<T> {
    let window = PageWindow::resolve(items.len(), requested, size);
    let start = window.offset();
    let slice = items[start..start + window.len()].to_vec();
    Page::from_window(slice, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_items_split_ten_and_three() {
        let items: Vec<u32> = (1..=13).collect();

        let first = paginate(&items, 1, 10);
        assert_eq!(first.len(), 10);
        assert_eq!(first.number, 1);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert_eq!(first.total_pages, 2);

        let second = paginate(&items, 2, 10);
        assert_eq!(second.items, vec![11, 12, 13]);
        assert!(!second.has_next);
        assert!(second.has_previous);
    }

    #[test]
    fn page_past_the_end_clamps_to_last() {
        let items: Vec<u32> = (1..=13).collect();
        let clamped = paginate(&items, 3, 10);
        assert_eq!(clamped, paginate(&items, 2, 10));
        assert_eq!(paginate(&items, i64::MAX, 10).number, 2);
    }

    #[test]
    fn page_below_one_clamps_to_first() {
        let items: Vec<u32> = (1..=13).collect();
        assert_eq!(paginate(&items, 0, 10), paginate(&items, 1, 10));
        assert_eq!(paginate(&items, -7, 10).number, 1);
    }

    #[test]
    fn empty_sequence_has_single_empty_page() {
        let items: Vec<u32> = Vec::new();
        let page = paginate(&items, 5, 10);
        assert!(page.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next && !page.has_previous);
    }

    #[test]
    fn concatenated_pages_reproduce_sequence() {
        for len in 0..40usize {
            for size in 1..12usize {
                let items: Vec<usize> = (0..len).collect();
                let total_pages = paginate(&items, 1, size).total_pages;
                let mut rebuilt = Vec::new();
                let mut last_number = 0;
                for n in 1..=total_pages as i64 {
                    let page = paginate(&items, n, size);
                    assert!(page.number >= last_number);
                    assert!(page.len() <= size);
                    last_number = page.number;
                    rebuilt.extend(page.items);
                }
                assert_eq!(rebuilt, items, "len={len} size={size}");
            }
        }
    }

    #[test]
    fn page_numbers_parse_leniently() {
        assert_eq!(parse_page_number(None), 1);
        assert_eq!(parse_page_number(Some("abc")), 1);
        assert_eq!(parse_page_number(Some("")), 1);
        assert_eq!(parse_page_number(Some(" 3 ")), 3);
        assert_eq!(parse_page_number(Some("-2")), -2);
        assert_eq!(PageQuery { page: Some("2".into()) }.number(), 2);
    }

    #[test]
    fn oversized_page_numbers_clamp_to_the_ends() {
        assert_eq!(parse_page_number(Some("99999999999999999999")), i64::MAX);
        assert_eq!(parse_page_number(Some("-99999999999999999999")), i64::MIN);
        assert_eq!(parse_page_number(Some("9999999999999999999x")), 1);

        let items: Vec<u32> = (1..=13).collect();
        let last = paginate(&items, parse_page_number(Some("99999999999999999999")), 10);
        assert_eq!(last.number, 2);
        assert_eq!(last.items, vec![11, 12, 13]);
        let first = paginate(&items, parse_page_number(Some("-99999999999999999999")), 10);
        assert_eq!(first.number, 1);
    }

    #[test]
    fn navigation_numbers() {
        let items: Vec<u32> = (1..=25).collect();
        let middle = paginate(&items, 2, 10);
        assert_eq!(middle.previous_page_number(), Some(1));
        assert_eq!(middle.next_page_number(), Some(3));
        let mapped = middle.map(|n| n * 2);
        assert_eq!(mapped.items[0], 22);
        assert_eq!(mapped.number, 2);
    }
}
