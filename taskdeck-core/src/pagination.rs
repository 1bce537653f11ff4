use std::fmt;

/// Previous/next control for a paged list. Only exists when there is more
/// than one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: u32,
    total_pages: u32,
}

impl Pagination {
    pub fn new(current_page: u32, total_pages: u32) -> Option<Self> {
        if total_pages <= 1 {
            return None;
        }
        Some(Self {
            current_page,
            total_pages,
        })
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 0
    }

    pub fn has_next(&self) -> bool {
        self.current_page + 1 < self.total_pages
    }

    pub fn previous_page(&self) -> Option<u32> {
        self.has_previous().then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next().then(|| self.current_page + 1)
    }
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page {} of {}", self.current_page + 1, self.total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_disables_previous() {
        let p = Pagination::new(0, 5).unwrap();
        assert!(!p.has_previous());
        assert!(p.has_next());
        assert_eq!(p.previous_page(), None);
        assert_eq!(p.next_page(), Some(1));
    }

    #[test]
    fn last_page_disables_next() {
        let p = Pagination::new(4, 5).unwrap();
        assert!(p.has_previous());
        assert!(!p.has_next());
        assert_eq!(p.next_page(), None);
        assert_eq!(p.previous_page(), Some(3));
    }

    #[test]
    fn single_or_empty_page_renders_nothing() {
        assert_eq!(Pagination::new(0, 1), None);
        assert_eq!(Pagination::new(0, 0), None);
    }

    #[test]
    fn label_is_one_based() {
        assert_eq!(Pagination::new(2, 5).unwrap().to_string(), "Page 3 of 5");
    }
}
