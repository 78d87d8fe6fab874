use serde::Serialize;

/// How many numbered links the page navigation shows around the current page.
const NAV_WINDOW: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl Pagination {
    /// `pages = ceil(total / limit)`; `page` is clamped into `[1, max(1, pages)]`.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        let pages = u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX);
        let page = page.clamp(1, pages.max(1));
        Self {
            page,
            limit,
            total,
            pages,
        }
    }

    pub fn empty(limit: u32) -> Self {
        Self::new(1, limit, 0)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    /// Navigation model for the prev / numbered / next controls.
    pub fn nav(&self) -> PageNav {
        let last = self.pages.max(1);
        let first_shown = self.page.saturating_sub(NAV_WINDOW).max(1);
        let last_shown = (self.page + NAV_WINDOW).min(last);
        PageNav {
            previous: self.has_previous().then(|| self.page - 1),
            next: self.has_next().then(|| self.page + 1),
            numbers: (first_shown..=last_shown)
                .map(|number| PageLink {
                    number,
                    current: number == self.page,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageNav {
    pub previous: Option<u32>,
    pub next: Option<u32>,
    pub numbers: Vec<PageLink>,
}

impl PageNav {
    pub fn previous_disabled(&self) -> bool {
        self.previous.is_none()
    }

    pub fn next_disabled(&self) -> bool {
        self.next.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub number: u32,
    pub current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_page_count_by_ceiling() {
        let pagination = Pagination::new(1, 8, 23);
        assert_eq!(pagination.pages, 3);

        let nav = pagination.nav();
        assert!(nav.previous_disabled());
        assert!(!nav.next_disabled());
        assert_eq!(nav.next, Some(2));
        assert_eq!(
            nav.numbers.iter().map(|l| l.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(nav.numbers[0].current);
    }

    #[test]
    fn page_is_clamped_into_range() {
        assert_eq!(Pagination::new(9, 8, 23).page, 3);
        assert_eq!(Pagination::new(0, 8, 23).page, 1);
        let empty = Pagination::empty(8);
        assert_eq!((empty.page, empty.pages), (1, 0));
        assert!(empty.nav().next_disabled());
        assert!(empty.nav().previous_disabled());
    }

    #[test]
    fn last_page_disables_next() {
        let nav = Pagination::new(3, 8, 23).nav();
        assert_eq!(nav.previous, Some(2));
        assert!(nav.next_disabled());
    }

    #[test]
    fn numbered_links_are_windowed() {
        let nav = Pagination::new(10, 10, 500).nav();
        assert_eq!(
            nav.numbers.iter().map(|l| l.number).collect::<Vec<_>>(),
            vec![8, 9, 10, 11, 12]
        );
    }
}
