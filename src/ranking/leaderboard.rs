//! Paging and rank windows for leaderboards and listings.

use crate::config::RankingConfig;
use serde::Serialize;

/// Page request after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 0-based page index.
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Builds a page from optional query values, clamping `limit` to
    /// `1..=max_page_size`.
    pub fn new(page: Option<u32>, limit: Option<u32>, cfg: &RankingConfig) -> Self {
        let limit = limit.unwrap_or(cfg.page_size).clamp(1, cfg.max_page_size);
        Self {
            page: page.unwrap_or(0),
            limit,
        }
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.limit as i64
    }

    /// Ranks covered by this page (1-based, inclusive).
    pub fn rank_range(&self) -> RankWindow {
        let first = self.offset() + 1;
        RankWindow {
            first,
            last: first + self.limit as i64 - 1,
        }
    }

    pub fn wrap<T>(self, total: i64, entries: Vec<T>) -> Paged<T> {
        Paged {
            total: total.max(0) as u64,
            page: self.page,
            limit: self.limit,
            entries,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paged<T> {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub entries: Vec<T>,
}

/// Inclusive 1-based rank range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankWindow {
    pub first: i64,
    pub last: i64,
}

/// Window of ranks around `rank`: `before` entries above and `after` below,
/// each clamped to `max`. Never starts above rank 1.
pub fn window(rank: i64, before: u32, after: u32, max: u32) -> RankWindow {
    let before = before.min(max) as i64;
    let after = after.min(max) as i64;
    RankWindow {
        first: (rank - before).max(1),
        last: rank.max(1) + after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamp() {
        let cfg = RankingConfig::default();
        assert_eq!(Page::new(None, None, &cfg), Page { page: 0, limit: 20 });
        assert_eq!(Page::new(Some(2), Some(1000), &cfg).limit, 100);
        assert_eq!(Page::new(Some(2), Some(0), &cfg).limit, 1);
    }

    #[test]
    fn test_offset_and_ranks() {
        let page = Page { page: 3, limit: 25 };
        assert_eq!(page.offset(), 75);
        assert_eq!(page.rank_range(), RankWindow { first: 76, last: 100 });
    }

    #[test]
    fn test_window_in_the_middle() {
        let w = window(10, 3, 3, 25);
        assert_eq!(w, RankWindow { first: 7, last: 13 });
    }

    #[test]
    fn test_window_near_top() {
        assert_eq!(window(2, 5, 1, 25), RankWindow { first: 1, last: 3 });
        assert_eq!(window(1, 3, 0, 25), RankWindow { first: 1, last: 1 });
    }

    #[test]
    fn test_window_is_clamped() {
        assert_eq!(window(100, 1000, 1000, 25), RankWindow { first: 75, last: 125 });
    }
}
