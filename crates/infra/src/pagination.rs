/// SQL-level window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: i64,
    pub offset: i64,
}

impl Default for LimitOffset {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

impl LimitOffset {
    /// Build from a 1-based page number. Offsets past `i64::MAX` saturate.
    pub fn from_page(limit: i64, page: i64) -> Self {
        Self {
            limit,
            offset: page.saturating_sub(1).max(0).saturating_mul(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_offset() {
        assert_eq!(LimitOffset::from_page(10, 1).offset, 0);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        assert_eq!(LimitOffset::from_page(100, i64::MAX).offset, i64::MAX);
        assert_eq!(LimitOffset::from_page(10, i64::MIN).offset, 0);
    }

    #[test]
    fn later_pages_skip_previous_rows() {
        let lo = LimitOffset::from_page(25, 3);
        assert_eq!(lo.limit, 25);
        assert_eq!(lo.offset, 50);
    }
}
