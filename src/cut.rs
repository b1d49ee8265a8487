use anyhow::{bail, Result};

/// Leading/trailing trim counts applied to a raw chapter list.
///
/// Both sides are counts, not indices: `end: Some(2)` drops the last two items.
/// A missing or zero count leaves that side untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl CutRange {
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    fn leading(&self) -> usize {
        self.start.unwrap_or(0)
    }

    fn trailing(&self) -> usize {
        self.end.unwrap_or(0)
    }

    /// Returns the items left after trimming, in their original order.
    pub fn apply<T>(&self, items: Vec<T>) -> Result<Vec<T>> {
        let total = items.len();
        let (lead, trail) = (self.leading(), self.trailing());
        let Some(removed) = lead.checked_add(trail).filter(|&n| n <= total) else {
            bail!(
                "Cut range (start {}, end {}) removes more than the {} available items",
                lead,
                trail,
                total
            );
        };

        Ok(items
            .into_iter()
            .skip(lead)
            .take(total - removed)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn retains_total_minus_both_offsets_in_order() {
        for (start, end) in [(None, None), (Some(1), None), (None, Some(2)), (Some(2), Some(3))] {
            let cut = CutRange::new(start, end);
            let kept = cut.apply(items(10)).unwrap();
            let lead = start.unwrap_or(0);
            let trail = end.unwrap_or(0);
            assert_eq!(kept.len(), 10 - lead - trail);
            assert_eq!(kept, (lead..10 - trail).collect::<Vec<_>>());
        }
    }

    #[test]
    fn zero_counts_mean_no_trim() {
        let cut = CutRange::new(Some(0), Some(0));
        assert_eq!(cut.apply(items(4)).unwrap(), items(4));
    }

    #[test]
    fn cutting_everything_is_allowed() {
        let cut = CutRange::new(Some(2), Some(2));
        assert!(cut.apply(items(4)).unwrap().is_empty());
    }

    #[test]
    fn over_cut_is_rejected() {
        let cut = CutRange::new(Some(3), Some(2));
        let err = cut.apply(items(4)).unwrap_err();
        assert!(err.to_string().contains("4 available items"));
    }

    #[test]
    fn huge_counts_are_rejected_without_overflow() {
        let cut = CutRange::new(Some(usize::MAX), Some(1));
        assert!(cut.apply(items(3)).is_err());
        let cut = CutRange::new(Some(1), Some(usize::MAX));
        assert!(cut.apply(items(3)).is_err());
    }
}
