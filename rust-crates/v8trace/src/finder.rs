// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Point-containment lookup over a fixed collection of source ranges.

use intervaltree::{Element, IntervalTree};
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::fmt;
use std::ops::Range;

/// Immutable index answering "which ranges contain this point".
///
/// Built once from the half-open ranges of one file's entries; the value
/// reported for a hit is the range's insertion index, which callers use to
/// address the entry collection the finder was built from.
///
/// Ranges may nest and overlap arbitrarily. Queries run in `O(log n + k)`
/// through an interval tree and never mutate the finder, so a shared
/// instance can serve concurrent lookups without locking.
pub struct RangeFinder<P: Ord + Copy> {
    tree: Option<IntervalTree<P, u32>>,
    len: usize,
}

impl<P: Ord + Copy> fmt::Debug for RangeFinder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RangeFinder({} ranges)", self.len)
    }
}

impl<P: Ord + Copy> RangeFinder<P> {
    /// Build a finder from ranges in entry order.
    ///
    /// Empty ranges are kept but can never contain a point; callers index
    /// point events as one-unit-wide ranges instead.
    pub fn new(ranges: impl IntoIterator<Item = Range<P>>) -> Self {
        let elements: Vec<Element<P, u32>> = ranges
            .into_iter()
            .zip(0u32..)
            .map(|(range, index)| Element {
                range,
                value: index,
            })
            .collect();

        let len = elements.len();
        let tree = if elements.is_empty() {
            None
        } else {
            Some(elements.into_iter().collect())
        };

        Self { tree, len }
    }

    /// Number of indexed ranges.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the finder indexes no ranges at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All ranges containing `point`, most specific first.
    ///
    /// Hits are ordered by descending start, then ascending end, then
    /// insertion order: the innermost enclosing range comes first, so a
    /// caller scanning for the tightest enclosing function can stop at the
    /// first function hit.
    pub fn find(&self, point: P) -> SmallVec<[u32; 4]> {
        let Some(tree) = &self.tree else {
            return SmallVec::new();
        };

        Self::ordered(tree.query_point(point))
    }

    /// All ranges overlapping `range`, ordered like [`RangeFinder::find`].
    pub fn overlapping(&self, range: Range<P>) -> SmallVec<[u32; 4]> {
        let Some(tree) = &self.tree else {
            return SmallVec::new();
        };

        Self::ordered(tree.query(range))
    }

    fn ordered<'a>(hits: impl Iterator<Item = &'a Element<P, u32>>) -> SmallVec<[u32; 4]>
    where
        P: 'a,
    {
        let mut hits: SmallVec<[(P, P, u32); 4]> = hits
            .map(|e| (e.range.start, e.range.end, e.value))
            .collect();
        hits.sort_unstable_by_key(|&(start, end, index)| (Reverse(start), end, index));
        hits.into_iter().map(|(_, _, index)| index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder(ranges: &[(u32, u32)]) -> RangeFinder<u32> {
        RangeFinder::new(ranges.iter().map(|&(s, e)| s..e))
    }

    #[test]
    fn containment() {
        let finder = finder(&[(0, 10), (5, 8), (20, 25)]);

        // Innermost first: (5, 8) is more specific than (0, 10).
        assert_eq!(finder.find(6).as_slice(), &[1, 0]);

        assert_eq!(finder.find(0).as_slice(), &[0]);
        assert_eq!(finder.find(9).as_slice(), &[0]);
        assert!(finder.find(15).is_empty());

        // Start inclusive, end exclusive.
        assert_eq!(finder.find(20).as_slice(), &[2]);
        assert_eq!(finder.find(24).as_slice(), &[2]);
        assert!(finder.find(25).is_empty());
    }

    #[test]
    fn tie_break_at_shared_start() {
        let finder = finder(&[(0, 10), (0, 5)]);
        assert_eq!(finder.find(2).as_slice(), &[1, 0]);
        assert_eq!(finder.find(7).as_slice(), &[0]);
    }

    #[test]
    fn identical_ranges_keep_insertion_order() {
        let finder = finder(&[(3, 9), (3, 9), (3, 9)]);
        assert_eq!(finder.find(4).as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn empty() {
        let finder = finder(&[]);
        assert!(finder.is_empty());
        assert!(finder.find(0).is_empty());
        assert!(finder.overlapping(0..100).is_empty());
    }

    #[test]
    fn overlap_queries() {
        let finder = finder(&[(0, 10), (5, 8), (20, 25)]);
        assert_eq!(finder.overlapping(7..21).as_slice(), &[2, 1, 0]);
        assert!(finder.overlapping(10..20).is_empty());
        assert_eq!(finder.overlapping(24..40).as_slice(), &[2]);
    }

    #[test]
    fn position_space() {
        use crate::script::Position;

        let body = Position::new(1, 0)..Position::new(8, 1);
        let inner = Position::new(2, 4)..Position::new(4, 5);
        let finder = RangeFinder::new([body, inner]);

        assert_eq!(finder.find(Position::new(3, 0)).as_slice(), &[1, 0]);
        assert_eq!(finder.find(Position::new(6, 0)).as_slice(), &[0]);
        assert!(finder.find(Position::new(9, 0)).is_empty());
    }
}
