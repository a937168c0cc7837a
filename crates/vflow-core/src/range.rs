#![forbid(unsafe_code)]

//! Inclusive index intervals.
//!
//! [`IndexRange`] is the unit the engine reasons in: the window of indices
//! that need live cells, the span touched by a list change, the page of a
//! paginated viewport. Both bounds are inclusive. A range with `min > max`
//! is *invalid* and behaves as the empty set; [`IndexRange::INVALID`] is the
//! canonical instance and is what the engine reports when nothing is
//! displayed.
//!
//! # Invariants
//!
//! 1. `is_valid() <=> min() <= max()`.
//! 2. `len() == max - min + 1` for valid ranges, `0` otherwise.
//! 3. `contains(i) <=> is_valid() && min <= i <= max`.
//! 4. `intersection` is commutative and never larger than either operand.

use std::collections::BTreeSet;
use std::fmt;

/// An inclusive `[min, max]` interval of list indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRange {
    min: usize,
    max: usize,
}

impl IndexRange {
    /// The invalid (empty) range.
    pub const INVALID: Self = Self { min: 1, max: 0 };

    /// Create the range `[min, max]`.
    ///
    /// Returns [`IndexRange::INVALID`] when `min > max`.
    #[inline]
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        if min > max {
            Self::INVALID
        } else {
            Self { min, max }
        }
    }

    /// The single-index range `[index, index]`.
    #[inline]
    #[must_use]
    pub const fn single(index: usize) -> Self {
        Self {
            min: index,
            max: index,
        }
    }

    /// The range of `len` indices starting at `start`.
    ///
    /// `len == 0` yields [`IndexRange::INVALID`].
    #[inline]
    #[must_use]
    pub const fn of_len(start: usize, len: usize) -> Self {
        if len == 0 {
            Self::INVALID
        } else {
            Self {
                min: start,
                max: start.saturating_add(len - 1),
            }
        }
    }

    /// Lower bound (meaningless for invalid ranges).
    #[inline]
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// Upper bound (meaningless for invalid ranges).
    #[inline]
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Whether the range holds at least one index.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Number of indices in the range.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        if self.is_valid() {
            self.max - self.min + 1
        } else {
            0
        }
    }

    /// Whether the range is empty (equivalent to `!is_valid()`).
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// Whether `index` lies inside the range.
    #[inline]
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.is_valid() && index >= self.min && index <= self.max
    }

    /// Whether the two ranges share at least one index.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.intersection(other).is_valid()
    }

    /// The indices present in both ranges.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        if !self.is_valid() || !other.is_valid() {
            return Self::INVALID;
        }
        Self::new(self.min.max(other.min), self.max.min(other.max))
    }

    /// The smallest range covering both operands.
    ///
    /// Invalid operands are ignored; two invalid ranges span nothing.
    #[must_use]
    pub fn span(&self, other: &Self) -> Self {
        match (self.is_valid(), other.is_valid()) {
            (false, false) => Self::INVALID,
            (true, false) => *self,
            (false, true) => *other,
            (true, true) => Self::new(self.min.min(other.min), self.max.max(other.max)),
        }
    }

    /// Clamp the range to `[0, len - 1]`.
    #[must_use]
    pub fn clamp_to_len(&self, len: usize) -> Self {
        if len == 0 || !self.is_valid() || self.min >= len {
            return Self::INVALID;
        }
        Self::new(self.min, self.max.min(len - 1))
    }

    /// Translate the range by `delta`, saturating at `0`.
    ///
    /// Returns [`IndexRange::INVALID`] when the whole range would fall below
    /// zero.
    #[must_use]
    pub fn shift_by(&self, delta: isize) -> Self {
        if !self.is_valid() {
            return Self::INVALID;
        }
        if delta >= 0 {
            let d = delta.unsigned_abs();
            Self::new(self.min.saturating_add(d), self.max.saturating_add(d))
        } else {
            let d = delta.unsigned_abs();
            if self.max < d {
                return Self::INVALID;
            }
            Self::new(self.min.saturating_sub(d), self.max - d)
        }
    }

    /// Iterate the indices in ascending order.
    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        if self.is_valid() {
            self.min..=self.max
        } else {
            // An exhausted inclusive range.
            #[allow(clippy::reversed_empty_ranges)]
            {
                1..=0
            }
        }
    }

    /// Collect the indices into an ordered set.
    #[must_use]
    pub fn to_set(&self) -> BTreeSet<usize> {
        self.iter().collect()
    }

    /// Half-open equivalent (`min..max + 1`), empty for invalid ranges.
    #[must_use]
    pub fn as_std(&self) -> std::ops::Range<usize> {
        if self.is_valid() {
            self.min..self.max + 1
        } else {
            0..0
        }
    }
}

impl Default for IndexRange {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<std::ops::RangeInclusive<usize>> for IndexRange {
    fn from(r: std::ops::RangeInclusive<usize>) -> Self {
        Self::new(*r.start(), *r.end())
    }
}

impl IntoIterator for IndexRange {
    type Item = usize;
    type IntoIter = std::ops::RangeInclusive<usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "[{}, {}]", self.min, self.max)
        } else {
            f.write_str("[invalid]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_range_is_empty() {
        let r = IndexRange::INVALID;
        assert!(!r.is_valid());
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert!(!r.contains(0));
        assert!(!r.contains(1));
        assert_eq!(r.iter().count(), 0);
        assert_eq!(IndexRange::default(), IndexRange::INVALID);
    }

    #[test]
    fn new_with_inverted_bounds_is_invalid() {
        assert_eq!(IndexRange::new(5, 3), IndexRange::INVALID);
        assert_eq!(IndexRange::of_len(7, 0), IndexRange::INVALID);
    }

    #[test]
    fn len_and_contains() {
        let r = IndexRange::new(5, 14);
        assert_eq!(r.len(), 10);
        assert!(r.contains(5));
        assert!(r.contains(14));
        assert!(!r.contains(4));
        assert!(!r.contains(15));
        assert_eq!(IndexRange::single(3).len(), 1);
        assert_eq!(IndexRange::of_len(2, 4), IndexRange::new(2, 5));
    }

    #[test]
    fn intersection_cases() {
        let a = IndexRange::new(0, 10);
        let b = IndexRange::new(3, 13);
        assert_eq!(a.intersection(&b), IndexRange::new(3, 10));
        assert_eq!(b.intersection(&a), IndexRange::new(3, 10));

        let disjoint = IndexRange::new(20, 30);
        assert_eq!(a.intersection(&disjoint), IndexRange::INVALID);
        assert!(!a.overlaps(&disjoint));
        assert!(a.overlaps(&b));
        assert_eq!(a.intersection(&IndexRange::INVALID), IndexRange::INVALID);
    }

    #[test]
    fn span_ignores_invalid() {
        let a = IndexRange::new(2, 4);
        let b = IndexRange::new(8, 9);
        assert_eq!(a.span(&b), IndexRange::new(2, 9));
        assert_eq!(a.span(&IndexRange::INVALID), a);
        assert_eq!(IndexRange::INVALID.span(&b), b);
        assert_eq!(
            IndexRange::INVALID.span(&IndexRange::INVALID),
            IndexRange::INVALID
        );
    }

    #[test]
    fn clamp_to_len_trims_tail() {
        let r = IndexRange::new(5, 20);
        assert_eq!(r.clamp_to_len(10), IndexRange::new(5, 9));
        assert_eq!(r.clamp_to_len(5), IndexRange::INVALID);
        assert_eq!(r.clamp_to_len(0), IndexRange::INVALID);
        assert_eq!(r.clamp_to_len(100), r);
    }

    #[test]
    fn shift_by_both_directions() {
        let r = IndexRange::new(5, 9);
        assert_eq!(r.shift_by(3), IndexRange::new(8, 12));
        assert_eq!(r.shift_by(-5), IndexRange::new(0, 4));
        assert_eq!(r.shift_by(-7), IndexRange::new(0, 2));
        assert_eq!(r.shift_by(-10), IndexRange::INVALID);
    }

    #[test]
    fn iteration_and_sets() {
        let r = IndexRange::new(2, 5);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(r.into_iter().sum::<usize>(), 14);
        assert_eq!(r.to_set().len(), 4);
        assert_eq!(r.as_std(), 2..6);
        assert_eq!(IndexRange::INVALID.as_std(), 0..0);
        assert_eq!(IndexRange::from(1..=3), IndexRange::new(1, 3));
    }

    #[test]
    fn display() {
        assert_eq!(IndexRange::new(1, 4).to_string(), "[1, 4]");
        assert_eq!(IndexRange::INVALID.to_string(), "[invalid]");
    }
}
