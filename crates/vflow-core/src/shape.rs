#![forbid(unsafe_code)]

//! Index shapes: how flat list indices are laid out along the scroll axis.
//!
//! A [`Flat`] list places one item per line. A [`Grid`] places `columns`
//! items per line in row-major order. The window calculator works in lines
//! and uses the shape to expand a line range into the item indices that must
//! be materialized; the position computer uses it to find each index's line
//! and column.
//!
//! Row-major grids shift linearly under insertion and removal, so the
//! reconciler never needs to know which shape it is working with.

use crate::range::IndexRange;

/// Mapping between flat item indices and lines along the primary axis.
pub trait IndexShape: Copy + std::fmt::Debug {
    /// Number of items on each line (always at least 1).
    fn per_line(&self) -> usize;

    /// Number of lines needed to hold `len` items.
    #[inline]
    fn lines(&self, len: usize) -> usize {
        len.div_ceil(self.per_line())
    }

    /// Line holding `index`.
    #[inline]
    fn line_of(&self, index: usize) -> usize {
        index / self.per_line()
    }

    /// Column of `index` within its line.
    #[inline]
    fn column_of(&self, index: usize) -> usize {
        index % self.per_line()
    }

    /// Item indices covered by `lines`, clamped to a list of `len` items.
    fn expand(&self, lines: IndexRange, len: usize) -> IndexRange {
        if !lines.is_valid() || len == 0 {
            return IndexRange::INVALID;
        }
        let per = self.per_line();
        let first = lines.min().saturating_mul(per);
        let last = lines
            .max()
            .saturating_add(1)
            .saturating_mul(per)
            .saturating_sub(1);
        IndexRange::new(first, last).clamp_to_len(len)
    }

    /// Lines touched by the item indices in `indices`.
    fn line_range(&self, indices: IndexRange) -> IndexRange {
        if !indices.is_valid() {
            return IndexRange::INVALID;
        }
        IndexRange::new(self.line_of(indices.min()), self.line_of(indices.max()))
    }
}

/// One item per line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flat;

impl IndexShape for Flat {
    #[inline]
    fn per_line(&self) -> usize {
        1
    }

    #[inline]
    fn lines(&self, len: usize) -> usize {
        len
    }

    #[inline]
    fn line_of(&self, index: usize) -> usize {
        index
    }

    #[inline]
    fn column_of(&self, _index: usize) -> usize {
        0
    }
}

/// Row-major grid with a fixed number of columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    columns: usize,
}

impl Grid {
    /// Create a grid; `columns` is raised to 1 if zero.
    #[must_use]
    pub const fn new(columns: usize) -> Self {
        Self {
            columns: if columns == 0 { 1 } else { columns },
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IndexShape for Grid {
    #[inline]
    fn per_line(&self) -> usize {
        self.columns
    }
}
