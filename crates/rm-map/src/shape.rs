//! Shape store: interior polyline vertices of lines.
//!
//! Shape points are `i16` deltas, each relative to the previous vertex, and
//! the first one relative to the line's `from` point.  They are only
//! meaningful when accumulated in ascending order: [`ShapeStore::get_position`]
//! mutates an accumulator and [`ShapeWalk`] wraps that contract in an
//! iterator.
//!
//! `shape/byline` is sorted by line id.  [`ShapeStore::of_line`] binary
//! searches it between caller hints (neighbouring lines tend to sit next to
//! each other in the table) and remembers misses in a per-line bitmask so a
//! line without shapes is only searched once per context.

use std::cell::RefCell;

use rm_core::{LineId, Position, ShapeId, SquareId};

use crate::database::{read_i16, read_i32, MapDatabase, RawRange, Record, Table};
use crate::point::checked_range;
use crate::square::{SquareRange, SquareTable};
use crate::MapResult;

/// One encoded shape delta.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawShape {
    pub delta_longitude: i16,
    pub delta_latitude:  i16,
}

impl Record for RawShape {
    const STRIDE: usize = 4;
    fn decode(b: &[u8]) -> Self {
        Self { delta_longitude: read_i16(b, 0), delta_latitude: read_i16(b, 2) }
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.delta_longitude.to_le_bytes());
        out.extend_from_slice(&self.delta_latitude.to_le_bytes());
    }
}

/// `shape/byline` row: the shape range of one line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawShapeByLine {
    pub line:  i32,
    pub first: i32,
    pub count: i32,
}

impl Record for RawShapeByLine {
    const STRIDE: usize = 12;
    fn decode(b: &[u8]) -> Self {
        Self { line: read_i32(b, 0), first: read_i32(b, 4), count: read_i32(b, 8) }
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.line.to_le_bytes());
        out.extend_from_slice(&self.first.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
    }
}

const MASK_BITS: usize = u64::BITS as usize;

pub struct ShapeStore {
    shapes:     Table<RawShape>,
    by_line:    Table<RawShapeByLine>,
    by_square:  Table<RawRange>,
    /// One bit per line: set once a lookup proved the line has no shapes.
    no_shapes:  RefCell<Vec<u64>>,
    line_count: usize,
}

impl ShapeStore {
    pub fn map(db: &MapDatabase, squares: &SquareTable, line_count: usize) -> MapResult<Self> {
        Ok(Self {
            shapes:     Table::open(db, "shape/data")?,
            by_line:    Table::open(db, "shape/byline")?,
            by_square:  Table::open_with_count(db, "shape/bysquare", squares.count())?,
            no_shapes:  RefCell::new(vec![0; line_count / MASK_BITS + 1]),
            line_count,
        })
    }

    pub fn count(&self) -> usize {
        self.shapes.count()
    }

    /// Number of lines that have at least one shape point.
    pub fn line_count_with_shapes(&self) -> usize {
        self.by_line.count()
    }

    /// Shapes of the lines owned by `square`.
    pub fn in_square(&self, squares: &SquareTable, square: SquareId) -> MapResult<SquareRange> {
        let Some(index) = squares.square_index(square) else {
            return Ok(SquareRange::EMPTY);
        };
        checked_range(self.by_square.get(index)?, "shape/bysquare", self.shapes.count())
    }

    /// Whether an earlier lookup already proved `line` has no shapes.
    pub(crate) fn known_empty(&self, line: LineId) -> bool {
        line.index() < self.line_count
            && self.no_shapes.borrow()[line.index() / MASK_BITS] & (1u64 << (line.index() % MASK_BITS)) != 0
    }

    fn mark_empty(&self, line: LineId) {
        if line.index() < self.line_count {
            self.no_shapes.borrow_mut()[line.index() / MASK_BITS] |= 1u64 << (line.index() % MASK_BITS);
        }
    }

    /// Shape range of `line`, searching `shape/byline` rows `begin..=end`.
    ///
    /// Hints that do not bracket the line fall back to the whole table, so a
    /// bad hint costs time but never a wrong answer.
    pub fn of_line(&self, line: LineId, begin: usize, end: usize) -> MapResult<SquareRange> {
        if self.known_empty(line) {
            return Ok(SquareRange::EMPTY);
        }

        let n = self.by_line.count();
        if n == 0 {
            self.mark_empty(line);
            return Ok(SquareRange::EMPTY);
        }

        let target = line.0 as i64;
        let row_line = |i: usize| -> MapResult<i64> { Ok(self.by_line.get(i)?.line as i64) };

        let mut lo = begin.min(n - 1);
        let mut hi = end.min(n - 1).max(lo);
        if row_line(lo)? > target || row_line(hi)? < target {
            lo = 0;
            hi = n - 1;
        }

        // Open interval (begin, end) around the candidate rows.
        let mut begin = lo as isize - 1;
        let mut end = hi as isize + 1;
        while end - begin > 1 {
            let middle = (begin + end) / 2;
            let l = row_line(middle as usize)?;
            if target < l {
                end = middle;
            } else if target > l {
                begin = middle;
            } else {
                end = middle;
                break;
            }
        }

        if (end as usize) < n {
            let row = self.by_line.get(end as usize)?;
            if row.line as i64 == target {
                let range = checked_range(
                    RawRange { first: row.first, count: row.count },
                    "shape/byline",
                    self.shapes.count(),
                )?;
                return Ok(range);
            }
        }

        self.mark_empty(line);
        Ok(SquareRange::EMPTY)
    }

    /// Shape range of `line`, searching the whole table.
    pub fn shapes_of_line(&self, line: LineId) -> MapResult<SquareRange> {
        self.of_line(line, 0, self.by_line.count().saturating_sub(1))
    }

    /// Add the delta of `shape` to `position`.
    ///
    /// Must be called for a line's shapes in ascending order, starting from
    /// the line's `from` position; any other order yields meaningless
    /// coordinates.
    pub fn get_position(&self, shape: ShapeId, position: &mut Position) -> MapResult<()> {
        let raw = self.shapes.get(shape.index())?;
        *position = position.offset(raw.delta_longitude as i32, raw.delta_latitude as i32);
        Ok(())
    }

    /// Iterate the absolute shape positions of `range`, starting from `start`.
    pub fn walk(&self, range: SquareRange, start: Position) -> ShapeWalk<'_> {
        ShapeWalk { store: self, next: range.first, end: range.first + range.count, position: start }
    }
}

/// Sequential accumulator over one line's shape deltas.
pub struct ShapeWalk<'a> {
    store:    &'a ShapeStore,
    next:     u32,
    end:      u32,
    position: Position,
}

impl Iterator for ShapeWalk<'_> {
    type Item = MapResult<Position>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let shape = ShapeId(self.next);
        self.next += 1;
        Some(
            self.store
                .get_position(shape, &mut self.position)
                .map(|()| self.position),
        )
    }
}
