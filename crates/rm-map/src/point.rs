//! Point store: square-relative coordinates resolved on demand.
//!
//! A point is stored as an unsigned `(delta_longitude, delta_latitude)` pair
//! relative to the minimum corner of its square.  Resolving an arbitrary
//! point index needs its square, so the store builds a point → square
//! reverse index the first time a position is asked for and keeps it for the
//! life of the context.
//!
//! Lookups usually walk points square by square, so a one-entry cursor keeps
//! the last square and its corner.  The cursor belongs to the activation: it
//! is cleared every time the owning context is (re)activated.

use std::cell::Cell;

use once_cell::unsync::OnceCell;

use rm_core::{PointId, Position, SquareId};

use crate::database::{read_u16, MapDatabase, RawRange, Record, Table};
use crate::square::{SquareRange, SquareTable};
use crate::{MapError, MapResult};

/// One encoded point.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawPoint {
    pub delta_longitude: u16,
    pub delta_latitude:  u16,
}

impl Record for RawPoint {
    const STRIDE: usize = 4;
    fn decode(b: &[u8]) -> Self {
        Self { delta_longitude: read_u16(b, 0), delta_latitude: read_u16(b, 2) }
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.delta_longitude.to_le_bytes());
        out.extend_from_slice(&self.delta_latitude.to_le_bytes());
    }
}

pub struct PointStore {
    points:          Table<RawPoint>,
    by_square:       Table<RawRange>,
    point_to_square: OnceCell<Vec<SquareId>>,
    last_square:     Cell<Option<(SquareId, Position)>>,
}

impl PointStore {
    pub fn map(db: &MapDatabase, squares: &SquareTable) -> MapResult<Self> {
        Ok(Self {
            points:          Table::open(db, "point/data")?,
            by_square:       Table::open_with_count(db, "point/bysquare", squares.count())?,
            point_to_square: OnceCell::new(),
            last_square:     Cell::new(None),
        })
    }

    /// Forget the cached square corner.
    pub fn reset_cursor(&self) {
        self.last_square.set(None);
    }

    pub fn count(&self) -> usize {
        self.points.count()
    }

    /// Points owned by `square`; empty if the square is not active.
    pub fn in_square(&self, squares: &SquareTable, square: SquareId) -> MapResult<SquareRange> {
        let Some(index) = squares.square_index(square) else {
            return Ok(SquareRange::EMPTY);
        };
        checked_range(self.by_square.get(index)?, "point/bysquare", self.points.count())
    }

    fn point_to_square(&self, squares: &SquareTable) -> MapResult<&[SquareId]> {
        self.point_to_square
            .get_or_try_init(|| {
                log::debug!("building point-to-square index for {} points", self.points.count());
                let mut table = vec![SquareId::INVALID; self.points.count()];
                for (i, range) in self.by_square.iter().enumerate() {
                    let range = checked_range(range, "point/bysquare", self.points.count())?;
                    let square = squares.square_from_index(i)?;
                    for p in range.iter() {
                        table[p as usize] = square;
                    }
                }
                Ok(table)
            })
            .map(Vec::as_slice)
    }

    /// Square owning `point`.
    pub fn square_of(&self, squares: &SquareTable, point: PointId) -> MapResult<SquareId> {
        let table = self.point_to_square(squares)?;
        match table.get(point.index()) {
            Some(&sq) if sq != SquareId::INVALID => Ok(sq),
            Some(_) => Err(MapError::UnassignedPoint(point)),
            None => Err(MapError::out_of_range("point/data", point.0, self.points.count())),
        }
    }

    /// Absolute position of `point`.
    pub fn position(&self, squares: &SquareTable, point: PointId) -> MapResult<Position> {
        let raw = self.points.get(point.index())?;
        let square = self.square_of(squares, point)?;

        let min = match self.last_square.get() {
            Some((sq, min)) if sq == square => min,
            _ => {
                let min = squares.square_min(square)?;
                self.last_square.set(Some((square, min)));
                min
            }
        };

        Ok(min.offset(raw.delta_longitude as i32, raw.delta_latitude as i32))
    }
}

/// Validate a stored `(first, count)` row against the table it indexes.
pub(crate) fn checked_range(raw: RawRange, table: &'static str, rows: usize) -> MapResult<SquareRange> {
    if raw.first < 0 || raw.count < 0 || raw.first as i64 + raw.count as i64 > rows as i64 {
        log::error!("invalid {table} range {}+{} over {rows} rows", raw.first, raw.count);
        return Err(MapError::out_of_range(table, raw.first as i64 + raw.count as i64, rows));
    }
    Ok(SquareRange::new(raw.first as u32, raw.count as u32))
}
