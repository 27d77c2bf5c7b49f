//! Line store: road segments between two points.
//!
//! Lines are grouped by the square of their `from` point, so the lines of a
//! square are one contiguous `line/bysquare` range.
//!
//! A second index, `line/bysquare2`, has one row per grid cell (active or
//! not) pointing into `line/index2`: the ids of every line whose bounding
//! box touches the cell.  Snapping reads this one, since a long road can
//! pass through a cell far from its `from` point.

use rm_core::{LineId, PointId, SquareId};

use crate::database::{read_i32, read_u16, MapDatabase, RawRange, Record, Table};
use crate::point::checked_range;
use crate::square::{SquareRange, SquareTable};
use crate::MapResult;

/// One encoded line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawLine {
    pub from:      i32,
    pub to:        i32,
    pub speed_kmh: u16,
}

impl Record for RawLine {
    const STRIDE: usize = 10;
    fn decode(b: &[u8]) -> Self {
        Self { from: read_i32(b, 0), to: read_i32(b, 4), speed_kmh: read_u16(b, 8) }
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.from.to_le_bytes());
        out.extend_from_slice(&self.to.to_le_bytes());
        out.extend_from_slice(&self.speed_kmh.to_le_bytes());
    }
}

/// A decoded line.  `speed_kmh == 0` means "unknown, use the default".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub from:      PointId,
    pub to:        PointId,
    pub speed_kmh: u16,
}

impl Line {
    /// The endpoint opposite `point`, or `None` if `point` is not an endpoint.
    pub fn other_end(&self, point: PointId) -> Option<PointId> {
        if point == self.from {
            Some(self.to)
        } else if point == self.to {
            Some(self.from)
        } else {
            None
        }
    }
}

pub struct LineStore {
    lines:     Table<RawLine>,
    by_square: Table<RawRange>,
    by_cell:   Table<RawRange>,
    crossing:  Table<i32>,
}

impl LineStore {
    pub fn map(db: &MapDatabase, squares: &SquareTable) -> MapResult<Self> {
        Ok(Self {
            lines:     Table::open(db, "line/data")?,
            by_square: Table::open_with_count(db, "line/bysquare", squares.count())?,
            by_cell:   Table::open_with_count(db, "line/bysquare2", squares.grid().square_count())?,
            crossing:  Table::open(db, "line/index2")?,
        })
    }

    pub fn count(&self) -> usize {
        self.lines.count()
    }

    pub fn get(&self, line: LineId) -> MapResult<Line> {
        let raw = self.lines.get(line.index())?;
        Ok(Line {
            from:      PointId::from_raw(raw.from as i64)?,
            to:        PointId::from_raw(raw.to as i64)?,
            speed_kmh: raw.speed_kmh,
        })
    }

    /// Lines whose `from` point lies in `square`.
    pub fn in_square(&self, squares: &SquareTable, square: SquareId) -> MapResult<SquareRange> {
        let Some(index) = squares.square_index(square) else {
            return Ok(SquareRange::EMPTY);
        };
        checked_range(self.by_square.get(index)?, "line/bysquare", self.lines.count())
    }

    /// Lines whose bounding box touches grid cell `square`, ascending.
    pub fn crossing(&self, square: SquareId) -> MapResult<Vec<LineId>> {
        let range = checked_range(self.by_cell.get(square.index())?, "line/bysquare2", self.crossing.count())?;
        range
            .iter()
            .map(|i| -> MapResult<LineId> { Ok(LineId::from_raw(self.crossing.get(i as usize)? as i64)?) })
            .collect()
    }
}
