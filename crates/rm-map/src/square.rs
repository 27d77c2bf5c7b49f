//! Square grid: the spatial tile index every other table hangs off.
//!
//! # Grid
//!
//! The map area is cut into `count_longitude × count_latitude` cells.  A cell
//! is identified by its global [`SquareId`] `x * count_latitude + y`, where
//! `x` counts columns from the west edge and `y` rows from the south edge.
//! Cells are at most `0x7ff0` micro-degrees wide so every point delta fits a
//! `u16`.  The last column and row absorb the integer-division remainder.
//!
//! # Active squares
//!
//! Only non-empty cells are stored.  `square/data` lists them in ascending
//! global id order; the position in that list is the dense *active index*
//! used by every `*/bysquare` table.  [`SquareTable::square_index`] resolves
//! a global id to its dense index through a lookup array built at map time.

use std::ops::Range;

use rm_core::{Area, Position, SquareId};

use crate::database::{read_i32, MapDatabase, Record, Table};
use crate::{MapError, MapResult};

/// Largest cell span (micro-degrees) the grid builder will produce.
pub const MAX_SQUARE_SPAN: i32 = 0x7ff0;

/// Most cells a grid may have, empty or not.
pub const MAX_SQUARE_COUNT: usize = 1 << 26;

// ── SquareRange ───────────────────────────────────────────────────────────────

/// A contiguous run of table rows owned by one square (or one line).
///
/// `count == 0` is a valid absence, not an error.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SquareRange {
    pub first: u32,
    pub count: u32,
}

impl SquareRange {
    pub const EMPTY: SquareRange = SquareRange { first: 0, count: 0 };

    pub fn new(first: u32, count: u32) -> Self {
        Self { first, count }
    }

    /// Index of the last row, or `None` when empty.
    pub fn last(&self) -> Option<u32> {
        (self.count > 0).then(|| self.first + self.count - 1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contains(&self, index: u32) -> bool {
        index >= self.first && index - self.first < self.count
    }

    /// Row indices in ascending order.
    pub fn iter(&self) -> Range<u32> {
        self.first..self.first + self.count
    }
}

// ── SquareGrid ────────────────────────────────────────────────────────────────

/// Geometry of the square grid (the `square/global` record).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SquareGrid {
    pub area:            Area,
    pub step_longitude:  i32,
    pub step_latitude:   i32,
    pub count_longitude: i32,
    pub count_latitude:  i32,
}

impl SquareGrid {
    /// Cover `area` with the fewest cells no wider than [`MAX_SQUARE_SPAN`].
    pub fn for_area(area: Area) -> Self {
        let span = MAX_SQUARE_SPAN as i64;
        let count_lon = ((area.east as i64 - area.west as i64 + span - 1) / span).max(1);
        let count_lat = ((area.north as i64 - area.south as i64 + span - 1) / span).max(1);
        Self::fixed(area, count_lon as i32, count_lat as i32)
    }

    /// Cut `area` into exactly `count_longitude × count_latitude` cells.
    ///
    /// Fails if a cell would be too wide for `u16` point deltas.
    pub fn with_counts(area: Area, count_longitude: i32, count_latitude: i32) -> MapResult<Self> {
        if count_longitude < 1 || count_latitude < 1 {
            return Err(MapError::Build(format!(
                "grid needs at least one cell, got {count_longitude}x{count_latitude}"
            )));
        }
        let grid = Self::fixed(area, count_longitude, count_latitude);
        let widest_lon = area.east as i64 - grid.square_west(count_longitude - 1) as i64;
        let widest_lat = area.north as i64 - grid.square_south(count_latitude - 1) as i64;
        if widest_lon > u16::MAX as i64 || widest_lat > u16::MAX as i64 {
            return Err(MapError::Build(format!(
                "{count_longitude}x{count_latitude} cells are too wide for this area"
            )));
        }
        grid.validate()?;
        Ok(grid)
    }

    fn fixed(area: Area, count_longitude: i32, count_latitude: i32) -> Self {
        let step_longitude = ((area.east as i64 - area.west as i64) / count_longitude as i64).max(1);
        let step_latitude = ((area.north as i64 - area.south as i64) / count_latitude as i64).max(1);
        Self {
            area,
            step_longitude: step_longitude as i32,
            step_latitude: step_latitude as i32,
            count_longitude,
            count_latitude,
        }
    }

    /// Check that the counts and steps tile the area and stay under
    /// [`MAX_SQUARE_COUNT`] cells.
    pub fn validate(&self) -> MapResult<()> {
        let fits = |count: i32, step: i32, low: i32, high: i32| {
            let span = high as i64 - low as i64;
            count >= 1 && step >= 1 && span >= 0 && (count as i64 - 1) * step as i64 <= span
        };
        if !fits(self.count_longitude, self.step_longitude, self.area.west, self.area.east)
            || !fits(self.count_latitude, self.step_latitude, self.area.south, self.area.north)
        {
            return Err(MapError::InvalidGrid(format!("{self:?} does not tile its area")));
        }
        let cells = self.count_longitude as i64 * self.count_latitude as i64;
        if cells > MAX_SQUARE_COUNT as i64 {
            return Err(MapError::InvalidGrid(format!("{cells} cells, at most {MAX_SQUARE_COUNT} allowed")));
        }
        Ok(())
    }

    /// Total number of cells, empty or not.
    pub fn square_count(&self) -> usize {
        self.count_longitude as usize * self.count_latitude as usize
    }

    /// Global id of cell `(x, y)`, or `None` outside the grid.
    pub fn square_id(&self, x: i32, y: i32) -> Option<SquareId> {
        if x < 0 || y < 0 || x >= self.count_longitude || y >= self.count_latitude {
            return None;
        }
        Some(SquareId((x * self.count_latitude + y) as u32))
    }

    /// Column and row of a global id.
    pub fn square_xy(&self, square: SquareId) -> (i32, i32) {
        let id = square.0 as i32;
        (id / self.count_latitude, id % self.count_latitude)
    }

    fn square_west(&self, x: i32) -> i32 {
        self.area.west + x * self.step_longitude
    }

    fn square_south(&self, y: i32) -> i32 {
        self.area.south + y * self.step_latitude
    }

    /// Bounds of a cell.
    pub fn square_area(&self, square: SquareId) -> Area {
        let (x, y) = self.square_xy(square);
        let west = self.square_west(x);
        let south = self.square_south(y);
        let east = if x == self.count_longitude - 1 { self.area.east } else { west + self.step_longitude };
        let north = if y == self.count_latitude - 1 { self.area.north } else { south + self.step_latitude };
        Area { west, east, south, north }
    }

    /// The cell covering `position`, or `None` if it lies outside the map.
    pub fn search(&self, position: Position) -> Option<SquareId> {
        if !self.area.contains(position) {
            return None;
        }
        let x = ((position.longitude - self.area.west) / self.step_longitude).min(self.count_longitude - 1);
        let y = ((position.latitude - self.area.south) / self.step_latitude).min(self.count_latitude - 1);
        self.square_id(x, y)
    }

    /// Cells within `radius` columns/rows of `square`, itself first.
    pub fn neighbours(&self, square: SquareId, radius: i32) -> Vec<SquareId> {
        let (cx, cy) = self.square_xy(square);
        let mut out = vec![square];
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(id) = self.square_id(cx + dx, cy + dy) {
                    out.push(id);
                }
            }
        }
        out
    }
}

impl Record for SquareGrid {
    const STRIDE: usize = 32;
    fn decode(b: &[u8]) -> Self {
        Self {
            area: Area {
                west:  read_i32(b, 0),
                east:  read_i32(b, 4),
                south: read_i32(b, 8),
                north: read_i32(b, 12),
            },
            step_longitude:  read_i32(b, 16),
            step_latitude:   read_i32(b, 20),
            count_longitude: read_i32(b, 24),
            count_latitude:  read_i32(b, 28),
        }
    }
    fn encode(&self, out: &mut Vec<u8>) {
        for v in [
            self.area.west,
            self.area.east,
            self.area.south,
            self.area.north,
            self.step_longitude,
            self.step_latitude,
            self.count_longitude,
            self.count_latitude,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

// ── SquareTable ───────────────────────────────────────────────────────────────

/// One active square: its global id and minimum corner.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawSquare {
    pub square:        i32,
    pub min_longitude: i32,
    pub min_latitude:  i32,
}

impl Record for RawSquare {
    const STRIDE: usize = 12;
    fn decode(b: &[u8]) -> Self {
        Self {
            square:        read_i32(b, 0),
            min_longitude: read_i32(b, 4),
            min_latitude:  read_i32(b, 8),
        }
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.square.to_le_bytes());
        out.extend_from_slice(&self.min_longitude.to_le_bytes());
        out.extend_from_slice(&self.min_latitude.to_le_bytes());
    }
}

/// Active squares of one map plus the global → dense lookup.
#[derive(Debug)]
pub struct SquareTable {
    grid:    SquareGrid,
    squares: Table<RawSquare>,
    /// `dense[global] = active index`, `u32::MAX` for empty cells.
    dense:   Vec<u32>,
}

impl SquareTable {
    pub fn map(db: &MapDatabase) -> MapResult<Self> {
        let global: Table<SquareGrid> = Table::open_with_count(db, "square/global", 1)?;
        let grid = global.get(0)?;
        if let Err(e) = grid.validate() {
            log::error!("invalid square/global structure in map {}: {e}", db.name());
            return Err(e);
        }

        let squares: Table<RawSquare> = Table::open(db, "square/data")?;
        let mut dense = vec![u32::MAX; grid.square_count()];
        for (i, sq) in squares.iter().enumerate() {
            let slot = dense
                .get_mut(sq.square as usize)
                .ok_or_else(|| MapError::out_of_range("square/global", sq.square, grid.square_count()))?;
            *slot = i as u32;
        }

        Ok(Self { grid, squares, dense })
    }

    pub fn grid(&self) -> &SquareGrid {
        &self.grid
    }

    /// Number of active (non-empty) squares.
    pub fn count(&self) -> usize {
        self.squares.count()
    }

    /// Dense active index of a global square, `None` if empty or off-grid.
    #[inline]
    pub fn square_index(&self, square: SquareId) -> Option<usize> {
        match self.dense.get(square.index()) {
            Some(&i) if i != u32::MAX => Some(i as usize),
            _ => None,
        }
    }

    /// Global id of the active square at dense index `index`.
    pub fn square_from_index(&self, index: usize) -> MapResult<SquareId> {
        let sq = self.squares.get(index)?;
        Ok(SquareId::from_raw(sq.square as i64)?)
    }

    /// Minimum corner of an active square.
    pub fn square_min(&self, square: SquareId) -> MapResult<Position> {
        let index = self
            .square_index(square)
            .ok_or_else(|| MapError::out_of_range("square/data", square.0 as i64, self.count()))?;
        let sq = self.squares.get(index)?;
        Ok(Position::new(sq.min_longitude, sq.min_latitude))
    }

    /// Global id of the active square covering `position`.
    pub fn square_search(&self, position: Position) -> Option<SquareId> {
        self.grid.search(position).filter(|&sq| self.square_index(sq).is_some())
    }

    /// Iterate active squares in dense order.
    pub fn active(&self) -> impl Iterator<Item = SquareId> + '_ {
        self.squares.iter().map(|sq| SquareId(sq.square as u32))
    }
}
