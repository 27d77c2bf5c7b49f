//! Map contexts and the set of mapped maps.
//!
//! # Lifecycle
//!
//! ```text
//! MapDatabase ──map──▶ MapContext ──activate──▶ active in MapSet ──unmap──▶ dropped
//! ```
//!
//! *Mapping* validates every section and builds the line-end hash.  The
//! other derived indexes (point → square, the place dictionary, the shape
//! miss bitmask) are built on first use and live as long as the context.
//! *Activating* resets the per-activation cursor caches; a context may be
//! activated any number of times.
//!
//! A context caches through `Cell`/`RefCell`, so it is `Send` but not
//! `Sync`: it belongs to one thread at a time.

use std::cell::Cell;

use rustc_hash::FxHashSet;

use rm_core::{distance, nearest_on_segment, HashId, LineId, PlaceId, PointId, Position, ShapeId, SquareId};

use crate::database::MapDatabase;
use crate::hash::{HashRegistry, HashSummary};
use crate::line::{Line, LineStore};
use crate::place::PlaceStore;
use crate::point::PointStore;
use crate::shape::ShapeStore;
use crate::square::{SquareRange, SquareTable};
use crate::{MapError, MapResult};

/// A line position found by [`MapContext::nearest_line`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineSnap {
    pub line:     LineId,
    /// Closest position on the line's polyline.
    pub position: Position,
    /// Metres from the query position.
    pub distance: i32,
}

// ── MapContext ────────────────────────────────────────────────────────────────

/// Every table of one mapped map, plus its derived indexes.
pub struct MapContext {
    name:        String,
    squares:     SquareTable,
    points:      PointStore,
    lines:       LineStore,
    shapes:      ShapeStore,
    places:      PlaceStore,
    hashes:      HashRegistry,
    /// Rows `2l` and `2l + 1` are the `from` and `to` ends of line `l`.
    line_ends:   HashId,
    activations: Cell<u32>,
}

impl MapContext {
    /// Open and validate every table of `db`.
    pub fn map(db: &MapDatabase) -> MapResult<Self> {
        let squares = SquareTable::map(db)?;
        let points = PointStore::map(db, &squares)?;
        let lines = LineStore::map(db, &squares)?;
        let shapes = ShapeStore::map(db, &squares, lines.count())?;
        let places = PlaceStore::map(db, &squares)?;

        let mut hashes = HashRegistry::new();
        let line_ends = hashes.create("line/byend", lines.count() * 2);
        let index = hashes.get_mut(line_ends)?;
        for l in 0..lines.count() {
            let line = lines.get(LineId(l as u32))?;
            if line.from.index() >= points.count() || line.to.index() >= points.count() {
                log::error!("line {l} references a point past the end of point/data in map {}", db.name());
                return Err(MapError::out_of_range("point/data", line.from.0.max(line.to.0), points.count()));
            }
            index.add(line.from.0, 2 * l as u32)?;
            index.add(line.to.0, 2 * l as u32 + 1)?;
        }

        log::info!(
            "mapped {}: {} squares, {} points, {} lines, {} shapes, {} places",
            db.name(),
            squares.count(),
            points.count(),
            lines.count(),
            shapes.count(),
            places.count(),
        );

        Ok(Self {
            name: db.name().to_string(),
            squares,
            points,
            lines,
            shapes,
            places,
            hashes,
            line_ends,
            activations: Cell::new(0),
        })
    }

    /// Make this context current: drop cursor caches, open lazy resources.
    pub fn activate(&self) -> MapResult<()> {
        self.points.reset_cursor();
        self.places.open_dictionary()?;
        self.activations.set(self.activations.get() + 1);
        log::info!("activated map {} (activation {})", self.name, self.activations.get());
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times the context has been activated.
    pub fn activations(&self) -> u32 {
        self.activations.get()
    }

    pub fn squares(&self) -> &SquareTable {
        &self.squares
    }

    pub fn shapes(&self) -> &ShapeStore {
        &self.shapes
    }

    // ── Points ────────────────────────────────────────────────────────────

    pub fn point_count(&self) -> usize {
        self.points.count()
    }

    pub fn points_in_square(&self, square: SquareId) -> MapResult<SquareRange> {
        self.points.in_square(&self.squares, square)
    }

    pub fn point_position(&self, point: PointId) -> MapResult<Position> {
        self.points.position(&self.squares, point)
    }

    pub fn point_square(&self, point: PointId) -> MapResult<SquareId> {
        self.points.square_of(&self.squares, point)
    }

    // ── Lines ─────────────────────────────────────────────────────────────

    pub fn line_count(&self) -> usize {
        self.lines.count()
    }

    pub fn line(&self, line: LineId) -> MapResult<Line> {
        self.lines.get(line)
    }

    pub fn lines_in_square(&self, square: SquareId) -> MapResult<SquareRange> {
        self.lines.in_square(&self.squares, square)
    }

    /// Lines with an end at `point`, in ascending id order.
    pub fn lines_at(&self, point: PointId) -> MapResult<Vec<LineId>> {
        let index = self.hashes.get(self.line_ends)?;
        let mut out = Vec::new();
        for row in index.chain(point.0) {
            let line = LineId(row / 2);
            let ends = self.lines.get(line)?;
            let end = if row % 2 == 0 { ends.from } else { ends.to };
            // The bucket holds every key with the same residue.
            if end == point {
                out.push(line);
            }
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    /// Full polyline of `line`: `from`, its shape points, then `to`.
    pub fn line_geometry(&self, line: LineId) -> MapResult<Vec<Position>> {
        let ends = self.lines.get(line)?;
        let start = self.point_position(ends.from)?;
        let range = self.shapes.shapes_of_line(line)?;

        let mut out = Vec::with_capacity(range.count as usize + 2);
        out.push(start);
        for position in self.shapes.walk(range, start) {
            out.push(position?);
        }
        out.push(self.point_position(ends.to)?);
        Ok(out)
    }

    /// Length of `line` in metres, following its shape.
    pub fn line_length(&self, line: LineId) -> MapResult<i32> {
        let geometry = self.line_geometry(line)?;
        Ok(geometry.windows(2).map(|w| distance(w[0], w[1])).sum())
    }

    /// Lines whose bounding box touches grid cell `square`, which need not
    /// be active.
    pub fn lines_crossing_square(&self, square: SquareId) -> MapResult<Vec<LineId>> {
        self.lines.crossing(square)
    }

    /// Closest line to `position` among the lines crossing the covering
    /// cell and the cells up to `radius` columns/rows around it.
    ///
    /// `None` if the position is off the map or no line is in reach.
    pub fn nearest_line(&self, position: Position, radius: i32) -> MapResult<Option<LineSnap>> {
        let Some(center) = self.squares.grid().search(position) else {
            return Ok(None);
        };

        let mut seen = FxHashSet::default();
        let mut best: Option<LineSnap> = None;
        for square in self.squares.grid().neighbours(center, radius) {
            for line in self.lines.crossing(square)? {
                if !seen.insert(line) {
                    continue;
                }
                let geometry = self.line_geometry(line)?;
                for w in geometry.windows(2) {
                    let snapped = nearest_on_segment(position, w[0], w[1]);
                    let d = distance(position, snapped);
                    if best.is_none_or(|b| d < b.distance) {
                        best = Some(LineSnap { line, position: snapped, distance: d });
                    }
                }
            }
        }
        Ok(best)
    }

    // ── Shapes ────────────────────────────────────────────────────────────

    pub fn shapes_in_square(&self, square: SquareId) -> MapResult<SquareRange> {
        self.shapes.in_square(&self.squares, square)
    }

    /// Shape range of `line`, binary searching `shape/byline` rows
    /// `hint_begin..=hint_end`.
    pub fn shape_of_line(&self, line: LineId, hint_begin: usize, hint_end: usize) -> MapResult<SquareRange> {
        self.shapes.of_line(line, hint_begin, hint_end)
    }

    /// Add the delta of `shape` to `position`.  See [`ShapeStore::get_position`].
    pub fn shape_get_position(&self, shape: ShapeId, position: &mut Position) -> MapResult<()> {
        self.shapes.get_position(shape, position)
    }

    // ── Places ────────────────────────────────────────────────────────────

    pub fn place_count(&self) -> usize {
        self.places.count()
    }

    pub fn place_layer_count(&self, square: SquareId) -> MapResult<u32> {
        self.places.layer_count(&self.squares, square)
    }

    pub fn place_in_square(&self, square: SquareId, layer: u32) -> MapResult<SquareRange> {
        self.places.in_square(&self.squares, square, layer)
    }

    /// Position of the point `place` sits on.
    pub fn place_point(&self, place: PlaceId) -> MapResult<Position> {
        self.point_position(self.places.point(place)?)
    }

    /// Id of the point `place` sits on.
    pub fn place_point_id(&self, place: PlaceId) -> MapResult<PointId> {
        self.places.point(place)
    }

    pub fn place_get_name(&self, place: PlaceId) -> MapResult<Option<&str>> {
        self.places.name(place)
    }

    // ── Diagnostics ───────────────────────────────────────────────────────

    /// Counters of every hash table of this context.
    pub fn hash_summary(&self) -> Vec<HashSummary> {
        self.hashes.summary()
    }
}

// ── MapSet ────────────────────────────────────────────────────────────────────

/// Handle of a context inside a [`MapSet`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MapHandle(usize);

/// Which table a by-square query addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Point,
    Line,
    Shape,
    /// Places of one 1-based layer.
    Place { layer: u32 },
}

/// Every mapped context plus the currently active one.
#[derive(Default)]
pub struct MapSet {
    maps:   Vec<Option<MapContext>>,
    active: Option<usize>,
}

impl MapSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `db` and keep the context; it is not activated.
    pub fn open(&mut self, db: &MapDatabase) -> MapResult<MapHandle> {
        let context = MapContext::map(db)?;
        self.maps.push(Some(context));
        Ok(MapHandle(self.maps.len() - 1))
    }

    pub fn get(&self, handle: MapHandle) -> MapResult<&MapContext> {
        self.maps
            .get(handle.0)
            .and_then(Option::as_ref)
            .ok_or(MapError::UnknownMap(handle.0))
    }

    /// Make `handle` the active context.
    pub fn activate(&mut self, handle: MapHandle) -> MapResult<&MapContext> {
        self.get(handle)?.activate()?;
        self.active = Some(handle.0);
        self.get(handle)
    }

    /// Drop a context.  Unmapping the active context leaves none active.
    pub fn unmap(&mut self, handle: MapHandle) -> MapResult<()> {
        let slot = self.maps.get_mut(handle.0).ok_or(MapError::UnknownMap(handle.0))?;
        let context = slot.take().ok_or(MapError::UnknownMap(handle.0))?;
        if self.active == Some(handle.0) {
            self.active = None;
        }
        log::info!("unmapped {}", context.name());
        Ok(())
    }

    pub fn active(&self) -> Option<&MapContext> {
        self.active.and_then(|i| self.maps.get(i)).and_then(Option::as_ref)
    }

    /// The active context, or [`MapError::NoActiveMap`].
    pub fn current(&self) -> MapResult<&MapContext> {
        self.active().ok_or(MapError::NoActiveMap)
    }

    /// Rows of `kind` owned by `square` in the active map.  Empty when no
    /// map is active.
    pub fn square_range(&self, kind: EntityKind, square: SquareId) -> MapResult<SquareRange> {
        let Some(context) = self.active() else {
            return Ok(SquareRange::EMPTY);
        };
        match kind {
            EntityKind::Point => context.points_in_square(square),
            EntityKind::Line => context.lines_in_square(square),
            EntityKind::Shape => context.shapes_in_square(square),
            EntityKind::Place { layer } => context.place_in_square(square, layer),
        }
    }
}
