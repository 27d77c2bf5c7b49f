//! Construct a [`MapDatabase`] from plain geometry.
//!
//! The builder accepts points, lines (with optional shape points) and places
//! in any order.  [`MapBuilder::build`] then:
//!
//! 1. lays the square grid over the data ([`GridSpec`]),
//! 2. keeps only squares that own at least one point,
//! 3. sorts points by square, and lines by the square of their `from` point,
//! 4. encodes point deltas against each square's minimum corner,
//! 5. encodes shape deltas, splitting any run too long for an `i16`,
//! 6. groups places by square and layer and writes the prefix offsets,
//! 7. interns place names into the `"city"` dictionary,
//! 8. lists, for every grid cell, the lines whose bounding box touches it.
//!
//! Sorting renumbers everything, so [`BuiltMap`] maps builder handles to the
//! final ids.
//!
//! # Example
//!
//! ```
//! use rm_core::Position;
//! use rm_map::{MapBuilder, MapContext};
//!
//! let mut b = MapBuilder::new("demo");
//! let a = b.add_point(Position::new(0, 0));
//! let c = b.add_point(Position::new(1_000, 0));
//! b.add_line(a, c, 50).unwrap();
//! let built = b.build().unwrap();
//! let map = MapContext::map(&built.database).unwrap();
//! assert_eq!(map.line_count(), 1);
//! ```

use rustc_hash::FxHashMap;

use rm_core::{Area, LineId, PlaceId, PointId, Position, SquareId};

use crate::database::{encode_section, MapDatabase, RawRange, Section};
use crate::dictionary::Dictionary;
use crate::line::RawLine;
use crate::place::PLACE_DICTIONARY;
use crate::point::RawPoint;
use crate::shape::{RawShape, RawShapeByLine};
use crate::square::{RawSquare, SquareGrid};
use crate::{MapError, MapResult};

/// How the square grid is laid over the map.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridSpec {
    /// Bounding box of the data, cut into the fewest allowed cells.
    #[default]
    Auto,
    /// Bounding box of the data, cut into a fixed number of cells.
    Counts { longitude: i32, latitude: i32 },
    /// Explicit area and cell counts.  Every position must lie inside.
    Explicit { area: Area, longitude: i32, latitude: i32 },
}

/// Builder handle of a point.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuildPoint(pub u32);

/// Builder handle of a line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuildLine(pub u32);

/// Builder handle of a place.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuildPlace(pub u32);

struct PendingLine {
    from:      BuildPoint,
    to:        BuildPoint,
    speed_kmh: u16,
    shape:     Vec<Position>,
}

struct PendingPlace {
    point: BuildPoint,
    layer: u32,
    name:  String,
}

/// Output of [`MapBuilder::build`].
#[derive(Debug)]
pub struct BuiltMap {
    pub database: MapDatabase,
    /// Final id of each builder point, indexed by `BuildPoint`.
    pub points:   Vec<PointId>,
    /// Final id of each builder line, indexed by `BuildLine`.
    pub lines:    Vec<LineId>,
    /// Final id of each builder place, indexed by `BuildPlace`.
    pub places:   Vec<PlaceId>,
}

impl BuiltMap {
    pub fn point(&self, p: BuildPoint) -> PointId {
        self.points[p.0 as usize]
    }

    pub fn line(&self, l: BuildLine) -> LineId {
        self.lines[l.0 as usize]
    }

    pub fn place(&self, p: BuildPlace) -> PlaceId {
        self.places[p.0 as usize]
    }
}

// ── MapBuilder ────────────────────────────────────────────────────────────────

pub struct MapBuilder {
    name:   String,
    grid:   GridSpec,
    points: Vec<Position>,
    lines:  Vec<PendingLine>,
    places: Vec<PendingPlace>,
}

impl MapBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:   name.into(),
            grid:   GridSpec::Auto,
            points: Vec::new(),
            lines:  Vec::new(),
            places: Vec::new(),
        }
    }

    pub fn with_grid(mut self, grid: GridSpec) -> Self {
        self.grid = grid;
        self
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn add_point(&mut self, position: Position) -> BuildPoint {
        let id = BuildPoint(self.points.len() as u32);
        self.points.push(position);
        id
    }

    fn check_point(&self, p: BuildPoint) -> MapResult<()> {
        if (p.0 as usize) < self.points.len() {
            Ok(())
        } else {
            Err(MapError::Build(format!("unknown builder point {}", p.0)))
        }
    }

    /// Add a line from `from` to `to`.  `speed_kmh == 0` means unknown.
    pub fn add_line(&mut self, from: BuildPoint, to: BuildPoint, speed_kmh: u16) -> MapResult<BuildLine> {
        self.check_point(from)?;
        self.check_point(to)?;
        let id = BuildLine(self.lines.len() as u32);
        self.lines.push(PendingLine { from, to, speed_kmh, shape: Vec::new() });
        Ok(id)
    }

    /// Append an interior vertex to `line`, in travel order from `from`.
    pub fn add_shape_point(&mut self, line: BuildLine, position: Position) -> MapResult<()> {
        let pending = self
            .lines
            .get_mut(line.0 as usize)
            .ok_or_else(|| MapError::Build(format!("unknown builder line {}", line.0)))?;
        pending.shape.push(position);
        Ok(())
    }

    /// Add a named place at `point` on `layer` (1-based).
    pub fn add_place(&mut self, point: BuildPoint, layer: u32, name: impl Into<String>) -> MapResult<BuildPlace> {
        self.check_point(point)?;
        if layer == 0 {
            return Err(MapError::Build("place layers start at 1".to_string()));
        }
        let id = BuildPlace(self.places.len() as u32);
        self.places.push(PendingPlace { point, layer, name: name.into() });
        Ok(id)
    }

    fn grid(&self) -> MapResult<SquareGrid> {
        let every = self
            .points
            .iter()
            .copied()
            .chain(self.lines.iter().flat_map(|l| l.shape.iter().copied()));
        let bounds = Area::bounding(every)
            .ok_or_else(|| MapError::Build(format!("map {} has no points", self.name)))?;

        match self.grid {
            GridSpec::Auto => Ok(SquareGrid::for_area(bounds)),
            GridSpec::Counts { longitude, latitude } => SquareGrid::with_counts(bounds, longitude, latitude),
            GridSpec::Explicit { area, longitude, latitude } => {
                if !area.contains(Position::new(bounds.west, bounds.south))
                    || !area.contains(Position::new(bounds.east, bounds.north))
                {
                    return Err(MapError::Build(format!("map {} has positions outside {area:?}", self.name)));
                }
                SquareGrid::with_counts(area, longitude, latitude)
            }
        }
    }

    /// Encode everything into a fresh [`MapDatabase`].
    pub fn build(self) -> MapResult<BuiltMap> {
        let grid = self.grid()?;
        grid.validate()?;

        // ── Squares ───────────────────────────────────────────────────────
        let point_square: Vec<SquareId> = self
            .points
            .iter()
            .map(|&p| {
                grid.search(p)
                    .ok_or_else(|| MapError::Build(format!("point {p} is outside the grid")))
            })
            .collect::<MapResult<_>>()?;

        let mut active: Vec<SquareId> = point_square.clone();
        active.sort_unstable();
        active.dedup();
        let dense: FxHashMap<SquareId, usize> = active.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        let corners: Vec<Position> = active
            .iter()
            .map(|&s| {
                let area = grid.square_area(s);
                Position::new(area.west, area.south)
            })
            .collect();

        // ── Points ────────────────────────────────────────────────────────
        let mut point_order: Vec<usize> = (0..self.points.len()).collect();
        point_order.sort_by_key(|&i| (point_square[i], i));

        let mut point_ids = vec![PointId::INVALID; self.points.len()];
        let mut point_data = Vec::with_capacity(self.points.len());
        let mut point_by_square = vec![RawRange { first: 0, count: 0 }; active.len()];
        for (final_id, &i) in point_order.iter().enumerate() {
            point_ids[i] = PointId(final_id as u32);
            let d = dense[&point_square[i]];
            let corner = corners[d];
            let dlon = u16::try_from(self.points[i].longitude - corner.longitude);
            let dlat = u16::try_from(self.points[i].latitude - corner.latitude);
            let (Ok(delta_longitude), Ok(delta_latitude)) = (dlon, dlat) else {
                return Err(MapError::Build(format!("point {} does not fit its square", self.points[i])));
            };
            point_data.push(RawPoint { delta_longitude, delta_latitude });

            let range = &mut point_by_square[d];
            if range.count == 0 {
                range.first = final_id as i32;
            }
            range.count += 1;
        }

        // ── Lines and shapes ──────────────────────────────────────────────
        let line_square = |l: &PendingLine| dense[&point_square[l.from.0 as usize]];
        let mut line_order: Vec<usize> = (0..self.lines.len()).collect();
        line_order.sort_by_key(|&i| (line_square(&self.lines[i]), i));

        let mut line_ids = vec![LineId::INVALID; self.lines.len()];
        let mut line_data = Vec::with_capacity(self.lines.len());
        let mut line_by_square = vec![RawRange { first: 0, count: 0 }; active.len()];
        let mut shape_data: Vec<RawShape> = Vec::new();
        let mut shape_by_line = Vec::new();
        let mut shape_by_square = vec![RawRange { first: 0, count: 0 }; active.len()];
        for (final_id, &i) in line_order.iter().enumerate() {
            let line = &self.lines[i];
            let d = line_square(line);
            line_ids[i] = LineId(final_id as u32);
            line_data.push(RawLine {
                from:      point_ids[line.from.0 as usize].0 as i32,
                to:        point_ids[line.to.0 as usize].0 as i32,
                speed_kmh: line.speed_kmh,
            });

            let range = &mut line_by_square[d];
            if range.count == 0 {
                range.first = final_id as i32;
            }
            range.count += 1;

            let first = shape_data.len();
            let mut previous = self.points[line.from.0 as usize];
            for &vertex in &line.shape {
                push_shape_deltas(&mut shape_data, previous, vertex);
                previous = vertex;
            }
            let count = shape_data.len() - first;
            if count > 0 {
                shape_by_line.push(RawShapeByLine {
                    line:  final_id as i32,
                    first: first as i32,
                    count: count as i32,
                });
            }
            let range = &mut shape_by_square[d];
            if range.count == 0 {
                range.first = first as i32;
            }
            range.count += count as i32;
        }

        // ── Crossing lines ────────────────────────────────────────────────
        // Indexed by global cell, so empty cells crossed by a road list it too.
        let mut crossing: Vec<Vec<i32>> = vec![Vec::new(); grid.square_count()];
        for (i, line) in self.lines.iter().enumerate() {
            let ends = [self.points[line.from.0 as usize], self.points[line.to.0 as usize]];
            let Some(bbox) = Area::bounding(ends.into_iter().chain(line.shape.iter().copied())) else {
                continue;
            };
            let low = grid.search(Position::new(bbox.west, bbox.south));
            let high = grid.search(Position::new(bbox.east, bbox.north));
            let (Some(low), Some(high)) = (low, high) else {
                return Err(MapError::Build(format!("line {i} leaves the grid")));
            };
            let (x0, y0) = grid.square_xy(low);
            let (x1, y1) = grid.square_xy(high);
            for x in x0..=x1 {
                for y in y0..=y1 {
                    if let Some(cell) = grid.square_id(x, y) {
                        crossing[cell.index()].push(line_ids[i].0 as i32);
                    }
                }
            }
        }
        let mut line_by_cell = Vec::with_capacity(crossing.len());
        let mut line_crossing: Vec<i32> = Vec::new();
        for ids in &mut crossing {
            ids.sort_unstable();
            line_by_cell.push(RawRange { first: line_crossing.len() as i32, count: ids.len() as i32 });
            line_crossing.extend_from_slice(ids);
        }

        // ── Places ────────────────────────────────────────────────────────
        let place_square = |p: &PendingPlace| dense[&point_square[p.point.0 as usize]];
        let mut place_order: Vec<usize> = (0..self.places.len()).collect();
        place_order.sort_by_key(|&i| (place_square(&self.places[i]), self.places[i].layer, i));

        let mut names: Vec<&str> = vec![""];
        let mut name_ids: FxHashMap<&str, u16> = FxHashMap::default();
        name_ids.insert("", 0);

        let mut place_ids = vec![PlaceId::INVALID; self.places.len()];
        let mut place_data = Vec::with_capacity(self.places.len());
        let mut place_names = Vec::with_capacity(self.places.len());
        for (final_id, &i) in place_order.iter().enumerate() {
            let place = &self.places[i];
            place_ids[i] = PlaceId(final_id as u32);
            place_data.push(point_ids[place.point.0 as usize].0 as i32);

            let id = match name_ids.get(place.name.as_str()) {
                Some(&id) => id,
                None => {
                    let id = u16::try_from(names.len()).map_err(|_| {
                        MapError::Build(format!("more than {} distinct place names", u16::MAX))
                    })?;
                    names.push(&place.name);
                    name_ids.insert(&place.name, id);
                    id
                }
            };
            place_names.push(id);
        }

        // Per square: `layers + 1` prefix offsets into the sorted places.
        let mut place_by_layer: Vec<i32> = Vec::new();
        let mut place_by_square = Vec::with_capacity(active.len());
        let mut cursor = 0usize;
        for d in 0..active.len() {
            let in_square: Vec<u32> = place_order[cursor..]
                .iter()
                .take_while(|&&i| place_square(&self.places[i]) == d)
                .map(|&i| self.places[i].layer)
                .collect();
            let layers = in_square.iter().copied().max().unwrap_or(0);

            place_by_square.push(RawRange { first: place_by_layer.len() as i32, count: layers as i32 });
            if layers > 0 {
                let mut offset = cursor;
                place_by_layer.push(offset as i32);
                for layer in 1..=layers {
                    offset += in_square.iter().filter(|&&l| l == layer).count();
                    place_by_layer.push(offset as i32);
                }
            }
            cursor += in_square.len();
        }

        // ── Database ──────────────────────────────────────────────────────
        let squares: Vec<RawSquare> = active
            .iter()
            .zip(&corners)
            .map(|(s, c)| RawSquare { square: s.0 as i32, min_longitude: c.longitude, min_latitude: c.latitude })
            .collect();
        let dictionary = Dictionary::encode(names.iter().copied());

        let mut db = MapDatabase::new(self.name.clone());
        db.add_section("square/global", encode_section(&[grid]));
        db.add_section("square/data", encode_section(&squares));
        db.add_section("point/data", encode_section(&point_data));
        db.add_section("point/bysquare", encode_section(&point_by_square));
        db.add_section("line/data", encode_section(&line_data));
        db.add_section("line/bysquare", encode_section(&line_by_square));
        db.add_section("line/bysquare2", encode_section(&line_by_cell));
        db.add_section("line/index2", encode_section(&line_crossing));
        db.add_section("shape/data", encode_section(&shape_data));
        db.add_section("shape/byline", encode_section(&shape_by_line));
        db.add_section("shape/bysquare", encode_section(&shape_by_square));
        db.add_section("place/data", encode_section(&place_data));
        db.add_section("place/name", encode_section(&place_names));
        db.add_section("place/bylayer", encode_section(&place_by_layer));
        db.add_section("place/bysquare", encode_section(&place_by_square));
        db.add_section(format!("string/{PLACE_DICTIONARY}"), Section::new(dictionary.len(), dictionary));

        log::info!(
            "built map {}: {} squares, {} points, {} lines, {} shapes, {} places",
            self.name,
            active.len(),
            point_data.len(),
            line_data.len(),
            shape_data.len(),
            place_data.len(),
        );

        Ok(BuiltMap { database: db, points: point_ids, lines: line_ids, places: place_ids })
    }
}

/// Append the deltas from `from` to `to`, cut into equal steps that each
/// fit an `i16`.
fn push_shape_deltas(out: &mut Vec<RawShape>, from: Position, to: Position) {
    let dlon = to.longitude as i64 - from.longitude as i64;
    let dlat = to.latitude as i64 - from.latitude as i64;
    let limit = i16::MAX as i64;
    let steps = ((dlon.abs().max(dlat.abs()) + limit - 1) / limit).max(1);

    let mut previous = (0i64, 0i64);
    for k in 1..=steps {
        let point = (dlon * k / steps, dlat * k / steps);
        out.push(RawShape {
            delta_longitude: (point.0 - previous.0) as i16,
            delta_latitude:  (point.1 - previous.1) as i16,
        });
        previous = point;
    }
}
