//! CSV map import.
//!
//! # CSV format
//!
//! A map directory holds up to three files.  Coordinates are decimal
//! degrees; ids are the file's own and only need to be unique per file.
//!
//! `points.csv`:
//!
//! ```csv
//! id,longitude,latitude
//! 1,2.350000,48.850000
//! 2,2.360000,48.850000
//! ```
//!
//! `lines.csv` (`shape` is optional: `lon lat` pairs separated by `;`):
//!
//! ```csv
//! from,to,speed_kmh,shape
//! 1,2,50,2.355 48.851
//! ```
//!
//! `places.csv` (optional file):
//!
//! ```csv
//! point,layer,name
//! 1,1,Châtelet
//! ```
//!
//! Rows are fed into a [`MapBuilder`]; nothing is encoded until
//! [`MapBuilder::build`].

use std::io::Read;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use rm_core::Position;

use crate::builder::{BuildPoint, GridSpec, MapBuilder};
use crate::{MapError, MapResult};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PointRecord {
    id:        u32,
    longitude: f64,
    latitude:  f64,
}

#[derive(Deserialize)]
struct LineRecord {
    from:      u32,
    to:        u32,
    speed_kmh: u16,
    #[serde(default)]
    shape:     String,
}

#[derive(Deserialize)]
struct PlaceRecord {
    point: u32,
    layer: u32,
    name:  String,
}

/// File ids of the loaded points, mapped to builder handles.
pub type PointIndex = FxHashMap<u32, BuildPoint>;

// ── Public API ────────────────────────────────────────────────────────────────

/// Load `points.csv`, `lines.csv` and (if present) `places.csv` from `dir`.
pub fn load_map_csv(name: &str, dir: &Path, grid: GridSpec) -> MapResult<MapBuilder> {
    let mut builder = MapBuilder::new(name).with_grid(grid);

    let points = load_points_reader(&mut builder, std::fs::File::open(dir.join("points.csv"))?)?;
    load_lines_reader(&mut builder, std::fs::File::open(dir.join("lines.csv"))?, &points)?;

    let places = dir.join("places.csv");
    if places.exists() {
        load_places_reader(&mut builder, std::fs::File::open(places)?, &points)?;
    }

    log::info!(
        "loaded map {name} from {}: {} points, {} lines",
        dir.display(),
        builder.point_count(),
        builder.line_count(),
    );
    Ok(builder)
}

/// Add every point row of `reader` to `builder`.
pub fn load_points_reader<R: Read>(builder: &mut MapBuilder, reader: R) -> MapResult<PointIndex> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut index = PointIndex::default();

    for result in csv_reader.deserialize::<PointRecord>() {
        let row = result?;
        let handle = builder.add_point(Position::from_degrees(row.longitude, row.latitude));
        if index.insert(row.id, handle).is_some() {
            return Err(MapError::Parse(format!("duplicate point id {}", row.id)));
        }
    }
    Ok(index)
}

/// Add every line row of `reader`; endpoints resolve through `points`.
/// Returns the number of lines added.
pub fn load_lines_reader<R: Read>(builder: &mut MapBuilder, reader: R, points: &PointIndex) -> MapResult<usize> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut added = 0;

    for result in csv_reader.deserialize::<LineRecord>() {
        let row = result?;
        let line = builder.add_line(resolve(points, row.from)?, resolve(points, row.to)?, row.speed_kmh)?;
        for vertex in parse_shape(&row.shape)? {
            builder.add_shape_point(line, vertex)?;
        }
        added += 1;
    }
    Ok(added)
}

/// Add every place row of `reader`.  Returns the number of places added.
pub fn load_places_reader<R: Read>(builder: &mut MapBuilder, reader: R, points: &PointIndex) -> MapResult<usize> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut added = 0;

    for result in csv_reader.deserialize::<PlaceRecord>() {
        let row = result?;
        builder.add_place(resolve(points, row.point)?, row.layer, row.name)?;
        added += 1;
    }
    Ok(added)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn resolve(points: &PointIndex, id: u32) -> MapResult<BuildPoint> {
    points
        .get(&id)
        .copied()
        .ok_or_else(|| MapError::Parse(format!("unknown point id {id}")))
}

fn parse_shape(s: &str) -> MapResult<Vec<Position>> {
    s.split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            let invalid = || MapError::Parse(format!("invalid shape vertex {v:?}: expected \"lon lat\""));
            let (lon, lat) = v.split_once(char::is_whitespace).ok_or_else(invalid)?;
            let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
            let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
            Ok(Position::from_degrees(lon, lat))
        })
        .collect()
}
