//! route-demo — build a small town, map it and route across it.
//!
//! Without arguments the town is a synthetic lattice with a fast ring road
//! and a few named places.  With a directory argument the map is imported
//! from `points.csv`, `lines.csv` and (optionally) `places.csv` in it and
//! routed corner to corner.
//!
//! Set `RUST_LOG=debug` to watch the search.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use rm_core::{Area, PlaceId, Position, SquareId};
use rm_map::{load_map_csv, EntityKind, GridSpec, MapBuilder, MapContext, MapSet};
use rm_navigate::{AlgorithmRegistry, CostKind, NavigateConfig, NavigateStatus, RouteEngine};

// ── Constants ─────────────────────────────────────────────────────────────────

const SIDE:         i32 = 12;
const STEP:         i32 = 2_000; // µ°, about 220 m
const STREET_KMH:   u16 = 30;
const RING_KMH:     u16 = 90;
const ORIGIN:       Position = Position::new(30_000_000, 45_000_000);

// ── Synthetic town ────────────────────────────────────────────────────────────

fn build_town() -> Result<MapBuilder> {
    let mut b = MapBuilder::new("town").with_grid(GridSpec::Counts { longitude: 3, latitude: 3 });

    let mut ids = Vec::with_capacity((SIDE * SIDE) as usize);
    for y in 0..SIDE {
        for x in 0..SIDE {
            ids.push(b.add_point(ORIGIN.offset(x * STEP, y * STEP)));
        }
    }
    let at = |x: i32, y: i32| ids[(y * SIDE + x) as usize];

    // The outermost rows and columns form the ring road.
    let edge = |i: i32| i == 0 || i == SIDE - 1;
    for y in 0..SIDE {
        for x in 0..SIDE {
            if x + 1 < SIDE {
                let speed = if edge(y) { RING_KMH } else { STREET_KMH };
                b.add_line(at(x, y), at(x + 1, y), speed)?;
            }
            if y + 1 < SIDE {
                let speed = if edge(x) { RING_KMH } else { STREET_KMH };
                b.add_line(at(x, y), at(x, y + 1), speed)?;
            }
        }
    }

    // A curved bypass across the middle.
    let bypass = b.add_line(at(0, SIDE / 2), at(SIDE - 1, SIDE / 2), 0)?;
    for i in 1..8 {
        let bulge = if i < 4 { i } else { 8 - i };
        b.add_shape_point(bypass, ORIGIN.offset(i * (SIDE - 1) * STEP / 8, (SIDE / 2) * STEP + bulge * STEP / 4))?;
    }

    b.add_place(at(0, 0), 1, "Old Town")?;
    b.add_place(at(SIDE - 1, SIDE - 1), 1, "Harbour")?;
    b.add_place(at(SIDE / 2, SIDE / 2), 2, "Market")?;
    b.add_place(at(SIDE / 2, SIDE / 2 + 1), 2, "Station")?;
    Ok(b)
}

// ── Reporting ─────────────────────────────────────────────────────────────────

fn report(label: &str, status: &NavigateStatus, elapsed_ms: f64) -> Result<()> {
    let route = status.route().with_context(|| format!("{label}: no route"))?;
    info!(
        "{label:<28} {:>3} segments  {:>6} m  {:>5} s  {:>4} iterations  {:>5} nodes  {elapsed_ms:.2} ms",
        route.segments.len(),
        route.cost.distance,
        route.time_secs(),
        route.iterations,
        status.len(),
    );
    Ok(())
}

fn list_places(map: &MapContext) -> Result<()> {
    for square in map.squares().active() {
        for layer in 1..=map.place_layer_count(square)? {
            for p in map.place_in_square(square, layer)?.iter() {
                let place = PlaceId(p);
                let name = map.place_get_name(place)?.unwrap_or("?");
                let at = map.place_point(place)?;
                info!("place {name:<10} layer {layer} square {square} at {at}");
            }
        }
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let builder = match std::env::args().nth(1) {
        Some(dir) => load_map_csv("imported", Path::new(&dir), GridSpec::Auto)
            .with_context(|| format!("loading map from {dir}"))?,
        None => build_town()?,
    };

    let t0 = Instant::now();
    let built = builder.build()?;
    info!("built {} points, {} lines in {:.1} ms", built.points.len(), built.lines.len(), t0.elapsed().as_secs_f64() * 1e3);

    let mut maps = MapSet::new();
    let handle = maps.open(&built.database)?;
    maps.activate(handle)?;
    let map = maps.current()?;

    let grid = map.squares().grid();
    info!(
        "{} active of {} squares, {} points, {} lines, {} shape points, {} places",
        map.squares().count(),
        grid.square_count(),
        map.point_count(),
        map.line_count(),
        map.shapes().count(),
        map.place_count(),
    );
    // Logs one line per table.
    map.hash_summary();
    list_places(map)?;
    info!("points in square 0: {}", maps.square_range(EntityKind::Point, SquareId(0))?.count);

    // Corner to corner of whatever was loaded.
    let Area { west, east, south, north } = grid.area;
    let from = Position::new(west, south);
    let to = Position::new(east, north);

    for cost in [CostKind::Fastest, CostKind::Shortest] {
        let config = NavigateConfig { cost, ..Default::default() };
        let registry = AlgorithmRegistry::with_defaults(&config);
        let engine = RouteEngine::new(config);

        for name in registry.names() {
            let algorithm = registry.find(name)?;
            let t = Instant::now();
            let status = engine.route_between(map, algorithm, from, to)?;
            report(&format!("{cost:?}/{name}"), &status, t.elapsed().as_secs_f64() * 1e3)?;
        }

        // Recalculate the first search with the other algorithm.
        let first = registry.get(0).context("empty registry")?;
        let second = registry.get(1).context("registry has one algorithm")?;
        let mut status = engine.route_between(map, first, from, to)?;
        let t = Instant::now();
        engine.recalc(map, second, &mut status)?;
        report(&format!("{cost:?}/recalc→{}", second.name()), &status, t.elapsed().as_secs_f64() * 1e3)?;
    }

    maps.unmap(handle)?;
    Ok(())
}
