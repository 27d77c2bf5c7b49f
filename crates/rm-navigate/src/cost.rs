//! Cost model.
//!
//! # Units
//!
//! Distances are whole metres along a line's polyline.  Times are kept in
//! **milliseconds** so that short lines do not round to zero; [`Cost`]
//! exposes whole seconds through [`Cost::time_secs`].
//!
//! # Priority keys
//!
//! The search orders labels by a [`Key`]: the primary measure of the
//! [`CostKind`] in the high 64 bits and the other measure in the low 64.
//! Keys add like costs, so `key(a) + key(b) == key(a + b)`, and comparing
//! keys compares costs lexicographically.

use std::ops::{Add, AddAssign};

use rm_core::{distance, nearest_on_segment, LineId, Position};
use rm_map::{MapContext, MapResult};

use crate::config::{CostKind, NavigateConfig};

/// Search priority.  See the module docs.
pub type Key = u128;

/// Accumulated cost of a route or a part of one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cost {
    /// Metres.
    pub distance: u32,
    /// Milliseconds.
    pub time_ms:  u32,
}

impl Cost {
    pub const ZERO: Cost = Cost { distance: 0, time_ms: 0 };

    /// Travel time rounded to whole seconds.
    pub fn time_secs(&self) -> u32 {
        (self.time_ms + 500) / 1_000
    }

    /// Priority key of this cost under `kind`.
    pub fn key(&self, kind: CostKind) -> Key {
        let (primary, secondary) = match kind {
            CostKind::Fastest => (self.time_ms, self.distance),
            CostKind::Shortest => (self.distance, self.time_ms),
        };
        (primary as Key) << 64 | secondary as Key
    }
}

impl Add for Cost {
    type Output = Cost;
    #[inline]
    fn add(self, rhs: Cost) -> Cost {
        Cost {
            distance: self.distance.saturating_add(rhs.distance),
            time_ms:  self.time_ms.saturating_add(rhs.time_ms),
        }
    }
}

impl AddAssign for Cost {
    #[inline]
    fn add_assign(&mut self, rhs: Cost) {
        *self = *self + rhs;
    }
}

/// Milliseconds to drive `metres` at `speed_kmh`.
#[inline]
pub fn travel_ms(metres: u32, speed_kmh: u16) -> u32 {
    (metres as u64 * 3_600 / speed_kmh.max(1) as u64).min(u32::MAX as u64) as u32
}

/// Distance in metres from the start of `geometry` to the point of the
/// polyline closest to `position`.
pub fn offset_along(geometry: &[Position], position: Position) -> u32 {
    let mut walked = 0i64;
    let mut best = (i64::MAX, 0i64);
    for w in geometry.windows(2) {
        let snapped = nearest_on_segment(position, w[0], w[1]);
        let off = distance(position, snapped) as i64;
        if off < best.0 {
            best = (off, walked + distance(w[0], snapped) as i64);
        }
        walked += distance(w[0], w[1]) as i64;
    }
    best.1.max(0) as u32
}

/// Polyline length of `geometry` in metres.
pub fn polyline_length(geometry: &[Position]) -> u32 {
    geometry.windows(2).map(|w| distance(w[0], w[1]).max(0) as u32).sum()
}

// ── CostModel ─────────────────────────────────────────────────────────────────

/// Prices line traversals on one map.
pub struct CostModel<'a> {
    map:    &'a MapContext,
    config: &'a NavigateConfig,
}

impl<'a> CostModel<'a> {
    pub fn new(map: &'a MapContext, config: &'a NavigateConfig) -> Self {
        Self { map, config }
    }

    pub fn kind(&self) -> CostKind {
        self.config.cost
    }

    #[inline]
    pub fn key(&self, cost: Cost) -> Key {
        cost.key(self.config.cost)
    }

    fn priced(&self, line: LineId, metres: u32) -> MapResult<Cost> {
        let speed = self.config.effective_speed(self.map.line(line)?.speed_kmh);
        Ok(Cost { distance: metres, time_ms: travel_ms(metres, speed) })
    }

    /// Cost of driving the whole of `line`.
    pub fn line(&self, line: LineId) -> MapResult<Cost> {
        let geometry = self.map.line_geometry(line)?;
        self.priced(line, polyline_length(&geometry))
    }

    /// Cost of driving `line` between two positions on it.
    pub fn partial(&self, line: LineId, from: Position, to: Position) -> MapResult<Cost> {
        let geometry = self.map.line_geometry(line)?;
        let a = offset_along(&geometry, from);
        let b = offset_along(&geometry, to);
        self.priced(line, a.abs_diff(b))
    }

    /// Fastest speed of any line on the map, for time lower bounds.
    pub fn max_speed(&self) -> MapResult<u16> {
        let mut fastest = self.config.effective_speed(0);
        for l in 0..self.map.line_count() {
            let line = self.map.line(LineId(l as u32))?;
            fastest = fastest.max(self.config.effective_speed(line.speed_kmh));
        }
        Ok(fastest)
    }

    /// A key no larger than the key of any route from `from` to `to`.
    ///
    /// Route lengths are summed from per-segment rounded distances, so the
    /// straight-line distance is shaved to stay below them.
    pub fn lower_bound(&self, from: Position, to: Position, max_speed_kmh: u16) -> Key {
        let straight = distance(from, to).max(0) as u32;
        let metres = straight.saturating_sub(straight / 64 + 1);
        self.key(Cost { distance: metres, time_ms: travel_ms(metres, max_speed_kmh) })
    }
}
