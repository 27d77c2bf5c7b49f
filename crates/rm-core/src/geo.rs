//! Fixed-point geographic coordinates.
//!
//! Positions are integer micro-degrees (1e-6 degree), the unit every map
//! table is encoded in.  Integer storage keeps square-relative delta encoding
//! exact: decoding a delta against its square corner always reproduces the
//! original value.

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Metres per micro-degree of latitude (and of longitude at the equator).
const METRES_PER_MICRODEGREE: f64 = 0.111_319_49;

/// A longitude/latitude pair in micro-degrees.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub longitude: i32,
    pub latitude: i32,
}

impl Position {
    #[inline]
    pub const fn new(longitude: i32, latitude: i32) -> Self {
        Self { longitude, latitude }
    }

    /// Build from floating-point degrees, rounding to the nearest micro-degree.
    pub fn from_degrees(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude: (longitude * 1e6).round() as i32,
            latitude:  (latitude * 1e6).round() as i32,
        }
    }

    /// Component-wise offset.  Used to accumulate shape deltas.
    #[inline]
    pub fn offset(self, delta_longitude: i32, delta_latitude: i32) -> Self {
        Self {
            longitude: self.longitude + delta_longitude,
            latitude:  self.latitude + delta_latitude,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

impl FromStr for Position {
    type Err = CoreError;

    /// Parse `"longitude,latitude"` in micro-degrees.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidPosition(s.to_string());
        let (lon, lat) = s.split_once(',').ok_or_else(invalid)?;
        let longitude = lon.trim().parse().map_err(|_| invalid())?;
        let latitude = lat.trim().parse().map_err(|_| invalid())?;
        Ok(Self { longitude, latitude })
    }
}

/// Planar distance in whole metres.
///
/// Local equirectangular approximation: the longitude span is scaled by the
/// cosine of the mean latitude.  Error stays well under 1 % for the
/// square-sized hops the router measures.
pub fn distance(a: Position, b: Position) -> i32 {
    let mean_lat = (a.latitude as f64 + b.latitude as f64) * 0.5 / 1e6;
    let dx = (b.longitude as i64 - a.longitude as i64) as f64
        * METRES_PER_MICRODEGREE
        * mean_lat.to_radians().cos();
    let dy = (b.latitude as i64 - a.latitude as i64) as f64 * METRES_PER_MICRODEGREE;
    dx.hypot(dy).round() as i32
}

/// The point of segment `a`–`b` closest to `p`.
///
/// Works in the same local planar frame as [`distance`].
pub fn nearest_on_segment(p: Position, a: Position, b: Position) -> Position {
    let scale = (p.latitude as f64 / 1e6).to_radians().cos();
    let dx = (b.longitude as i64 - a.longitude as i64) as f64;
    let dy = (b.latitude as i64 - a.latitude as i64) as f64;
    let len2 = dx * dx * scale * scale + dy * dy;
    if len2 == 0.0 {
        return a;
    }
    let px = (p.longitude as i64 - a.longitude as i64) as f64;
    let py = (p.latitude as i64 - a.latitude as i64) as f64;
    let t = ((px * dx * scale * scale + py * dy) / len2).clamp(0.0, 1.0);
    Position {
        longitude: (a.longitude as f64 + t * dx).round() as i32,
        latitude:  (a.latitude as f64 + t * dy).round() as i32,
    }
}

/// An axis-aligned box in micro-degrees.  Bounds are inclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Area {
    pub west: i32,
    pub east: i32,
    pub south: i32,
    pub north: i32,
}

impl Area {
    pub fn new(west: i32, east: i32, south: i32, north: i32) -> Self {
        Self { west, east, south, north }
    }

    /// Smallest area covering every position, or `None` for an empty input.
    pub fn bounding(positions: impl IntoIterator<Item = Position>) -> Option<Self> {
        positions.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Area::new(p.longitude, p.longitude, p.latitude, p.latitude),
                Some(a) => Area {
                    west:  a.west.min(p.longitude),
                    east:  a.east.max(p.longitude),
                    south: a.south.min(p.latitude),
                    north: a.north.max(p.latitude),
                },
            })
        })
    }

    #[inline]
    pub fn contains(&self, p: Position) -> bool {
        p.longitude >= self.west
            && p.longitude <= self.east
            && p.latitude >= self.south
            && p.latitude <= self.north
    }
}
