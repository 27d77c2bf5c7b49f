//! `rm-core` — foundational types for the roadmap tile index and router.
//!
//! This crate is a dependency of every other `rm-*` crate.  It has no `rm-*`
//! dependencies and a single external one (`thiserror`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                                          |
//! |-----------|-------------------------------------------------------------------|
//! | [`ids`]   | `SquareId`, `PointId`, `LineId`, `ShapeId`, `PlaceId`, `StringId`, `HashId`, `IterationId` |
//! | [`geo`]   | `Position` (micro-degrees), `Area`, `distance`, `nearest_on_segment` |
//! | [`error`] | `CoreError`, `CoreResult`                                         |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{distance, nearest_on_segment, Area, Position};
pub use ids::{HashId, IterationId, LineId, PlaceId, PointId, ShapeId, SquareId, StringId};
