//! `rm-map` — square-tiled road map tables and map contexts.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                       |
//! |----------------|----------------------------------------------------------------|
//! | [`database`]   | `MapDatabase`, `Section`, `Record`, typed `Table` views        |
//! | [`square`]     | `SquareGrid`, `SquareTable`, `SquareRange`                     |
//! | [`point`]      | `PointStore` (square-relative deltas, lazy point → square)    |
//! | [`line`]       | `LineStore`, `Line`                                            |
//! | [`shape`]      | `ShapeStore`, `ShapeWalk` (sequential `i16` deltas)            |
//! | [`place`]      | `PlaceStore` (layered places, lazily opened names)             |
//! | [`hash`]       | `HashIndex`, `HashRegistry`, `hash_string`, `HashSummary`      |
//! | [`dictionary`] | `Dictionary` (interned strings)                                |
//! | [`context`]    | `MapContext`, `MapSet`, `EntityKind`, `LineSnap`               |
//! | [`builder`]    | `MapBuilder`, `GridSpec`, `BuiltMap`                           |
//! | [`loader`]     | `load_map_csv` and the per-file readers                        |
//! | [`error`]      | `MapError`, `MapResult<T>`                                     |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on grid and config types.  |

pub mod builder;
pub mod context;
pub mod database;
pub mod dictionary;
pub mod error;
pub mod hash;
pub mod line;
pub mod loader;
pub mod place;
pub mod point;
pub mod shape;
pub mod square;


pub use builder::{BuildLine, BuildPlace, BuildPoint, BuiltMap, GridSpec, MapBuilder};
pub use context::{EntityKind, LineSnap, MapContext, MapHandle, MapSet};
pub use database::{MapDatabase, Record, Section, Table};
pub use dictionary::Dictionary;
pub use error::{MapError, MapResult};
pub use hash::{hash_string, HashIndex, HashRegistry, HashSummary, HASH_MODULO};
pub use line::Line;
pub use loader::{load_lines_reader, load_map_csv, load_places_reader, load_points_reader, PointIndex};
pub use square::{SquareGrid, SquareRange, SquareTable, MAX_SQUARE_COUNT, MAX_SQUARE_SPAN};
