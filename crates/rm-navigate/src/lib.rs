//! `rm-navigate` — pluggable route search over a mapped roadmap.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                        |
//! |-----------------|-----------------------------------------------------------------|
//! | [`config`]      | `NavigateConfig`, `CostKind`                                    |
//! | [`cost`]        | `Cost`, `CostModel`, priority `Key`s                            |
//! | [`status`]      | `NavigateStatus` arena, `RouteRequest`, `Route`, `SearchState`  |
//! | [`algorithm`]   | `RouteAlgorithm` trait, `AlgorithmRegistry`                     |
//! | [`dijkstra`]    | `BidirectionalDijkstra`                                         |
//! | [`astar`]       | `AStar` (forward only, straight-line lower bound)               |
//! | [`route`]       | `RouteEngine`: `get_initial`, `recalc`, `route_between`         |
//! | [`search`]      | `seed`/`expand` steps shared by the strategies                  |
//! | [`error`]       | `NavigateError`, `NavigateResult<T>`                            |
//!
//! # Usage
//!
//! ```no_run
//! use rm_core::Position;
//! use rm_map::{MapBuilder, MapContext};
//! use rm_navigate::{AlgorithmRegistry, NavigateConfig, RouteEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = MapBuilder::new("demo");
//! let a = builder.add_point(Position::new(0, 0));
//! let b = builder.add_point(Position::new(1_000, 0));
//! builder.add_line(a, b, 50)?;
//! let built = builder.build()?;
//!
//! let map = MapContext::map(&built.database)?;
//! map.activate()?;
//!
//! let config = NavigateConfig::default();
//! let registry = AlgorithmRegistry::with_defaults(&config);
//! let engine = RouteEngine::new(config);
//! let status = engine.route_between(&map, registry.find("astar")?, Position::new(0, 0), Position::new(1_000, 0))?;
//! println!("{} m", status.route()?.cost.distance);
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                          |
//! |---------|-----------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on config, request and costs. |

pub mod algorithm;
pub mod astar;
pub mod config;
pub mod cost;
pub mod dijkstra;
pub mod error;
pub mod route;
pub mod search;
pub mod status;

#[cfg(test)]
mod tests;

pub use algorithm::{AlgorithmRegistry, RouteAlgorithm};
pub use astar::AStar;
pub use config::{CostKind, NavigateConfig};
pub use cost::{Cost, CostModel, Key};
pub use dijkstra::BidirectionalDijkstra;
pub use error::{NavigateError, NavigateResult};
pub use route::RouteEngine;
pub use status::{NavigateIteration, NavigateSegment, NavigateStatus, Route, RouteRequest, SearchState, Side};
