//! Forward A*.
//!
//! Grows from the start only, ordering points by cost so far plus a
//! straight-line lower bound to the destination (converted to time at the
//! map's fastest speed when minimising time).  The destination line's ends
//! are goal labels seeded once; the search ends when the cheapest open
//! estimate reaches the best meeting.

use rm_map::MapContext;

use crate::algorithm::RouteAlgorithm;
use crate::search;
use crate::status::{NavigateStatus, SearchState, Side};
use crate::NavigateResult;

pub struct AStar {
    max_iterations: u32,
}

impl AStar {
    pub const NAME: &'static str = "astar";

    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

impl Default for AStar {
    fn default() -> Self {
        Self::new(crate::NavigateConfig::default().max_iterations)
    }
}

impl RouteAlgorithm for AStar {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    fn bidirectional(&self) -> bool {
        false
    }

    fn step(&self, map: &MapContext, status: &mut NavigateStatus, side: Side) -> NavigateResult<()> {
        if status.state() == SearchState::Initializing {
            return search::seed(map, status, true);
        }
        if side == Side::Forward {
            search::expand(map, status, side)?;
        }
        Ok(())
    }

    fn is_terminal(&self, status: &NavigateStatus) -> bool {
        let Some(best) = status.best_key() else {
            return false;
        };
        status.frontier_min(Side::Forward).is_none_or(|top| top >= best)
    }
}
