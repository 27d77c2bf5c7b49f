//! Bidirectional Dijkstra.
//!
//! Both sides settle points in cost order.  The search is over once the two
//! cheapest open labels together cost at least as much as the best meeting:
//! no path through an unsettled point can beat it.  If either side runs dry
//! the best meeting is final as well.

use rm_map::MapContext;

use crate::algorithm::RouteAlgorithm;
use crate::search;
use crate::status::{NavigateStatus, SearchState, Side};
use crate::NavigateResult;

pub struct BidirectionalDijkstra {
    max_iterations: u32,
}

impl BidirectionalDijkstra {
    pub const NAME: &'static str = "bidirectional-dijkstra";

    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

impl Default for BidirectionalDijkstra {
    fn default() -> Self {
        Self::new(crate::NavigateConfig::default().max_iterations)
    }
}

impl RouteAlgorithm for BidirectionalDijkstra {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    fn bidirectional(&self) -> bool {
        true
    }

    fn step(&self, map: &MapContext, status: &mut NavigateStatus, side: Side) -> NavigateResult<()> {
        if status.state() == SearchState::Initializing {
            return search::seed(map, status, false);
        }
        search::expand(map, status, side)?;
        Ok(())
    }

    fn is_terminal(&self, status: &NavigateStatus) -> bool {
        let Some(best) = status.best_key() else {
            return false;
        };
        match (status.frontier_min(Side::Forward), status.frontier_min(Side::Backward)) {
            (Some(f), Some(b)) => f + b >= best,
            _ => true,
        }
    }
}
