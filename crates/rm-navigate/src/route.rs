//! The route engine: runs any [`RouteAlgorithm`] to convergence or
//! exhaustion.
//!
//! # Rounds
//!
//! Round `i` (1-based) is one forward step, then one backward step for
//! bidirectional algorithms.  The terminal test runs after every step, so a
//! search may converge halfway through a round.  A search that is still open
//! after `max_iterations` rounds ends [`Exhausted`](SearchState::Exhausted)
//! with its iteration counter equal to the budget.

use log::{debug, info, warn};

use rm_core::Position;
use rm_map::MapContext;

use crate::algorithm::RouteAlgorithm;
use crate::config::NavigateConfig;
use crate::search;
use crate::status::{NavigateStatus, RouteRequest, SearchState, Side};
use crate::{NavigateError, NavigateResult};

pub struct RouteEngine {
    config: NavigateConfig,
}

impl RouteEngine {
    pub fn new(config: NavigateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NavigateConfig {
        &self.config
    }

    /// Start a search for `request` and run it until it converges or
    /// exhausts.
    ///
    /// Both lines must exist on `map`.  Running out of iterations is not an
    /// error: the returned status is `Exhausted` and
    /// [`NavigateStatus::route`] reports `NoRoute`.
    pub fn get_initial(
        &self,
        map:       &MapContext,
        algorithm: &dyn RouteAlgorithm,
        request:   RouteRequest,
    ) -> NavigateResult<NavigateStatus> {
        map.line(request.from_line)?;
        map.line(request.to_line)?;

        let mut status = NavigateStatus::new(request, self.config.clone(), algorithm.name());
        debug!(
            "{}: route {} → {} (straight {} m)",
            algorithm.name(),
            request.from_pos,
            request.to_pos,
            status.maxdist(),
        );
        self.run(map, algorithm, &mut status)?;
        Ok(status)
    }

    /// Rerun `status` from scratch, possibly with another algorithm.
    ///
    /// The sentinels keep their ids; every other node is dropped and the
    /// generation advances.
    pub fn recalc(
        &self,
        map:       &MapContext,
        algorithm: &dyn RouteAlgorithm,
        status:    &mut NavigateStatus,
    ) -> NavigateResult<()> {
        status.reset(self.config.clone(), algorithm.name());
        debug!("{}: recalc, generation {}", algorithm.name(), status.generation());
        self.run(map, algorithm, status)
    }

    /// Snap two free positions to their nearest lines and route between
    /// them.
    pub fn route_between(
        &self,
        map:       &MapContext,
        algorithm: &dyn RouteAlgorithm,
        from:      Position,
        to:        Position,
    ) -> NavigateResult<NavigateStatus> {
        let radius = self.config.snap_radius_squares;
        let start = map.nearest_line(from, radius)?.ok_or(NavigateError::NoCandidateLine(from))?;
        let end = map.nearest_line(to, radius)?.ok_or(NavigateError::NoCandidateLine(to))?;
        debug!(
            "snapped {from} to line {} ({} m), {to} to line {} ({} m)",
            start.line, start.distance, end.line, end.distance,
        );

        let request = RouteRequest {
            from_line: start.line,
            from_pos:  start.position,
            to_line:   end.line,
            to_pos:    end.position,
        };
        self.get_initial(map, algorithm, request)
    }

    fn run(&self, map: &MapContext, algorithm: &dyn RouteAlgorithm, status: &mut NavigateStatus) -> NavigateResult<()> {
        let max = algorithm.max_iterations();

        for iteration in 1..=max {
            status.set_iteration(iteration);

            if self.step(map, algorithm, status, Side::Forward)? {
                return Ok(());
            }
            if algorithm.bidirectional() && self.step(map, algorithm, status, Side::Backward)? {
                return Ok(());
            }
        }

        status.set_state(SearchState::Exhausted);
        warn!("{}: no route after {} iterations", algorithm.name(), status.iteration());
        Ok(())
    }

    /// One step plus the terminal test.  Returns `true` once converged.
    fn step(
        &self,
        map:       &MapContext,
        algorithm: &dyn RouteAlgorithm,
        status:    &mut NavigateStatus,
        side:      Side,
    ) -> NavigateResult<bool> {
        algorithm.step(map, status, side)?;
        if !algorithm.is_terminal(status) {
            return Ok(false);
        }

        search::converge(status)?;
        let cost = status.node(status.last()).map(|n| n.running).unwrap_or_default();
        info!(
            "{}: converged after {} iterations, {} m, {} s, {} segments",
            algorithm.name(),
            status.iteration(),
            cost.distance,
            cost.time_secs(),
            status.path().len(),
        );
        Ok(true)
    }
}
