//! Route search state.
//!
//! # Arena
//!
//! A [`NavigateStatus`] owns every node of one search in a `Vec`, addressed
//! by [`IterationId`].  Slots 0 and 1 are the `first` and `last` sentinels:
//! they stand for the start and destination positions, cost nothing, and
//! keep their ids across [`recalc`](crate::RouteEngine::recalc).  Every
//! other node is one labelled segment.
//!
//! Forward labels link towards `first` through `prev`; backward labels link
//! towards `last` through `next`.  When the search converges the winning
//! chain is stitched together so that following `next` from `first` reaches
//! `last`, and running costs are recomputed along it.
//!
//! A recalculation drops every intermediate node in one truncation and bumps
//! the generation; nodes record the generation they were created in.

use rm_core::{IterationId, LineId, Position};

use crate::config::NavigateConfig;
use crate::cost::{Cost, Key};
use crate::search::SearchScratch;
use crate::{NavigateError, NavigateResult};

const FIRST: IterationId = IterationId(0);
const LAST: IterationId = IterationId(1);

/// Where a search stands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchState {
    /// Nothing labelled yet.
    Initializing,
    Searching,
    /// A route was found; `first → … → last` is linked.
    Converged,
    /// The iteration budget ran out before convergence.
    Exhausted,
}

/// Which end a step grows from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// From the start position towards the destination.
    Forward,
    /// From the destination back towards the start.
    Backward,
}

/// The route endpoints.  Each position lies on its line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteRequest {
    pub from_line: LineId,
    pub from_pos:  Position,
    pub to_line:   LineId,
    pub to_pos:    Position,
}

/// A directed piece of one line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigateSegment {
    pub line:     LineId,
    pub from_pos: Position,
    pub to_pos:   Position,
}

/// One arena node.
#[derive(Clone, Debug)]
pub struct NavigateIteration {
    pub segment:    NavigateSegment,
    /// Cost of this segment alone.
    pub step:       Cost,
    /// Cost from the start through this segment once converged; during the
    /// search, the cost from this node's own search origin.
    pub running:    Cost,
    pub prev:       Option<IterationId>,
    pub next:       Option<IterationId>,
    pub generation: u32,
}

/// A converged route.
///
/// `cost.time_ms` is the internal millisecond total; callers wanting the
/// travel time read [`Route::time_secs`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub segments:   Vec<NavigateSegment>,
    /// Metres and milliseconds.
    pub cost:       Cost,
    /// Rounds the search used.
    pub iterations: u32,
}

impl Route {
    /// `true` when start and destination coincide.
    pub fn is_trivial(&self) -> bool {
        self.segments.is_empty()
    }

    /// Travel time in whole seconds, rounded to nearest.
    pub fn time_secs(&self) -> u32 {
        self.cost.time_secs()
    }
}

// ── NavigateStatus ────────────────────────────────────────────────────────────

pub struct NavigateStatus {
    request:    RouteRequest,
    config:     NavigateConfig,
    algorithm:  String,
    nodes:      Vec<NavigateIteration>,
    state:      SearchState,
    iteration:  u32,
    generation: u32,
    maxdist:    i32,
    pub(crate) search: SearchScratch,
}

fn sentinel(position: Position, generation: u32) -> NavigateIteration {
    NavigateIteration {
        segment: NavigateSegment { line: LineId::INVALID, from_pos: position, to_pos: position },
        step: Cost::ZERO,
        running: Cost::ZERO,
        prev: None,
        next: None,
        generation,
    }
}

impl NavigateStatus {
    pub(crate) fn new(request: RouteRequest, config: NavigateConfig, algorithm: &str) -> Self {
        Self {
            request,
            config,
            algorithm:  algorithm.to_string(),
            nodes:      vec![sentinel(request.from_pos, 0), sentinel(request.to_pos, 0)],
            state:      SearchState::Initializing,
            iteration:  0,
            generation: 0,
            maxdist:    rm_core::distance(request.from_pos, request.to_pos),
            search:     SearchScratch::default(),
        }
    }

    /// Drop every intermediate node and start a new generation.
    pub(crate) fn reset(&mut self, config: NavigateConfig, algorithm: &str) {
        self.generation += 1;
        self.nodes.truncate(2);
        for node in &mut self.nodes {
            node.prev = None;
            node.next = None;
            node.step = Cost::ZERO;
            node.running = Cost::ZERO;
            node.generation = self.generation;
        }
        self.config = config;
        self.algorithm = algorithm.to_string();
        self.state = SearchState::Initializing;
        self.iteration = 0;
        self.search = SearchScratch::default();
    }

    pub fn request(&self) -> &RouteRequest {
        &self.request
    }

    pub fn config(&self) -> &NavigateConfig {
        &self.config
    }

    /// Name of the algorithm that produced this state.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SearchState) {
        self.state = state;
    }

    /// Rounds run so far (the last round, once finished).
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn set_iteration(&mut self, iteration: u32) {
        self.iteration = iteration;
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Straight-line distance between the endpoints, in metres.
    pub fn maxdist(&self) -> i32 {
        self.maxdist
    }

    /// Smallest open priority on `side`, if any.
    pub fn frontier_min(&self, side: Side) -> Option<Key> {
        match side {
            Side::Forward => self.search.forward.peek(),
            Side::Backward => self.search.backward.peek(),
        }
    }

    /// Key of the best meeting found so far.
    pub fn best_key(&self) -> Option<Key> {
        self.search.best_key()
    }

    pub fn first(&self) -> IterationId {
        FIRST
    }

    pub fn last(&self) -> IterationId {
        LAST
    }

    /// Number of nodes, sentinels included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 2
    }

    pub fn node(&self, id: IterationId) -> Option<&NavigateIteration> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (IterationId, &NavigateIteration)> {
        self.nodes.iter().enumerate().map(|(i, n)| (IterationId(i as u32), n))
    }

    pub(crate) fn node_mut(&mut self, id: IterationId) -> NavigateResult<&mut NavigateIteration> {
        self.nodes.get_mut(id.index()).ok_or(NavigateError::InvalidIteration(id))
    }

    /// Append a node stamped with the current generation.
    pub(crate) fn push(
        &mut self,
        segment: NavigateSegment,
        step: Cost,
        running: Cost,
        prev: Option<IterationId>,
        next: Option<IterationId>,
    ) -> IterationId {
        let id = IterationId(self.nodes.len() as u32);
        self.nodes.push(NavigateIteration { segment, step, running, prev, next, generation: self.generation });
        id
    }

    /// Stitch `meet_forward → meet_backward` into the `first → last` chain
    /// and recompute running costs along it.
    pub(crate) fn link(&mut self, meet_forward: IterationId, meet_backward: IterationId) -> NavigateResult<()> {
        let limit = self.nodes.len();

        let mut cur = meet_forward;
        for _ in 0..limit {
            let Some(prev) = self.node_mut(cur)?.prev else { break };
            self.node_mut(prev)?.next = Some(cur);
            cur = prev;
        }
        if cur != FIRST {
            return Err(NavigateError::InvalidIteration(cur));
        }

        let mut cur = meet_backward;
        for _ in 0..limit {
            let Some(next) = self.node_mut(cur)?.next else { break };
            self.node_mut(next)?.prev = Some(cur);
            cur = next;
        }
        if cur != LAST {
            return Err(NavigateError::InvalidIteration(cur));
        }

        self.node_mut(meet_forward)?.next = Some(meet_backward);
        self.node_mut(meet_backward)?.prev = Some(meet_forward);

        let mut running = Cost::ZERO;
        let mut cur = FIRST;
        self.node_mut(FIRST)?.running = running;
        for _ in 0..limit {
            let Some(next) = self.node_mut(cur)?.next else { break };
            let node = self.node_mut(next)?;
            running += node.step;
            node.running = running;
            cur = next;
        }
        Ok(())
    }

    /// Nodes from `first` to `last`, sentinels excluded.  Empty unless the
    /// search converged.
    pub fn path(&self) -> Vec<IterationId> {
        if self.state != SearchState::Converged {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut cur = self.nodes[FIRST.index()].next;
        while let Some(id) = cur {
            if id == LAST || out.len() > self.nodes.len() {
                break;
            }
            out.push(id);
            cur = self.nodes.get(id.index()).and_then(|n| n.next);
        }
        out
    }

    /// The converged route, or [`NavigateError::NoRoute`].
    pub fn route(&self) -> NavigateResult<Route> {
        if self.state != SearchState::Converged {
            return Err(NavigateError::NoRoute { iterations: self.iteration });
        }
        let segments = self
            .path()
            .into_iter()
            .map(|id| self.nodes[id.index()].segment)
            .collect();
        Ok(Route { segments, cost: self.nodes[LAST.index()].running, iterations: self.iteration })
    }
}
