//! Frontier machinery shared by the built-in algorithms.
//!
//! [`seed`] and [`expand`] are public so that a custom
//! [`RouteAlgorithm`](crate::RouteAlgorithm) can reuse them with its own
//! ordering of steps and its own terminal test.
//!
//! # Labels
//!
//! Each side keeps one label per reached point: the best known cost from its
//! origin and the arena node whose segment ends (forward) or starts
//! (backward) at that point.  Every improvement appends a new node; the
//! superseded node stays in the arena but drops out of the chain.
//!
//! # Seeding
//!
//! The first forward step labels both ends of the start line (forward) and
//! of the destination line (backward).  A seed whose position coincides with
//! the endpoint is labelled with the sentinel itself at zero cost.  When both
//! positions lie on the same line a direct candidate is added before any
//! other, so it wins ties; identical positions link `first` straight to
//! `last`.
//!
//! # Meetings
//!
//! Labelling a point already labelled by the other side offers a meeting.
//! The best meeting cost only changes on a strictly better offer.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use rm_core::{IterationId, LineId, PointId, Position};
use rm_map::MapContext;

use crate::cost::{Cost, CostModel, Key};
use crate::status::{NavigateSegment, NavigateStatus, SearchState, Side};
use crate::{NavigateError, NavigateResult};

// ── Frontier ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
pub(crate) struct Label {
    pub cost: Cost,
    /// Priority the label was queued with.
    pub key:  Key,
    pub node: IterationId,
}

/// Priority queue plus labels of one search side.
#[derive(Default)]
pub(crate) struct Frontier {
    heap:    BinaryHeap<Reverse<(Key, PointId)>>,
    labels:  FxHashMap<PointId, Label>,
    settled: FxHashSet<PointId>,
}

impl Frontier {
    pub fn label(&self, point: PointId) -> Option<&Label> {
        self.labels.get(&point)
    }

    fn improves(&self, point: PointId, key: Key, model: &CostModel<'_>) -> bool {
        if self.settled.contains(&point) {
            return false;
        }
        self.labels.get(&point).is_none_or(|l| key < model.key(l.cost))
    }

    fn set(&mut self, point: PointId, label: Label) {
        self.labels.insert(point, label);
        self.heap.push(Reverse((label.key, point)));
    }

    /// Drop queue entries that were superseded or already settled.
    fn prune(&mut self) {
        while let Some(&Reverse((key, point))) = self.heap.peek() {
            let stale = self.settled.contains(&point) || self.labels.get(&point).is_none_or(|l| key > l.key);
            if !stale {
                break;
            }
            self.heap.pop();
        }
    }

    fn pop(&mut self) -> Option<PointId> {
        self.prune();
        let Reverse((_, point)) = self.heap.pop()?;
        self.settled.insert(point);
        Some(point)
    }

    /// Smallest live priority.  Valid after every step, which prunes.
    pub fn peek(&self) -> Option<Key> {
        self.heap.peek().map(|Reverse((key, _))| *key)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

// ── Scratch ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Meeting {
    /// Both sides labelled this point.
    Point(PointId),
    /// Start and destination on one line.
    Direct(IterationId),
}

/// Lower-bound parameters of a directed search.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Heuristic {
    target:        Position,
    max_speed_kmh: u16,
}

/// Algorithm working state, owned by the status.
#[derive(Default)]
pub(crate) struct SearchScratch {
    pub forward:   Frontier,
    pub backward:  Frontier,
    pub best:      Option<(Key, Meeting)>,
    line_costs:    FxHashMap<LineId, Cost>,
    positions:     FxHashMap<PointId, Position>,
    heuristic:     Option<Heuristic>,
}

impl SearchScratch {
    fn side(&mut self, side: Side) -> (&mut Frontier, &Frontier) {
        match side {
            Side::Forward => (&mut self.forward, &self.backward),
            Side::Backward => (&mut self.backward, &self.forward),
        }
    }

    fn offer(&mut self, key: Key, meeting: Meeting) {
        if self.best.is_none_or(|(best, _)| key < best) {
            log::debug!("meeting {meeting:?} improves best to {key:#x}");
            self.best = Some((key, meeting));
        }
    }

    /// Best meeting key so far.
    pub fn best_key(&self) -> Option<Key> {
        self.best.map(|(key, _)| key)
    }
}

fn position(map: &MapContext, scratch: &mut SearchScratch, point: PointId) -> NavigateResult<Position> {
    if let Some(&p) = scratch.positions.get(&point) {
        return Ok(p);
    }
    let p = map.point_position(point)?;
    scratch.positions.insert(point, p);
    Ok(p)
}

fn line_cost(model: &CostModel<'_>, scratch: &mut SearchScratch, line: LineId) -> NavigateResult<Cost> {
    if let Some(&c) = scratch.line_costs.get(&line) {
        return Ok(c);
    }
    let c = model.line(line)?;
    scratch.line_costs.insert(line, c);
    Ok(c)
}

fn heuristic(model: &CostModel<'_>, scratch: &SearchScratch, side: Side, at: Position) -> Key {
    match (side, scratch.heuristic) {
        (Side::Forward, Some(h)) => model.lower_bound(at, h.target, h.max_speed_kmh),
        _ => 0,
    }
}

// ── Steps ─────────────────────────────────────────────────────────────────────

/// Label `point` on `side` unless it already has an equal or better label.
/// Appends the node and offers a meeting with the other side.
fn relax(
    model: &CostModel<'_>,
    status: &mut NavigateStatus,
    side: Side,
    point: PointId,
    at: Position,
    cost: Cost,
    node: impl FnOnce(&mut NavigateStatus) -> IterationId,
) {
    let g = model.key(cost);
    let h = heuristic(model, &status.search, side, at);
    let (own, _) = status.search.side(side);
    if !own.improves(point, g, model) {
        return;
    }

    let node = node(status);
    let (own, other) = status.search.side(side);
    own.set(point, Label { cost, key: g + h, node });
    let meeting = other.label(point).map(|l| g + model.key(l.cost));
    if let Some(key) = meeting {
        status.search.offer(key, Meeting::Point(point));
    }
}

/// Label both ends of the start and destination lines and move the status
/// to `Searching`.  With `directed`, forward priorities include a
/// straight-line lower bound to the destination.
pub fn seed(map: &MapContext, status: &mut NavigateStatus, directed: bool) -> NavigateResult<()> {
    let config = status.config().clone();
    let model = CostModel::new(map, &config);
    let request = *status.request();
    let first = status.first();
    let last = status.last();

    if directed {
        status.search.heuristic = Some(Heuristic { target: request.to_pos, max_speed_kmh: model.max_speed()? });
    }

    if request.from_line == request.to_line && request.from_pos == request.to_pos {
        status.search.offer(0, Meeting::Direct(first));
    } else if request.from_line == request.to_line {
        let step = model.partial(request.from_line, request.from_pos, request.to_pos)?;
        let segment = NavigateSegment { line: request.from_line, from_pos: request.from_pos, to_pos: request.to_pos };
        let node = status.push(segment, step, step, Some(first), Some(last));
        status.search.offer(model.key(step), Meeting::Direct(node));
    }

    let from_line = map.line(request.from_line)?;
    for end in [from_line.from, from_line.to] {
        let at = position(map, &mut status.search, end)?;
        if at == request.from_pos {
            relax(&model, status, Side::Forward, end, at, Cost::ZERO, |_| first);
        } else {
            let step = model.partial(request.from_line, request.from_pos, at)?;
            let segment = NavigateSegment { line: request.from_line, from_pos: request.from_pos, to_pos: at };
            relax(&model, status, Side::Forward, end, at, step, |s| s.push(segment, step, step, Some(first), None));
        }
    }

    let to_line = map.line(request.to_line)?;
    for end in [to_line.from, to_line.to] {
        let at = position(map, &mut status.search, end)?;
        if at == request.to_pos {
            relax(&model, status, Side::Backward, end, at, Cost::ZERO, |_| last);
        } else {
            let step = model.partial(request.to_line, at, request.to_pos)?;
            let segment = NavigateSegment { line: request.to_line, from_pos: at, to_pos: request.to_pos };
            relax(&model, status, Side::Backward, end, at, step, |s| s.push(segment, step, step, None, Some(last)));
        }
    }

    status.search.forward.prune();
    status.search.backward.prune();
    status.set_state(SearchState::Searching);
    log::debug!(
        "seeded search: {} forward, {} backward labels, best {:?}",
        status.search.forward.label_count(),
        status.search.backward.label_count(),
        status.search.best_key(),
    );
    Ok(())
}

/// Settle the cheapest open point of `side` and relax the lines at it.
/// Returns `false` when the side has nothing left to settle.
pub fn expand(map: &MapContext, status: &mut NavigateStatus, side: Side) -> NavigateResult<bool> {
    let config = status.config().clone();
    let model = CostModel::new(map, &config);

    let (own, _) = status.search.side(side);
    let Some(point) = own.pop() else {
        return Ok(false);
    };
    let Some(label) = own.label(point).copied() else {
        return Ok(false);
    };
    let here = position(map, &mut status.search, point)?;

    for line in map.lines_at(point)? {
        let Some(other) = map.line(line)?.other_end(point) else { continue };
        if other == point {
            continue;
        }
        let there = position(map, &mut status.search, other)?;
        let step = line_cost(&model, &mut status.search, line)?;
        let cost = label.cost + step;

        match side {
            Side::Forward => {
                let segment = NavigateSegment { line, from_pos: here, to_pos: there };
                relax(&model, status, side, other, there, cost, |s| {
                    s.push(segment, step, cost, Some(label.node), None)
                });
            }
            Side::Backward => {
                let segment = NavigateSegment { line, from_pos: there, to_pos: here };
                relax(&model, status, side, other, there, cost, |s| {
                    s.push(segment, step, cost, None, Some(label.node))
                });
            }
        }
    }

    status.search.forward.prune();
    status.search.backward.prune();
    Ok(true)
}

/// Link the best meeting into the `first → last` chain.
pub(crate) fn converge(status: &mut NavigateStatus) -> NavigateResult<()> {
    let Some((_, meeting)) = status.search.best else {
        return Err(NavigateError::NoRoute { iterations: status.iteration() });
    };
    let (forward, backward) = match meeting {
        Meeting::Direct(node) => (node, status.last()),
        Meeting::Point(point) => {
            let f = status.search.forward.label(point).map(|l| l.node);
            let b = status.search.backward.label(point).map(|l| l.node);
            match (f, b) {
                (Some(f), Some(b)) => (f, b),
                _ => return Err(NavigateError::NoRoute { iterations: status.iteration() }),
            }
        }
    };
    status.link(forward, backward)?;
    status.set_state(SearchState::Converged);
    Ok(())
}
