//! Pluggable search strategies.
//!
//! # Pluggability
//!
//! The engine drives a search only through the [`RouteAlgorithm`] trait, so
//! an application can register its own strategy next to the built-in
//! [`BidirectionalDijkstra`](crate::BidirectionalDijkstra) and
//! [`AStar`](crate::AStar).  Strategies are stateless: everything a search
//! knows lives in its [`NavigateStatus`], which is what makes
//! [`recalc`](crate::RouteEngine::recalc) a reset instead of a rebuild.
//!
//! # Selection
//!
//! An [`AlgorithmRegistry`] is append-only and never picks on its own; the
//! caller asks for a strategy by name or by position.

use rm_map::MapContext;

use crate::config::NavigateConfig;
use crate::status::{NavigateStatus, Side};
use crate::{AStar, BidirectionalDijkstra, NavigateError, NavigateResult};

// ── RouteAlgorithm trait ──────────────────────────────────────────────────────

/// One route search strategy.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so a registry can be shared; the
/// statuses they operate on are not.
pub trait RouteAlgorithm: Send + Sync {
    /// Unique name used for registry lookups.
    fn name(&self) -> &str;

    /// Rounds the engine runs before declaring the search exhausted.
    fn max_iterations(&self) -> u32;

    /// Whether the engine also calls [`step`](Self::step) with
    /// [`Side::Backward`] each round.
    fn bidirectional(&self) -> bool;

    /// Advance the search by one step on `side`.
    ///
    /// The first forward step of a search finds the status in
    /// `SearchState::Initializing` and seeds it.
    fn step(&self, map: &MapContext, status: &mut NavigateStatus, side: Side) -> NavigateResult<()>;

    /// `true` once the best meeting found can no longer be improved.
    fn is_terminal(&self, status: &NavigateStatus) -> bool;
}

// ── AlgorithmRegistry ─────────────────────────────────────────────────────────

/// Append-only list of strategies.
#[derive(Default)]
pub struct AlgorithmRegistry {
    algorithms: Vec<Box<dyn RouteAlgorithm>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in strategies, bidirectional Dijkstra
    /// first.
    pub fn with_defaults(config: &NavigateConfig) -> Self {
        let mut registry = Self::new();
        registry.algorithms.push(Box::new(BidirectionalDijkstra::new(config.max_iterations)));
        registry.algorithms.push(Box::new(AStar::new(config.max_iterations)));
        registry
    }

    /// Append `algorithm` and return its position.  Names must be unique.
    pub fn register(&mut self, algorithm: Box<dyn RouteAlgorithm>) -> NavigateResult<usize> {
        if self.algorithms.iter().any(|a| a.name() == algorithm.name()) {
            return Err(NavigateError::DuplicateAlgorithm(algorithm.name().to_string()));
        }
        log::debug!("registered route algorithm {}", algorithm.name());
        self.algorithms.push(algorithm);
        Ok(self.algorithms.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&dyn RouteAlgorithm> {
        self.algorithms.get(index).map(Box::as_ref)
    }

    pub fn find(&self, name: &str) -> NavigateResult<&dyn RouteAlgorithm> {
        self.algorithms
            .iter()
            .find(|a| a.name() == name)
            .map(Box::as_ref)
            .ok_or_else(|| NavigateError::UnknownAlgorithm(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.algorithms.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}
