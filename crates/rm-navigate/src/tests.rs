//! Unit tests for rm-navigate.
//!
//! Maps are built in memory with `MapBuilder`.  Coordinates are micro-degrees
//! near the equator, where 1000 µ° is about 111 m.

#[cfg(test)]
mod helpers {
    use rm_core::{Area, LineId, Position};
    use rm_map::{BuiltMap, GridSpec, MapBuilder, MapContext};

    use crate::{NavigateStatus, RouteRequest};

    pub const STEP: i32 = 1_000;

    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    pub fn open(builder: MapBuilder) -> (BuiltMap, MapContext) {
        init_logging();
        let built = builder.build().unwrap();
        let map = MapContext::map(&built.database).unwrap();
        map.activate().unwrap();
        (built, map)
    }

    /// Two points, one line between them at 50 km/h, on a single square
    /// reaching `STEP` past the road on every side.
    pub fn two_nodes() -> (BuiltMap, MapContext, [Position; 2]) {
        let p0 = Position::new(0, 0);
        let p1 = Position::new(STEP, 0);
        let mut b = MapBuilder::new("two").with_grid(GridSpec::Explicit {
            area:      Area::new(-STEP, 2 * STEP, -STEP, STEP),
            longitude: 1,
            latitude:  1,
        });
        let a = b.add_point(p0);
        let c = b.add_point(p1);
        b.add_line(a, c, 50).unwrap();
        let (built, map) = open(b);
        (built, map, [p0, p1])
    }

    /// `n × n` lattice, `STEP` apart, every neighbour pair joined at 50 km/h.
    pub fn lattice(n: i32) -> (BuiltMap, MapContext) {
        let mut b = MapBuilder::new("lattice");
        let mut ids = Vec::new();
        for y in 0..n {
            for x in 0..n {
                ids.push(b.add_point(Position::new(x * STEP, y * STEP)));
            }
        }
        let at = |x: i32, y: i32| ids[(y * n + x) as usize];
        for y in 0..n {
            for x in 0..n {
                if x + 1 < n {
                    b.add_line(at(x, y), at(x + 1, y), 50).unwrap();
                }
                if y + 1 < n {
                    b.add_line(at(x, y), at(x, y + 1), 50).unwrap();
                }
            }
        }
        open(b)
    }

    /// Request along one line from one end to the other.
    pub fn along(line: LineId, from: Position, to: Position) -> RouteRequest {
        RouteRequest { from_line: line, from_pos: from, to_line: line, to_pos: to }
    }

    /// The converged chain must be continuous from start to destination.
    pub fn assert_continuous(status: &NavigateStatus) {
        let route = status.route().unwrap();
        let request = status.request();
        let Some(first) = route.segments.first() else {
            assert_eq!(request.from_pos, request.to_pos);
            return;
        };
        assert_eq!(first.from_pos, request.from_pos);
        assert_eq!(route.segments.last().unwrap().to_pos, request.to_pos);
        for w in route.segments.windows(2) {
            assert_eq!(w[0].to_pos, w[1].from_pos, "gap between segments");
        }
    }
}

// ── Cost model ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod cost {
    use rm_core::{distance, LineId, Position};
    use rm_map::MapBuilder;

    use crate::cost::{offset_along, polyline_length, travel_ms};
    use crate::{Cost, CostKind, CostModel, NavigateConfig};

    #[test]
    fn travel_time_in_milliseconds() {
        // 1 km at 60 km/h is one minute.
        assert_eq!(travel_ms(1_000, 60), 60_000);
        assert_eq!(travel_ms(0, 60), 0);
        assert_eq!(travel_ms(1_000, 0), 3_600_000, "zero speed is clamped to 1 km/h");
        assert_eq!(Cost { distance: 0, time_ms: 1_499 }.time_secs(), 1);
        assert_eq!(Cost { distance: 0, time_ms: 1_500 }.time_secs(), 2);
    }

    #[test]
    fn keys_order_by_primary_measure() {
        let quick = Cost { distance: 900, time_ms: 10 };
        let short = Cost { distance: 100, time_ms: 90 };
        assert!(quick.key(CostKind::Fastest) < short.key(CostKind::Fastest));
        assert!(short.key(CostKind::Shortest) < quick.key(CostKind::Shortest));
        // Keys add like costs.
        assert_eq!(
            quick.key(CostKind::Fastest) + short.key(CostKind::Fastest),
            (quick + short).key(CostKind::Fastest),
        );
    }

    #[test]
    fn offsets_along_a_bent_polyline() {
        let geometry = [Position::new(0, 0), Position::new(1_000, 0), Position::new(1_000, 1_000)];
        let leg = distance(geometry[0], geometry[1]) as u32;
        assert_eq!(polyline_length(&geometry), 2 * leg);
        assert_eq!(offset_along(&geometry, geometry[0]), 0);
        assert_eq!(offset_along(&geometry, geometry[1]), leg);
        assert_eq!(offset_along(&geometry, geometry[2]), 2 * leg);
        // Off the line: measured at the projection.
        assert_eq!(offset_along(&geometry, Position::new(500, 50)), distance(geometry[0], Position::new(500, 0)) as u32);
    }

    #[test]
    fn line_cost_follows_shape_and_speed() {
        super::helpers::init_logging();
        let mut b = MapBuilder::new("bent");
        let a = b.add_point(Position::new(0, 0));
        let c = b.add_point(Position::new(1_000, 1_000));
        let bent = b.add_line(a, c, 0).unwrap();
        b.add_shape_point(bent, Position::new(1_000, 0)).unwrap();
        let fast = b.add_line(a, c, 100).unwrap();
        let (built, map) = super::helpers::open(b);

        let config = NavigateConfig { default_speed_kmh: 36, ..Default::default() };
        let model = CostModel::new(&map, &config);

        let bent_cost = model.line(built.line(bent)).unwrap();
        assert_eq!(bent_cost.distance as i32, map.line_length(built.line(bent)).unwrap());
        assert_eq!(bent_cost.time_ms, travel_ms(bent_cost.distance, 36), "unset speed uses the default");

        let fast_cost = model.line(built.line(fast)).unwrap();
        assert!(fast_cost.distance < bent_cost.distance);
        assert_eq!(model.max_speed().unwrap(), 100);

        let half = model.partial(built.line(bent), Position::new(1_000, 0), Position::new(1_000, 1_000)).unwrap();
        assert_eq!(half.distance, distance(Position::new(1_000, 0), Position::new(1_000, 1_000)) as u32);
    }

    #[test]
    fn lower_bound_never_exceeds_a_real_route() {
        let (_, map) = super::helpers::lattice(3);
        for kind in [CostKind::Fastest, CostKind::Shortest] {
            let config = NavigateConfig { cost: kind, ..Default::default() };
            let model = CostModel::new(&map, &config);
            let max = model.max_speed().unwrap();
            for l in 0..map.line_count() {
                let line = map.line(LineId(l as u32)).unwrap();
                let from = map.point_position(line.from).unwrap();
                let to = map.point_position(line.to).unwrap();
                let actual = model.key(model.line(LineId(l as u32)).unwrap());
                assert!(model.lower_bound(from, to, max) <= actual);
            }
        }
    }
}

// ── Search status ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod status {
    use rm_core::{IterationId, LineId};

    use crate::{BidirectionalDijkstra, NavigateConfig, RouteEngine, SearchState};

    #[test]
    fn two_node_graph_converges_in_one_iteration() {
        let (_, map, [p0, p1]) = super::helpers::two_nodes();
        let engine = RouteEngine::new(NavigateConfig::default());
        let algorithm = BidirectionalDijkstra::default();

        let status = engine.get_initial(&map, &algorithm, super::helpers::along(LineId(0), p0, p1)).unwrap();

        assert_eq!(status.state(), SearchState::Converged);
        assert_eq!(status.iteration(), 1);
        assert_eq!(status.path().len(), 1);
        let route = status.route().unwrap();
        assert_eq!(route.cost.distance as i32, rm_core::distance(p0, p1));
        assert_eq!(route.time_secs(), (route.cost.time_ms + 500) / 1_000);
        assert_eq!(route.iterations, 1);
        assert_eq!(status.maxdist(), rm_core::distance(p0, p1));
        super::helpers::assert_continuous(&status);
    }

    #[test]
    fn disconnected_graph_exhausts_at_budget() {
        super::helpers::init_logging();
        let mut b = rm_map::MapBuilder::new("split");
        let p = [(0, 0), (1_000, 0), (50_000, 50_000), (51_000, 50_000)]
            .map(|(x, y)| b.add_point(rm_core::Position::new(x, y)));
        let west = b.add_line(p[0], p[1], 50).unwrap();
        let east = b.add_line(p[2], p[3], 50).unwrap();
        let (built, map) = super::helpers::open(b);

        let engine = RouteEngine::new(NavigateConfig::default());
        let algorithm = BidirectionalDijkstra::new(25);
        let request = crate::RouteRequest {
            from_line: built.line(west),
            from_pos:  map.point_position(built.point(p[0])).unwrap(),
            to_line:   built.line(east),
            to_pos:    map.point_position(built.point(p[3])).unwrap(),
        };
        let status = engine.get_initial(&map, &algorithm, request).unwrap();

        assert_eq!(status.state(), SearchState::Exhausted);
        assert_eq!(status.iteration(), 25);
        assert!(status.path().is_empty());
        assert!(matches!(status.route(), Err(crate::NavigateError::NoRoute { iterations: 25 })));
    }

    #[test]
    fn sentinels_survive_recalc() {
        let (_, map, [p0, p1]) = super::helpers::two_nodes();
        let engine = RouteEngine::new(NavigateConfig::default());
        let dijkstra = BidirectionalDijkstra::default();
        let astar = crate::AStar::default();

        let mut status = engine.get_initial(&map, &dijkstra, super::helpers::along(LineId(0), p0, p1)).unwrap();
        let before = status.route().unwrap();
        assert_eq!(status.first(), IterationId(0));
        assert_eq!(status.last(), IterationId(1));
        assert_eq!(status.generation(), 0);

        engine.recalc(&map, &astar, &mut status).unwrap();

        assert_eq!(status.first(), IterationId(0));
        assert_eq!(status.last(), IterationId(1));
        assert_eq!(status.node(status.first()).unwrap().segment.from_pos, p0);
        assert_eq!(status.node(status.last()).unwrap().segment.to_pos, p1);
        assert_eq!(status.generation(), 1);
        assert_eq!(status.algorithm(), crate::AStar::NAME);
        assert!(status.nodes().all(|(_, n)| n.generation == 1), "old nodes were dropped");
        assert_eq!(status.state(), SearchState::Converged);
        assert_eq!(status.route().unwrap().cost, before.cost);
    }

    #[test]
    fn same_position_is_a_trivial_route() {
        let (_, map, [p0, _]) = super::helpers::two_nodes();
        let engine = RouteEngine::new(NavigateConfig::default());
        let status = engine
            .get_initial(&map, &BidirectionalDijkstra::default(), super::helpers::along(LineId(0), p0, p0))
            .unwrap();

        let route = status.route().unwrap();
        assert!(route.is_trivial());
        assert_eq!(route.cost, crate::Cost::ZERO);
        assert_eq!(status.node(status.first()).unwrap().next, Some(status.last()));
    }

    #[test]
    fn mid_line_positions_cost_the_partial_length() {
        let (_, map, [p0, p1]) = super::helpers::two_nodes();
        let from = rm_core::Position::new(250, 0);
        let to = rm_core::Position::new(750, 0);
        let engine = RouteEngine::new(NavigateConfig::default());
        let status = engine
            .get_initial(&map, &BidirectionalDijkstra::default(), super::helpers::along(LineId(0), from, to))
            .unwrap();

        let route = status.route().unwrap();
        assert_eq!(route.segments.len(), 1);
        assert_eq!(route.cost.distance as i32, rm_core::distance(from, to));
        assert!((route.cost.distance as i32) < rm_core::distance(p0, p1));
        super::helpers::assert_continuous(&status);
    }

    #[test]
    fn unknown_line_is_rejected() {
        let (_, map, [p0, p1]) = super::helpers::two_nodes();
        let engine = RouteEngine::new(NavigateConfig::default());
        let request = super::helpers::along(LineId(7), p0, p1);
        let err = engine.get_initial(&map, &BidirectionalDijkstra::default(), request).err().unwrap();
        assert!(matches!(err, crate::NavigateError::Map(rm_map::MapError::IndexOutOfRange { .. })));
    }
}

// ── Algorithms ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod algorithms {
    use rm_core::{distance, Position};
    use rm_map::MapBuilder;

    use crate::{
        AStar, BidirectionalDijkstra, CostKind, NavigateConfig, RouteAlgorithm, RouteEngine, RouteRequest,
        SearchState,
    };

    use super::helpers::STEP;

    #[test]
    fn lattice_corner_to_corner() {
        let (_, map) = super::helpers::lattice(4);
        let engine = RouteEngine::new(NavigateConfig::default());
        let from = Position::new(0, 0);
        let to = Position::new(3 * STEP, 3 * STEP);
        let edge = distance(Position::new(0, 0), Position::new(STEP, 0)) as u32;

        let status = engine.route_between(&map, &BidirectionalDijkstra::default(), from, to).unwrap();
        assert_eq!(status.state(), SearchState::Converged);
        let route = status.route().unwrap();
        assert_eq!(route.cost.distance, 6 * edge);
        assert_eq!(route.segments.len(), 6);
        super::helpers::assert_continuous(&status);
    }

    #[test]
    fn dijkstra_and_astar_agree() {
        let (_, map) = super::helpers::lattice(5);
        for kind in [CostKind::Fastest, CostKind::Shortest] {
            let engine = RouteEngine::new(NavigateConfig { cost: kind, ..Default::default() });
            let from = Position::new(STEP, 0);
            let to = Position::new(4 * STEP, 3 * STEP);

            let d = engine.route_between(&map, &BidirectionalDijkstra::default(), from, to).unwrap();
            let a = engine.route_between(&map, &AStar::default(), from, to).unwrap();

            assert_eq!(d.route().unwrap().cost, a.route().unwrap().cost, "{kind:?}");
            super::helpers::assert_continuous(&a);
        }
    }

    #[test]
    fn random_pairs_agree() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let (_, map) = super::helpers::lattice(6);
        let engine = RouteEngine::new(NavigateConfig::default());
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..20 {
            let mut pick = || Position::new(rng.gen_range(0..=5) * STEP, rng.gen_range(0..=5) * STEP);
            let (from, to) = (pick(), pick());
            let d = engine.route_between(&map, &BidirectionalDijkstra::default(), from, to).unwrap();
            let a = engine.route_between(&map, &AStar::default(), from, to).unwrap();
            assert_eq!(d.route().unwrap().cost, a.route().unwrap().cost, "{from} → {to}");
            super::helpers::assert_continuous(&d);
        }
    }

    /// Slow direct road against a fast detour.
    ///
    /// ```text
    ///            C
    ///         ╱     ╲     100 km/h
    ///       A ─────── B   10 km/h
    /// ```
    fn detour_map() -> (rm_map::BuiltMap, rm_map::MapContext, RouteRequest) {
        let mut b = MapBuilder::new("detour");
        let a = b.add_point(Position::new(0, 0));
        let c = b.add_point(Position::new(5_000, 3_000));
        let z = b.add_point(Position::new(10_000, 0));
        let direct = b.add_line(a, z, 10).unwrap();
        b.add_line(a, c, 100).unwrap();
        b.add_line(c, z, 100).unwrap();
        let (built, map) = super::helpers::open(b);
        let line = built.line(direct);
        let request = super::helpers::along(line, Position::new(0, 0), Position::new(10_000, 0));
        (built, map, request)
    }

    #[test]
    fn fastest_and_shortest_choose_different_roads() {
        let (_, map, request) = detour_map();
        let direct_length = map.line_length(request.from_line).unwrap() as u32;

        for algorithm in [&BidirectionalDijkstra::default() as &dyn RouteAlgorithm, &AStar::default()] {
            let fastest = RouteEngine::new(NavigateConfig { cost: CostKind::Fastest, ..Default::default() })
                .get_initial(&map, algorithm, request)
                .unwrap()
                .route()
                .unwrap();
            assert_eq!(fastest.segments.len(), 2, "{} takes the detour", algorithm.name());
            assert!(fastest.cost.distance > direct_length);

            let shortest = RouteEngine::new(NavigateConfig { cost: CostKind::Shortest, ..Default::default() })
                .get_initial(&map, algorithm, request)
                .unwrap()
                .route()
                .unwrap();
            assert_eq!(shortest.segments.len(), 1, "{} stays on the direct road", algorithm.name());
            assert_eq!(shortest.cost.distance, direct_length);
            assert!(shortest.cost.time_ms > fastest.cost.time_ms);
        }
    }

    #[test]
    fn astar_expands_fewer_nodes_than_forward_search() {
        let (_, map) = super::helpers::lattice(8);
        let engine = RouteEngine::new(NavigateConfig { cost: CostKind::Shortest, ..Default::default() });
        let from = Position::new(0, 0);
        let to = Position::new(7 * STEP, 0);

        let astar = engine.route_between(&map, &AStar::default(), from, to).unwrap();
        let plain = engine.route_between(&map, &super::registry::ForwardOnly, from, to).unwrap();

        assert_eq!(astar.route().unwrap().cost, plain.route().unwrap().cost);
        assert!(astar.len() < plain.len(), "{} vs {}", astar.len(), plain.len());
    }
}

// ── Registry and engine ───────────────────────────────────────────────────────

#[cfg(test)]
mod registry {
    use rm_core::Position;
    use rm_map::MapContext;

    use crate::search::{expand, seed};
    use crate::{
        AStar, AlgorithmRegistry, BidirectionalDijkstra, NavigateConfig, NavigateError, NavigateResult,
        NavigateStatus, RouteAlgorithm, RouteEngine, SearchState, Side,
    };

    /// Plain forward Dijkstra assembled from the public search steps.
    pub struct ForwardOnly;

    impl RouteAlgorithm for ForwardOnly {
        fn name(&self) -> &str {
            "forward"
        }

        fn max_iterations(&self) -> u32 {
            10_000
        }

        fn bidirectional(&self) -> bool {
            false
        }

        fn step(&self, map: &MapContext, status: &mut NavigateStatus, side: Side) -> NavigateResult<()> {
            if status.state() == SearchState::Initializing {
                return seed(map, status, false);
            }
            expand(map, status, side).map(|_| ())
        }

        fn is_terminal(&self, status: &NavigateStatus) -> bool {
            status
                .best_key()
                .is_some_and(|best| status.frontier_min(Side::Forward).is_none_or(|top| top >= best))
        }
    }

    #[test]
    fn defaults_in_order() {
        let registry = AlgorithmRegistry::with_defaults(&NavigateConfig::default());
        assert_eq!(registry.names(), vec![BidirectionalDijkstra::NAME, AStar::NAME]);
        assert_eq!(registry.get(0).unwrap().name(), BidirectionalDijkstra::NAME);
        assert!(registry.get(0).unwrap().bidirectional());
        assert!(!registry.find(AStar::NAME).unwrap().bidirectional());
        assert!(registry.get(2).is_none());
    }

    #[test]
    fn budget_comes_from_config() {
        let config = NavigateConfig { max_iterations: 42, ..Default::default() };
        let registry = AlgorithmRegistry::with_defaults(&config);
        assert!(registry.names().iter().all(|n| registry.find(n).unwrap().max_iterations() == 42));
    }

    #[test]
    fn custom_algorithm_registers_once() {
        let mut registry = AlgorithmRegistry::with_defaults(&NavigateConfig::default());
        assert_eq!(registry.register(Box::new(ForwardOnly)).unwrap(), 2);
        assert!(matches!(
            registry.register(Box::new(ForwardOnly)),
            Err(NavigateError::DuplicateAlgorithm(name)) if name == "forward"
        ));
        assert_eq!(registry.len(), 3);
        assert!(matches!(registry.find("nope"), Err(NavigateError::UnknownAlgorithm(_))));
    }

    #[test]
    fn custom_algorithm_routes() {
        let (_, map) = super::helpers::lattice(3);
        let mut registry = AlgorithmRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(ForwardOnly)).unwrap();

        let engine = RouteEngine::new(NavigateConfig::default());
        let status = engine
            .route_between(&map, registry.find("forward").unwrap(), Position::new(0, 0), Position::new(2_000, 2_000))
            .unwrap();
        assert_eq!(status.algorithm(), "forward");
        super::helpers::assert_continuous(&status);
    }

    #[test]
    fn route_between_snaps_to_nearest_line() {
        let (_, map, [p0, p1]) = super::helpers::two_nodes();
        let engine = RouteEngine::new(NavigateConfig::default());
        // Both positions sit a little off the road.
        let status = engine
            .route_between(&map, &BidirectionalDijkstra::default(), Position::new(100, 40), Position::new(900, -40))
            .unwrap();

        let request = status.request();
        assert_eq!(request.from_pos, Position::new(100, 0));
        assert_eq!(request.to_pos, Position::new(900, 0));
        let route = status.route().unwrap();
        assert!(route.cost.distance < rm_core::distance(p0, p1) as u32);
    }

    #[test]
    fn route_between_snaps_onto_road_crossing_empty_cells() {
        use rm_core::{Area, LineId};
        use rm_map::{GridSpec, MapBuilder};

        let mut b = MapBuilder::new("long").with_grid(GridSpec::Explicit {
            area:      Area::new(0, 5_000, 0, 1_000),
            longitude: 5,
            latitude:  1,
        });
        let west = b.add_point(Position::new(10, 500));
        let east = b.add_point(Position::new(4_990, 500));
        b.add_line(west, east, 50).unwrap();
        let (_, map) = super::helpers::open(b);

        let engine = RouteEngine::new(NavigateConfig { snap_radius_squares: 1, ..Default::default() });
        let status = engine
            .route_between(&map, &BidirectionalDijkstra::default(), Position::new(2_400, 500), Position::new(2_600, 520))
            .unwrap();

        let request = status.request();
        assert_eq!((request.from_line, request.to_line), (LineId(0), LineId(0)));
        assert_eq!(request.from_pos, Position::new(2_400, 500));
        assert_eq!(request.to_pos, Position::new(2_600, 500));
    }

    #[test]
    fn route_between_off_map_has_no_candidate() {
        let (_, map, _) = super::helpers::two_nodes();
        let engine = RouteEngine::new(NavigateConfig::default());
        let far = Position::new(90_000_000, 45_000_000);
        let err = engine
            .route_between(&map, &BidirectionalDijkstra::default(), Position::new(0, 0), far)
            .err()
            .unwrap();
        assert!(matches!(err, NavigateError::NoCandidateLine(p) if p == far));
    }
}
