//! Unit tests for rm-core primitives.

#[cfg(test)]
mod ids {
    use crate::{CoreError, LineId, PointId, SquareId, StringId};

    #[test]
    fn index_roundtrip() {
        let id = PointId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(PointId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(PointId::INVALID.0, u32::MAX);
        assert_eq!(LineId::INVALID.0, u32::MAX);
        assert_eq!(StringId::INVALID.0, u16::MAX);
        assert_eq!(SquareId::default(), SquareId::INVALID);
    }

    #[test]
    fn from_raw_rejects_negative() {
        assert_eq!(LineId::from_raw(7).unwrap(), LineId(7));
        assert_eq!(
            LineId::from_raw(-1),
            Err(CoreError::InvalidIndex { what: "LineId", value: -1 })
        );
        assert!(StringId::from_raw(70_000).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(SquareId(3).to_string(), "SquareId(3)");
    }
}

#[cfg(test)]
mod geo {
    use crate::{distance, nearest_on_segment, Area, Position};

    #[test]
    fn zero_distance() {
        let p = Position::from_degrees(4.35, 50.85);
        assert_eq!(distance(p, p), 0);
    }

    #[test]
    fn one_degree_latitude() {
        // ~1 degree of latitude ≈ 111 km
        let a = Position::new(0, 0);
        let b = Position::new(0, 1_000_000);
        let d = distance(a, b);
        assert!((d - 111_319).abs() <= 1, "got {d}");
    }

    #[test]
    fn longitude_shrinks_with_latitude() {
        let equator = distance(Position::new(0, 0), Position::new(1_000_000, 0));
        let north = distance(Position::new(0, 60_000_000), Position::new(1_000_000, 60_000_000));
        assert!((north * 2 - equator).abs() < 50, "equator {equator}, 60N {north}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Position::new(-122_419_400, 37_774_900);
        let b = Position::new(-122_409_400, 37_784_900);
        assert_eq!(distance(a, b), distance(b, a));
    }

    #[test]
    fn parse_position() {
        let p: Position = "1005, 5".parse().unwrap();
        assert_eq!(p, Position::new(1005, 5));
        assert!("1005".parse::<Position>().is_err());
        assert!("a,b".parse::<Position>().is_err());
    }

    #[test]
    fn bounding_area() {
        let area = Area::bounding([Position::new(10, 10), Position::new(1005, 5)]).unwrap();
        assert_eq!(area, Area::new(10, 1005, 5, 10));
        assert!(area.contains(Position::new(500, 7)));
        assert!(!area.contains(Position::new(500, 11)));
        assert!(Area::bounding(std::iter::empty()).is_none());
    }

    #[test]
    fn projection_onto_segment() {
        let a = Position::new(0, 0);
        let b = Position::new(1000, 0);
        assert_eq!(nearest_on_segment(Position::new(400, 300), a, b), Position::new(400, 0));
        // Beyond the ends the projection clamps to the endpoint.
        assert_eq!(nearest_on_segment(Position::new(-50, 10), a, b), a);
        assert_eq!(nearest_on_segment(Position::new(1500, -10), a, b), b);
        // Degenerate segment.
        assert_eq!(nearest_on_segment(Position::new(7, 7), a, a), a);
    }
}
