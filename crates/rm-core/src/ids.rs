//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` to allow
//! direct indexing into table slices, but callers should prefer the
//! `.index()` helpers for clarity.
//!
//! The on-disk tables store ids as signed 32-bit integers; [`from_raw`] is the
//! single place where a raw record value becomes a typed id.
//!
//! [`from_raw`]: PointId::from_raw

use std::fmt;

use crate::CoreError;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a slice index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Convert a signed on-disk value, rejecting negatives and values
            /// that do not fit the id width.
            pub fn from_raw(raw: i64) -> Result<$name, CoreError> {
                <$inner>::try_from(raw).map($name).map_err(|_| CoreError::InvalidIndex {
                    what:  stringify!($name),
                    value: raw,
                })
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Global square id: `x * count_latitude + y` on the map grid.
    pub struct SquareId(u32);
}

typed_id! {
    /// Dense, map-wide index of a point.
    pub struct PointId(u32);
}

typed_id! {
    /// Index of a line (an edge between two points).
    pub struct LineId(u32);
}

typed_id! {
    /// Index of one shape delta in the shape table.
    pub struct ShapeId(u32);
}

typed_id! {
    /// Index of a named place.
    pub struct PlaceId(u32);
}

typed_id! {
    /// Interned string id.  Id 0 is always the empty string.
    pub struct StringId(u16);
}

typed_id! {
    /// Handle of a hash table inside a `HashRegistry`.
    pub struct HashId(u32);
}

typed_id! {
    /// Slot of a node in a route-search arena.
    pub struct IterationId(u32);
}
