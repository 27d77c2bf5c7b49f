//! Route search configuration.

/// What the search minimises.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CostKind {
    /// Travel time first, distance as the tie-break.
    #[default]
    Fastest,
    /// Distance first, travel time as the tie-break.
    Shortest,
}

/// Settings shared by the route engine and the built-in algorithms.
///
/// Typically embedded in the application's own configuration file.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigateConfig {
    /// Rounds before a search gives up.  One round is a forward step plus,
    /// for bidirectional algorithms, a backward step.
    pub max_iterations: u32,

    pub cost: CostKind,

    /// Speed assumed for lines that carry none (`speed_kmh == 0`).
    pub default_speed_kmh: u16,

    /// How many squares around a position `route_between` scans for the
    /// nearest line.
    pub snap_radius_squares: i32,
}

impl Default for NavigateConfig {
    fn default() -> Self {
        Self {
            max_iterations:      100_000,
            cost:                CostKind::Fastest,
            default_speed_kmh:   50,
            snap_radius_squares: 1,
        }
    }
}

impl NavigateConfig {
    /// Speed used for a line stored with `speed_kmh`.
    #[inline]
    pub fn effective_speed(&self, speed_kmh: u16) -> u16 {
        if speed_kmh == 0 { self.default_speed_kmh.max(1) } else { speed_kmh }
    }
}
