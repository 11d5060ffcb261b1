/// Which direction(s) the search driver explores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
    Both,
}

/// Tie-breaking preference the host can request between equally-costed
/// solutions; the core's search order already favors fewer pushes, so this
/// only affects how a solution's LURD string inserts intervening walk steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovesVsPushes {
    MovesFirst,
    PushesFirst,
}

/// Run configuration, passed explicitly to `precompute`/`solve`. There is no
/// global mutable configuration state in the core.
#[derive(Debug, Clone)]
pub struct Config {
    pub detect_simple: bool,
    pub detect_freeze: bool,
    pub detect_corral: bool,
    pub detect_bipartite: bool,
    pub detect_closed_diagonal: bool,
    pub direction: SearchDirection,
    pub max_pushes: u32,
    pub max_nodes: usize,
    pub wall_clock_millis: Option<u64>,
    pub moves_vs_pushes: MovesVsPushes,
    /// Node budget for the bounded corral-discharge DFS; 0 means unbounded.
    pub corral_discharge_max_nodes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detect_simple: true,
            detect_freeze: true,
            detect_corral: true,
            detect_bipartite: true,
            detect_closed_diagonal: true,
            direction: SearchDirection::Both,
            max_pushes: u32::MAX,
            max_nodes: usize::MAX,
            wall_clock_millis: None,
            moves_vs_pushes: MovesVsPushes::PushesFirst,
            corral_discharge_max_nodes: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_enables_all_deadlock_tests() {
        let config = Config::default();
        assert!(config.detect_simple);
        assert!(config.detect_freeze);
        assert!(config.detect_corral);
        assert!(config.detect_bipartite);
        assert!(config.detect_closed_diagonal);
        assert_eq!(config.direction, SearchDirection::Both);
        assert_eq!(config.max_pushes, u32::MAX);
        assert_eq!(config.max_nodes, usize::MAX);
        assert_eq!(config.wall_clock_millis, None);
    }
}
