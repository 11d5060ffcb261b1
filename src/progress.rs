/// A snapshot of search progress, delivered to an optional progress sink at
/// a cadence the driver controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    pub nodes_visited: usize,
    pub current_depth: u32,
    pub elapsed_ms: u128,
}

/// How often the driver invokes the progress sink, in nodes expanded.
pub const PROGRESS_REPORT_INTERVAL: usize = 10_000;
