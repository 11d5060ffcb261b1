use thiserror::Error;

/// A single violated structural invariant detected while ingesting a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidLevelViolation {
    /// Input rows are not all the same width after space-padding.
    NonRectangular,
    /// No `@`/`+` pusher cell was found.
    NoPusher,
    /// More than one pusher cell was found.
    MultiplePushers,
    /// Box count and goal count differ.
    BoxGoalCountMismatch,
    /// A goal cannot be reached by any box under push semantics.
    UnreachableGoal,
    /// The outer ring of the board is not entirely wall-or-out-of-bounds,
    /// which would let the search wander into an unbounded region.
    NonClosedBorder,
    /// Board text failed to parse for a reason other than the violations
    /// above: an empty board, a board exceeding the maximum supported size,
    /// or an unrecognized character at a given position.
    Malformed,
}

impl std::fmt::Display for InvalidLevelViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            InvalidLevelViolation::NonRectangular => "board rows are not rectangular",
            InvalidLevelViolation::NoPusher => "no pusher cell found",
            InvalidLevelViolation::MultiplePushers => "more than one pusher cell found",
            InvalidLevelViolation::BoxGoalCountMismatch => "box count does not match goal count",
            InvalidLevelViolation::UnreachableGoal => "a goal is not reachable by any box",
            InvalidLevelViolation::NonClosedBorder => "board border is not fully closed",
            InvalidLevelViolation::Malformed => "board text is malformed",
        };
        write!(f, "{}", msg)
    }
}

/// Error surface of the solver/deadlock core. Every public entry point
/// returns `Result<_, CoreError>`; the core never panics on caller input,
/// reserving `panic!`/`assert!` for its own internal bookkeeping invariants.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid level: {violation}")]
    InvalidLevel { violation: InvalidLevelViolation },

    #[error("budget exhausted after {nodes} nodes / {millis} ms")]
    BudgetExhausted { nodes: usize, millis: u64 },

    #[error("run was cancelled")]
    Cancelled,

    #[error("internal error at {at}")]
    Internal { at: String },
}
