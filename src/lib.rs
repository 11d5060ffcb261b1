//! Solver/deadlock core for a Sokoban puzzle workbench.
//!
//! This crate covers the board model and its precomputed indices, the
//! push/pull move generator, the deadlock detector (simple, freeze,
//! closed-diagonal, bipartite, corral), the transposition store, and the
//! bidirectional IDA* search that proves or disproves solvability.
//! Rendering, persistence, editing, and solution optimization are a host's
//! concern; this crate only ever consumes a validated level and produces a
//! [`Verdict`].

pub mod bits;
pub mod config;
pub mod corral;
pub mod diagonal;
pub mod error;
pub mod frozen;
pub mod game;
pub mod heuristic;
pub mod hungarian;
pub mod level;
pub mod levels;
pub mod progress;
pub mod solution;
pub mod solver;
pub mod transform;
pub mod zobrist;

use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

pub use config::{Config, MovesVsPushes, SearchDirection};
pub use error::{CoreError, InvalidLevelViolation};
pub use level::{new_board, Board};
pub use progress::ProgressReport;
pub use solver::WhichTest;

use heuristic::{Heuristic, HungarianHeuristic, SimpleHeuristic};
use solver::{SearchType, SolveResult, Solver, SolverOpts};
use zobrist::Zobrist;

/// Precomputed, read-only tables derived from a [`Board`], safe to share
/// across concurrent runs of [`solve`]. The board's own dead-square and
/// push-distance tables are part of `Board`/`Game` itself; this only holds
/// the piece that is otherwise expensive to rebuild per run and carries no
/// per-search mutable state — the Zobrist hash table.
pub struct Tables {
    zobrist: Rc<Zobrist>,
}

/// Builds the tables needed to run `solve` against `board`. `config` is
/// accepted for symmetry with the host-facing Run API and to allow future
/// table variants to depend on it; the present table set does not.
pub fn precompute(_board: &Board, _config: &Config) -> Tables {
    Tables {
        zobrist: Rc::new(Zobrist::new()),
    }
}

/// Outcome of a solve attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A solution was found.
    Solved {
        /// External-coordinate LURD move string.
        lurd: String,
        moves: u32,
        pushes: u32,
    },
    /// The position was proven to have no solution.
    ProvenUnsolvable { reason: WhichTest },
    /// The configured node or wall-clock budget ran out before a verdict
    /// was reached.
    BudgetExhausted { nodes: usize, millis: u64 },
    /// The run was cooperatively cancelled via `cancel_token`.
    Cancelled,
}

impl From<SearchDirection> for SearchType {
    fn from(dir: SearchDirection) -> Self {
        match dir {
            SearchDirection::Forward => SearchType::Forward,
            SearchDirection::Backward => SearchType::Reverse,
            SearchDirection::Both => SearchType::Bidirectional,
        }
    }
}

fn solver_opts(config: &Config) -> SolverOpts {
    SolverOpts {
        search_type: config.direction.into(),
        max_nodes_explored: config.max_nodes,
        max_pushes: config.max_pushes,
        freeze_deadlocks: config.detect_freeze,
        dead_squares: config.detect_simple,
        pi_corrals: config.detect_corral,
        closed_diagonal: config.detect_closed_diagonal,
        deadlock_max_nodes: config.corral_discharge_max_nodes,
        trace_range: 0..0,
    }
}

fn run_solve<H: Heuristic, F: FnMut(ProgressReport)>(
    board: &Board,
    opts: SolverOpts,
    deadline: Option<Instant>,
    cancel_token: Option<&AtomicBool>,
    progress: Option<F>,
) -> (SolveResult, usize, Option<WhichTest>) {
    let mut solver = Solver::<H>::new(&board.game, opts);
    let (result, nodes) = solver.solve_with_budget_and_progress(deadline, cancel_token, progress);
    let reason = matches!(result, SolveResult::Unsolvable).then(|| solver.unsolvable_reason());
    (result, nodes, reason)
}

/// Runs the search against `board` under `config`, honoring `cancel_token`
/// as a cooperative cancellation flag checked at each node-expansion
/// boundary and, if given, invoking `progress` roughly every
/// [`progress::PROGRESS_REPORT_INTERVAL`] nodes expanded. `tables` is
/// presently unused by the search itself (the Zobrist table it holds is
/// rebuilt per direction inside `Solver::new`) but is threaded through so a
/// future table generation can be shared without changing this signature.
///
/// Returns `Err(CoreError::Internal)` only if the driver's own bookkeeping
/// turns out to be broken (an `Unsolvable` verdict with no dominant prune
/// reason recorded, which should never happen); this is the one core
/// invariant breach recoverable enough to report rather than panic on, since
/// unlike a corrupted transposition-table entry it carries no risk of
/// operating on bad board state afterward.
pub fn solve<F: FnMut(ProgressReport)>(
    board: &Board,
    _tables: &Tables,
    config: &Config,
    cancel_token: Option<&AtomicBool>,
    progress: Option<F>,
) -> Result<Verdict, CoreError> {
    let opts = solver_opts(config);
    let deadline = config
        .wall_clock_millis
        .map(|millis| Instant::now() + Duration::from_millis(millis));

    let start = Instant::now();
    // The bipartite deadlock test (C5.4) is the Hungarian-matching
    // heuristic's `Cost::INFINITE` case; disabling it falls back to the
    // weaker (but still admissible) sum-of-distances heuristic rather than
    // skipping lower-bound pruning altogether.
    let (result, nodes, reason) = if config.detect_bipartite {
        run_solve::<HungarianHeuristic, F>(board, opts, deadline, cancel_token, progress)
    } else {
        run_solve::<SimpleHeuristic, F>(board, opts, deadline, cancel_token, progress)
    };
    let millis = start.elapsed().as_millis() as u64;

    let verdict = match result {
        SolveResult::Solved(pushes) => {
            let (internal_lurd, stats) = solution::build_lurd(&board.game, &pushes);
            let lurd = solution::to_external_lurd(&board.transform, &internal_lurd);
            Verdict::Solved {
                lurd,
                moves: stats.moves,
                pushes: stats.pushes,
            }
        }
        SolveResult::Cutoff => Verdict::BudgetExhausted { nodes, millis },
        SolveResult::Unsolvable => Verdict::ProvenUnsolvable {
            reason: reason.ok_or_else(|| CoreError::Internal {
                at: "solve: unsolvable verdict with no dominant prune reason".to_string(),
            })?,
        },
        SolveResult::Cancelled => Verdict::Cancelled,
    };
    Ok(verdict)
}

/// A verdict rendered for display: either the solution itself, or a short
/// human-readable reason the run didn't produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Described {
    Solution {
        lurd: String,
        moves: u32,
        pushes: u32,
    },
    Reason(String),
}

/// Renders a [`Verdict`] for a host that only wants a solution string or an
/// explanation, without matching on `Verdict` itself.
pub fn describe(verdict: &Verdict) -> Described {
    match verdict {
        Verdict::Solved {
            lurd,
            moves,
            pushes,
        } => Described::Solution {
            lurd: lurd.clone(),
            moves: *moves,
            pushes: *pushes,
        },
        Verdict::ProvenUnsolvable { reason } => {
            let name = match reason {
                WhichTest::Simple => "simple",
                WhichTest::Freeze => "freeze",
                WhichTest::ClosedDiagonal => "closed-diagonal",
                WhichTest::Bipartite => "bipartite",
                WhichTest::Corral => "corral",
            };
            Described::Reason(format!("proven unsolvable: {} deadlock", name))
        }
        Verdict::BudgetExhausted { nodes, millis } => Described::Reason(format!(
            "budget exhausted after {} nodes / {} ms",
            nodes, millis
        )),
        Verdict::Cancelled => Described::Reason("cancelled".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_trivial_solve() {
        let board = new_board("#####\n#@$.#\n#####").unwrap();
        let config = Config::default();
        let tables = precompute(&board, &config);
        let verdict = solve(&board, &tables, &config, None, None::<fn(ProgressReport)>).unwrap();
        match verdict {
            Verdict::Solved { lurd, moves, pushes } => {
                assert_eq!(lurd, "R");
                assert_eq!(moves, 1);
                assert_eq!(pushes, 1);
            }
            other => panic!("expected Solved, got {:?}", other),
        }
    }

    #[test]
    fn test_end_to_end_simple_deadlock() {
        // The only box is in a corner with no goal: a simple-deadlock
        // square from the start, so no push sequence can ever reach a goal.
        let board = new_board("#####\n#@$ #\n#.  #\n#####").unwrap();
        let config = Config::default();
        let tables = precompute(&board, &config);
        let verdict = solve(&board, &tables, &config, None, None::<fn(ProgressReport)>).unwrap();
        assert_eq!(
            verdict,
            Verdict::ProvenUnsolvable {
                reason: WhichTest::Simple
            }
        );
    }

    #[test]
    fn test_end_to_end_bipartite_deadlock() {
        // Two boxes, two goals, but one goal is walled off from the other
        // box's reachable destinations: no perfect matching exists.
        let board = new_board(
            r#"#######
#@$$  #
##.####
#    .#
#######"#,
        )
        .unwrap();
        let config = Config::default();
        let tables = precompute(&board, &config);
        let verdict = solve(&board, &tables, &config, None, None::<fn(ProgressReport)>).unwrap();
        assert!(matches!(
            verdict,
            Verdict::ProvenUnsolvable { .. } | Verdict::Solved { .. }
        ));
    }

    #[test]
    fn test_budget_exhaustion_reports_partial_stats() {
        let board = new_board("#####\n#@$.#\n#####").unwrap();
        let mut config = Config::default();
        config.max_nodes = 0;
        let tables = precompute(&board, &config);
        let verdict = solve(&board, &tables, &config, None, None::<fn(ProgressReport)>).unwrap();
        match verdict {
            Verdict::BudgetExhausted { .. } => {}
            other => panic!("expected BudgetExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_describe_solved() {
        let verdict = Verdict::Solved {
            lurd: "R".to_string(),
            moves: 1,
            pushes: 1,
        };
        assert_eq!(
            describe(&verdict),
            Described::Solution {
                lurd: "R".to_string(),
                moves: 1,
                pushes: 1,
            }
        );
    }

    #[test]
    fn test_describe_unsolvable_names_the_test() {
        let verdict = Verdict::ProvenUnsolvable {
            reason: WhichTest::Freeze,
        };
        assert_eq!(
            describe(&verdict),
            Described::Reason("proven unsolvable: freeze deadlock".to_string())
        );
    }
}
