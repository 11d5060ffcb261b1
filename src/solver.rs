use crate::bits::{Bitvector, Index};
use crate::corral::{CorralResult, CorralSearcher};
use crate::diagonal::is_closed_diagonal_deadlock;
use crate::frozen::{compute_frozen_boxes, compute_new_frozen_boxes};
use crate::game::{Checkpoint, Direction, Game, Move, Moves, Position, Pull, Push, ReachableSet};
use crate::heuristic::{Cost, Heuristic, HeuristicOutcome};
use crate::progress::{ProgressReport, PROGRESS_REPORT_INTERVAL};
use crate::zobrist::Zobrist;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::Range;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Result of solving a puzzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    /// Puzzle was solved
    Solved(Vec<Push>),
    /// Node, push-depth, or wall-clock budget exceeded before a verdict was reached
    Cutoff,
    /// Puzzle is impossible to solve
    Unsolvable,
    /// The run was cooperatively cancelled
    Cancelled,
}

/// Which deadlock test is credited with an `Unsolvable` verdict. Attributed
/// after the fact by counting which test pruned the most candidate moves
/// over the course of the search; ties broken by cascade order (the order
/// the tests are listed in the detector's design).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhichTest {
    Simple,
    Freeze,
    ClosedDiagonal,
    Bipartite,
    Corral,
}

#[derive(Debug, Clone, Copy, Default)]
struct PruneCounts {
    simple: u64,
    freeze: u64,
    closed_diagonal: u64,
    bipartite: u64,
    corral: u64,
}

impl PruneCounts {
    fn merge(&self, other: &PruneCounts) -> PruneCounts {
        PruneCounts {
            simple: self.simple + other.simple,
            freeze: self.freeze + other.freeze,
            closed_diagonal: self.closed_diagonal + other.closed_diagonal,
            bipartite: self.bipartite + other.bipartite,
            corral: self.corral + other.corral,
        }
    }

    /// Cascade order matches the detector's listed test order; the first
    /// test (by that order) among those tied for the highest count wins.
    fn dominant(&self) -> WhichTest {
        let candidates = [
            (self.simple, WhichTest::Simple),
            (self.freeze, WhichTest::Freeze),
            (self.closed_diagonal, WhichTest::ClosedDiagonal),
            (self.bipartite, WhichTest::Bipartite),
            (self.corral, WhichTest::Corral),
        ];
        candidates
            .into_iter()
            .max_by_key(|&(count, _)| count)
            .map(|(_, test)| test)
            .unwrap_or(WhichTest::Simple)
    }
}

/// Internal trait containing search logic that is polymorphic depending on the
/// direction of the search (forward vs reverse).
trait SearchHelper {
    type Move: Move;

    fn compute_moves(&self, game: &Game) -> ReachableSet<Self::Move>;
    fn compute_unmoves(&self, game: &Game) -> Moves<Self::Move>;

    fn apply_move(&self, game: &mut Game, move_: &Self::Move);
    fn apply_unmove(&self, game: &mut Game, move_: &Self::Move);

    fn is_dead_square(&self, game: &Game, pos: Position) -> bool;

    fn is_closed_diagonal_deadlock(&self, game: &Game, pos: Position) -> bool;

    fn search_corrals(
        &mut self,
        game: &mut Game,
        reachable: &ReachableSet<Self::Move>,
        deadline: Option<Instant>,
    ) -> CorralResult<Self::Move>;

    fn compute_frozen_boxes(&self, game: &Game) -> Bitvector;
    fn compute_new_frozen_boxes(
        &self,
        frozen: &Bitvector,
        game: &Game,
        box_idx: Index,
    ) -> Bitvector;

    fn new_heuristic<H: Heuristic>(&self, game: &Game, frozen_boxes: Bitvector) -> H;

    fn to_push_by_pos(&self, game: &Game, move_: &Self::Move) -> PushByPos;
}

struct ForwardSearchHelper {
    corral_searcher: CorralSearcher,
    freeze_deadlocks: bool,
    dead_squares: bool,
    pi_corrals: bool,
    closed_diagonal: bool,
}

struct ReverseSearchHelper {
    dead_squares: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Forward,
    Reverse,
    Bidirectional,
}

#[derive(Debug, Copy, Clone)]
struct PushByPos {
    box_pos: Position,
    direction: Direction,
}

impl SearchHelper for ForwardSearchHelper {
    type Move = Push;

    fn compute_moves(&self, game: &Game) -> ReachableSet<Push> {
        game.compute_pushes()
    }

    fn compute_unmoves(&self, game: &Game) -> Moves<Push> {
        game.compute_pulls().moves.to_pushes()
    }

    fn apply_move(&self, game: &mut Game, push: &Push) {
        game.push(*push);
    }

    fn apply_unmove(&self, game: &mut Game, push: &Push) {
        game.pull(push.to_pull());
    }

    fn is_dead_square(&self, game: &Game, pos: Position) -> bool {
        if self.dead_squares {
            game.is_push_dead_square(pos)
        } else {
            false
        }
    }

    fn is_closed_diagonal_deadlock(&self, game: &Game, pos: Position) -> bool {
        self.closed_diagonal && is_closed_diagonal_deadlock(game, pos)
    }

    fn search_corrals(
        &mut self,
        game: &mut Game,
        reachable: &ReachableSet<Self::Move>,
        deadline: Option<Instant>,
    ) -> CorralResult<Self::Move> {
        if self.pi_corrals {
            self.corral_searcher.search(game, reachable, deadline)
        } else {
            CorralResult::None
        }
    }

    fn compute_frozen_boxes(&self, game: &Game) -> Bitvector {
        if self.freeze_deadlocks {
            compute_frozen_boxes(game)
        } else {
            Bitvector::new()
        }
    }

    fn compute_new_frozen_boxes(
        &self,
        frozen: &Bitvector,
        game: &Game,
        box_idx: Index,
    ) -> Bitvector {
        if self.freeze_deadlocks {
            compute_new_frozen_boxes(*frozen, game, box_idx)
        } else {
            Bitvector::new()
        }
    }

    fn new_heuristic<H: Heuristic>(&self, game: &Game, frozen_boxes: Bitvector) -> H {
        H::new_push(game, frozen_boxes)
    }

    fn to_push_by_pos(&self, game: &Game, push: &Push) -> PushByPos {
        PushByPos {
            box_pos: game.box_position(push.box_index()),
            direction: push.direction(),
        }
    }
}

impl SearchHelper for ReverseSearchHelper {
    type Move = Pull;

    fn compute_moves(&self, game: &Game) -> ReachableSet<Pull> {
        game.compute_pulls()
    }

    fn compute_unmoves(&self, game: &Game) -> Moves<Pull> {
        game.compute_pushes().moves.to_pulls()
    }

    fn apply_move(&self, game: &mut Game, pull: &Pull) {
        game.pull(*pull);
    }

    fn apply_unmove(&self, game: &mut Game, pull: &Pull) {
        game.push(pull.to_push())
    }

    fn is_dead_square(&self, game: &Game, pos: Position) -> bool {
        if self.dead_squares {
            game.is_pull_dead_square(pos)
        } else {
            false
        }
    }

    fn is_closed_diagonal_deadlock(&self, _game: &Game, _pos: Position) -> bool {
        false
    }

    fn search_corrals(
        &mut self,
        _game: &mut Game,
        _reachable: &ReachableSet<Self::Move>,
        _deadline: Option<Instant>,
    ) -> CorralResult<Self::Move> {
        CorralResult::None
    }

    fn compute_frozen_boxes(&self, _game: &Game) -> Bitvector {
        Bitvector::new()
    }

    fn compute_new_frozen_boxes(
        &self,
        _frozen: &Bitvector,
        _game: &Game,
        _box_idx: Index,
    ) -> Bitvector {
        Bitvector::new()
    }

    fn new_heuristic<H: Heuristic>(&self, game: &Game, frozen_boxes: Bitvector) -> H {
        H::new_pull(game, frozen_boxes)
    }

    fn to_push_by_pos(&self, game: &Game, pull: &Pull) -> PushByPos {
        let new_box_pos = game.box_position(pull.box_index());
        let old_box_pos = game.move_position(new_box_pos, pull.direction()).unwrap();
        PushByPos {
            box_pos: old_box_pos,
            direction: pull.direction().reverse(),
        }
    }
}

#[derive(Clone)]
struct Node {
    checkpoint: Checkpoint,
    frozen_boxes: Bitvector,
    /// Number of pushes/pulls taken from this search's root to reach this node.
    g: u32,
    /// Heuristic cost at this node; kept around so a threshold bump can
    /// re-admit a root without recomputing its heuristic.
    cost: Cost,
}

fn f_value(g: u32, cost: Cost) -> u32 {
    g + usize::from(cost) as u32
}

/// Transposition-table entry. `iteration` is the IDA* iteration this state
/// was last touched in and `closed` only means something relative to that
/// tag: an entry whose `iteration` doesn't match the current one is treated
/// as neither discovered nor closed, which is what lets the same table carry
/// over across iterations instead of being cleared each time the threshold
/// bumps.
struct TableEntry {
    parent_hash: u64,
    iteration: u32,
    closed: bool,
}

struct Searcher<H, S> {
    game: Game,
    /// DFS frontier for the current iteration. Refilled from `roots` each
    /// time the threshold bumps.
    stack: Vec<Node>,
    /// States surviving initial filtering (g=0), kept around so every
    /// iteration can re-seed its stack without recomputing initial costs.
    roots: Vec<Node>,
    table: HashMap<u64, TableEntry>,
    zobrist: Rc<Zobrist>,
    heuristic: HashMap<u64, H>,
    helper: S,
    max_pushes: u32,
    prune_counts: PruneCounts,
    max_g: u32,
    /// Current IDA* iteration, starting at 1 once `start_iteration` is first called.
    iteration: u32,
    /// Current iteration's cutoff on `g+h`.
    threshold: u32,
    /// Minimum `g+h` among nodes pruned this iteration for exceeding
    /// `threshold`; becomes next iteration's threshold.
    next_threshold: Option<u32>,
    /// Set once any candidate move is pruned purely for exceeding
    /// `max_pushes`, so the driver can tell a budget cutoff from a proven
    /// dead end once the whole search space under `threshold` is exhausted.
    budget_pruned: bool,
}

enum ExpandNode {
    NotDone,
    Solved,
    /// The current iteration's DFS frontier emptied out. Does not by itself
    /// mean the position is unsolvable — the driver must bump the
    /// threshold and retry, or recognize a proven dead end when no node was
    /// ever pruned purely by the threshold or the push budget.
    IterationExhausted,
}

impl<H: Heuristic, S: SearchHelper> Searcher<H, S> {
    fn new(
        game: &Game,
        zobrist: Rc<Zobrist>,
        initial_player_positions: &[Position],
        helper: S,
        max_pushes: u32,
    ) -> Self {
        let mut roots = Vec::new();
        let mut table = HashMap::new();
        let mut heuristic: HashMap<u64, H> = HashMap::new();
        let mut game = game.clone();
        let mut prune_counts = PruneCounts::default();

        // Loop through initial positions
        for &pos in initial_player_positions {
            // Set initial position
            game.set_player(pos);

            // Compute frozen boxes
            let frozen_boxes = helper.compute_frozen_boxes(&game);
            if game.unsolved_boxes().contains_any(&frozen_boxes) {
                prune_counts.freeze += 1;
                continue;
            }

            // Compute initial cost
            let frozen_boxes_hash = zobrist.compute_boxes_hash_subset(&game, frozen_boxes);
            let cost = heuristic
                .entry(frozen_boxes_hash)
                .or_insert_with(|| helper.new_heuristic(&game, frozen_boxes))
                .compute(&game);
            if cost == Cost::INFINITE {
                prune_counts.bipartite += 1;
                continue;
            }

            roots.push(Node {
                checkpoint: game.checkpoint(),
                frozen_boxes,
                g: 0,
                cost,
            });

            // Insert into transposition table. `iteration: 0` marks it as
            // untouched, since real iterations start at 1.
            table.insert(
                zobrist.compute_hash(&game),
                TableEntry {
                    parent_hash: 0,
                    iteration: 0,
                    closed: false,
                },
            );
        }

        Self {
            game,
            stack: Vec::new(),
            roots,
            table,
            zobrist,
            heuristic,
            helper,
            max_pushes,
            prune_counts,
            max_g: 0,
            iteration: 0,
            threshold: 0,
            next_threshold: None,
            budget_pruned: false,
        }
    }

    /// The minimum `g+h` (i.e. `h`, since all roots have `g=0`) among this
    /// side's surviving initial states. `None` if every initial state was
    /// pruned (frozen- or bipartite-deadlocked) up front.
    fn initial_threshold(&self) -> Option<u32> {
        self.roots.iter().map(|r| f_value(r.g, r.cost)).min()
    }

    /// Begins a new IDA* iteration at the given threshold: bumps the
    /// iteration counter (which lazily invalidates every transposition-table
    /// entry's "closed" tag from the previous iteration) and refills the DFS
    /// stack from `roots`, deferring any root whose `g+h` still exceeds
    /// `threshold` to a later iteration.
    fn start_iteration(&mut self, threshold: u32) {
        self.iteration += 1;
        self.threshold = threshold;
        self.next_threshold = None;
        self.stack.clear();
        for root in &self.roots {
            let f = f_value(root.g, root.cost);
            if f <= threshold {
                self.stack.push(root.clone());
            } else {
                self.next_threshold = Some(self.next_threshold.map_or(f, |nt| nt.min(f)));
            }
        }
        log::debug!(
            "search-driver iteration {} starting: threshold={} roots_admitted={}",
            self.iteration,
            threshold,
            self.stack.len()
        );
    }

    /// Whichever of `next_threshold`/`budget_pruned` the driver needs once
    /// this side's current iteration is exhausted.
    fn next_threshold(&self) -> Option<u32> {
        self.next_threshold
    }

    fn budget_pruned(&self) -> bool {
        self.budget_pruned
    }

    fn expand_node<H2, S2>(
        &mut self,
        other_searcher: &Searcher<H2, S2>,
        deadline: Option<Instant>,
    ) -> ExpandNode {
        // Pop next node from the DFS stack
        let node = match self.stack.pop() {
            Some(node) => node,
            None => return ExpandNode::IterationExhausted,
        };
        self.max_g = self.max_g.max(node.g);
        log::trace!(
            "expanding node: direction g={} iteration={} threshold={}",
            node.g,
            self.iteration,
            self.threshold
        );

        // Restore the node's checkpoint
        self.game.restore(&node.checkpoint);

        // Compute reachable set
        let reachable = self.helper.compute_moves(&self.game);

        // Compute hash
        let boxes_hash = self.zobrist.compute_boxes_hash(&self.game);
        let player_hash = self.zobrist.player_hash(self.game.player());
        let uncanonical_hash = boxes_hash ^ player_hash;

        // Check tranposition table for uncanonical hash
        let entry = self.table.get_mut(&uncanonical_hash).unwrap();
        if entry.iteration == self.iteration && entry.closed {
            // Someone else closed this node already this iteration
            return ExpandNode::NotDone;
        }
        // Mark node as closed for this iteration
        entry.iteration = self.iteration;
        entry.closed = true;
        let parent_hash = entry.parent_hash;

        // Compute canonical hash
        let canonical_player_pos = reachable.squares.top_left().unwrap();
        let canonical_player_hash = self.zobrist.player_hash(canonical_player_pos);
        let canonical_hash = boxes_hash ^ canonical_player_hash;

        // Check transposition table for canonical hash
        if canonical_hash != uncanonical_hash {
            match self.table.entry(canonical_hash) {
                Entry::Occupied(mut e) => {
                    let e = e.get_mut();
                    if e.iteration == self.iteration && e.closed {
                        // Someone else closed this node already this iteration
                        return ExpandNode::NotDone;
                    }
                    e.iteration = self.iteration;
                    e.closed = true;
                }
                Entry::Vacant(e) => {
                    // Otherwise, insert a closed node
                    e.insert(TableEntry {
                        parent_hash,
                        iteration: self.iteration,
                        closed: true,
                    });
                }
            }
        }

        // Check if we've hit the other side
        if other_searcher.table.contains_key(&canonical_hash) {
            log::debug!("search-driver met the opposing frontier at g={}", node.g);
            return ExpandNode::Solved;
        }

        // Apply PI-corral pruning
        let moves = match self
            .helper
            .search_corrals(&mut self.game, &reachable, deadline)
        {
            CorralResult::Prune(pruned_moves) => pruned_moves,
            CorralResult::None => reachable.moves,
            CorralResult::Deadlocked => {
                log::debug!("corral deadlock short-circuit at g={}", node.g);
                self.prune_counts.corral += 1;
                return ExpandNode::NotDone;
            }
            // The discharge search couldn't finish before the deadline; we
            // can't claim a corral deadlock, so fall back to the unpruned
            // move set exactly as if no corral had been found.
            CorralResult::MaybeLive(pruned_moves) => pruned_moves,
        };

        let child_g = node.g + 1;
        let mut candidates: Vec<(S::Move, Node)> = Vec::new();

        // Try each move
        for move_ in &moves {
            // Make sure we're not trying to push a frozen box
            if node.frozen_boxes.contains(move_.box_index()) {
                continue;
            }

            // Respect the configured push-depth budget. This is a resource
            // cutoff, not evidence of a dead end, so it's tracked separately
            // from the deadlock-test prune counts.
            if child_g > self.max_pushes {
                self.budget_pruned = true;
                continue;
            }

            let old_box_pos = self.game.box_position(move_.box_index());
            let new_box_pos = self
                .game
                .move_position(old_box_pos, move_.direction())
                .unwrap();

            // Apply dead square pruning
            if self.helper.is_dead_square(&self.game, new_box_pos) {
                self.prune_counts.simple += 1;
                continue;
            }

            // Apply closed-diagonal pruning
            if self.helper.is_closed_diagonal_deadlock(&self.game, new_box_pos) {
                self.prune_counts.closed_diagonal += 1;
                continue;
            }

            // Apply move
            self.helper.apply_move(&mut self.game, &move_);

            // Compute newly frozen boxes
            let new_frozen = self.helper.compute_new_frozen_boxes(
                &node.frozen_boxes,
                &self.game,
                move_.box_index(),
            );
            let child_frozen_boxes = node.frozen_boxes.union(&new_frozen);

            // Apply frozen box deadlock pruning
            if self.game.unsolved_boxes().contains_any(&child_frozen_boxes) {
                self.prune_counts.freeze += 1;
                self.helper.apply_unmove(&mut self.game, &move_);
                continue;
            }

            // Compute child hash
            let child_boxes_hash = boxes_hash
                ^ self.zobrist.box_hash(old_box_pos)
                ^ self.zobrist.box_hash(new_box_pos);
            let child_hash = child_boxes_hash ^ self.zobrist.player_hash(self.game.player());

            // Check the transposition table. A stale tag from an earlier
            // iteration doesn't block re-discovery; only a tag from this
            // iteration (meaning some other path already queued or closed
            // it) does.
            match self.table.entry(child_hash) {
                Entry::Occupied(mut e) => {
                    let e = e.get_mut();
                    if e.iteration == self.iteration {
                        self.helper.apply_unmove(&mut self.game, &move_);
                        continue;
                    }
                    e.parent_hash = canonical_hash;
                    e.iteration = self.iteration;
                    e.closed = false;
                }
                Entry::Vacant(e) => {
                    e.insert(TableEntry {
                        parent_hash: canonical_hash,
                        iteration: self.iteration,
                        closed: false,
                    });
                }
            };

            // Compute child cost using appropriate heuristic
            let frozen_hash = self
                .zobrist
                .compute_boxes_hash_subset(&self.game, child_frozen_boxes);
            let child_outcome = self
                .heuristic
                .entry(frozen_hash)
                .or_insert_with(|| {
                    self.helper
                        .new_heuristic::<H>(&self.game, child_frozen_boxes)
                })
                .compute_bounded(&self.game, deadline);

            // If the matching overran the deadline, we can't conclude
            // anything about this child: admit it at cost 0 (the weakest
            // possible lower bound) rather than treat the cutoff as proof
            // of a dead end.
            let child_cost = match child_outcome {
                HeuristicOutcome::Cost(cost) => cost,
                HeuristicOutcome::MaybeLive => Cost::ZERO,
            };

            // If unsolvable, skip
            if child_cost == Cost::INFINITE {
                self.prune_counts.bipartite += 1;
                self.helper.apply_unmove(&mut self.game, &move_);
                continue;
            }

            // IDA* threshold test: only admit the child into this
            // iteration's frontier if g+h doesn't exceed the threshold;
            // otherwise remember it for the next iteration's threshold.
            let child_f = f_value(child_g, child_cost);
            if child_f > self.threshold {
                self.next_threshold = Some(self.next_threshold.map_or(child_f, |nt| nt.min(child_f)));
                self.helper.apply_unmove(&mut self.game, &move_);
                continue;
            }

            candidates.push((
                move_.clone(),
                Node {
                    checkpoint: self.game.checkpoint(),
                    frozen_boxes: child_frozen_boxes,
                    g: child_g,
                    cost: child_cost,
                },
            ));

            // Unapply move
            self.helper.apply_unmove(&mut self.game, &move_);
        }

        // Tie-break: larger h (nearer goal) first, then lexicographic
        // (box_index, direction) for total determinism. Pushed onto the
        // stack in reverse so the first-priority candidate ends up on top.
        candidates.sort_by(|(move_a, node_a), (move_b, node_b)| {
            node_b
                .cost
                .cmp(&node_a.cost)
                .then_with(|| move_a.box_index().cmp(&move_b.box_index()))
                .then_with(|| move_a.direction().cmp(&move_b.direction()))
        });
        for (_, child) in candidates.into_iter().rev() {
            self.stack.push(child);
        }

        ExpandNode::NotDone
    }

    fn prune_counts(&self) -> &PruneCounts {
        &self.prune_counts
    }

    fn max_g(&self) -> u32 {
        self.max_g
    }

    fn reconstruct_solution(&self) -> Vec<PushByPos> {
        let mut solution = Vec::new();
        let mut current_game = self.game.clone();
        let mut current_hash = self.zobrist.compute_hash(&current_game);

        // Work backwards until we reach an initial state (parent_hash == 0)
        loop {
            let entry = self
                .table
                .get(&current_hash)
                .expect("Failed to reconstruct solution: state not in transposition table");

            if entry.parent_hash == 0 {
                // Reached an initial state
                break;
            }

            // Compute all possible unmoves from current state
            let unmoves = self.helper.compute_unmoves(&current_game);

            // Try each unmove to find which one leads to parent state
            let mut found = false;
            for unmove in &unmoves {
                self.helper.apply_unmove(&mut current_game, &unmove);

                // Compute hash of this previous state
                let prev_hash = self.zobrist.compute_hash(&current_game);

                // Check if this matches the parent we're looking for
                if prev_hash == entry.parent_hash {
                    solution.push(self.helper.to_push_by_pos(&current_game, &unmove));
                    current_hash = prev_hash;
                    found = true;
                    break;
                }

                // Redo the unmove if it wasn't correct
                self.helper.apply_move(&mut current_game, &unmove);
            }

            assert!(
                found,
                "Failed to reconstruct solution: no unmove leads to parent state"
            );
        }

        solution
    }
}

pub struct Solver<H> {
    forward: Searcher<H, ForwardSearchHelper>,
    reverse: Searcher<H, ReverseSearchHelper>,
    game: Game,
    opts: SolverOpts,
}

pub struct SolverOpts {
    pub search_type: SearchType,
    pub max_nodes_explored: usize,
    pub max_pushes: u32,
    pub freeze_deadlocks: bool,
    pub dead_squares: bool,
    pub pi_corrals: bool,
    pub closed_diagonal: bool,
    pub deadlock_max_nodes: usize,
    pub trace_range: Range<usize>,
}

impl<H: Heuristic> Solver<H> {
    pub fn new(game: &Game, opts: SolverOpts) -> Self {
        let zobrist = Rc::new(Zobrist::new());
        let reverse_game = game.swap_boxes_and_goals();
        let forward_player_positions = [game.canonical_player_pos()];
        let reverse_player_positions = reverse_game.all_possible_player_positions();

        let forward_helper = ForwardSearchHelper {
            corral_searcher: CorralSearcher::new(zobrist.clone(), opts.deadlock_max_nodes),
            dead_squares: opts.dead_squares,
            pi_corrals: opts.pi_corrals,
            freeze_deadlocks: opts.freeze_deadlocks,
            closed_diagonal: opts.closed_diagonal,
        };
        let reverse_helper = ReverseSearchHelper {
            dead_squares: opts.dead_squares,
        };

        let forward_searcher = Searcher::new(
            game,
            zobrist.clone(),
            &forward_player_positions,
            forward_helper,
            opts.max_pushes,
        );
        let reverse_searcher = Searcher::new(
            &reverse_game,
            zobrist,
            &reverse_player_positions,
            reverse_helper,
            opts.max_pushes,
        );

        Self {
            forward: forward_searcher,
            reverse: reverse_searcher,
            game: game.clone(),
            opts,
        }
    }

    pub fn solve(&mut self) -> (SolveResult, usize) {
        self.solve_with_budget(None, None)
    }

    /// Which deadlock test to credit for an `Unsolvable` verdict. Only
    /// meaningful after `solve`/`solve_with_budget` has returned that
    /// result; combines both search directions' prune tallies.
    pub fn unsolvable_reason(&self) -> WhichTest {
        self.forward
            .prune_counts()
            .merge(self.reverse.prune_counts())
            .dominant()
    }

    /// Runs the search, additionally suspending at each node-expansion
    /// boundary to check a wall-clock deadline and a cooperative
    /// cancellation flag, per the run's resource model.
    pub fn solve_with_budget(
        &mut self,
        deadline: Option<Instant>,
        cancel: Option<&AtomicBool>,
    ) -> (SolveResult, usize) {
        self.solve_with_budget_and_progress_dyn(deadline, cancel, None)
    }

    /// Full form of [`Solver::solve_with_budget`], additionally reporting
    /// progress to `progress` (if given) roughly every
    /// [`PROGRESS_REPORT_INTERVAL`] nodes expanded. `progress` is a plain
    /// closure, not a trait object; the dynamic dispatch lives only in the
    /// private helper this delegates to, so the two search directions share
    /// one copy of the loop.
    pub fn solve_with_budget_and_progress<F: FnMut(ProgressReport)>(
        &mut self,
        deadline: Option<Instant>,
        cancel: Option<&AtomicBool>,
        mut progress: Option<F>,
    ) -> (SolveResult, usize) {
        let progress: Option<&mut dyn FnMut(ProgressReport)> = match &mut progress {
            Some(f) => Some(f),
            None => None,
        };
        self.solve_with_budget_and_progress_dyn(deadline, cancel, progress)
    }

    /// Drives the search per spec: IDA* on `g+h`, re-deepening the
    /// threshold `L` to the minimum overflow value whenever the active
    /// side(s)' frontier empties out under the current `L`, until a meeting
    /// state is found, a resource budget is exceeded, or every side proves
    /// it cannot admit another node at any threshold.
    fn solve_with_budget_and_progress_dyn(
        &mut self,
        deadline: Option<Instant>,
        cancel: Option<&AtomicBool>,
        mut progress: Option<&mut dyn FnMut(ProgressReport)>,
    ) -> (SolveResult, usize) {
        let started_at = Instant::now();
        let mut nodes_explored = 0;
        let result;

        let do_forward = matches!(
            self.opts.search_type,
            SearchType::Forward | SearchType::Bidirectional
        );
        let do_reverse = matches!(
            self.opts.search_type,
            SearchType::Reverse | SearchType::Bidirectional
        );

        let initial_threshold = [
            do_forward.then(|| self.forward.initial_threshold()).flatten(),
            do_reverse.then(|| self.reverse.initial_threshold()).flatten(),
        ]
        .into_iter()
        .flatten()
        .min();

        let Some(mut threshold) = initial_threshold else {
            // Every active side's roots were pruned before search even
            // started (frozen- or bipartite-deadlocked): L0 = +infinity.
            return (SolveResult::Unsolvable, 0);
        };

        if do_forward {
            self.forward.start_iteration(threshold);
        }
        if do_reverse {
            self.reverse.start_iteration(threshold);
        }
        let mut forward_exhausted = !do_forward;
        let mut reverse_exhausted = !do_reverse;
        let mut last_is_forward: Option<bool> = None;

        loop {
            if let Some(cancel) = cancel {
                if cancel.load(Ordering::Relaxed) {
                    result = SolveResult::Cancelled;
                    break;
                }
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    result = SolveResult::Cutoff;
                    break;
                }
            }

            if forward_exhausted && reverse_exhausted {
                let next_threshold = [
                    do_forward.then(|| self.forward.next_threshold()).flatten(),
                    do_reverse.then(|| self.reverse.next_threshold()).flatten(),
                ]
                .into_iter()
                .flatten()
                .min();

                match next_threshold {
                    Some(next) => {
                        log::debug!(
                            "search-driver iteration boundary: threshold {} -> {}",
                            threshold,
                            next
                        );
                        threshold = next;
                        if do_forward {
                            self.forward.start_iteration(threshold);
                        }
                        if do_reverse {
                            self.reverse.start_iteration(threshold);
                        }
                        forward_exhausted = !do_forward;
                        reverse_exhausted = !do_reverse;
                        continue;
                    }
                    None => {
                        // No node was ever deferred to a deeper threshold.
                        // If one was instead dropped purely for the push
                        // budget, the search space isn't actually exhausted.
                        let budget_pruned = (do_forward && self.forward.budget_pruned())
                            || (do_reverse && self.reverse.budget_pruned());
                        result = if budget_pruned {
                            SolveResult::Cutoff
                        } else {
                            SolveResult::Unsolvable
                        };
                        break;
                    }
                }
            }

            let is_forward = match self.opts.search_type {
                SearchType::Forward => true,
                SearchType::Reverse => false,
                SearchType::Bidirectional => {
                    if forward_exhausted {
                        false
                    } else if reverse_exhausted {
                        true
                    } else {
                        nodes_explored % 2 == 0
                    }
                }
            };
            if last_is_forward != Some(is_forward) {
                log::debug!(
                    "search-driver direction switch: now {}",
                    if is_forward { "forward" } else { "reverse" }
                );
                last_is_forward = Some(is_forward);
            }

            let expand_node = if is_forward {
                self.forward.expand_node(&self.reverse, deadline)
            } else {
                self.reverse.expand_node(&self.forward, deadline)
            };

            match expand_node {
                ExpandNode::NotDone => {
                    nodes_explored += 1;
                    if let Some(sink) = progress.as_mut() {
                        if nodes_explored % PROGRESS_REPORT_INTERVAL == 0 {
                            sink(ProgressReport {
                                nodes_visited: nodes_explored,
                                current_depth: self.forward.max_g().max(self.reverse.max_g()),
                                elapsed_ms: started_at.elapsed().as_millis(),
                            });
                        }
                    }
                    if nodes_explored >= self.opts.max_nodes_explored {
                        result = SolveResult::Cutoff;
                        break;
                    }
                }
                ExpandNode::Solved => {
                    if is_forward {
                        self.reverse.game.restore(&self.forward.game.checkpoint());
                    } else {
                        self.forward.game.restore(&self.reverse.game.checkpoint());
                    }
                    let soln = self.reconstruct_solution();
                    result = SolveResult::Solved(soln);
                    break;
                }
                ExpandNode::IterationExhausted => {
                    if is_forward {
                        forward_exhausted = true;
                    } else {
                        reverse_exhausted = true;
                    }
                }
            }

            if self.opts.trace_range.contains(&nodes_explored) {
                let (dir, game) = if is_forward {
                    ("forward", &self.forward.game)
                } else {
                    ("reverse", &self.reverse.game)
                };
                println!("direction={} count={}:\n{}", dir, nodes_explored, game);
            }
        }

        (result, nodes_explored)
    }

    fn reconstruct_solution(&self) -> Vec<Push> {
        let forward_soln = self.forward.reconstruct_solution();
        let reverse_soln = self.reverse.reconstruct_solution();
        self.combine_solution(&forward_soln, &reverse_soln)
    }

    fn combine_solution(
        &self,
        forward_soln: &[PushByPos],
        reverse_soln: &[PushByPos],
    ) -> Vec<Push> {
        let mut game = self.game.clone();
        let mut soln = Vec::new();
        let chained = forward_soln.iter().rev().chain(reverse_soln.iter());

        for (i, push_by_pos) in chained.enumerate() {
            // Get box index at this position
            let box_index = game.box_index(push_by_pos.box_pos).unwrap_or_else(|| {
                panic!(
                    "Solution verification failed: no box at position {} for push {}",
                    push_by_pos.box_pos,
                    i + 1
                )
            });

            // Compute valid pushes at this state
            let valid_pushes = game.compute_pushes().moves;

            // Verify that this push is among the valid pushes
            let push = Push::new(box_index, push_by_pos.direction);
            assert!(
                valid_pushes.contains(push),
                "Solution verification failed: push {} (box at {}, direction {:?}) is not valid",
                i + 1,
                push_by_pos.box_pos,
                push_by_pos.direction
            );

            // Apply the push
            game.push(push);
            soln.push(push);
        }

        // Verify final state is solved
        assert!(
            game.is_solved(),
            "Solution verification failed: puzzle is not solved"
        );

        soln
    }
}
