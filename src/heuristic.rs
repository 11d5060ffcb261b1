use arrayvec::ArrayVec;

use crate::{
    bits::{Bitvector, Index},
    game::{ALL_DIRECTIONS, Game, MAX_BOXES, MAX_SIZE, Position, Tile},
    hungarian::{ArrayMatrix, hungarian_algorithm},
};
use std::collections::VecDeque;
use std::time::Instant;

/// Outcome of a deadline-bounded heuristic computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicOutcome {
    Cost(Cost),
    /// The computation was not attempted (or not completed) because the
    /// deadline had already passed; the caller cannot conclude anything
    /// about solvability from this subtest and must not treat it as proof
    /// of a dead end.
    MaybeLive,
}

/// Estimated cost returned by heuristic computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cost(u16);

impl Cost {
    pub const INFINITE: Cost = Cost(u16::MAX);
    pub const ZERO: Cost = Cost(0);
}

impl From<Cost> for usize {
    fn from(cost: Cost) -> usize {
        cost.0 as usize
    }
}

/// Trait for computing heuristics that estimate the number of moves (pushes/pulls) needed.
///
/// `frozen_boxes` names boxes the caller has already proven immovable (and
/// thus already resting on a goal, or the position would be dead); an
/// implementation may exclude them from its distance/matching computation.
pub trait Heuristic {
    /// Create a push-oriented heuristic for forward search.
    fn new_push(game: &Game, frozen_boxes: Bitvector) -> Self
    where
        Self: Sized;

    /// Create a pull-oriented heuristic for reverse search.
    fn new_pull(game: &Game, frozen_boxes: Bitvector) -> Self
    where
        Self: Sized;

    /// Compute estimated number of moves (pushes/pulls).
    /// Returns Cost::INFINITE if the position is impossible to solve.
    fn compute(&self, game: &Game) -> Cost;

    /// Deadline-bounded form of [`Heuristic::compute`]. Implementations
    /// whose cost is bounded by a matching problem (worse than linear in
    /// the box count) should override this to check `deadline` before
    /// running and report `MaybeLive` on overrun, rather than let an
    /// expensive match stall the search driver. The default simply ignores
    /// the deadline, which is appropriate for implementations cheap enough
    /// that a deadline check is never worth the cost.
    fn compute_bounded(&self, game: &Game, _deadline: Option<Instant>) -> HeuristicOutcome {
        HeuristicOutcome::Cost(self.compute(game))
    }
}

/// A heuristic based on simple matching of boxes to goals using precomputed push/pull distances.
pub struct SimpleHeuristic {
    /// distances[idx][y][x] = minimum pushes/pulls to get a box from (x, y) to destination idx
    distances: Box<[[[u16; MAX_SIZE]; MAX_SIZE]; MAX_BOXES]>,
}

impl Heuristic for SimpleHeuristic {
    fn new_push(game: &Game, _frozen_boxes: Bitvector) -> Self {
        let distances = Box::new(compute_push_distances(game));
        SimpleHeuristic { distances }
    }

    fn new_pull(game: &Game, _frozen_boxes: Bitvector) -> Self {
        let distances = Box::new(compute_pull_distances(game));
        SimpleHeuristic { distances }
    }

    fn compute(&self, game: &Game) -> Cost {
        // Compute two distances:
        //   box_to_dst_total: total distance from each box to its nearest destination.
        //   dst_to_box_total: total distance from each destination to its nearest box.
        // The simple distance is the maximum between the two.
        // If either distance is u16::MAX, then the game is unsolvable.

        let mut box_to_dst_total = 0u16;
        let mut dst_to_box = [u16::MAX; MAX_BOXES];
        let box_count = game.box_count();

        for pos in game.box_positions().iter() {
            let mut box_to_dst = u16::MAX;

            for (dst_idx, dst_to_box) in dst_to_box.iter_mut().enumerate().take(box_count) {
                let distance = self.distances[dst_idx][pos.1 as usize][pos.0 as usize];
                box_to_dst = std::cmp::min(box_to_dst, distance);
                *dst_to_box = std::cmp::min(*dst_to_box, distance);
            }

            if box_to_dst == u16::MAX {
                return Cost::INFINITE;
            }

            box_to_dst_total += box_to_dst;
        }

        let mut dst_to_box_total = 0;
        for &dist in dst_to_box.iter().take(box_count) {
            if dist == u16::MAX {
                return Cost::INFINITE;
            } else {
                dst_to_box_total += dist;
            }
        }

        Cost(std::cmp::max(dst_to_box_total, box_to_dst_total))
    }
}

/// Heuristic based on an exact minimum-cost bipartite matching between
/// unfrozen boxes and unclaimed goals, computed via the Hungarian algorithm.
/// A frozen box is assumed to already occupy its final goal, so it and the
/// goal square it claims are excluded from the matching.
pub struct HungarianHeuristic {
    /// distances[idx][y][x] = minimum pushes/pulls to get a box from (x, y) to destination idx
    distances: Box<[[[u16; MAX_SIZE]; MAX_SIZE]; MAX_BOXES]>,
    frozen_boxes: Bitvector,
}

impl Heuristic for HungarianHeuristic {
    fn new_push(game: &Game, frozen_boxes: Bitvector) -> Self {
        let distances = Box::new(compute_push_distances(game));
        HungarianHeuristic {
            distances,
            frozen_boxes,
        }
    }

    fn new_pull(game: &Game, frozen_boxes: Bitvector) -> Self {
        let distances = Box::new(compute_pull_distances(game));
        HungarianHeuristic {
            distances,
            frozen_boxes,
        }
    }

    fn compute(&self, game: &Game) -> Cost {
        let box_count = game.box_count();

        let mut claimed_goals = Bitvector::new();
        for box_idx in self.frozen_boxes.iter() {
            let pos = game.box_position(box_idx);
            if let Some(goal_idx) = game.goal_positions().iter().position(|&g| g == pos) {
                claimed_goals.add(Index(goal_idx as u8));
            }
        }

        let active_boxes: ArrayVec<Index, MAX_BOXES> = (0..box_count)
            .map(|i| Index(i as u8))
            .filter(|idx| !self.frozen_boxes.contains(*idx))
            .collect();
        let active_goals: ArrayVec<Index, MAX_BOXES> = (0..box_count)
            .map(|i| Index(i as u8))
            .filter(|idx| !claimed_goals.contains(*idx))
            .collect();

        // A mismatch means some frozen box's goal square was also claimed by
        // another box (or vice versa): the position cannot be completed.
        if active_boxes.len() != active_goals.len() {
            return Cost::INFINITE;
        }
        if active_boxes.is_empty() {
            return Cost(0);
        }

        let n = active_boxes.len();
        let mut matrix: ArrayMatrix<u16, { MAX_BOXES * MAX_BOXES }> = ArrayMatrix::new(n, n);
        for &box_idx in active_boxes.iter() {
            let pos = game.box_position(box_idx);
            for &goal_idx in active_goals.iter() {
                matrix.push(self.distances[goal_idx.0 as usize][pos.1 as usize][pos.0 as usize]);
            }
        }

        match hungarian_algorithm(&matrix) {
            u16::MAX => Cost::INFINITE,
            total => Cost(total),
        }
    }

    fn compute_bounded(&self, game: &Game, deadline: Option<Instant>) -> HeuristicOutcome {
        // The matching itself isn't checkpointed mid-algorithm; this only
        // guards against starting an O(n^3) solve once the deadline has
        // already passed.
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                log::warn!("bipartite deadlock subtest deadline overrun; reporting MAYBE_LIVE");
                return HeuristicOutcome::MaybeLive;
            }
        }
        HeuristicOutcome::Cost(self.compute(game))
    }
}

/// Compute push distances from each goal to all positions using BFS with pulls
fn compute_push_distances(game: &Game) -> [[[u16; MAX_SIZE]; MAX_SIZE]; MAX_BOXES] {
    let mut distances = [[[u16::MAX; MAX_SIZE]; MAX_SIZE]; MAX_BOXES];

    for (goal_idx, &goal_pos) in game.goal_positions().iter().enumerate() {
        bfs_pulls(game, goal_pos, &mut distances[goal_idx]);
    }

    distances
}

/// Compute pull distances from each goal to all positions using BFS with pushes
fn compute_pull_distances(game: &Game) -> [[[u16; MAX_SIZE]; MAX_SIZE]; MAX_BOXES] {
    let mut distances = [[[u16::MAX; MAX_SIZE]; MAX_SIZE]; MAX_BOXES];

    for (goal_idx, &goal_pos) in game.goal_positions().iter().enumerate() {
        bfs_pushes(game, goal_pos, &mut distances[goal_idx]);
    }

    distances
}

/// BFS using pulls to compute distances from a goal position
fn bfs_pulls(game: &Game, goal_pos: Position, distances: &mut [[u16; MAX_SIZE]; MAX_SIZE]) {
    let mut queue = VecDeque::new();
    queue.push_back(goal_pos);
    distances[goal_pos.1 as usize][goal_pos.0 as usize] = 0;

    while let Some(box_pos) = queue.pop_front() {
        let dist = distances[box_pos.1 as usize][box_pos.0 as usize];

        for direction in ALL_DIRECTIONS {
            if let Some(new_box_pos) = game.move_position(box_pos, direction.reverse()) {
                if let Some(player_pos) = game.move_position(new_box_pos, direction.reverse()) {
                    let new_box_tile = game.get_tile(new_box_pos);
                    let player_tile = game.get_tile(player_pos);

                    if (new_box_tile == Tile::Floor || new_box_tile == Tile::Goal)
                        && (player_tile == Tile::Floor || player_tile == Tile::Goal)
                        && distances[new_box_pos.1 as usize][new_box_pos.0 as usize] == u16::MAX
                    {
                        distances[new_box_pos.1 as usize][new_box_pos.0 as usize] = dist + 1;
                        queue.push_back(new_box_pos);
                    }
                }
            }
        }
    }
}

/// BFS using pushes to compute distances from a box start position
fn bfs_pushes(game: &Game, start_pos: Position, distances: &mut [[u16; MAX_SIZE]; MAX_SIZE]) {
    let mut queue = VecDeque::new();
    queue.push_back(start_pos);
    distances[start_pos.1 as usize][start_pos.0 as usize] = 0;

    while let Some(box_pos) = queue.pop_front() {
        let dist = distances[box_pos.1 as usize][box_pos.0 as usize];

        for direction in ALL_DIRECTIONS {
            if let Some(new_box_pos) = game.move_position(box_pos, direction) {
                if let Some(player_pos) = game.move_position(box_pos, direction.reverse()) {
                    let new_box_tile = game.get_tile(new_box_pos);
                    let player_tile = game.get_tile(player_pos);

                    if (new_box_tile == Tile::Floor || new_box_tile == Tile::Goal)
                        && (player_tile == Tile::Floor || player_tile == Tile::Goal)
                        && distances[new_box_pos.1 as usize][new_box_pos.0 as usize] == u16::MAX
                    {
                        distances[new_box_pos.1 as usize][new_box_pos.0 as usize] = dist + 1;
                        queue.push_back(new_box_pos);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_heuristic_solved() {
        let input = "####\n\
                     #@*#\n\
                     ####";
        let game = Game::from_text(input).unwrap();
        let heuristic = SimpleHeuristic::new_push(&game, Bitvector::new());

        assert_eq!(heuristic.compute(&game), Cost(0));
    }

    #[test]
    fn test_simple_heuristic_one_move() {
        let input = "####\n\
                     #@$.#\n\
                     ####";
        let game = Game::from_text(input).unwrap();
        let heuristic = SimpleHeuristic::new_push(&game, Bitvector::new());

        // Box at (2,1), goal at (3,1), push distance = 1
        assert_eq!(heuristic.compute(&game), Cost(1));
    }

    #[test]
    fn test_simple_heuristic_multiple_boxes() {
        let input = "######\n\
                     #    #\n\
                     # $$ #\n\
                     # .. #\n\
                     #  @ #\n\
                     ######";
        let game = Game::from_text(input).unwrap();
        let heuristic = SimpleHeuristic::new_push(&game, Bitvector::new());

        // Two boxes at (2,2) and (3,2), two goals at (2,3) and (3,3)
        // Simple matching should pair them optimally: each box is 1 away from a goal
        assert_eq!(heuristic.compute(&game), Cost(2));
    }

    #[test]
    fn test_hungarian_heuristic_multiple_boxes() {
        let input = "######\n\
                     #    #\n\
                     # $$ #\n\
                     # .. #\n\
                     #  @ #\n\
                     ######";
        let game = Game::from_text(input).unwrap();
        let heuristic = HungarianHeuristic::new_push(&game, Bitvector::new());

        assert_eq!(heuristic.compute(&game), Cost(2));
    }

    #[test]
    fn test_hungarian_heuristic_excludes_frozen_box() {
        let input = "#####\n\
                     #@$.#\n\
                     #  *#\n\
                     #####";
        let game = Game::from_text(input).unwrap();
        // The box already on its own goal is frozen; only the remaining
        // box/goal pair should enter the matching.
        let mut frozen_boxes = Bitvector::new();
        frozen_boxes.add(game.box_index(Position(3, 2)).unwrap());
        let heuristic = HungarianHeuristic::new_push(&game, frozen_boxes);

        assert_eq!(heuristic.compute(&game), Cost(1));
    }
}
