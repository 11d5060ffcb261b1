use arrayvec::ArrayVec;

use crate::bits::Bitvector;
use crate::game::{ALL_DIRECTIONS, Direction, Game, Index, MAX_BOXES, Position, Tile};

/// Computes the set of boxes which are currently effectively frozen.
///
/// A full sweep from scratch; used only when a cheaper incremental update
/// (`compute_new_frozen_boxes`) is not applicable, e.g. at the root of a
/// search.
pub fn compute_frozen_boxes(game: &Game) -> Bitvector {
    let mut result = Bitvector::new();
    for box_idx in 0..game.box_count() {
        let box_idx = Index(box_idx as u8);
        if !result.contains(box_idx) {
            let frozen = compute_new_frozen_boxes(result, game, box_idx);
            result.add_all(&frozen);
        }
    }
    result
}

/// Incrementally compute boxes which are newly frozen after `box_idx` has
/// just been pushed to its current location. `frozen` names boxes already
/// known to be frozen prior to this push and is not re-examined.
pub fn compute_new_frozen_boxes(frozen: Bitvector, game: &Game, box_idx: Index) -> Bitvector {
    assert!(!frozen.contains(box_idx));

    // Find all boxes which might become frozen as a consequence of this push.
    let candidates = find_candidates(frozen, game, box_idx);
    // Mark all candidate boxes as frozen initially, then try to disprove it.
    let mut candidates_frozen = candidates;
    let mut to_check = candidates;

    while let Some(box_idx) = to_check.pop() {
        let pos = game.box_position(box_idx);
        if check_unfrozen(game, pos, &candidates, &candidates_frozen) {
            candidates_frozen.remove(box_idx);

            // Whenever we unfreeze a box, wake up its neighbors to be
            // re-checked: they may have only been frozen because this box
            // was assumed frozen.
            for &dir in &ALL_DIRECTIONS {
                if let Some(next_pos) = game.move_position(pos, dir) {
                    if let Some(next_box_idx) = game.box_index(next_pos) {
                        if candidates_frozen.contains(next_box_idx) {
                            to_check.add(next_box_idx);
                        }
                    }
                }
            }
        }
    }

    candidates_frozen
}

fn find_candidates(frozen: Bitvector, game: &Game, box_idx: Index) -> Bitvector {
    let mut candidates = Bitvector::new();
    let mut stack: ArrayVec<Index, MAX_BOXES> = ArrayVec::new();

    candidates.add(box_idx);
    stack.push(box_idx);

    while let Some(box_idx) = stack.pop() {
        let pos = game.box_position(box_idx);
        for &dir in &ALL_DIRECTIONS {
            if let Some(next_pos) = game.move_position(pos, dir) {
                if let Some(next_box_idx) = game.box_index(next_pos) {
                    if !candidates.contains(next_box_idx) && !frozen.contains(next_box_idx) {
                        candidates.add(next_box_idx);
                        stack.push(next_box_idx);
                    }
                }
            }
        }
    }

    candidates
}

fn check_unfrozen_dir(
    game: &Game,
    pos: Position,
    dir: Direction,
    candidates: &Bitvector,
    candidates_frozen: &Bitvector,
) -> bool {
    if let Some(next_pos) = game.move_position(pos, dir) {
        if let Some(next_box_idx) = game.box_index(next_pos) {
            if candidates.contains(next_box_idx) {
                // Candidate box: whether it's frozen is still being decided.
                !candidates_frozen.contains(next_box_idx)
            } else {
                // Non-candidate box: it was already known frozen.
                false
            }
        } else {
            // No box: check for a wall.
            game.get_tile(next_pos) != Tile::Wall
        }
    } else {
        // Out-of-bounds acts like a wall.
        true
    }
}

fn check_dead_square_dir(game: &Game, pos: Position, dir: Direction) -> bool {
    if let Some(next_pos) = game.move_position(pos, dir) {
        game.is_push_dead_square(next_pos)
    } else {
        true
    }
}

fn check_unfrozen_vertical(
    game: &Game,
    pos: Position,
    candidates: &Bitvector,
    candidates_frozen: &Bitvector,
) -> bool {
    check_unfrozen_dir(game, pos, Direction::Up, candidates, candidates_frozen)
        && check_unfrozen_dir(game, pos, Direction::Down, candidates, candidates_frozen)
        && !(check_dead_square_dir(game, pos, Direction::Up)
            && check_dead_square_dir(game, pos, Direction::Down))
}

fn check_unfrozen_horizontal(
    game: &Game,
    pos: Position,
    candidates: &Bitvector,
    candidates_frozen: &Bitvector,
) -> bool {
    check_unfrozen_dir(game, pos, Direction::Left, candidates, candidates_frozen)
        && check_unfrozen_dir(game, pos, Direction::Right, candidates, candidates_frozen)
        && !(check_dead_square_dir(game, pos, Direction::Left)
            && check_dead_square_dir(game, pos, Direction::Right))
}

fn check_unfrozen(
    game: &Game,
    pos: Position,
    candidates: &Bitvector,
    candidates_frozen: &Bitvector,
) -> bool {
    check_unfrozen_horizontal(game, pos, candidates, candidates_frozen)
        || check_unfrozen_vertical(game, pos, candidates, candidates_frozen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Game {
        Game::from_text(text.trim_matches('\n')).unwrap()
    }

    #[test]
    fn test_box_on_goal_not_frozen_alone() {
        // A single box sitting on a goal with open space around it is not frozen.
        let game = parse(
            r#"
#####
#@*.#
#   #
#####
"#,
        );
        let frozen = compute_frozen_boxes(&game);
        assert!(frozen.is_empty());
    }

    #[test]
    fn test_corner_box_off_goal_is_frozen() {
        // A box jammed in a corner, not on a goal, is frozen on both axes.
        let game = parse(
            r#"
####
#@$#
#.#
####
"#,
        );
        let frozen = compute_frozen_boxes(&game);
        let box_idx = game.box_index(Position(2, 1)).unwrap();
        assert!(frozen.contains(box_idx));
    }

    #[test]
    fn test_chain_unfreezes_when_support_removed() {
        // Two boxes against a wall: if one is mobile, it can unfreeze its
        // neighbor which was only frozen by assumption.
        let game = parse(
            r#"
######
#@$$.#
#..  #
######
"#,
        );
        let frozen = compute_frozen_boxes(&game);
        // Both boxes have goals reachable and floor beneath, so neither
        // should be permanently frozen.
        assert!(frozen.is_empty());
    }
}
