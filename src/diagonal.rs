use crate::game::{Direction, Game, Position, Tile};

/// The four diagonal directions, each expressed as a (vertical, horizontal)
/// pair of cardinal steps whose composition reaches the diagonal neighbour.
const DIAGONALS: [(Direction, Direction); 4] = [
    (Direction::Up, Direction::Left),
    (Direction::Up, Direction::Right),
    (Direction::Down, Direction::Left),
    (Direction::Down, Direction::Right),
];

/// Detects the closed-diagonal pattern at `pos`: a box not on a goal whose
/// two orthogonal neighbours toward one diagonal are both walls, while the
/// diagonal cell itself holds another box also not on a goal. The two boxes
/// and two walls form a 2x2-blocked diamond; both boxes are sealed on both
/// axes, by the walls directly and by each other along the diagonal.
///
/// This is a direct, non-recursive check, run as a cheap short-circuit
/// ahead of the general freeze recursion (which would also eventually
/// reach the same verdict, since each box in the diamond is individually
/// wall-cornered on both axes) — it exists to prove the deadlock in O(1)
/// at the instant a box lands in the corner, without waiting on a full
/// frozen-box sweep.
pub fn is_closed_diagonal_deadlock(game: &Game, pos: Position) -> bool {
    if game.get_tile(pos) == Tile::Goal {
        return false;
    }

    for (vertical, horizontal) in DIAGONALS {
        let Some(vert) = game.move_position(pos, vertical) else {
            continue;
        };
        let Some(horiz) = game.move_position(pos, horizontal) else {
            continue;
        };
        let Some(diag) = game.move_position(vert, horizontal) else {
            continue;
        };

        if game.get_tile(vert) != Tile::Wall || game.get_tile(horiz) != Tile::Wall {
            continue;
        }
        if game.get_tile(diag) == Tile::Goal {
            continue;
        }
        if game.box_index(diag).is_some() {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Game {
        Game::from_text(text.trim_matches('\n')).unwrap()
    }

    #[test]
    fn test_closed_diagonal_detected() {
        // Box at (2,3) has walls directly above (2,2) and to its left
        // (1,3); the diagonal cell (1,2) holds a second box. The diamond
        // is closed and neither box sits on a goal.
        let game = parse(
            r#"
######
#@   #
#$#  #
##$  #
#  ..#
######
"#,
        );
        assert!(is_closed_diagonal_deadlock(&game, Position(2, 3)));
    }

    #[test]
    fn test_open_diamond_not_flagged() {
        // Same layout but the wall to the left of (2,3) is removed, so the
        // diamond never closes.
        let game = parse(
            r#"
######
#@   #
#$#  #
# $  #
#  ..#
######
"#,
        );
        assert!(!is_closed_diagonal_deadlock(&game, Position(2, 3)));
    }

    #[test]
    fn test_box_on_goal_never_flagged() {
        // Identical diamond, but the lower box now sits on a goal, so it
        // is never reported as deadlocked.
        let game = parse(
            r#"
######
#@   #
#$#  #
##*  #
#  . #
######
"#,
        );
        assert!(!is_closed_diagonal_deadlock(&game, Position(2, 3)));
    }
}
