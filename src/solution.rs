use std::collections::{HashMap, VecDeque};

use crate::bits::{Bitboard, LazyBitboard, Position};
use crate::game::{ALL_DIRECTIONS, Direction, Game, Move, Push, Tile};
use crate::transform::{encode_lurd_char, Mirror, Rotation, Transform};

/// Move/push counts matching `lurd.len()` and the uppercase-letter count,
/// per the `Solved` verdict's reported fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolutionStats {
    pub moves: u32,
    pub pushes: u32,
}

/// Builds the internal-coordinate LURD string for a push sequence,
/// interleaving the pusher's walk steps (lowercase) between pushes
/// (uppercase). `pushes` must be a sequence of legal pushes from `initial`.
pub fn build_lurd(initial: &Game, pushes: &[Push]) -> (String, SolutionStats) {
    let mut game = initial.clone();
    let mut lurd = String::new();
    let mut moves = 0u32;
    let mut pushes_taken = 0u32;

    for &push in pushes {
        let box_pos = game.box_position(push.box_index());
        let origin = game
            .move_position(box_pos, push.direction().reverse())
            .expect("a legal push always has a player-side origin cell");

        let walk = find_path(&game, game.player(), origin);
        for dir in walk {
            lurd.push(encode_lurd_char(dir, false));
            moves += 1;
        }

        lurd.push(encode_lurd_char(push.direction(), true));
        moves += 1;
        pushes_taken += 1;

        game.push(push);
    }

    (
        lurd,
        SolutionStats {
            moves,
            pushes: pushes_taken,
        },
    )
}

/// Converts an internal-coordinate LURD solution string to the externally
/// displayed form described by `transform`.
pub fn to_external_lurd(transform: &Transform, lurd: &str) -> String {
    crate::transform::internal_to_external_lurd(transform, lurd)
}

/// Shortest walk (no pushes) from `start` to `goal` through the pusher's
/// currently reachable, box-free region. Panics if `goal` is unreachable,
/// since callers only ever look for the origin cell of a push already
/// known to be legal from `start`'s connected component.
fn find_path(game: &Game, start: Position, goal: Position) -> Vec<Direction> {
    if start == goal {
        return Vec::new();
    }

    let mut visited = LazyBitboard::new();
    let mut prev: HashMap<Position, (Position, Direction)> = HashMap::new();
    let mut queue = VecDeque::new();

    visited.set(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        if pos == goal {
            break;
        }
        for &dir in &ALL_DIRECTIONS {
            if let Some(next) = game.move_position(pos, dir) {
                if visited.get(next) {
                    continue;
                }
                if game.get_tile(next) == Tile::Wall {
                    continue;
                }
                if game.box_index(next).is_some() {
                    continue;
                }
                visited.set(next);
                prev.insert(next, (pos, dir));
                queue.push_back(next);
            }
        }
    }

    let mut path = Vec::new();
    let mut cur = goal;
    while cur != start {
        let (prev_pos, dir) = *prev
            .get(&cur)
            .expect("push origin must lie in the pusher's reachable region");
        path.push(dir);
        cur = prev_pos;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Game {
        Game::from_text(text.trim_matches('\n')).unwrap()
    }

    #[test]
    fn test_build_lurd_single_push() {
        let game = parse(
            r#"
#####
#@$.#
#####
"#,
        );
        let push = Push::new(game.box_index(Position(2, 1)).unwrap(), Direction::Right);
        let (lurd, stats) = build_lurd(&game, &[push]);
        assert_eq!(lurd, "R");
        assert_eq!(stats.moves, 1);
        assert_eq!(stats.pushes, 1);
    }

    #[test]
    fn test_build_lurd_includes_walk_steps() {
        // A pillar at (3,2) blocks the direct path, so the player must walk
        // left and around before it can push the box (at (3,1)) rightward
        // from (2,1).
        let game = parse(
            r#"
#######
#  $ .#
#  #  #
#  @  #
#######
"#,
        );
        let push = Push::new(game.box_index(Position(3, 1)).unwrap(), Direction::Right);
        let (lurd, stats) = build_lurd(&game, &[push]);
        assert_eq!(lurd, "luuR");
        assert_eq!(stats.moves, 4);
        assert_eq!(stats.pushes, 1);
    }

    #[test]
    fn test_to_external_lurd_identity() {
        let transform = Transform {
            rotation: Rotation::Deg0,
            mirror: Mirror::None,
        };
        assert_eq!(to_external_lurd(&transform, "uldR"), "uldR");
    }
}
