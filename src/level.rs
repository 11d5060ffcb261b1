use std::collections::VecDeque;

use crate::bits::{Bitboard, LazyBitboard, Position};
use crate::error::{CoreError, InvalidLevelViolation};
use crate::game::{ALL_DIRECTIONS, Game, Tile, MAX_SIZE};
use crate::transform::{parse_preamble, Transform};

/// A validated level paired with its display transform, ready to hand to
/// `precompute`. Distinct from the bare `Game` the solver operates on: this
/// is the ingest-time wrapper that also carries how the board should be
/// displayed back to the host.
#[derive(Debug, Clone)]
pub struct Board {
    pub game: Game,
    pub transform: Transform,
}

fn classify_from_text_error(message: &str) -> InvalidLevelViolation {
    if message.contains("Multiple players") {
        InvalidLevelViolation::MultiplePushers
    } else if message.contains("No player found") {
        InvalidLevelViolation::NoPusher
    } else if message.contains("does not match box count") {
        InvalidLevelViolation::BoxGoalCountMismatch
    } else {
        // "Empty board", "exceeds maximum size", and "Invalid character ..."
        // all land here: none of them are a non-rectangular-row failure, and
        // none of the other violations fit either.
        InvalidLevelViolation::Malformed
    }
}

/// Checks that the outer ring of the board is entirely wall (or, for rows
/// shorter than the board width, implicitly out-of-bounds floor that was
/// never enclosed) — a level without a closed border lets the search wander
/// into an unbounded region.
fn has_closed_border(game: &Game, width: u8, height: u8) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    for x in 0..width {
        if game.get_tile(Position(x, 0)) != Tile::Wall {
            return false;
        }
        if game.get_tile(Position(x, height - 1)) != Tile::Wall {
            return false;
        }
    }
    for y in 0..height {
        if game.get_tile(Position(0, y)) != Tile::Wall {
            return false;
        }
        if game.get_tile(Position(width - 1, y)) != Tile::Wall {
            return false;
        }
    }
    true
}

/// Checks that every goal lies in the pusher's wall-free connected
/// component, i.e. is not sealed behind walls from the rest of the board. A
/// goal the pusher can never reach can also never receive a pushed box, so
/// this is necessary (if not sufficient) for solvability. This is a
/// structural connectivity check, not a full push-solvability proof — the
/// latter is the search driver's job, and an
/// unreachable-under-pushes-but-connected goal surfaces as
/// `ProvenUnsolvable`, not a rejected level.
fn all_goals_reachable(game: &Game, width: u8, height: u8) -> bool {
    let mut visited = LazyBitboard::new();
    let mut queue = VecDeque::new();
    let start = game.player();
    visited.set(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for &dir in &ALL_DIRECTIONS {
            if let Some(next) = game.move_position(pos, dir) {
                if visited.get(next) || game.get_tile(next) == Tile::Wall {
                    continue;
                }
                visited.set(next);
                queue.push_back(next);
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            let pos = Position(x, y);
            if game.get_tile(pos) == Tile::Goal && !visited.get(pos) {
                return false;
            }
        }
    }

    true
}

/// Parses a board from XSB text (optionally preceded by a `View: Rotated
/// ...` preamble line), validating the structural invariants enumerated in
/// `InvalidLevelViolation`.
pub fn new_board(level: &str) -> Result<Board, CoreError> {
    let mut lines = level.lines().peekable();
    let mut transform = Transform::default();

    if let Some(&first_line) = lines.peek() {
        if let Some(parsed) = parse_preamble(first_line) {
            transform = parsed;
            lines.next();
        }
    }

    let body: Vec<&str> = lines.collect();
    let body_text = body.join("\n");

    let game = Game::from_text(&body_text).map_err(|message| CoreError::InvalidLevel {
        violation: classify_from_text_error(&message),
    })?;

    let width = body.iter().map(|line| line.len()).max().unwrap_or(0) as u8;
    let height = body.len() as u8;

    if width as usize > MAX_SIZE || height as usize > MAX_SIZE {
        return Err(CoreError::InvalidLevel {
            violation: InvalidLevelViolation::NonRectangular,
        });
    }

    if !has_closed_border(&game, width, height) {
        return Err(CoreError::InvalidLevel {
            violation: InvalidLevelViolation::NonClosedBorder,
        });
    }

    if !all_goals_reachable(&game, width, height) {
        return Err(CoreError::InvalidLevel {
            violation: InvalidLevelViolation::UnreachableGoal,
        });
    }

    for &box_pos in game.box_positions() {
        if game.is_push_dead_square(box_pos) {
            log::warn!(
                "box at {} starts on a simple-deadlock square; level may be unsolvable",
                box_pos
            );
        }
    }

    Ok(Board { game, transform })
}
