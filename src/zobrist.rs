use crate::bits::{Bitvector, Position};
use crate::game::{Game, MAX_SIZE};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Zobrist hash tables for game states.
///
/// `compute_hash`/`compute_boxes_hash` are the from-scratch reference
/// implementations; the search maintains hashes incrementally by xor-ing in
/// `box_hash`/`player_hash` deltas as boxes and the pusher move.
pub struct Zobrist {
    box_hashes: [[u64; MAX_SIZE]; MAX_SIZE],
    player_hashes: [[u64; MAX_SIZE]; MAX_SIZE],
}

impl Zobrist {
    pub fn new() -> Self {
        // Use a seeded PRNG for reproducible Zobrist hashes
        let mut rng = ChaCha8Rng::seed_from_u64(0x123456789abcdef0);

        let mut box_hashes = [[0u64; MAX_SIZE]; MAX_SIZE];
        for row in box_hashes.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.next_u64();
            }
        }

        let mut player_hashes = [[0u64; MAX_SIZE]; MAX_SIZE];
        for row in player_hashes.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.next_u64();
            }
        }

        Zobrist {
            box_hashes,
            player_hashes,
        }
    }

    /// Hash contribution of a single box at `pos`.
    pub fn box_hash(&self, pos: Position) -> u64 {
        self.box_hashes[pos.1 as usize][pos.0 as usize]
    }

    /// Hash contribution of the pusher standing at `pos`.
    pub fn player_hash(&self, pos: Position) -> u64 {
        self.player_hashes[pos.1 as usize][pos.0 as usize]
    }

    /// Hash of every box in `game`, independent of pusher position.
    pub fn compute_boxes_hash(&self, game: &Game) -> u64 {
        game.box_positions()
            .iter()
            .fold(0u64, |acc, &pos| acc ^ self.box_hash(pos))
    }

    /// Hash of only the boxes named in `boxes`, by index.
    pub fn compute_boxes_hash_subset(&self, game: &Game, boxes: Bitvector) -> u64 {
        boxes
            .iter()
            .fold(0u64, |acc, idx| acc ^ self.box_hash(game.box_position(idx)))
    }

    /// Full position hash: all boxes plus the pusher's own square.
    ///
    /// The search never uses this as a transposition key directly (it
    /// canonicalizes on the pusher's reachable *region*, not its exact
    /// square) but it is the simplest unambiguous key for path
    /// reconstruction and for tests.
    pub fn compute_hash(&self, game: &Game) -> u64 {
        self.compute_boxes_hash(game) ^ self.player_hash(game.player())
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;

    fn parse(text: &str) -> Game {
        Game::from_text(text.trim_matches('\n')).unwrap()
    }

    #[test]
    fn test_hash_changes_after_push() {
        let zobrist = Zobrist::new();
        let game = parse(
            r#"
####
#@$.#
####
"#,
        );
        let mut pushed = game.clone();
        let push = game.compute_pushes().moves.iter().next().unwrap();
        pushed.push(push);

        assert_ne!(zobrist.compute_hash(&game), zobrist.compute_hash(&pushed));
    }

    #[test]
    fn test_subset_hash_matches_full_hash_for_all_boxes() {
        let zobrist = Zobrist::new();
        let game = parse(
            r#"
######
#@$$ .#
#    .#
######
"#,
        );
        let all_boxes = Bitvector::full(game.box_count() as u8);
        assert_eq!(
            zobrist.compute_boxes_hash(&game),
            zobrist.compute_boxes_hash_subset(&game, all_boxes)
        );
    }

    #[test]
    fn test_player_hash_distinct_per_position() {
        let zobrist = Zobrist::new();
        assert_ne!(
            zobrist.player_hash(Position(0, 0)),
            zobrist.player_hash(Position(1, 0))
        );
    }
}
