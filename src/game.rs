//! Headless game surface: owns the authoritative board, the running score
//! and the spawn RNG. The search only ever sees copies of its board.

use rand::{rngs::StdRng, SeedableRng};

use crate::engine::{Board, Move};

pub struct Game {
    board: Board,
    score: u64,
    moves: u64,
    rng: StdRng,
}

impl Game {
    /// Fresh game with two random tiles, reproducible from `seed`.
    ///
    /// ```
    /// use expectimax_2048::game::Game;
    /// let g = Game::new(1);
    /// assert_eq!(g.board().count_empty(), 14);
    /// assert_eq!(Game::new(1).board(), g.board());
    /// ```
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let board = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        Self { board, score: 0, moves: 0, rng }
    }

    /// Continue from an existing board.
    pub fn from_board(board: Board, seed: u64) -> Self {
        Self { board, score: 0, moves: 0, rng: StdRng::seed_from_u64(seed) }
    }

    #[inline]
    pub fn board(&self) -> Board { self.board }

    /// Sum of all merges so far.
    #[inline]
    pub fn score(&self) -> u64 { self.score }

    /// Number of legal moves applied.
    #[inline]
    pub fn moves(&self) -> u64 { self.moves }

    #[inline]
    pub fn is_over(&self) -> bool { self.board.is_game_over() }

    /// Apply `dir`; on a legal move add the merge score and spawn a tile.
    ///
    /// Returns false (and changes nothing) when the move is a no-op.
    pub fn apply(&mut self, dir: Move) -> bool {
        let outcome = self.board.apply(dir);
        if !outcome.is_legal() {
            return false;
        }
        self.score += outcome.score;
        self.moves += 1;
        self.board = outcome.board.with_random_tile(&mut self.rng);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_move_changes_nothing() {
        let board = Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut g = Game::from_board(board, 9);
        assert!(!g.apply(Move::Left));
        assert!(!g.apply(Move::Up));
        assert_eq!(g.board(), board);
        assert_eq!((g.score(), g.moves()), (0, 0));
    }

    #[test]
    fn legal_move_scores_and_spawns() {
        let board = Board::from_rows([[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut g = Game::from_board(board, 9);
        assert!(g.apply(Move::Left));
        assert_eq!(g.score(), 8);
        assert_eq!(g.moves(), 1);
        assert_eq!(g.board().count_empty(), 13);
        assert_eq!(&g.board().rows()[0][..2], &[4, 4]);
    }

    #[test]
    fn same_seed_same_game() {
        let dirs = [Move::Left, Move::Down, Move::Right, Move::Down, Move::Up];
        let play = |seed| {
            let mut g = Game::new(seed);
            for _ in 0..10 {
                for dir in dirs {
                    g.apply(dir);
                }
            }
            (g.board(), g.score(), g.moves())
        };
        assert_eq!(play(77), play(77));
    }
}
