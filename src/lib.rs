//! expectimax-2048: a 2048 move engine + Expectimax policy
//!
//! This crate provides:
//! - A value-semantics `Board` with the 2048 slide/merge rule (`engine` module)
//! - A positional heuristic and an Expectimax AI (`expectimax` module) with
//!   single-threaded and parallel variants
//! - A headless game surface for driving whole games (`game` module)
//! - [`decide`], the single entry point a game driver needs
//!
//! Quick start:
//! ```
//! use expectimax_2048::{decide, Move};
//!
//! let grid = [
//!     [2, 0, 0, 2],
//!     [0, 0, 0, 0],
//!     [0, 4, 0, 0],
//!     [0, 0, 0, 0],
//! ];
//! let dir: Option<Move> = decide(grid).unwrap();
//! assert!(dir.is_some());
//! ```
//!
//! Full loop (simplest possible)
//! ```
//! use expectimax_2048::expectimax::Expectimax;
//! use expectimax_2048::game::Game;
//!
//! let mut policy = Expectimax::new();
//! let mut game = Game::new(123);
//! while !game.is_over() && game.moves() < 4 {
//!     match policy.best_move(game.board()) {
//!         Some(dir) => { game.apply(dir); }
//!         None => break,
//!     }
//! }
//! assert!(game.moves() > 0);
//! ```

pub mod engine;
pub mod error;
pub mod expectimax;
pub mod game;

pub use engine::{Board, Move};
pub use error::{BoardError, ConfigError};

use expectimax::Expectimax;

/// Pick the next move for `grid` with the default sequential search.
///
/// Returns `Ok(None)` when no move is legal (game over) and an error when the
/// grid holds a value that is neither 0 nor a power of two in `2..=MAX_TILE`.
pub fn decide(grid: [[u32; 4]; 4]) -> Result<Option<Move>, BoardError> {
    decide_with(&mut Expectimax::new(), grid)
}

/// Like [`decide`] but reuses a configured policy.
pub fn decide_with(policy: &mut Expectimax, grid: [[u32; 4]; 4]) -> Result<Option<Move>, BoardError> {
    let board = Board::from_rows(grid)?;
    Ok(policy.best_move(board))
}
