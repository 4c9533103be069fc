//! Expectimax search policy (single-threaded and parallel) for 2048.
//!
//! This module provides two policy implementations:
//! - [`Expectimax`]: single-threaded expectimax.
//! - [`ExpectimaxParallel`]: rayon-based parallel expectimax.
//!
//! Both variants share the same public surface, configuration and tie-break,
//! and return identical scores for the same board.
//!
//! The search alternates player nodes (best of the four directions) with
//! chance nodes (a 2 with probability 0.9 or a 4 with probability 0.1 in a
//! uniformly chosen free cell). Chance nodes become heuristic leaves once
//! the depth cutoffs in [`SearchCutoffs`] are reached.
//!
//! Quick start
//! ```
//! use expectimax_2048::engine::Board;
//! use expectimax_2048::expectimax::{Expectimax, ExpectimaxParallel};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let b0 = Board::EMPTY
//!     .with_random_tile(&mut rng)
//!     .with_random_tile(&mut rng);
//!
//! let mut ex = Expectimax::new();
//! let m = ex.best_move(b0);
//! assert!(m.is_some());
//!
//! let mut ex_par = ExpectimaxParallel::new();
//! assert_eq!(ex_par.best_move(b0), m);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{Board, FreeCell, Move};
use crate::error::ConfigError;

mod heuristic;
mod search_par;
mod search_seq;

pub use heuristic::HeuristicBreakdown;
pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Spawn probability of a 2; a 4 spawns otherwise.
pub(crate) const SPAWN_TWO_PROB: f64 = 0.9;
pub(crate) const SPAWN_FOUR_PROB: f64 = 0.1;

/// Node kinds of the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Node {
    Player,
    Chance,
}

/// Depth limits at which chance nodes are scored by the heuristic instead of expanded.
///
/// A chance node at `depth` is a leaf when `depth >= max_depth`, or when
/// `depth >= wide_depth` and the board has at least `wide_free_cells` empties.
/// Depth counts both player and chance plies and starts at 0 at the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCutoffs {
    pub wide_depth: u32,
    pub wide_free_cells: usize,
    pub max_depth: u32,
}

impl Default for SearchCutoffs {
    fn default() -> Self { Self { wide_depth: 3, wide_free_cells: 6, max_depth: 5 } }
}

impl SearchCutoffs {
    #[inline]
    pub(crate) fn is_leaf(&self, depth: u32, free_cells: usize) -> bool {
        (free_cells >= self.wide_free_cells && depth >= self.wide_depth) || depth >= self.max_depth
    }
}

/// How equal root scores are resolved, scanning directions in `Up, Right, Down, Left` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The earliest direction with the maximum score wins.
    #[default]
    FirstMax,
    /// The latest direction with the maximum score wins.
    LastMax,
}

impl TieBreak {
    #[inline]
    pub(crate) fn prefers(self, candidate: f64, best: f64) -> bool {
        match self {
            TieBreak::FirstMax => candidate > best,
            TieBreak::LastMax => candidate >= best,
        }
    }
}

/// Thresholds used only by the parallel implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParThresholds {
    /// Nodes shallower than this fan out on the rayon pool; deeper nodes run sequentially.
    pub par_depth: u32,
}

impl Default for ParThresholds {
    fn default() -> Self { Self { par_depth: 2 } }
}

/// Configurable knobs for Expectimax. Defaults are the tuned reference values.
///
/// ```
/// use expectimax_2048::expectimax::{ExpectimaxConfig, TieBreak};
/// let cfg: ExpectimaxConfig = serde_json::from_str(r#"{ "tie_break": "last_max" }"#).unwrap();
/// assert_eq!(cfg.tie_break, TieBreak::LastMax);
/// assert_eq!(cfg.cutoffs.max_depth, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectimaxConfig {
    pub cutoffs: SearchCutoffs,
    pub tie_break: TieBreak,
    pub par_thresholds: ParThresholds,
}

impl ExpectimaxConfig {
    /// Load a JSON config; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let cfg: ExpectimaxConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.cutoffs;
        if c.max_depth == 0 {
            return Err(ConfigError::Invalid("cutoffs.max_depth must be at least 1".into()));
        }
        if c.wide_depth > c.max_depth {
            return Err(ConfigError::Invalid(format!(
                "cutoffs.wide_depth ({}) exceeds cutoffs.max_depth ({})",
                c.wide_depth, c.max_depth
            )));
        }
        if c.wide_free_cells > 16 {
            return Err(ConfigError::Invalid(format!(
                "cutoffs.wide_free_cells ({}) exceeds the 16 cells of the board",
                c.wide_free_cells
            )));
        }
        Ok(())
    }
}

/// Per-branch expected value at the root (no normalization).
///
/// - `ev` is the expected value for taking `dir` from the current board.
/// - `legal` is false when the move is a no-op for the current board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEval {
    pub dir: Move,
    pub ev: f64,
    pub legal: bool,
}

impl BranchEval {
    pub(crate) fn illegal(dir: Move) -> Self { Self { dir, ev: 0.0, legal: false } }
}

/// Basic search stats for a single evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub peak_nodes: u64,
}

impl SearchStats {
    pub(crate) fn record(&mut self, nodes: u64) {
        self.nodes = nodes;
        self.peak_nodes = self.peak_nodes.max(nodes);
    }
}

/// Children of a chance node in spawn order (per free cell: the 2, then the 4)
/// with their probability weights.
pub(crate) fn chance_children(board: Board, cells: &[FreeCell]) -> impl Iterator<Item = (Board, f64)> + '_ {
    let num_empty = cells.len() as f64;
    let two_weight = SPAWN_TWO_PROB / num_empty;
    let four_weight = SPAWN_FOUR_PROB / num_empty;
    cells
        .iter()
        .flat_map(move |&cell| [(board.with_tile(cell, 2), two_weight), (board.with_tile(cell, 4), four_weight)])
}

/// Pick the preferred legal branch, scanning in `Up, Right, Down, Left` order.
pub(crate) fn select_branch(branches: &[BranchEval; 4], tie_break: TieBreak) -> Option<(Move, f64)> {
    let mut best: Option<(Move, f64)> = None;
    for branch in branches.iter().filter(|b| b.legal) {
        match best {
            Some((_, score)) if !tie_break.prefers(branch.ev, score) => {}
            _ => best = Some((branch.dir, branch.ev)),
        }
    }
    best
}

/// Raw heuristic value for a board, counting its empty cells.
///
/// ```
/// use expectimax_2048::engine::Board;
/// use expectimax_2048::expectimax::heuristic_value;
/// let b = Board::from_rows([[64, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
/// assert_eq!(heuristic_value(&b), 1_500_000.0);
/// ```
#[inline]
pub fn heuristic_value(board: &Board) -> f64 { heuristic::evaluate(board, board.count_empty()) }

/// Per-term heuristic values for a board.
#[inline]
pub fn heuristic_breakdown(board: &Board) -> HeuristicBreakdown {
    heuristic::breakdown(&board.rows(), board.count_empty())
}
