use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::engine::{Board, Move};

use super::heuristic;
use super::{chance_children, select_branch, BranchEval, ExpectimaxConfig, Node, SearchStats};

/// Parallel Expectimax using rayon.
///
/// Nodes shallower than `par_thresholds.par_depth` evaluate their children
/// on the rayon pool. Child scores are collected in order and summed
/// sequentially, so scores and the chosen move match [`super::Expectimax`]
/// exactly regardless of thread scheduling.
pub struct ExpectimaxParallel {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl ExpectimaxParallel {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self { Self { cfg, stats: SearchStats::default() } }

    #[inline]
    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    /// Compute the best move using parallel expectimax.
    ///
    /// This is a convenience wrapper around `branch_evals` that just picks the best move.
    #[inline]
    pub fn best_move(&mut self, board: Board) -> Option<Move> {
        let start = Instant::now();
        let branches = self.branch_evals(board);
        let best = select_branch(&branches, self.cfg.tie_break);
        tracing::debug!(
            dir = ?best.map(|(dir, _)| dir),
            nodes = self.stats.nodes,
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "parallel expectimax decision"
        );
        best.map(|(dir, _)| dir)
    }

    /// Alias of [`Self::best_move`].
    #[inline]
    pub fn get_next_move(&mut self, board: Board) -> Option<Move> { self.best_move(board) }

    /// Get both best move and all branch evaluations from a single search.
    #[inline]
    pub fn best_move_with_branches(&mut self, board: Board) -> (Option<Move>, [BranchEval; 4]) {
        let branches = self.branch_evals(board);
        let best_move = select_branch(&branches, self.cfg.tie_break).map(|(dir, _)| dir);
        (best_move, branches)
    }

    /// Core function: compute EV for each direction (no normalization) in parallel.
    ///
    /// Returns a fixed array in order: `[Up, Right, Down, Left]` and marks
    /// illegal moves as `legal=false`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let state_count = AtomicU64::new(1);
        let out = self.player_branches(board, 0, &state_count);
        for branch in &out {
            tracing::trace!(dir = %branch.dir, ev = branch.ev, legal = branch.legal, "root branch");
        }
        self.stats.record(state_count.load(Ordering::Relaxed));
        out
    }

    /// EV at root (player node), equivalent to the best branch EV.
    ///
    /// When no move is legal this is the heuristic value of the board itself.
    pub fn state_value(&mut self, board: Board) -> f64 {
        let branches = self.branch_evals(board);
        match select_branch(&branches, self.cfg.tie_break) {
            Some((_, ev)) => ev,
            None => heuristic::evaluate(&board, board.count_empty()),
        }
    }

    /// Statistics collected from the last call to [`Self::best_move`],
    /// [`Self::branch_evals`] or [`Self::state_value`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }

    fn expectimax_parallel(&self, board: Board, node: Node, depth: u32, state_count: &AtomicU64) -> f64 {
        state_count.fetch_add(1, Ordering::Relaxed);
        match node {
            Node::Player => {
                let branches = self.player_branches(board, depth, state_count);
                match select_branch(&branches, self.cfg.tie_break) {
                    Some((_, score)) => score,
                    None => heuristic::evaluate(&board, board.count_empty()),
                }
            }
            Node::Chance => self.evaluate_chance(board, depth, state_count),
        }
    }

    fn player_branches(&self, board: Board, depth: u32, state_count: &AtomicU64) -> [BranchEval; 4] {
        let eval = |dir: Move| {
            let outcome = board.apply(dir);
            if outcome.is_legal() {
                let ev = self.expectimax_parallel(outcome.board, Node::Chance, depth + 1, state_count);
                BranchEval { dir, ev, legal: true }
            } else {
                BranchEval::illegal(dir)
            }
        };
        if depth < self.cfg.par_thresholds.par_depth {
            let evals: Vec<BranchEval> = Move::ALL.par_iter().map(|&dir| eval(dir)).collect();
            let mut out = Move::ALL.map(BranchEval::illegal);
            for be in evals {
                out[be.dir.index()] = be;
            }
            out
        } else {
            Move::ALL.map(eval)
        }
    }

    fn evaluate_chance(&self, board: Board, depth: u32, state_count: &AtomicU64) -> f64 {
        let cells = board.free_cells();
        let num_empty = cells.len();
        if self.cfg.cutoffs.is_leaf(depth, num_empty) {
            return heuristic::evaluate(&board, num_empty);
        }
        if num_empty == 0 {
            return self.expectimax_parallel(board, Node::Player, depth + 1, state_count);
        }
        let children: Vec<(Board, f64)> = chance_children(board, &cells).collect();
        let scores: Vec<f64> = if depth < self.cfg.par_thresholds.par_depth {
            children
                .par_iter()
                .map(|&(child, _)| self.expectimax_parallel(child, Node::Player, depth + 1, state_count))
                .collect()
        } else {
            children
                .iter()
                .map(|&(child, _)| self.expectimax_parallel(child, Node::Player, depth + 1, state_count))
                .collect()
        };
        // Summed in spawn order so the result does not depend on scheduling.
        children.iter().zip(&scores).fold(0.0, |acc, (&(_, weight), &score)| acc + score * weight)
    }
}

impl Default for ExpectimaxParallel { fn default() -> Self { Self::new() } }
