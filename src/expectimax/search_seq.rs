use std::time::Instant;

use crate::engine::{Board, Move};

use super::heuristic;
use super::{chance_children, select_branch, BranchEval, ExpectimaxConfig, Node, SearchStats};

/// Single-threaded Expectimax search.
///
/// Every recursive call receives its own `Board` value; nothing is shared
/// between sibling branches.
pub struct Expectimax {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl Expectimax {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self { Self { cfg, stats: SearchStats::default() } }

    #[inline]
    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    /// Alias of [`Self::best_move`].
    #[inline]
    pub fn get_next_move(&mut self, board: Board) -> Option<Move> { self.best_move(board) }

    /// Compute the best move using expectimax; `None` when no move is legal.
    ///
    /// Example
    /// ```
    /// use expectimax_2048::engine::Board;
    /// use expectimax_2048::expectimax::Expectimax;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// let mut ex = Expectimax::new();
    /// assert!(ex.best_move(b).is_some());
    /// ```
    pub fn best_move(&mut self, board: Board) -> Option<Move> {
        let start = Instant::now();
        let mut state_count = 0u64;
        let result = self.expectimax(board, Node::Player, 0, &mut state_count);
        self.stats.record(state_count);
        tracing::debug!(
            dir = ?result.move_dir,
            score = result.score,
            nodes = state_count,
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "expectimax decision"
        );
        result.move_dir
    }

    /// Compute EV for each direction (no normalization).
    ///
    /// Returns a fixed array in order: `[Up, Right, Down, Left]` and marks
    /// illegal moves as `legal=false`.
    ///
    /// Example
    /// ```
    /// use expectimax_2048::engine::Board;
    /// use expectimax_2048::expectimax::Expectimax;
    /// let b = Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// let branches = Expectimax::new().branch_evals(b);
    /// assert_eq!(branches.map(|b| b.legal), [false, true, true, false]);
    /// ```
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        // The root itself counts as one node.
        let mut state_count = 1u64;
        let out = self.player_branches(board, 0, &mut state_count);
        for branch in &out {
            tracing::trace!(dir = %branch.dir, ev = branch.ev, legal = branch.legal, "root branch");
        }
        self.stats.record(state_count);
        out
    }

    /// EV at root (player node), equivalent to the best branch EV.
    ///
    /// When no move is legal this is the heuristic value of the board itself.
    pub fn state_value(&mut self, board: Board) -> f64 {
        let mut state_count = 0u64;
        let res = self.expectimax(board, Node::Player, 0, &mut state_count);
        self.stats.record(state_count);
        res.score
    }

    /// Statistics collected from the last call to [`Self::best_move`],
    /// [`Self::branch_evals`] or [`Self::state_value`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }

    fn expectimax(&self, board: Board, node: Node, depth: u32, state_count: &mut u64) -> ExpectimaxResult {
        *state_count += 1;
        match node {
            Node::Player => self.evaluate_player(board, depth, state_count),
            Node::Chance => ExpectimaxResult { score: self.evaluate_chance(board, depth, state_count), move_dir: None },
        }
    }

    fn player_branches(&self, board: Board, depth: u32, state_count: &mut u64) -> [BranchEval; 4] {
        let mut out = Move::ALL.map(BranchEval::illegal);
        for (slot, &dir) in out.iter_mut().zip(Move::ALL.iter()) {
            let outcome = board.apply(dir);
            if outcome.is_legal() {
                let ev = self.expectimax(outcome.board, Node::Chance, depth + 1, state_count).score;
                *slot = BranchEval { dir, ev, legal: true };
            }
        }
        out
    }

    fn evaluate_player(&self, board: Board, depth: u32, state_count: &mut u64) -> ExpectimaxResult {
        let branches = self.player_branches(board, depth, state_count);
        match select_branch(&branches, self.cfg.tie_break) {
            Some((dir, score)) => ExpectimaxResult { score, move_dir: Some(dir) },
            None => ExpectimaxResult { score: heuristic::evaluate(&board, board.count_empty()), move_dir: None },
        }
    }

    fn evaluate_chance(&self, board: Board, depth: u32, state_count: &mut u64) -> f64 {
        let cells = board.free_cells();
        let num_empty = cells.len();
        if self.cfg.cutoffs.is_leaf(depth, num_empty) {
            return heuristic::evaluate(&board, num_empty);
        }
        if num_empty == 0 {
            // Nothing can spawn; the player moves again on the full board.
            return self.expectimax(board, Node::Player, depth + 1, state_count).score;
        }
        let mut score = 0.0;
        for (child, weight) in chance_children(board, &cells) {
            score += self.expectimax(child, Node::Player, depth + 1, state_count).score * weight;
        }
        score
    }
}

#[derive(Debug, Clone, Copy)]
struct ExpectimaxResult { score: f64, move_dir: Option<Move> }

impl Default for Expectimax { fn default() -> Self { Self::new() } }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectimax::{SearchCutoffs, TieBreak};
    use rand::{rngs::StdRng, SeedableRng};

    fn board(rows: [[u32; 4]; 4]) -> Board { Board::from_rows(rows).unwrap() }

    fn shallow(tie_break: TieBreak) -> Expectimax {
        Expectimax::with_config(ExpectimaxConfig {
            cutoffs: SearchCutoffs { wide_depth: 1, wide_free_cells: 6, max_depth: 1 },
            tie_break,
            ..Default::default()
        })
    }

    #[test]
    fn stuck_board_has_no_move() {
        let stuck = board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut ex = Expectimax::new();
        assert_eq!(ex.best_move(stuck), None);
        assert_eq!(ex.state_value(stuck), heuristic::evaluate(&stuck, 0));
        assert!(ex.branch_evals(stuck).iter().all(|b| !b.legal));
        assert_eq!(ex.best_move(Board::EMPTY), None);
    }

    #[test]
    fn only_legal_directions_are_explored() {
        let b = board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [0, 2, 4, 2]]);
        let mut ex = Expectimax::new();
        let branches = ex.branch_evals(b);
        assert_eq!(branches.map(|b| b.legal), [false, false, true, true]);
        let dir = ex.best_move(b).unwrap();
        assert!(dir == Move::Down || dir == Move::Left);
    }

    #[test]
    fn equal_scores_follow_tie_break() {
        // Left and Right give mirrored boards with identical heuristic values.
        let b = board([[0, 16, 16, 0], [0; 4], [0; 4], [0; 4]]);
        let branches = shallow(TieBreak::FirstMax).branch_evals(b);
        assert_eq!(branches[Move::Right.index()].ev, branches[Move::Left.index()].ev);
        assert!(branches[Move::Right.index()].ev > branches[Move::Down.index()].ev);
        assert!(!branches[Move::Up.index()].legal);
        for _ in 0..3 {
            assert_eq!(shallow(TieBreak::FirstMax).best_move(b), Some(Move::Right));
            assert_eq!(shallow(TieBreak::LastMax).best_move(b), Some(Move::Left));
        }
    }

    #[test]
    fn leaf_cutoff_scores_moved_board() {
        let b = board([[0, 16, 16, 0], [0; 4], [0; 4], [0; 4]]);
        let left = b.shift(Move::Left);
        let branches = shallow(TieBreak::FirstMax).branch_evals(b);
        assert_eq!(branches[Move::Left.index()].ev, heuristic::evaluate(&left, 15));
    }

    #[test]
    fn chance_node_weights_spawns() {
        // Either spawn in the last cell leaves a stuck board, so both children are leaves.
        let b = board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 8], [4, 2, 8, 0]]);
        let two = b.with_tile((3, 3), 2);
        let four = b.with_tile((3, 3), 4);
        assert!(two.is_game_over() && four.is_game_over());
        let ex = Expectimax::new();
        let mut nodes = 0;
        let score = ex.expectimax(b, Node::Chance, 1, &mut nodes).score;
        let expected = 0.0 + heuristic::evaluate(&two, 0) * 0.9 + heuristic::evaluate(&four, 0) * 0.1;
        assert_eq!(score, expected);
        assert_eq!(nodes, 3);
    }

    #[test]
    fn full_chance_node_defers_to_player() {
        let full = board([[2, 2, 4, 8], [4, 8, 2, 4], [8, 4, 8, 2], [2, 8, 4, 8]]);
        let ex = Expectimax::new();
        let (mut a, mut b) = (0, 0);
        let chance = ex.expectimax(full, Node::Chance, 1, &mut a).score;
        let player = ex.expectimax(full, Node::Player, 2, &mut b).score;
        assert_eq!(chance, player);
        assert_eq!(a, b + 1);
    }

    #[test]
    fn chance_node_expands_every_spawn() {
        let b = board([[2, 4, 8, 16], [4, 0, 16, 8], [2, 8, 0, 4], [0, 2, 4, 2]]);
        let cells = b.free_cells();
        assert_eq!(cells.len(), 3);
        // Player children sit at depth 2, their chance nodes at depth 3 are leaves.
        let ex = Expectimax::with_config(ExpectimaxConfig {
            cutoffs: SearchCutoffs { wide_depth: 3, wide_free_cells: 6, max_depth: 3 },
            ..Default::default()
        });
        let mut expected = 0.0;
        let mut expected_nodes = 1u64;
        for &cell in &cells {
            for (value, prob) in [(2, 0.9), (4, 0.1)] {
                let child = b.with_tile(cell, value);
                assert_eq!(child.count_empty(), cells.len() - 1);
                let leaves: Vec<f64> = Move::ALL
                    .iter()
                    .map(|&dir| child.apply(dir))
                    .filter(|out| out.is_legal())
                    .map(|out| heuristic::evaluate(&out.board, out.board.count_empty()))
                    .collect();
                expected_nodes += 1 + leaves.len() as u64;
                let best = leaves
                    .iter()
                    .copied()
                    .reduce(f64::max)
                    .unwrap_or_else(|| heuristic::evaluate(&child, child.count_empty()));
                expected += best * prob / cells.len() as f64;
            }
        }
        let mut nodes = 0;
        let score = ex.expectimax(b, Node::Chance, 1, &mut nodes).score;
        assert_eq!(nodes, expected_nodes);
        assert!((score - expected).abs() <= 1e-9 * expected.abs());
    }

    #[test]
    fn best_move_is_legal_and_matches_state_value() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut ex = Expectimax::new();
        let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        for _ in 0..8 {
            let dir = ex.best_move(b).unwrap();
            assert!(b.apply(dir).is_legal());
            assert!(ex.last_stats().nodes > 0);
            let branches = ex.branch_evals(b);
            let best = branches.iter().filter(|br| br.legal).map(|br| br.ev).fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(branches[dir.index()].ev, best);
            assert_eq!(ex.state_value(b), best);
            b = b.shift(dir).with_random_tile(&mut rng);
        }
        assert!(ex.last_stats().peak_nodes >= ex.last_stats().nodes);
        ex.reset_stats();
        assert_eq!(ex.last_stats(), SearchStats::default());
    }

    #[test]
    fn search_is_deterministic() {
        let b = board([[2, 0, 4, 0], [0, 8, 0, 0], [2, 0, 0, 0], [0, 0, 0, 2]]);
        let first = Expectimax::new().branch_evals(b);
        let second = Expectimax::new().branch_evals(b);
        assert_eq!(first, second);
    }
}
