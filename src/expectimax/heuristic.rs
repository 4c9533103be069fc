use crate::engine::Board;

const EMPTY_WEIGHT: f64 = 100_000.0;
const SMOOTHNESS_POWER: i32 = 3;
const MONOTONICITY_WEIGHT: f64 = 10_000.0;

/// Individual terms of the heuristic, already weighted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeuristicBreakdown {
    pub tile_sum: f64,
    pub smoothness: f64,
    pub monotonicity: f64,
    pub empty: f64,
}

impl HeuristicBreakdown {
    #[inline]
    pub fn total(&self) -> f64 { self.tile_sum + self.empty + self.smoothness + self.monotonicity }
}

/// Heuristic value of `board` given its number of empty cells.
#[inline]
pub(crate) fn evaluate(board: &Board, empty_count: usize) -> f64 {
    breakdown(&board.rows(), empty_count).total()
}

pub(crate) fn breakdown(grid: &[[u32; 4]; 4], empty_count: usize) -> HeuristicBreakdown {
    HeuristicBreakdown {
        tile_sum: calc_sum(grid),
        smoothness: calc_smoothness(grid).powi(SMOOTHNESS_POWER),
        monotonicity: calc_monotonicity(grid) * MONOTONICITY_WEIGHT,
        empty: empty_count as f64 * EMPTY_WEIGHT,
    }
}

fn calc_sum(grid: &[[u32; 4]; 4]) -> f64 {
    grid.iter().flatten().map(|&v| (v as f64) * (v as f64)).sum()
}

// Always <= 0.
fn calc_smoothness(grid: &[[u32; 4]; 4]) -> f64 {
    let s = |row: usize, col: usize| (grid[row][col] as f64).sqrt();
    let mut smoothness = 0.0;
    for row in 0..4 {
        for col in 0..3 {
            smoothness -= (s(row, col) - s(row, col + 1)).abs();
        }
    }
    for row in 0..3 {
        for col in 0..4 {
            smoothness -= (s(row, col) - s(row + 1, col)).abs();
        }
    }
    smoothness
}

#[inline]
fn log_value(tile: u32) -> f64 {
    if tile > 1 { (tile as f64).log2() } else { 0.0 }
}

/// Accumulated decreasing and increasing ramps of one line, gaps skipped.
///
/// The gap skip never moves past the last cell, so a trailing empty cell is
/// compared as log-value 0.
fn line_ramps(line: [u32; 4]) -> (f64, f64) {
    let mut decreasing = 0.0;
    let mut increasing = 0.0;
    let mut current = 0;
    let mut next = 1;
    while next < 4 {
        while next < 3 && line[next] == 0 {
            next += 1;
        }
        let current_value = log_value(line[current]);
        let next_value = log_value(line[next]);
        if current_value > next_value {
            decreasing += next_value - current_value;
        } else if next_value > current_value {
            increasing += current_value - next_value;
        }
        current = next;
        next += 1;
    }
    (decreasing, increasing)
}

// Always <= 0.
fn calc_monotonicity(grid: &[[u32; 4]; 4]) -> f64 {
    let (mut up, mut down, mut left, mut right) = (0.0, 0.0, 0.0, 0.0);
    for x in 0..4 {
        let column = [grid[0][x], grid[1][x], grid[2][x], grid[3][x]];
        let (dec, inc) = line_ramps(column);
        up += dec;
        down += inc;
    }
    for row in grid {
        let (dec, inc) = line_ramps(*row);
        left += dec;
        right += inc;
    }
    f64::max(up, down) + f64::max(left, right)
}
