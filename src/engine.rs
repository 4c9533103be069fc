use arrayvec::ArrayVec;
use rand::Rng;
use std::fmt;

use crate::error::BoardError;

/// A direction to move/merge tiles.
///
/// Declaration order is the canonical search order: `Up, Right, Down, Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Right,
    Down,
    Left,
}

impl Move {
    /// All directions in canonical search order.
    pub const ALL: [Move; 4] = [Move::Up, Move::Right, Move::Down, Move::Left];

    /// Position of this direction in [`Move::ALL`].
    #[inline]
    pub fn index(self) -> usize { self as usize }

    /// Cells visited when applying this move, nearest to the destination edge first.
    ///
    /// Coordinates are `(row, col)`.
    pub fn traversal(self) -> [(usize, usize); 16] {
        let mut cells = [(0, 0); 16];
        for outer in 0..4 {
            for inner in 0..4 {
                cells[outer * 4 + inner] = match self {
                    Move::Up => (inner, outer),
                    Move::Right => (outer, 3 - inner),
                    Move::Down => (3 - inner, outer),
                    Move::Left => (outer, inner),
                };
            }
        }
        cells
    }

    /// Candidate cells behind `(row, col)` (farther from the destination edge), nearest first.
    pub fn behind(self, row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
        (1..4).map_while(move |step| {
            let (r, c) = match self {
                Move::Up => (row + step, col),
                Move::Right => (row, col.checked_sub(step)?),
                Move::Down => (row.checked_sub(step)?, col),
                Move::Left => (row, col + step),
            };
            (r < 4 && c < 4).then_some((r, c))
        })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Move::Up => "up",
            Move::Right => "right",
            Move::Down => "down",
            Move::Left => "left",
        };
        f.write_str(s)
    }
}

impl TryFrom<u8> for Move {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Move::ALL.get(v as usize).copied().ok_or(v)
    }
}

type Grid = [[u32; 4]; 4];
type Score = u64;

/// A free cell as `(x, y)`, i.e. `(col, row)`.
pub type FreeCell = (usize, usize);

/// Free cells of one board; at most 16, kept on the stack.
pub type FreeCells = ArrayVec<FreeCell, 16>;

/// Largest tile accepted on input: the highest tile reachable on a 4x4 board.
///
/// Search plies keep doubling it well below `u32::MAX`; merges that would
/// overflow are refused in [`apply_move`] regardless.
pub const MAX_TILE: u32 = 1 << 17;

/// 4x4 2048 board stored as plain tile values (0 = empty).
///
/// `Board` is `Copy`: every search branch works on its own value, so
/// sibling branches never observe each other's slides and merges.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(Grid);

/// Result of simulating one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    /// Number of slide and merge steps. Zero means the move was a no-op.
    pub moved: u32,
    /// Sum of the tiles created by merges.
    pub score: Score,
}

impl MoveOutcome {
    #[inline]
    pub fn is_legal(&self) -> bool { self.moved > 0 }
}

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board([[0; 4]; 4]);

    /// Build a board from rows, rejecting any tile that is not 0 or a power of two >= 2.
    ///
    /// ```
    /// use expectimax_2048::engine::Board;
    /// let b = Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap();
    /// assert_eq!(b.count_empty(), 14);
    /// assert!(Board::from_rows([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_err());
    /// ```
    pub fn from_rows(rows: Grid) -> Result<Self, BoardError> {
        for (row, line) in rows.iter().enumerate() {
            for (col, &value) in line.iter().enumerate() {
                if !is_valid_tile(value) {
                    return Err(BoardError::InvalidTile { row, col, value });
                }
            }
        }
        Ok(Board(rows))
    }

    /// Build a board from dynamically sized rows, checking the 4x4 shape first.
    pub fn from_slices<R: AsRef<[u32]>>(rows: &[R]) -> Result<Self, BoardError> {
        if rows.len() != 4 {
            let cols = rows.first().map_or(0, |r| r.as_ref().len());
            return Err(BoardError::Shape { rows: rows.len(), cols });
        }
        let mut grid = [[0u32; 4]; 4];
        for (dst, src) in grid.iter_mut().zip(rows) {
            let src = src.as_ref();
            if src.len() != 4 {
                return Err(BoardError::Shape { rows: 4, cols: src.len() });
            }
            dst.copy_from_slice(src);
        }
        Board::from_rows(grid)
    }

    /// Copy of the underlying rows.
    #[inline]
    pub fn rows(&self) -> Grid { self.0 }

    /// Tile value at `(row, col)`; 0 when empty.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 { self.0[row][col] }

    /// Return a copy with `value` placed at free cell `(x, y)`.
    #[inline]
    pub(crate) fn with_tile(self, (x, y): FreeCell, value: u32) -> Self {
        let mut grid = self.0;
        grid[y][x] = value;
        Board(grid)
    }

    /// Slide/merge in `dir`, returning the full outcome. No randomness.
    #[inline]
    pub fn apply(self, dir: Move) -> MoveOutcome { apply_move(self, dir) }

    /// Return the board resulting from sliding/merging tiles in `dir` (no random insert).
    ///
    /// ```
    /// use expectimax_2048::engine::{Board, Move};
    /// let b = Board::from_rows([[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// assert_eq!(b.shift(Move::Left).rows()[0], [4, 4, 0, 0]);
    /// ```
    #[inline]
    pub fn shift(self, dir: Move) -> Self { apply_move(self, dir).board }

    /// Every empty cell as `(x, y)`, x outer and y inner.
    #[inline]
    pub fn free_cells(&self) -> FreeCells { free_cells(self) }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(&self) -> usize { self.0.iter().flatten().filter(|&&v| v == 0).count() }

    /// Return true if no legal moves remain.
    #[inline]
    pub fn is_game_over(self) -> bool { is_game_over(self) }

    /// Return the highest tile value present on the board (0 for an empty board).
    #[inline]
    pub fn highest_tile(&self) -> u32 { self.0.iter().flatten().copied().max().unwrap_or(0) }

    /// Sum of all tile values.
    #[inline]
    pub fn tile_sum(&self) -> u64 { self.0.iter().flatten().map(|&v| v as u64).sum() }

    /// Insert a 2 (90%) or 4 (10%) tile into a uniformly chosen empty cell.
    ///
    /// A full board is returned unchanged.
    ///
    /// ```
    /// use expectimax_2048::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let cells = free_cells(&self);
        if cells.is_empty() {
            return self;
        }
        let cell = cells[rng.gen_range(0..cells.len())];
        let value = if rng.gen_range(0..10) < 9 { 2 } else { 4 };
        self.with_tile(cell, value)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:?})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f, "-------------------------------")?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

impl TryFrom<Grid> for Board {
    type Error = BoardError;

    fn try_from(rows: Grid) -> Result<Self, Self::Error> { Board::from_rows(rows) }
}

impl TryFrom<&[Vec<u32>]> for Board {
    type Error = BoardError;

    fn try_from(rows: &[Vec<u32>]) -> Result<Self, Self::Error> { Board::from_slices(rows) }
}

impl From<Board> for Grid {
    fn from(b: Board) -> Self { b.0 }
}

#[inline]
fn is_valid_tile(value: u32) -> bool {
    value == 0 || ((2..=MAX_TILE).contains(&value) && value.is_power_of_two())
}

/// Every coordinate holding 0, as `(x, y)`: column-major, x outer and y inner.
pub fn free_cells(board: &Board) -> FreeCells {
    let mut cells = FreeCells::new();
    for x in 0..4 {
        for y in 0..4 {
            if board.0[y][x] == 0 {
                cells.push((x, y));
            }
        }
    }
    cells
}

/// Slide/merge tiles in the given direction. No randomness.
///
/// Each cell in the direction's traversal pulls in the nearest tile behind it
/// when empty, then merges with the next tile behind it when equal. A tile
/// merges at most once per move and the first non-empty candidate blocks the scan.
pub fn apply_move(board: Board, direction: Move) -> MoveOutcome {
    let mut grid = board.0;
    let mut moved = 0;
    let mut score: Score = 0;
    for (row, col) in direction.traversal() {
        for (r, c) in direction.behind(row, col) {
            if grid[row][col] == 0 && grid[r][c] != 0 {
                grid[row][col] = grid[r][c];
                grid[r][c] = 0;
                moved += 1;
            }
            if grid[r][c] != 0 {
                if grid[row][col] == grid[r][c] {
                    // A doubling past u32 blocks like a mismatch.
                    if let Some(merged) = grid[row][col].checked_mul(2) {
                        grid[row][col] = merged;
                        grid[r][c] = 0;
                        score += merged as Score;
                        moved += 1;
                    }
                }
                break;
            }
        }
    }
    MoveOutcome { board: Board(grid), moved, score }
}

/// True if no move in any direction changes the board.
pub fn is_game_over(board: Board) -> bool {
    Move::ALL.iter().all(|&dir| !apply_move(board, dir).is_legal())
}

fn format_val(val: u32) -> String {
    match val {
        0 => String::from("       "),
        x => format!("{:^7}", x),
    }
}
