use std::io;

/// Rejected board input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("invalid tile {value} at row {row}, col {col}: expected 0 or a power of two >= 2")]
    InvalidTile { row: usize, col: usize, value: u32 },
    #[error("board must be 4x4, got {rows} rows with {cols} columns in the first offending row")]
    Shape { rows: usize, cols: usize },
}

/// Failure loading or validating an [`ExpectimaxConfig`](crate::expectimax::ExpectimaxConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
