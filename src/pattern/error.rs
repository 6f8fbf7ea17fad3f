// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,
    #[error("Pattern bytes ({bytes}) and mask ({mask}) differ in length")]
    LengthMismatch { bytes: usize, mask: usize },
    #[error("Invalid pattern token '{0}'")]
    InvalidToken(String),
}
