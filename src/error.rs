use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("index {index} out of bounds for atomic array of length {len}")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}
