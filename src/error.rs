use crate::record::Field;
use std::num::ParseIntError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Opening or reading the input failed, or the CSV itself is malformed
    #[error("failed to read scan output: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: missing column {} ({})", .field.index(), .field.name())]
    MissingField { line: u64, field: Field },

    #[error("line {line}: column {} ({}) is not a valid integer: {value:?}", .field.index(), .field.name())]
    InvalidField {
        line: u64,
        field: Field,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("no root directory found (no directory row has parent inode 0)")]
    NoRoot,

    #[error("found {} root directories, expected exactly one: {candidates:?}", .candidates.len())]
    MultipleRoots { candidates: Vec<u64> },

    #[error("inode {0} is not a loaded directory")]
    UnknownNode(u64),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
