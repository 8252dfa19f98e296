//! Crate-wide error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read ROM file: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROM image is too small to contain a valid header ({0} bytes)")]
    TruncatedRom(usize),

    #[error("malformed assertion file at line {line}: {message}")]
    InvalidAssertion { line: usize, message: String },
}
