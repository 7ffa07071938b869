//! Error types for block wiring and evaluation.

use thiserror::Error;

/// Result type for block operations.
pub type BlockResult<T> = Result<T, BlockError>;

/// Errors raised while wiring or evaluating a block model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BlockError {
    /// A block was re-entered while its own evaluation was still running.
    #[error("Algebraic loop detected at {block}")]
    AlgebraicLoop { block: String },

    /// A parameter was assigned after the simulation run started.
    #[error("Parameter {block} cannot be changed while the simulation is running")]
    LockedParameter { block: String },

    /// Reference does not name a block of this model.
    #[error("Unknown block: {what}")]
    UnknownBlock { what: String },

    /// Operation targets a block of an incompatible kind.
    #[error("{operation} is not supported by {block}")]
    WrongKind {
        operation: &'static str,
        block: String,
    },

    /// Invalid argument provided to a wiring function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    /// Writing a value to an output sink failed.
    #[error("Output error: {message}")]
    Output { message: String },
}

impl From<std::io::Error> for BlockError {
    fn from(e: std::io::Error) -> Self {
        BlockError::Output {
            message: e.to_string(),
        }
    }
}
