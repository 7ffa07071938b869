//! Error types for simulation operations.

use thiserror::Error;
use vf_blocks::BlockError;
use vf_core::VfError;

/// Errors encountered while driving a block model through time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Evaluation failed; an algebraic loop aborts the run here.
    #[error("Block evaluation failed at t={t}: {source}")]
    Block {
        t: f64,
        #[source]
        source: BlockError,
    },

    #[error("State diverged at t={t}: {source}")]
    Diverged {
        t: f64,
        #[source]
        source: VfError,
    },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn block_at(t: f64) -> impl Fn(BlockError) -> SimError + Copy {
        move |source| SimError::Block { t, source }
    }
}
