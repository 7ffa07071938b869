//! Vector and scalar continuous blocks for vectorflow.
//!
//! This crate provides the value-computation graph: blocks that produce a
//! [`Vector3`](vf_core::Vector3) or a scalar on demand, wired together through
//! lightweight references and re-evaluated once per simulation epoch.
//!
//! # Architecture
//!
//! - A [`Model`] arena owns every block, including the anonymous nodes built
//!   by the composition operators (`add`, `scale`, `unit_vector`, ...)
//! - [`VectorRef`] / [`ScalarRef`] are copyable, non-owning, rebindable handles
//! - Evaluation is pull-based and loop-checked: a block that depends on its own
//!   value within one epoch fails with [`BlockError::AlgebraicLoop`]
//! - Vector integrators drive three scalar integrators through a split feed
//!   that evaluates the upstream vector once per epoch
//!
//! # Example
//!
//! ```
//! use vf_blocks::Model;
//! use vf_core::Vector3;
//!
//! let mut model = Model::new();
//! let a = model.constant3(Vector3::new(1.0, 2.0, 3.0));
//! let b = model.constant3(Vector3::new(1.0, 0.0, 0.0));
//! let sum = model.add(a, b);
//! let len = model.abs(sum);
//!
//! assert_eq!(model.value(sum).unwrap(), Vector3::new(2.0, 2.0, 3.0));
//! assert!((model.scalar_value(len).unwrap() - 17.0_f64.sqrt()).abs() < 1e-12);
//! ```

pub mod block;
pub mod error;
pub mod integrator;
pub mod model;
pub mod ops;
pub mod reference;

pub use block::{EvalState, FeedSync, ScalarFn, ScalarOp, ScaleOp, VectorFn, VectorOp};
pub use error::{BlockError, BlockResult};
pub use model::{BlockValue, Model};
pub use reference::{
    BlockRef, Integrator3, Parameter, Parameter3, ScalarIntegrator, ScalarRef, Variable,
    Variable3, VectorRef,
};
