//! vf-core: stable foundation for vectorflow.
//!
//! Contains:
//! - vector (the immutable `Vector3` value type + trace formatting)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for arena-allocated blocks)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod vector;

// Re-exports: nice ergonomics for downstream crates
pub use error::{VfError, VfResult};
pub use ids::*;
pub use numeric::*;
pub use vector::{Axis, Vector3, format_g};
