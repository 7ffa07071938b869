//! Non-owning handles to blocks in a [`Model`] arena.
//!
//! A reference is a copyable index. It never owns the block it names and has
//! no behaviour of its own beyond forwarding evaluation requests to the model.
//! Blocks are owned by the arena for the model's whole lifetime, so a
//! reference cannot dangle; a reference taken from another model is reported
//! as [`BlockError::UnknownBlock`](crate::BlockError::UnknownBlock) when used.

use core::fmt;

use vf_core::{BlockId, Vector3};

use crate::error::BlockResult;
use crate::model::Model;

/// Reference to a vector-producing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorRef(pub(crate) BlockId);

impl VectorRef {
    pub fn id(self) -> BlockId {
        self.0
    }

    /// Current value of the referent (loop-checked).
    pub fn value(self, model: &Model) -> BlockResult<Vector3> {
        model.value(self)
    }

    /// Rebind this handle, returning the previous referent.
    pub fn set(&mut self, other: impl Into<VectorRef>) -> VectorRef {
        core::mem::replace(self, other.into())
    }

    /// Identity comparison against a raw block id (diagnostics only).
    pub fn refers_to(self, id: BlockId) -> bool {
        self.0 == id
    }
}

/// Reference to a scalar-producing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarRef(pub(crate) BlockId);

impl ScalarRef {
    pub fn id(self) -> BlockId {
        self.0
    }

    pub fn value(self, model: &Model) -> BlockResult<f64> {
        model.scalar_value(self)
    }

    pub fn set(&mut self, other: impl Into<ScalarRef>) -> ScalarRef {
        core::mem::replace(self, other.into())
    }

    pub fn refers_to(self, id: BlockId) -> bool {
        self.0 == id
    }
}

/// Either kind of reference, for operations that accept both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockRef {
    Vector(VectorRef),
    Scalar(ScalarRef),
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Vector(r) => write!(f, "vector block #{}", r.0),
            BlockRef::Scalar(r) => write!(f, "scalar block #{}", r.0),
        }
    }
}

impl From<VectorRef> for BlockRef {
    fn from(r: VectorRef) -> Self {
        BlockRef::Vector(r)
    }
}

impl From<ScalarRef> for BlockRef {
    fn from(r: ScalarRef) -> Self {
        BlockRef::Scalar(r)
    }
}

/// Typed handle for a block with operations beyond evaluation.
///
/// Each handle converts into the plain reference of its domain so it can be
/// wired anywhere an input is expected.
macro_rules! typed_handle {
    ($(#[$doc:meta])* $name:ident => $plain:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) BlockId);

        impl $name {
            pub fn id(self) -> BlockId {
                self.0
            }

            pub fn output(self) -> $plain {
                $plain(self.0)
            }
        }

        impl From<$name> for $plain {
            fn from(h: $name) -> Self {
                $plain(h.0)
            }
        }

        impl From<$name> for BlockRef {
            fn from(h: $name) -> Self {
                BlockRef::from($plain(h.0))
            }
        }
    };
}

typed_handle!(
    /// Mutable vector value, assignable at any time.
    Variable3 => VectorRef
);
typed_handle!(
    /// Vector value locked once the simulation run starts.
    Parameter3 => VectorRef
);
typed_handle!(
    /// Vector integrator driving three scalar integrators.
    Integrator3 => VectorRef
);
typed_handle!(
    /// Mutable scalar value.
    Variable => ScalarRef
);
typed_handle!(
    /// Scalar value locked once the simulation run starts.
    Parameter => ScalarRef
);
typed_handle!(
    /// Scalar integrator; its value is its accumulated state.
    ScalarIntegrator => ScalarRef
);
