use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier for a block in a model arena.
///
/// - `u32` keeps handles small enough to copy everywhere
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        // index+1 must be nonzero
        Self(NonZeroU32::new(index + 1).expect("index+1 is nonzero"))
    }

    /// Id for the next slot of an arena currently holding `len` entries.
    ///
    /// # Panics
    ///
    /// Panics if the arena already holds `u32::MAX` entries.
    pub fn next(len: usize) -> Self {
        let index = u32::try_from(len)
            .ok()
            .filter(|&i| i < u32::MAX)
            .expect("arena holds fewer than u32::MAX entries");
        Self::from_index(index)
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Recover the 0-based index as a `usize` for slice access.
    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Domain-specific ID aliases for clarity (no runtime cost).
pub type BlockId = Id;
pub type FeedId = Id;
