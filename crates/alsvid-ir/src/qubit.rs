//! Wire identifiers.
//!
//! Qubits and classical bits are addressed by flat indices across the
//! whole circuit; registers are naming overlays resolved when they are
//! declared, so everything downstream of the builder works with plain
//! [`QubitId`]/[`ClbitId`] values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of one quantum wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The flat index as a usize, for amplitude and mask arithmetic.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for QubitId {
    fn from(index: u32) -> Self {
        QubitId(index)
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Index of one classical wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    /// The flat index as a usize.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for ClbitId {
    fn from(index: u32) -> Self {
        ClbitId(index)
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}
