//! Shared state passed between compilation stages.

use crate::layout::{CouplingMap, Layout};
use crate::routing::RoutingPlan;

/// Properties shared between compilation passes and target-aware stages.
///
/// The layout slot is filled by the direct-layout solver (or the trivial
/// fallback), the routing slot by the lookahead router; optimization
/// passes read but normally do not touch either.
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Qubit layout mapping (logical → physical).
    pub layout: Option<Layout>,

    /// Target coupling map defining allowed two-qubit interactions.
    pub coupling_map: Option<CouplingMap>,

    /// SWAP schedule produced by the router, when routing was needed.
    pub routing: Option<RoutingPlan>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a property set targeting a device coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMap) -> Self {
        self.coupling_map = Some(coupling_map);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }
}
