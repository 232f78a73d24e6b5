//! Pass trait and types for compilation passes.

use alsvid_ir::Dag;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Analysis pass that reads but does not modify the IR.
    Analysis,
    /// Transformation pass that modifies the IR.
    Transformation,
}

/// A compilation pass that operates on the IR graph.
///
/// Passes are the fundamental unit of compilation. Each pass performs a
/// specific semantics-preserving rewrite or analysis, mutating the IR in
/// place through its rewrite primitives and leaving the wire invariant
/// intact.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given IR.
    fn run(&self, dag: &mut Dag, properties: &mut PropertySet) -> CompileResult<()>;

    /// Check if this pass should run based on current state.
    fn should_run(&self, _dag: &Dag, _properties: &PropertySet) -> bool {
        true
    }
}
