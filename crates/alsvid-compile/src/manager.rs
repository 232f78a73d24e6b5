//! Pass manager for orchestrating optimization.

use tracing::{debug, info, instrument};

use alsvid_ir::Dag;

use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{BasisStatePropagation, GateCancellation, PureStateSimplification};
use crate::property::PropertySet;

/// Integer optimization level selecting which passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct OptimizationLevel(pub u8);

impl OptimizationLevel {
    /// No optimization.
    pub const NONE: Self = Self(0);
    /// Redundant-gate cancellation only.
    pub const LIGHT: Self = Self(1);
    /// Cancellation plus constant-basis-state propagation.
    pub const MODERATE: Self = Self(2);
    /// All passes, including pure-state simplification.
    pub const HEAVY: Self = Self(3);
}

impl From<u8> for OptimizationLevel {
    fn from(level: u8) -> Self {
        Self(level.min(3))
    }
}

/// Manages and executes a sequence of passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Create the fixed pipeline for an optimization level.
    ///
    /// | Level | Passes |
    /// |-------|--------|
    /// | 0 | none |
    /// | 1 | gate cancellation |
    /// | 2 | + constant-basis-state propagation |
    /// | 3 | + pure-state simplification |
    pub fn for_level(level: OptimizationLevel) -> Self {
        let mut pm = Self::new();
        if level >= OptimizationLevel::LIGHT {
            pm.add_pass(GateCancellation::new());
        }
        if level >= OptimizationLevel::MODERATE {
            pm.add_pass(BasisStatePropagation::new());
        }
        if level >= OptimizationLevel::HEAVY {
            pm.add_pass(PureStateSimplification::new());
        }
        pm
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given IR.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut Dag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            dag.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(dag, properties)?;
                debug!("Pass {} completed, ops: {}", pass.name(), dag.num_ops());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, final depth: {}, ops: {}",
            dag.depth(),
            dag.num_ops()
        );

        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_level_table() {
        assert!(PassManager::for_level(OptimizationLevel::NONE).is_empty());
        assert_eq!(PassManager::for_level(OptimizationLevel::LIGHT).len(), 1);
        assert_eq!(PassManager::for_level(OptimizationLevel::MODERATE).len(), 2);
        assert_eq!(PassManager::for_level(OptimizationLevel::HEAVY).len(), 3);
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(OptimizationLevel::from(9), OptimizationLevel::HEAVY);
    }

    #[test]
    fn test_run_on_empty_dag() {
        let pm = PassManager::for_level(OptimizationLevel::HEAVY);
        let mut dag = Dag::new();
        dag.add_qubit_register("q", 2);
        let mut props = PropertySet::new();
        pm.run(&mut dag, &mut props).unwrap();
        assert_eq!(dag.num_ops(), 0);
    }
}
