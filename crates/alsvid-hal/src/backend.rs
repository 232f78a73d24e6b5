//! Backend trait and run configuration.
//!
//! The [`Backend`] trait is the narrow contract every adapter implements:
//!
//! ```text
//!   assemble(&mut dag) ──→ execute(&dag, &config) ──→ ExecutionResult
//!      (in-place lowering)        (blocking)
//! ```
//!
//! `assemble` lowers any IR gate outside the backend's native set through
//! the DAG rewrite primitives (or rejects the circuit with a
//! [`Validation`](crate::HalError::Validation) error) before anything
//! expensive happens; `execute` runs an already-assembled IR and blocks
//! for the result. The core hands an IR to exactly one backend call at a
//! time, so no interior synchronization is required beyond `Send + Sync`.

use serde::{Deserialize, Serialize};

use alsvid_ir::Dag;

use crate::error::HalResult;
use crate::result::ExecutionResult;

/// Execution configuration handed to a backend.
///
/// A plain attribute bag: shots and measured qubits are first-class, and
/// backend-specific extras (platform name, device address, task metadata)
/// ride along as loose JSON values with no shared schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of measurement shots.
    pub shots: u32,
    /// Qubits to read out, in readout order. `None` measures all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure_qubits: Option<Vec<u32>>,
    /// Backend-specific extras.
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl RunConfig {
    /// Create a configuration with the default shot count.
    pub fn new() -> Self {
        Self {
            shots: 1024,
            measure_qubits: None,
            extras: serde_json::Map::new(),
        }
    }

    /// Set the number of shots.
    #[must_use]
    pub fn configure_shots(mut self, shots: u32) -> Self {
        self.shots = shots;
        self
    }

    /// Set the qubits to read out.
    #[must_use]
    pub fn configure_measure_qubits(mut self, qubits: impl IntoIterator<Item = u32>) -> Self {
        self.measure_qubits = Some(qubits.into_iter().collect());
        self
    }

    /// Add a backend-specific extra.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for quantum backends.
///
/// # Contract
///
/// - `assemble` MUST validate gate support and mutate the IR into the
///   backend's native set before `execute` is called; all user-visible
///   rejections happen here, never mid-execution.
/// - `execute` receives an already-assembled IR and blocks until the
///   result is available.
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Lower the IR to this backend's native gate set, in place.
    fn assemble(&self, dag: &mut Dag) -> HalResult<()>;

    /// Run an assembled IR and return its results.
    fn execute(&self, dag: &Dag, config: &RunConfig) -> HalResult<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_builders() {
        let config = RunConfig::new()
            .configure_shots(2048)
            .configure_measure_qubits([0, 2])
            .with_extra("platform", serde_json::json!("local"));

        assert_eq!(config.shots, 2048);
        assert_eq!(config.measure_qubits, Some(vec![0, 2]));
        assert_eq!(config.extras["platform"], "local");
    }

    #[test]
    fn test_run_config_default_measures_all() {
        let config = RunConfig::default();
        assert_eq!(config.shots, 1024);
        assert!(config.measure_qubits.is_none());
    }
}
