//! Backend registry mapping mode strings to backend factories.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{HalError, HalResult};

/// Factory function type for registered backends.
type BackendFactory = Box<dyn Fn() -> HalResult<Box<dyn Backend>> + Send + Sync>;

/// Central registry for quantum backends.
///
/// Callers select a backend by mode string; an unknown mode is a
/// configuration-time error, surfaced before any compilation or
/// execution work starts.
#[derive(Default)]
pub struct BackendRegistry {
    factories: FxHashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory under a mode name.
    pub fn register_factory(
        &mut self,
        mode: impl Into<String>,
        factory: impl Fn() -> HalResult<Box<dyn Backend>> + Send + Sync + 'static,
    ) {
        let mode = mode.into();
        debug!("Registering backend: {}", mode);
        self.factories.insert(mode, Box::new(factory));
    }

    /// Create the backend registered under a mode name.
    pub fn resolve(&self, mode: &str) -> HalResult<Box<dyn Backend>> {
        match self.factories.get(mode) {
            Some(factory) => factory(),
            None => Err(HalError::UnknownBackend(mode.to_string())),
        }
    }

    /// List all registered mode names.
    pub fn available_backends(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a mode name is registered.
    pub fn has_backend(&self, mode: &str) -> bool {
        self.factories.contains_key(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RunConfig;
    use crate::result::ExecutionResult;
    use alsvid_ir::Dag;

    struct NullBackend;

    impl Backend for NullBackend {
        fn name(&self) -> &'static str {
            "null"
        }

        fn assemble(&self, _dag: &mut Dag) -> HalResult<()> {
            Ok(())
        }

        fn execute(&self, _dag: &Dag, config: &RunConfig) -> HalResult<ExecutionResult> {
            Ok(ExecutionResult::from_counts(
                crate::result::Counts::new(),
                config.shots,
            ))
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = BackendRegistry::new();
        assert!(registry.available_backends().is_empty());
        assert!(!registry.has_backend("simulator"));
    }

    #[test]
    fn test_resolve_registered() {
        let mut registry = BackendRegistry::new();
        registry.register_factory("null", || Ok(Box::new(NullBackend)));

        let backend = registry.resolve("null").unwrap();
        assert_eq!(backend.name(), "null");
    }

    #[test]
    fn test_resolve_unknown_is_typed() {
        let registry = BackendRegistry::new();
        let err = match registry.resolve("nonexistent") {
            Ok(_) => panic!("expected resolve to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, HalError::UnknownBackend(_)));
    }

    #[test]
    fn test_available_backends_sorted() {
        let mut registry = BackendRegistry::new();
        registry.register_factory("zebra", || Ok(Box::new(NullBackend)));
        registry.register_factory("alpha", || Ok(Box::new(NullBackend)));

        assert_eq!(registry.available_backends(), vec!["alpha", "zebra"]);
    }
}
