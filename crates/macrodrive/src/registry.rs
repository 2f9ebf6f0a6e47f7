//! Ordered teardown ledger for host-side handles.

use crate::error::{HostError, RegistryError, ReleaseFailure, TeardownError};

/// A zero-argument release operation, bound at registration time.
pub type ReleaseAction = Box<dyn FnOnce() -> Result<(), HostError> + Send>;

/// An ordered collection of release actions.
///
/// Registration order is acquisition order; disposal runs every action
/// exactly once in strict reverse order, so the host's reference graph is
/// torn down leaves-first (a sheet collection before its document, a
/// document before its container, the container before the host itself).
pub struct DisposalRegistry {
    actions: Vec<(String, ReleaseAction)>,
    disposed: bool,
}

impl DisposalRegistry {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            disposed: false,
        }
    }

    /// Number of release actions still registered.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether [`dispose_all`](Self::dispose_all) has already run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Append a release action. The label shows up in teardown diagnostics.
    pub fn register<F>(&mut self, label: impl Into<String>, action: F) -> Result<(), RegistryError>
    where
        F: FnOnce() -> Result<(), HostError> + Send + 'static,
    {
        if self.disposed {
            return Err(RegistryError::AlreadyDisposed);
        }
        self.actions.push((label.into(), Box::new(action)));
        Ok(())
    }

    /// Run every registered action in reverse registration order.
    ///
    /// Idempotent: the first call consumes the whole ledger, later calls do
    /// nothing. A failing action never stops the rest; failures are collected
    /// and reported together once the chain has run to the end.
    pub fn dispose_all(&mut self) -> Result<(), TeardownError> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;

        let mut failures = Vec::new();
        while let Some((label, action)) = self.actions.pop() {
            tracing::debug!(%label, "releasing");
            if let Err(error) = action() {
                tracing::warn!(%label, %error, "release action failed");
                failures.push(ReleaseFailure { label, error });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TeardownError { failures })
        }
    }
}

impl Default for DisposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn releases_in_reverse_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = DisposalRegistry::new();
        for name in ["host", "documents", "document", "sheets"] {
            let order = Arc::clone(&order);
            registry
                .register(name, move || {
                    order.lock().unwrap().push(name);
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(registry.len(), 4);

        registry.dispose_all().unwrap();
        assert_eq!(
            *order.lock().unwrap(),
            vec!["sheets", "document", "documents", "host"]
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn dispose_all_is_idempotent() {
        let runs = Arc::new(Mutex::new(0));
        let mut registry = DisposalRegistry::new();
        let counter = Arc::clone(&runs);
        registry
            .register("handle", move || {
                *counter.lock().unwrap() += 1;
                Ok(())
            })
            .unwrap();

        registry.dispose_all().unwrap();
        registry.dispose_all().unwrap();
        assert_eq!(*runs.lock().unwrap(), 1);
        assert!(registry.is_disposed());
    }

    #[test]
    fn register_after_dispose_is_rejected() {
        let mut registry = DisposalRegistry::new();
        registry.dispose_all().unwrap();

        let result = registry.register("late", || Ok(()));
        assert!(matches!(result, Err(RegistryError::AlreadyDisposed)));
    }

    #[test]
    fn failures_are_collected_not_propagated() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = DisposalRegistry::new();

        let tracker = Arc::clone(&order);
        registry
            .register("first", move || {
                tracker.lock().unwrap().push("first");
                Ok(())
            })
            .unwrap();
        registry
            .register("broken", || {
                Err(HostError::Rejected("handle went stale".to_string()))
            })
            .unwrap();
        let tracker = Arc::clone(&order);
        registry
            .register("last", move || {
                tracker.lock().unwrap().push("last");
                Ok(())
            })
            .unwrap();

        let err = registry.dispose_all().unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].label, "broken");

        // the failure did not stop the releases on either side of it
        assert_eq!(*order.lock().unwrap(), vec!["last", "first"]);
    }
}
