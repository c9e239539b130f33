//! Per-deployment mutual exclusion.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use terraport_core::DeploymentId;

use crate::error::{ControlError, ControlResult};

/// Set of deployments with a run in flight.
#[derive(Debug, Default)]
pub struct DeploymentLocks {
    held: DashMap<DeploymentId, ()>,
}

impl DeploymentLocks {
    /// Create an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a deployment, failing immediately if it is already claimed.
    ///
    /// The claim is released when the returned guard is dropped.
    pub fn try_acquire(&self, id: &DeploymentId) -> ControlResult<DeploymentGuard<'_>> {
        match self.held.entry(id.clone()) {
            Entry::Occupied(_) => Err(ControlError::DeploymentInProgress(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(DeploymentGuard {
                    locks: self,
                    id: id.clone(),
                })
            }
        }
    }

    /// Returns true if a run is in flight for the deployment.
    #[must_use]
    pub fn is_held(&self, id: &DeploymentId) -> bool {
        self.held.contains_key(id)
    }
}

/// Claim on one deployment.
#[derive(Debug)]
pub struct DeploymentGuard<'a> {
    locks: &'a DeploymentLocks,
    id: DeploymentId,
}

impl Drop for DeploymentGuard<'_> {
    fn drop(&mut self) {
        self.locks.held.remove(&self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_conflicts_until_release() {
        let locks = DeploymentLocks::new();
        let id = DeploymentId::generate();

        let guard = locks.try_acquire(&id).unwrap();
        assert!(locks.is_held(&id));
        assert!(matches!(
            locks.try_acquire(&id),
            Err(ControlError::DeploymentInProgress(_))
        ));

        drop(guard);
        assert!(!locks.is_held(&id));
        assert!(locks.try_acquire(&id).is_ok());
    }

    #[test]
    fn distinct_deployments_do_not_conflict() {
        let locks = DeploymentLocks::new();
        let _a = locks.try_acquire(&DeploymentId::generate()).unwrap();
        let _b = locks.try_acquire(&DeploymentId::generate()).unwrap();
    }
}
