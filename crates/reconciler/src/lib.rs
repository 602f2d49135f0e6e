use control_store::RemoteControlStore;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{
        ControlIdentity, DesiredControlState, ObservedControlState, ResourceState, StatusUpdate,
    },
    error::ReconcileError,
};
use tracing::{debug, info, warn};

pub mod plan;

pub use plan::{detect_drift, plan, Drift, PlannedChange};

/// What to do with a `disabled_reason` supplied while `enabled` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonPolicy {
    /// Drop the stale reason and log a warning.
    #[default]
    Drop,
    /// Fail with `InvalidDesiredState` before any remote call.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerOptions {
    pub reason_policy: ReasonPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Present(ObservedControlState),
    /// The control no longer exists remotely and tracking was dropped.
    Gone,
}

impl RefreshOutcome {
    pub fn observed(&self) -> Option<&ObservedControlState> {
        match self {
            Self::Present(observed) => Some(observed),
            Self::Gone => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    pub change: PlannedChange,
    pub outcome: RefreshOutcome,
}

/// Keeps one standards control in line with its desired configuration.
///
/// Every operation issues at most one remote mutation and never retries;
/// `state` is only written once the remote side has confirmed the change.
pub struct ControlReconciler<S: RemoteControlStore> {
    store: S,
    options: ReconcilerOptions,
}

impl<S: RemoteControlStore> ControlReconciler<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, ReconcilerOptions::default())
    }

    pub fn with_options(store: S, options: ReconcilerOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates or updates the control, adopts its identity and reads it back.
    pub async fn apply(
        &self,
        state: &mut ResourceState,
        identity: ControlIdentity,
        desired: &DesiredControlState,
    ) -> Result<RefreshOutcome, ReconcileError> {
        if let Some(tracked) = &state.identity {
            if *tracked != identity {
                return Err(ReconcileError::IdentityConflict {
                    tracked: tracked.clone(),
                    requested: identity,
                });
            }
        }

        let update = self.status_update(identity, desired)?;
        info!(
            control_arn = %update.identity.control_arn,
            standard_arn = %update.identity.standard_arn,
            status = %update.status,
            "setting standards control status"
        );

        self.store
            .update_status(&update)
            .await
            .map_err(|source| ReconcileError::RemoteUpdateFailed {
                identity: update.identity.clone(),
                attempted: update.status,
                source,
            })?;

        state.identity = Some(update.identity);
        self.refresh(state).await
    }

    /// Re-reads the tracked control. Zero matches drops tracking.
    pub async fn refresh(&self, state: &mut ResourceState) -> Result<RefreshOutcome, ReconcileError> {
        let Some(identity) = state.identity.clone() else {
            return Ok(RefreshOutcome::Gone);
        };
        debug!(control_arn = %identity.control_arn, "reading standards control");

        let mut records = self
            .store
            .query_by_standard(&identity.standard_arn, Some(&identity.control_arn))
            .await
            .map_err(|source| ReconcileError::RemoteLookupFailed {
                identity: identity.clone(),
                source,
            })?;
        records.retain(|record| record.control_arn == identity.control_arn);

        match records.len() {
            0 => {
                warn!(
                    control_arn = %identity.control_arn,
                    "standards control not found, removing from state"
                );
                state.clear();
                Ok(RefreshOutcome::Gone)
            }
            1 => {
                let observed = ObservedControlState::from(records.remove(0));
                state.observed = Some(observed.clone());
                Ok(RefreshOutcome::Present(observed))
            }
            matches => Err(ReconcileError::RemoteLookupAmbiguous { identity, matches }),
        }
    }

    /// Puts the control back to the enabled baseline and stops tracking it.
    ///
    /// Controls cannot be removed from a subscribed standard, so this is what
    /// destroying the managed instance means.
    pub async fn reset(&self, state: &mut ResourceState) -> Result<(), ReconcileError> {
        let identity = state.identity.clone().ok_or(ReconcileError::NotTracked)?;
        info!(control_arn = %identity.control_arn, "resetting standards control to enabled");

        let update = StatusUpdate::reset(identity);
        self.store
            .update_status(&update)
            .await
            .map_err(|source| ReconcileError::RemoteResetFailed {
                identity: update.identity.clone(),
                source,
            })?;

        state.clear();
        Ok(())
    }

    /// Seeds tracking from an external identifier and reads the control.
    ///
    /// `state` is only replaced once the read succeeds.
    pub async fn import(
        &self,
        state: &mut ResourceState,
        id: &str,
    ) -> Result<RefreshOutcome, ReconcileError> {
        let identity = ControlIdentity::from_import_id(id)?;
        if let Some(tracked) = &state.identity {
            if *tracked != identity {
                return Err(ReconcileError::IdentityConflict {
                    tracked: tracked.clone(),
                    requested: identity,
                });
            }
        }

        info!(control_arn = %identity.control_arn, "importing standards control");
        let mut candidate = ResourceState::tracked(identity);
        let outcome = self.refresh(&mut candidate).await?;
        *state = candidate;
        Ok(outcome)
    }

    /// Refreshes, plans and then carries out the plan.
    pub async fn converge(
        &self,
        state: &mut ResourceState,
        identity: ControlIdentity,
        desired: &DesiredControlState,
    ) -> Result<Convergence, ReconcileError> {
        let current = self.refresh(state).await?;
        let change = plan(state, &identity, desired);

        let outcome = match &change {
            PlannedChange::NoOp => current,
            PlannedChange::Create | PlannedChange::Update { .. } => {
                self.apply(state, identity, desired).await?
            }
            PlannedChange::Replace { .. } => {
                self.reset(state).await?;
                self.apply(state, identity, desired).await?
            }
        };

        Ok(Convergence { change, outcome })
    }

    fn status_update(
        &self,
        identity: ControlIdentity,
        desired: &DesiredControlState,
    ) -> Result<StatusUpdate, ReconcileError> {
        if desired.has_stale_reason() {
            match self.options.reason_policy {
                ReasonPolicy::Reject => {
                    return Err(ReconcileError::InvalidDesiredState {
                        reason: format!(
                            "disabled_reason is only allowed when enabled is false (control {})",
                            identity.control_arn
                        ),
                    });
                }
                ReasonPolicy::Drop => {
                    warn!(
                        control_arn = %identity.control_arn,
                        "ignoring disabled_reason for a control that is being enabled"
                    );
                }
            }
        }

        Ok(StatusUpdate {
            status: desired.target_status(),
            disabled_reason: desired.effective_reason().map(str::to_string),
            identity,
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
