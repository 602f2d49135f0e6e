use std::fmt;

use shared::domain::{
    ControlIdentity, ControlStatus, DesiredControlState, ObservedControlState, ResourceState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// Tracked, but nothing has been observed yet (fresh import seed).
    Unobserved,
    Status {
        expected: ControlStatus,
        observed: ControlStatus,
    },
    DisabledReason {
        expected: Option<String>,
        observed: Option<String>,
    },
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unobserved => f.write_str("remote state not observed yet"),
            Self::Status { expected, observed } => {
                write!(f, "status: {observed} -> {expected}")
            }
            Self::DisabledReason { expected, observed } => write!(
                f,
                "disabled_reason: {:?} -> {:?}",
                observed.as_deref().unwrap_or(""),
                expected.as_deref().unwrap_or("")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedChange {
    NoOp,
    Create,
    Update {
        drift: Vec<Drift>,
    },
    /// The control identity cannot change in place.
    Replace {
        from: ControlIdentity,
        to: ControlIdentity,
    },
}

impl PlannedChange {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

impl fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => f.write_str("no changes"),
            Self::Create => f.write_str("create"),
            Self::Update { drift } => {
                f.write_str("update in place")?;
                for item in drift {
                    write!(f, "\n  ~ {item}")?;
                }
                Ok(())
            }
            Self::Replace { from, to } => {
                write!(f, "replace (forces new resource)\n  - {from}\n  + {to}")
            }
        }
    }
}

/// Decides what converging `state` onto the desired control would take.
///
/// Pure: looks only at what is already tracked and observed. Callers that want
/// drift from out-of-band changes must refresh `state` first.
pub fn plan(
    state: &ResourceState,
    identity: &ControlIdentity,
    desired: &DesiredControlState,
) -> PlannedChange {
    let Some(tracked) = &state.identity else {
        return PlannedChange::Create;
    };

    if tracked != identity {
        return PlannedChange::Replace {
            from: tracked.clone(),
            to: identity.clone(),
        };
    }

    let drift = detect_drift(state.observed.as_ref(), desired);
    if drift.is_empty() {
        PlannedChange::NoOp
    } else {
        PlannedChange::Update { drift }
    }
}

pub fn detect_drift(
    observed: Option<&ObservedControlState>,
    desired: &DesiredControlState,
) -> Vec<Drift> {
    let Some(observed) = observed else {
        return vec![Drift::Unobserved];
    };

    let expected = desired.target_status();
    if observed.status != expected {
        return vec![Drift::Status {
            expected,
            observed: observed.status,
        }];
    }

    if expected == ControlStatus::Disabled {
        let expected_reason = desired.effective_reason();
        let observed_reason = observed
            .disabled_reason
            .as_deref()
            .filter(|reason| !reason.trim().is_empty());
        if expected_reason != observed_reason {
            return vec![Drift::DisabledReason {
                expected: expected_reason.map(str::to_string),
                observed: observed_reason.map(str::to_string),
            }];
        }
    }

    Vec::new()
}

#[cfg(test)]
#[path = "tests/plan_tests.rs"]
mod tests;
