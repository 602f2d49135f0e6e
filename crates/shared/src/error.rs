use thiserror::Error;

use crate::domain::{ControlIdentity, ControlStatus};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("error setting standards control {identity} to {attempted}: {source}")]
    RemoteUpdateFailed {
        identity: ControlIdentity,
        attempted: ControlStatus,
        source: anyhow::Error,
    },
    #[error("error resetting standards control {identity} to enabled: {source}")]
    RemoteResetFailed {
        identity: ControlIdentity,
        source: anyhow::Error,
    },
    #[error("error reading standards control {identity}: {source}")]
    RemoteLookupFailed {
        identity: ControlIdentity,
        source: anyhow::Error,
    },
    #[error("standards control {identity} matched {matches} remote records, expected one")]
    RemoteLookupAmbiguous {
        identity: ControlIdentity,
        matches: usize,
    },
    #[error("invalid desired state: {reason}")]
    InvalidDesiredState { reason: String },
    #[error("no standards control is tracked by this instance")]
    NotTracked,
    #[error("invalid import id {id:?}: expected '<standard arn>,<control arn>' or a control arn")]
    InvalidImportId { id: String },
    #[error("instance already tracks {tracked}, refusing to adopt {requested}")]
    IdentityConflict {
        tracked: ControlIdentity,
        requested: ControlIdentity,
    },
}

impl ReconcileError {
    /// Remote failures may be retried by the orchestration layer; everything
    /// else needs a change in input first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUpdateFailed { .. }
                | Self::RemoteResetFailed { .. }
                | Self::RemoteLookupFailed { .. }
        )
    }

    pub fn identity(&self) -> Option<&ControlIdentity> {
        match self {
            Self::RemoteUpdateFailed { identity, .. }
            | Self::RemoteResetFailed { identity, .. }
            | Self::RemoteLookupFailed { identity, .. }
            | Self::RemoteLookupAmbiguous { identity, .. } => Some(identity),
            Self::IdentityConflict { requested, .. } => Some(requested),
            Self::InvalidDesiredState { .. } | Self::NotTracked | Self::InvalidImportId { .. } => {
                None
            }
        }
    }
}
