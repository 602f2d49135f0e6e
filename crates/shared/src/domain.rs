use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

macro_rules! arn_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

arn_newtype!(StandardArn);
arn_newtype!(ControlArn);

/// The pair that addresses one control. The remote store indexes controls by
/// their standard subscription, so the control ARN alone cannot be queried.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlIdentity {
    pub standard_arn: StandardArn,
    pub control_arn: ControlArn,
}

impl ControlIdentity {
    pub fn new(standard_arn: impl Into<String>, control_arn: impl Into<String>) -> Self {
        Self {
            standard_arn: StandardArn::new(standard_arn),
            control_arn: ControlArn::new(control_arn),
        }
    }

    /// Parses an import identifier.
    ///
    /// Accepts either `<standard arn>,<control arn>` or a bare Security Hub
    /// control ARN, in which case the subscription ARN is derived from the
    /// control's standard path.
    pub fn from_import_id(id: &str) -> Result<Self, ReconcileError> {
        let id = id.trim();
        let invalid = || ReconcileError::InvalidImportId { id: id.to_string() };

        if let Some((standard, control)) = id.split_once(',') {
            let (standard, control) = (standard.trim(), control.trim());
            if standard.is_empty() || control.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::new(standard, control));
        }

        let standard = subscription_arn_for_control(id).ok_or_else(invalid)?;
        Ok(Self::new(standard, id))
    }
}

impl fmt::Display for ControlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (standard {})", self.control_arn, self.standard_arn)
    }
}

// arn:<partition>:securityhub:<region>:<account>:control/<standard path>/<control id>
fn subscription_arn_for_control(control_arn: &str) -> Option<String> {
    let parts: Vec<&str> = control_arn.splitn(6, ':').collect();
    let [prefix, partition, service, region, account, resource] = parts.as_slice() else {
        return None;
    };
    if *prefix != "arn" || *service != "securityhub" || partition.is_empty() {
        return None;
    }
    let path = resource.strip_prefix("control/")?;
    let (standard_path, control_id) = path.rsplit_once('/')?;
    if standard_path.is_empty() || control_id.is_empty() {
        return None;
    }
    Some(format!(
        "arn:{partition}:securityhub:{region}:{account}:subscription/{standard_path}"
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Enabled,
    Disabled,
}

impl ControlStatus {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredControlState {
    pub enabled: bool,
    pub disabled_reason: Option<String>,
}

impl Default for DesiredControlState {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_reason: None,
        }
    }
}

impl DesiredControlState {
    pub fn enabled() -> Self {
        Self::default()
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            enabled: false,
            disabled_reason: Some(reason.into()),
        }
    }

    pub fn target_status(&self) -> ControlStatus {
        ControlStatus::from_enabled(self.enabled)
    }

    /// The reason that may be sent upstream: only while disabling, and never blank.
    pub fn effective_reason(&self) -> Option<&str> {
        if self.enabled {
            return None;
        }
        non_blank(self.disabled_reason.as_deref())
    }

    /// True when a reason is present that would be stale because the control is enabled.
    pub fn has_stale_reason(&self) -> bool {
        self.enabled && non_blank(self.disabled_reason.as_deref()).is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityRating {
    Low,
    Medium,
    High,
    Critical,
}

/// Read-only descriptive attributes reported by the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlDetails {
    pub control_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity_rating: Option<SeverityRating>,
    pub remediation_url: Option<String>,
    #[serde(default)]
    pub related_requirements: Vec<String>,
    pub control_status_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRecord {
    pub control_arn: ControlArn,
    pub status: ControlStatus,
    pub disabled_reason: Option<String>,
    #[serde(default)]
    pub details: ControlDetails,
}

/// One outgoing mutation against the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub identity: ControlIdentity,
    pub status: ControlStatus,
    pub disabled_reason: Option<String>,
}

impl StatusUpdate {
    pub fn reset(identity: ControlIdentity) -> Self {
        Self {
            identity,
            status: ControlStatus::Enabled,
            disabled_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedControlState {
    pub status: ControlStatus,
    pub disabled_reason: Option<String>,
    #[serde(default)]
    pub details: ControlDetails,
}

impl ObservedControlState {
    pub fn enabled(&self) -> bool {
        self.status.is_enabled()
    }
}

impl From<ControlRecord> for ObservedControlState {
    fn from(record: ControlRecord) -> Self {
        let disabled_reason = match record.status {
            ControlStatus::Enabled => None,
            ControlStatus::Disabled => record.disabled_reason,
        };
        Self {
            status: record.status,
            disabled_reason,
            details: record.details,
        }
    }
}

/// Engine-visible state of one managed instance. No identity means untracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub identity: Option<ControlIdentity>,
    pub observed: Option<ObservedControlState>,
}

impl ResourceState {
    pub fn tracked(identity: ControlIdentity) -> Self {
        Self {
            identity: Some(identity),
            observed: None,
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.identity.is_some()
    }

    /// The persisted identity key.
    pub fn id(&self) -> Option<&ControlArn> {
        self.identity.as_ref().map(|identity| &identity.control_arn)
    }

    pub fn clear(&mut self) {
        self.identity = None;
        self.observed = None;
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
