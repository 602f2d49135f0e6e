//! JSON shapes spoken by the Security Hub style control plane.
//!
//! The upper-case status and severity strings never leave this module; the
//! rest of the workspace only sees the closed enums from `shared::domain`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{ControlArn, ControlDetails, ControlRecord, ControlStatus, SeverityRating};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireControlStatus {
    Enabled,
    Disabled,
}

impl From<ControlStatus> for WireControlStatus {
    fn from(value: ControlStatus) -> Self {
        match value {
            ControlStatus::Enabled => Self::Enabled,
            ControlStatus::Disabled => Self::Disabled,
        }
    }
}

impl From<WireControlStatus> for ControlStatus {
    fn from(value: WireControlStatus) -> Self {
        match value {
            WireControlStatus::Enabled => Self::Enabled,
            WireControlStatus::Disabled => Self::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireSeverityRating {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityRating> for WireSeverityRating {
    fn from(value: SeverityRating) -> Self {
        match value {
            SeverityRating::Low => Self::Low,
            SeverityRating::Medium => Self::Medium,
            SeverityRating::High => Self::High,
            SeverityRating::Critical => Self::Critical,
        }
    }
}

impl From<WireSeverityRating> for SeverityRating {
    fn from(value: WireSeverityRating) -> Self {
        match value {
            WireSeverityRating::Low => Self::Low,
            WireSeverityRating::Medium => Self::Medium,
            WireSeverityRating::High => Self::High,
            WireSeverityRating::Critical => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateStandardsControlRequest {
    pub control_status: WireControlStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireStandardsControl {
    pub standards_control_arn: String,
    pub control_status: WireControlStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_status_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_rating: Option<WireSeverityRating>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_requirements: Vec<String>,
}

impl From<WireStandardsControl> for ControlRecord {
    fn from(value: WireStandardsControl) -> Self {
        Self {
            control_arn: ControlArn::new(value.standards_control_arn),
            status: value.control_status.into(),
            disabled_reason: value.disabled_reason,
            details: ControlDetails {
                control_id: value.control_id,
                title: value.title,
                description: value.description,
                severity_rating: value.severity_rating.map(Into::into),
                remediation_url: value.remediation_url,
                related_requirements: value.related_requirements,
                control_status_updated_at: value.control_status_updated_at,
            },
        }
    }
}

impl From<&ControlRecord> for WireStandardsControl {
    fn from(value: &ControlRecord) -> Self {
        Self {
            standards_control_arn: value.control_arn.0.clone(),
            control_status: value.status.into(),
            disabled_reason: value.disabled_reason.clone(),
            control_status_updated_at: value.details.control_status_updated_at,
            control_id: value.details.control_id.clone(),
            title: value.details.title.clone(),
            description: value.details.description.clone(),
            remediation_url: value.details.remediation_url.clone(),
            severity_rating: value.details.severity_rating.map(Into::into),
            related_requirements: value.details.related_requirements.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeStandardsControlsResponse {
    #[serde(default)]
    pub controls: Vec<WireStandardsControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[cfg(test)]
#[path = "tests/wire_tests.rs"]
mod tests;
