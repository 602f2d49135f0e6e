use super::*;

#[test]
fn update_request_omits_absent_reason() {
    let body = serde_json::to_value(UpdateStandardsControlRequest {
        control_status: ControlStatus::Enabled.into(),
        disabled_reason: None,
    })
    .expect("serialize");
    assert_eq!(body, serde_json::json!({ "ControlStatus": "ENABLED" }));

    let body = serde_json::to_value(UpdateStandardsControlRequest {
        control_status: ControlStatus::Disabled.into(),
        disabled_reason: Some("not applicable".into()),
    })
    .expect("serialize");
    assert_eq!(
        body,
        serde_json::json!({ "ControlStatus": "DISABLED", "DisabledReason": "not applicable" })
    );
}

#[test]
fn describe_response_maps_into_control_records() {
    let raw = r#"{
        "Controls": [{
            "StandardsControlArn": "arn:aws:securityhub:us-east-1:111122223333:control/cis-aws-foundations-benchmark/v/1.2.0/1.1",
            "ControlStatus": "DISABLED",
            "DisabledReason": "handled by SCP",
            "ControlStatusUpdatedAt": "2024-05-01T10:00:00Z",
            "ControlId": "CIS.1.1",
            "Title": "Avoid the use of the root account",
            "SeverityRating": "CRITICAL",
            "RelatedRequirements": ["CIS AWS Foundations 1.1"]
        }],
        "NextToken": "page-2"
    }"#;

    let response: DescribeStandardsControlsResponse = serde_json::from_str(raw).expect("decode");
    assert_eq!(response.next_token.as_deref(), Some("page-2"));

    let record = ControlRecord::from(response.controls[0].clone());
    assert_eq!(record.status, ControlStatus::Disabled);
    assert_eq!(record.disabled_reason.as_deref(), Some("handled by SCP"));
    assert_eq!(record.details.control_id.as_deref(), Some("CIS.1.1"));
    assert_eq!(record.details.severity_rating, Some(SeverityRating::Critical));
    assert_eq!(record.details.related_requirements.len(), 1);
    assert!(record.details.control_status_updated_at.is_some());
    assert_eq!(record.details.description, None);
}

#[test]
fn unknown_status_is_a_decode_error() {
    let raw = r#"{ "StandardsControlArn": "arn:ctl:1", "ControlStatus": "PAUSED" }"#;
    assert!(serde_json::from_str::<WireStandardsControl>(raw).is_err());
}
