use super::*;

use clap::Parser;
use control_store::InMemoryControlStore;
use shared::domain::{ControlArn, ControlDetails, ControlRecord, ControlStatus};

const STANDARD: &str = "arn:std:1";
const CONTROL: &str = "arn:ctl:1";

#[derive(Parser, Debug)]
struct TestCli {
    #[command(subcommand)]
    command: Command,
}

async fn setup(status: ControlStatus) -> (ControlReconciler<InMemoryControlStore>, Storage) {
    let mut remote = ControlRecord {
        control_arn: ControlArn::from(CONTROL),
        status,
        disabled_reason: None,
        details: ControlDetails::default(),
    };
    remote.details.control_id = Some("IAM.1".into());
    let reconciler =
        ControlReconciler::new(InMemoryControlStore::new().with_control(STANDARD, remote));
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    (reconciler, storage)
}

fn parse(args: &[&str]) -> Command {
    let mut argv = vec!["hubctl"];
    argv.extend_from_slice(args);
    TestCli::try_parse_from(argv).expect("parse").command
}

fn apply_disabled() -> Command {
    parse(&[
        "apply",
        "--name",
        "iam-1",
        "--standard-arn",
        STANDARD,
        "--control-arn",
        CONTROL,
        "--enabled",
        "false",
        "--disabled-reason",
        "not applicable",
    ])
}

#[test]
fn enabled_defaults_to_true() {
    let Command::Apply(args) = parse(&[
        "apply",
        "--name",
        "x",
        "--standard-arn",
        STANDARD,
        "--control-arn",
        CONTROL,
    ]) else {
        panic!("expected apply");
    };
    assert!(args.enabled);
    assert_eq!(args.desired(), DesiredControlState::default());
}

#[tokio::test]
async fn apply_creates_then_reports_no_changes() {
    let (reconciler, storage) = setup(ControlStatus::Enabled).await;

    let out = execute(apply_disabled(), &reconciler, &storage)
        .await
        .expect("apply");
    assert!(out.starts_with("iam-1: create"), "unexpected output: {out}");
    assert!(out.contains("status: disabled"));
    assert!(out.contains("disabled_reason: not applicable"));

    let stored = storage.load("iam-1").await.expect("load");
    assert_eq!(stored.id().map(ControlArn::as_str), Some(CONTROL));

    let out = execute(apply_disabled(), &reconciler, &storage)
        .await
        .expect("second apply");
    assert!(out.starts_with("iam-1: no changes"), "unexpected output: {out}");
    assert_eq!(reconciler.store().updates().len(), 1);
}

#[tokio::test]
async fn plan_does_not_touch_remote_or_state() {
    let (reconciler, storage) = setup(ControlStatus::Enabled).await;
    let Command::Apply(args) = apply_disabled() else {
        panic!("expected apply");
    };

    let out = execute(Command::Plan(args), &reconciler, &storage)
        .await
        .expect("plan");
    assert_eq!(out, "iam-1: create\n");
    assert!(reconciler.store().updates().is_empty());
    assert!(!storage.load("iam-1").await.expect("load").is_tracked());
}

#[tokio::test]
async fn refresh_drops_instance_when_standard_is_gone() {
    let (reconciler, storage) = setup(ControlStatus::Enabled).await;
    execute(apply_disabled(), &reconciler, &storage)
        .await
        .expect("apply");

    reconciler.store().unsubscribe(STANDARD);
    let out = execute(
        parse(&["refresh", "--name", "iam-1"]),
        &reconciler,
        &storage,
    )
    .await
    .expect("refresh");

    assert!(out.contains("removed from state"), "unexpected output: {out}");
    assert!(!storage.load("iam-1").await.expect("load").is_tracked());
}

#[tokio::test]
async fn reset_enables_and_forgets_instance() {
    let (reconciler, storage) = setup(ControlStatus::Enabled).await;
    execute(apply_disabled(), &reconciler, &storage)
        .await
        .expect("apply");

    let out = execute(parse(&["reset", "--name", "iam-1"]), &reconciler, &storage)
        .await
        .expect("reset");

    assert!(out.contains("to enabled"));
    let last = reconciler.store().updates().pop().expect("reset update");
    assert_eq!(last.status, ControlStatus::Enabled);
    assert!(!storage.load("iam-1").await.expect("load").is_tracked());

    let err = execute(parse(&["reset", "--name", "iam-1"]), &reconciler, &storage)
        .await
        .expect_err("nothing to reset");
    assert!(err.to_string().contains("no standards control is tracked"));
}

#[tokio::test]
async fn import_stores_observed_attributes() {
    let (reconciler, storage) = setup(ControlStatus::Disabled).await;

    let out = execute(
        parse(&["import", "--name", "iam-1", format!("{STANDARD},{CONTROL}").as_str()]),
        &reconciler,
        &storage,
    )
    .await
    .expect("import");

    assert!(out.contains("control_id: IAM.1"), "unexpected output: {out}");
    assert!(reconciler.store().updates().is_empty());

    let shown = execute(parse(&["show"]), &reconciler, &storage)
        .await
        .expect("show");
    assert!(shown.starts_with("iam-1: arn:ctl:1 (standard arn:std:1)"));
}

#[tokio::test]
async fn import_of_unknown_control_stores_nothing() {
    let (reconciler, storage) = setup(ControlStatus::Enabled).await;

    let err = execute(
        parse(&["import", "--name", "other", "arn:std:1,arn:ctl:404"]),
        &reconciler,
        &storage,
    )
    .await
    .expect_err("should fail");

    assert!(err.to_string().contains("not found remotely"));
    assert!(storage.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn import_of_vanished_control_forgets_tracked_instance() {
    let (reconciler, storage) = setup(ControlStatus::Enabled).await;
    execute(apply_disabled(), &reconciler, &storage)
        .await
        .expect("apply");
    reconciler.store().unsubscribe(STANDARD);

    let err = execute(
        parse(&["import", "--name", "iam-1", format!("{STANDARD},{CONTROL}").as_str()]),
        &reconciler,
        &storage,
    )
    .await
    .expect_err("should fail");

    assert!(err.to_string().contains("not found remotely"));
    assert!(!storage.load("iam-1").await.expect("load").is_tracked());
}

#[test]
fn format_state_marks_untracked_and_unobserved() {
    assert_eq!(
        format_state("x", &ResourceState::default()),
        "x: not tracked\n"
    );
    let out = format_state(
        "x",
        &ResourceState::tracked(ControlIdentity::new(STANDARD, CONTROL)),
    );
    assert!(out.ends_with("  status: (not observed)\n"));
}
