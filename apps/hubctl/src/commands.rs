use std::fmt::Write as _;

use anyhow::Result;
use clap::{ArgAction, Args, Subcommand};
use control_store::RemoteControlStore;
use reconciler::{plan, ControlReconciler, RefreshOutcome};
use shared::domain::{ControlIdentity, DesiredControlState, ResourceState};
use storage::Storage;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct DesiredArgs {
    /// Instance name the state is stored under.
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub standard_arn: String,
    #[arg(long)]
    pub control_arn: String,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub enabled: bool,
    #[arg(long)]
    pub disabled_reason: Option<String>,
}

impl DesiredArgs {
    fn identity(&self) -> ControlIdentity {
        ControlIdentity::new(&self.standard_arn, &self.control_arn)
    }

    fn desired(&self) -> DesiredControlState {
        DesiredControlState {
            enabled: self.enabled,
            disabled_reason: self.disabled_reason.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Converge the control onto the desired state.
    Apply(DesiredArgs),
    /// Refresh and show what `apply` would do, without changing anything.
    Plan(DesiredArgs),
    /// Re-read the control and store what was observed.
    Refresh {
        #[arg(long)]
        name: String,
    },
    /// Set the control back to enabled and stop tracking it.
    Reset {
        #[arg(long)]
        name: String,
    },
    /// Start tracking an existing control.
    Import {
        #[arg(long)]
        name: String,
        /// `<standard arn>,<control arn>` or a control arn.
        id: String,
    },
    /// Print stored state.
    Show {
        #[arg(long)]
        name: Option<String>,
    },
}

/// Runs one command and returns the report to print. State is written back
/// even when the reconciler fails after a confirmed remote change.
pub async fn execute<S: RemoteControlStore>(
    command: Command,
    reconciler: &ControlReconciler<S>,
    storage: &Storage,
) -> Result<String> {
    match command {
        Command::Apply(args) => {
            let mut state = storage.load(&args.name).await?;
            let result = reconciler
                .converge(&mut state, args.identity(), &args.desired())
                .await;
            storage.save(&args.name, &state).await?;
            let convergence = result?;
            info!(instance = %args.name, change = %convergence.change, "apply finished");

            let mut out = format!("{}: {}\n", args.name, convergence.change);
            match convergence.outcome {
                RefreshOutcome::Present(_) => out.push_str(&format_state(&args.name, &state)),
                RefreshOutcome::Gone => {
                    let _ = writeln!(out, "{}: control not found remotely", args.name);
                }
            }
            Ok(out)
        }
        Command::Plan(args) => {
            let mut state = storage.load(&args.name).await?;
            reconciler.refresh(&mut state).await?;
            let change = plan(&state, &args.identity(), &args.desired());
            Ok(format!("{}: {}\n", args.name, change))
        }
        Command::Refresh { name } => {
            let mut state = storage.load(&name).await?;
            let was_tracked = state.is_tracked();
            let result = reconciler.refresh(&mut state).await;
            storage.save(&name, &state).await?;
            match result? {
                RefreshOutcome::Present(_) => Ok(format_state(&name, &state)),
                RefreshOutcome::Gone if was_tracked => {
                    Ok(format!("{name}: control not found remotely, removed from state\n"))
                }
                RefreshOutcome::Gone => Ok(format!("{name}: not tracked\n")),
            }
        }
        Command::Reset { name } => {
            let mut state = storage.load(&name).await?;
            let identity = state.identity.clone();
            reconciler.reset(&mut state).await?;
            storage.save(&name, &state).await?;
            let identity = identity.map(|i| i.to_string()).unwrap_or_default();
            Ok(format!("{name}: reset {identity} to enabled\n"))
        }
        Command::Import { name, id } => {
            let mut state = storage.load(&name).await?;
            let outcome = reconciler.import(&mut state, &id).await?;
            storage.save(&name, &state).await?;
            match outcome {
                RefreshOutcome::Present(_) => Ok(format_state(&name, &state)),
                RefreshOutcome::Gone => {
                    anyhow::bail!("cannot import {id}: control not found remotely")
                }
            }
        }
        Command::Show { name: Some(name) } => {
            let state = storage.load(&name).await?;
            if state.is_tracked() {
                Ok(format_state(&name, &state))
            } else {
                Ok(format!("{name}: not tracked\n"))
            }
        }
        Command::Show { name: None } => {
            let mut out = String::new();
            for instance in storage.list().await? {
                out.push_str(&format_state(&instance.name, &instance.state));
            }
            Ok(out)
        }
    }
}

pub fn format_state(name: &str, state: &ResourceState) -> String {
    let mut out = String::new();
    let Some(identity) = &state.identity else {
        let _ = writeln!(out, "{name}: not tracked");
        return out;
    };

    let _ = writeln!(out, "{name}: {identity}");
    let Some(observed) = &state.observed else {
        let _ = writeln!(out, "  status: (not observed)");
        return out;
    };

    let _ = writeln!(out, "  status: {}", observed.status);
    if let Some(reason) = &observed.disabled_reason {
        let _ = writeln!(out, "  disabled_reason: {reason}");
    }
    let details = &observed.details;
    if let Some(control_id) = &details.control_id {
        let _ = writeln!(out, "  control_id: {control_id}");
    }
    if let Some(title) = &details.title {
        let _ = writeln!(out, "  title: {title}");
    }
    if let Some(severity) = &details.severity_rating {
        let _ = writeln!(out, "  severity: {severity:?}");
    }
    if let Some(url) = &details.remediation_url {
        let _ = writeln!(out, "  remediation_url: {url}");
    }
    if !details.related_requirements.is_empty() {
        let _ = writeln!(
            out,
            "  related_requirements: {}",
            details.related_requirements.join(", ")
        );
    }
    if let Some(updated_at) = &details.control_status_updated_at {
        let _ = writeln!(out, "  status_updated_at: {}", updated_at.to_rfc3339());
    }
    out
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
