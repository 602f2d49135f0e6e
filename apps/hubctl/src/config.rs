use std::{fs, io, path::Path};

use anyhow::{bail, Context, Result};
use reconciler::ReasonPolicy;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub state_database_url: String,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    pub reason_policy: ReasonPolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "https://securityhub.us-east-1.amazonaws.com".into(),
            state_database_url: "sqlite://./.hubctl/state.db".into(),
            request_timeout_secs: 30,
            page_size: 100,
            reason_policy: ReasonPolicy::Drop,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    endpoint: Option<String>,
    state_database_url: Option<String>,
    request_timeout_secs: Option<u64>,
    page_size: Option<u32>,
    reason_policy: Option<ReasonPolicy>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file (if present), then the environment.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> Result<()> {
    let file: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file.endpoint {
        settings.endpoint = v;
    }
    if let Some(v) = file.state_database_url {
        settings.state_database_url = v;
    }
    if let Some(v) = file.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file.reason_policy {
        settings.reason_policy = v;
    }
    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = var("HUBCTL_ENDPOINT") {
        settings.endpoint = v;
    }
    if let Some(v) = var("APP__ENDPOINT") {
        settings.endpoint = v;
    }

    if let Some(v) = var("HUBCTL_STATE_DB") {
        settings.state_database_url = v;
    }
    if let Some(v) = var("APP__STATE_DATABASE_URL") {
        settings.state_database_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v
            .parse()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS is not a number: '{v}'"))?;
    }
    if let Some(v) = var("APP__PAGE_SIZE") {
        settings.page_size = v
            .parse()
            .with_context(|| format!("APP__PAGE_SIZE is not a number: '{v}'"))?;
    }

    if let Some(v) = var("APP__REASON_POLICY") {
        settings.reason_policy = match v.trim().to_ascii_lowercase().as_str() {
            "drop" => ReasonPolicy::Drop,
            "reject" => ReasonPolicy::Reject,
            other => bail!("APP__REASON_POLICY must be 'drop' or 'reject', got '{other}'"),
        };
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    Ok(())
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().state_database_url;
    }

    if raw_database_url.starts_with("sqlite:") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
