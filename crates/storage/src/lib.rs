use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::domain::{ControlIdentity, ObservedControlState, ResourceState};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Persisted state of the managed instances, keyed by instance name.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredInstance {
    pub name: String,
    pub state: ResourceState,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        // every in-memory connection is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;

        let storage = Self { pool };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS managed_controls (
                instance_name  TEXT PRIMARY KEY NOT NULL,
                standard_arn   TEXT NOT NULL,
                control_arn    TEXT NOT NULL,
                observed_json  TEXT,
                updated_at     TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create managed_controls table")?;
        Ok(())
    }

    /// Loads an instance; an unknown name is an untracked instance.
    pub async fn load(&self, name: &str) -> Result<ResourceState> {
        let row = sqlx::query(
            "SELECT instance_name, standard_arn, control_arn, observed_json, updated_at
             FROM managed_controls WHERE instance_name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(stored_instance(&row)?.state),
            None => Ok(ResourceState::default()),
        }
    }

    /// Writes an instance. Saving an untracked state forgets the instance.
    pub async fn save(&self, name: &str, state: &ResourceState) -> Result<()> {
        let Some(identity) = &state.identity else {
            self.clear(name).await?;
            return Ok(());
        };

        let observed_json = state
            .observed
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("failed to encode observed control state")?;

        sqlx::query(
            "INSERT INTO managed_controls
                 (instance_name, standard_arn, control_arn, observed_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(instance_name) DO UPDATE SET
                 standard_arn = excluded.standard_arn,
                 control_arn = excluded.control_arn,
                 observed_json = excluded.observed_json,
                 updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(identity.standard_arn.as_str())
        .bind(identity.control_arn.as_str())
        .bind(observed_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(instance = name, control_arn = %identity.control_arn, "storage: saved instance");
        Ok(())
    }

    /// Returns whether a row was removed.
    pub async fn clear(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM managed_controls WHERE instance_name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<StoredInstance>> {
        let rows = sqlx::query(
            "SELECT instance_name, standard_arn, control_arn, observed_json, updated_at
             FROM managed_controls ORDER BY instance_name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(stored_instance).collect()
    }
}

fn stored_instance(row: &SqliteRow) -> Result<StoredInstance> {
    let name = row.get::<String, _>("instance_name");
    let observed = row
        .get::<Option<String>, _>("observed_json")
        .map(|raw| serde_json::from_str::<ObservedControlState>(&raw))
        .transpose()
        .with_context(|| format!("corrupt observed state for instance '{name}'"))?;

    Ok(StoredInstance {
        state: ResourceState {
            identity: Some(ControlIdentity::new(
                row.get::<String, _>("standard_arn"),
                row.get::<String, _>("control_arn"),
            )),
            observed,
        },
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        name,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
