use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::domain::{
    ControlArn, ControlIdentity, ControlRecord, ControlStatus, StandardArn, StatusUpdate,
};

use crate::RemoteControlStore;

#[derive(Default)]
struct MemoryInner {
    standards: BTreeMap<StandardArn, Vec<ControlRecord>>,
    updates: Vec<StatusUpdate>,
    queries: usize,
    fail_updates: Option<String>,
    fail_queries: Option<String>,
}

/// Control store kept in process memory.
///
/// Records every update it receives, including rejected ones, so callers can
/// assert on the exact outgoing mutations.
#[derive(Default)]
pub struct InMemoryControlStore {
    inner: Mutex<MemoryInner>,
}

impl InMemoryControlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_control(self, standard_arn: &str, record: ControlRecord) -> Self {
        self.insert_control(standard_arn, record);
        self
    }

    /// Adds a control under a standard subscription. Inserting the same arn
    /// twice keeps both records.
    pub fn insert_control(&self, standard_arn: &str, record: ControlRecord) {
        self.lock()
            .standards
            .entry(StandardArn::from(standard_arn))
            .or_default()
            .push(record);
    }

    /// Drops a whole subscription together with its controls.
    pub fn unsubscribe(&self, standard_arn: &str) {
        self.lock().standards.remove(&StandardArn::from(standard_arn));
    }

    /// Changes a control without going through `update_status`.
    pub fn set_out_of_band(
        &self,
        identity: &ControlIdentity,
        status: ControlStatus,
        disabled_reason: Option<&str>,
    ) -> bool {
        let mut inner = self.lock();
        match find_record(&mut inner, identity) {
            Some(record) => {
                apply_status(record, status, disabled_reason.map(str::to_string));
                true
            }
            None => false,
        }
    }

    pub fn fail_updates_with(&self, message: impl Into<String>) {
        self.lock().fail_updates = Some(message.into());
    }

    pub fn fail_queries_with(&self, message: impl Into<String>) {
        self.lock().fail_queries = Some(message.into());
    }

    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.fail_updates = None;
        inner.fail_queries = None;
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.lock().updates.clone()
    }

    pub fn query_count(&self) -> usize {
        self.lock().queries
    }

    pub fn control(&self, identity: &ControlIdentity) -> Option<ControlRecord> {
        let mut inner = self.lock();
        find_record(&mut inner, identity).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn find_record<'a>(
    inner: &'a mut MemoryInner,
    identity: &ControlIdentity,
) -> Option<&'a mut ControlRecord> {
    inner
        .standards
        .get_mut(&identity.standard_arn)?
        .iter_mut()
        .find(|record| record.control_arn == identity.control_arn)
}

fn apply_status(record: &mut ControlRecord, status: ControlStatus, reason: Option<String>) {
    record.status = status;
    record.disabled_reason = match status {
        ControlStatus::Enabled => None,
        ControlStatus::Disabled => reason,
    };
    record.details.control_status_updated_at = Some(Utc::now());
}

#[async_trait]
impl RemoteControlStore for InMemoryControlStore {
    async fn update_status(&self, update: &StatusUpdate) -> Result<ControlRecord> {
        let mut inner = self.lock();
        inner.updates.push(update.clone());

        if let Some(message) = &inner.fail_updates {
            return Err(anyhow!(message.clone()));
        }

        let record = find_record(&mut inner, &update.identity)
            .ok_or_else(|| anyhow!("standards control {} not found", update.identity))?;
        apply_status(record, update.status, update.disabled_reason.clone());
        Ok(record.clone())
    }

    async fn query_by_standard(
        &self,
        standard_arn: &StandardArn,
        control_arn: Option<&ControlArn>,
    ) -> Result<Vec<ControlRecord>> {
        let mut inner = self.lock();
        inner.queries += 1;

        if let Some(message) = &inner.fail_queries {
            return Err(anyhow!(message.clone()));
        }

        Ok(inner
            .standards
            .get(standard_arn)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| control_arn.map_or(true, |arn| &record.control_arn == arn))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
