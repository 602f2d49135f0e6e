use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{ControlArn, ControlRecord, StandardArn, StatusUpdate};

pub mod http;
pub mod memory;
pub mod wire;

pub use http::{HttpControlStore, HttpStoreOptions};
pub use memory::InMemoryControlStore;

/// Remote control plane holding the standards controls.
///
/// Controls are only addressable through the standard subscription they
/// belong to; `query_by_standard` may return any number of records and it is
/// up to the caller to decide what that count means.
#[async_trait]
pub trait RemoteControlStore: Send + Sync {
    async fn update_status(&self, update: &StatusUpdate) -> Result<ControlRecord>;
    async fn query_by_standard(
        &self,
        standard_arn: &StandardArn,
        control_arn: Option<&ControlArn>,
    ) -> Result<Vec<ControlRecord>>;
}

#[async_trait]
impl<S: RemoteControlStore + ?Sized> RemoteControlStore for Arc<S> {
    async fn update_status(&self, update: &StatusUpdate) -> Result<ControlRecord> {
        (**self).update_status(update).await
    }

    async fn query_by_standard(
        &self,
        standard_arn: &StandardArn,
        control_arn: Option<&ControlArn>,
    ) -> Result<Vec<ControlRecord>> {
        (**self).query_by_standard(standard_arn, control_arn).await
    }
}
