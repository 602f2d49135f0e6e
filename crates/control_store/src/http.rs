use std::{collections::HashSet, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::domain::{ControlArn, ControlRecord, StandardArn, StatusUpdate};
use tracing::debug;
use url::Url;

use crate::{
    wire::{DescribeStandardsControlsResponse, UpdateStandardsControlRequest},
    RemoteControlStore,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpStoreOptions {
    pub timeout: Duration,
    pub page_size: u32,
}

impl Default for HttpStoreOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// REST adapter for the control plane.
///
/// Updates go to `PATCH /standards/control/{control arn}` and lookups page
/// through `GET /standards/controls/{subscription arn}`.
pub struct HttpControlStore {
    http: Client,
    endpoint: String,
    page_size: u32,
}

impl HttpControlStore {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_options(endpoint, HttpStoreOptions::default())
    }

    pub fn with_options(endpoint: &str, options: HttpStoreOptions) -> Result<Self> {
        let parsed = Url::parse(endpoint)
            .with_context(|| format!("invalid control store endpoint '{endpoint}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("control store endpoint must be http(s), got '{endpoint}'");
        }
        if options.page_size == 0 {
            bail!("control store page size must be positive");
        }

        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .context("failed to build control store http client")?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            page_size: options.page_size,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteControlStore for HttpControlStore {
    async fn update_status(&self, update: &StatusUpdate) -> Result<ControlRecord> {
        let control_arn = &update.identity.control_arn;
        debug!(
            control_arn = %control_arn,
            status = %update.status,
            "control store: updating control status"
        );

        self.http
            .patch(format!("{}/standards/control/{}", self.endpoint, control_arn))
            .json(&UpdateStandardsControlRequest {
                control_status: update.status.into(),
                disabled_reason: update.disabled_reason.clone(),
            })
            .send()
            .await
            .with_context(|| format!("update request for {control_arn} failed"))?
            .error_for_status()
            .with_context(|| format!("update of {control_arn} rejected"))?;

        Ok(ControlRecord {
            control_arn: control_arn.clone(),
            status: update.status,
            disabled_reason: update.disabled_reason.clone(),
            details: Default::default(),
        })
    }

    async fn query_by_standard(
        &self,
        standard_arn: &StandardArn,
        control_arn: Option<&ControlArn>,
    ) -> Result<Vec<ControlRecord>> {
        let url = format!("{}/standards/controls/{}", self.endpoint, standard_arn);
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut query = vec![("MaxResults", self.page_size.to_string())];
            if let Some(token) = &next_token {
                query.push(("NextToken", token.clone()));
            }

            let page: DescribeStandardsControlsResponse = self
                .http
                .get(&url)
                .query(&query)
                .send()
                .await
                .with_context(|| format!("describe request for {standard_arn} failed"))?
                .error_for_status()
                .with_context(|| format!("describe of {standard_arn} rejected"))?
                .json()
                .await
                .with_context(|| format!("invalid describe response for {standard_arn}"))?;

            debug!(
                standard_arn = %standard_arn,
                page_len = page.controls.len(),
                "control store: fetched controls page"
            );

            records.extend(
                page.controls
                    .into_iter()
                    .map(ControlRecord::from)
                    .filter(|record| control_arn.map_or(true, |arn| &record.control_arn == arn)),
            );

            match page.next_token.filter(|token| !token.is_empty()) {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(anyhow!(
                        "control store repeated pagination token for {standard_arn}"
                    ));
                }
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
