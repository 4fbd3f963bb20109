/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

//! Periodic forwarding of the latest values to an emoncms input API.
//!
//! Every interval the store is snapshotted, records are grouped by node, and each node's values are
//! posted as one `fulljson` object. Failures are logged and counted but never stop the forwarder.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meterbridge_model::DomainRecord;
use meterbridge_store::StateStore;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ForwarderConfig;
use crate::shutdown_handle::ShutdownHandle;

/// Latest values for one node, by record key.
pub type NodeValues = BTreeMap<String, serde_json::Value>;

#[async_trait]
pub trait InputPoster: std::fmt::Debug + Send + Sync + 'static {
    async fn post_node(&self, node: &str, values: &NodeValues) -> Result<(), ForwarderError>;
}

#[derive(Debug)]
pub struct EmoncmsClient {
    http_client: reqwest::Client,
    input_url: String,
    apikey: String,
}

impl EmoncmsClient {
    pub fn new(config: &ForwarderConfig) -> Result<Self, ForwarderError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            input_url: format!("{}/input/post", config.endpoint.trim_end_matches('/')),
            apikey: config.apikey.clone(),
        })
    }
}

#[async_trait]
impl InputPoster for EmoncmsClient {
    async fn post_node(&self, node: &str, values: &NodeValues) -> Result<(), ForwarderError> {
        let fulljson = serde_json::to_string(values)?;
        let response = self
            .http_client
            .post(&self.input_url)
            .form(&[
                ("node", node),
                ("apikey", self.apikey.as_str()),
                ("fulljson", fulljson.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ForwarderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // emoncms answers 200 with {"success": false, "message": ...} for a bad apikey.
        if let Ok(serde_json::Value::Object(reply)) = serde_json::from_str(&body)
            && reply.get("success") == Some(&serde_json::Value::Bool(false))
        {
            let message = reply
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no message")
                .to_string();
            return Err(ForwarderError::Rejected(message));
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ForwarderError {
    #[error("HTTP error posting inputs: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not serialize inputs: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("input API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("input API rejected the post: {0}")]
    Rejected(String),
}

/// Group records by node. Records without a node have nowhere to go and are left out.
pub fn group_by_node(records: Vec<DomainRecord>) -> BTreeMap<String, NodeValues> {
    let mut nodes: BTreeMap<String, NodeValues> = BTreeMap::new();
    for record in records {
        let Some(node) = record.node else {
            continue;
        };
        nodes
            .entry(node)
            .or_default()
            .insert(record.key, record.value.to_json());
    }
    nodes
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReport {
    pub posted: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct Forwarder {
    poster: Box<dyn InputPoster>,
    store: Arc<StateStore>,
    interval: Duration,
}

impl Forwarder {
    pub fn new(poster: Box<dyn InputPoster>, store: Arc<StateStore>, interval: Duration) -> Self {
        Self {
            poster,
            store,
            interval,
        }
    }

    /// Post the current snapshot once, one request per node.
    pub async fn forward_once(&self) -> ForwardReport {
        let mut report = ForwardReport::default();
        for (node, values) in group_by_node(self.store.snapshot()) {
            match self.poster.post_node(&node, &values).await {
                Ok(()) => {
                    tracing::debug!(%node, inputs = values.len(), "posted inputs");
                    report.posted += 1;
                }
                Err(error) => {
                    tracing::warn!(%node, %error, "could not post inputs");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

pub fn spawn(forwarder: Forwarder) -> ForwarderHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let join_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(forwarder.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut total_failed = 0usize;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::info!(total_failed, "forwarder shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    let report = forwarder.forward_once().await;
                    total_failed += report.failed;
                    if report.failed > 0 {
                        tracing::warn!(
                            failed = report.failed,
                            total_failed,
                            "some nodes could not be forwarded"
                        );
                    }
                }
            }
        }
    });

    ForwarderHandle {
        shutdown_tx,
        join_handle,
    }
}

pub struct ForwarderHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<()>,
}

impl ShutdownHandle<()> for ForwarderHandle {
    fn into_parts(self) -> (oneshot::Sender<()>, JoinHandle<()>) {
        (self.shutdown_tx, self.join_handle)
    }
}
