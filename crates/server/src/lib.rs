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

mod http_server;

// pub mods are only ones used by main.rs and integration tests
pub mod config;
pub mod forwarder;
pub mod intake;
pub mod shutdown_handle;

use std::net::SocketAddr;
use std::sync::Arc;

use meterbridge_mqtt::{BrokerSubscriber, IntakeStatsTracker, SubscriberError};
use meterbridge_query::ApiState;
use meterbridge_store::StateStore;
use meterbridge_transform::{RouteError, Transformer};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::{Config, ConfigError};
use crate::forwarder::{EmoncmsClient, Forwarder, ForwarderError};
use crate::intake::Intake;
use crate::shutdown_handle::ShutdownHandle;

/// Run meterbridge in the background, returning a [`SpawnHandle`] once the broker subscription and
/// the query endpoint are up. When the handle is dropped, everything shuts down.
///
/// The handle's task also ends on its own if the subscription does (the broker refusing our
/// credentials on reconnect), resolving to that error.
pub async fn spawn(config: Config) -> Result<SpawnHandle, SpawnError> {
    config.validate()?;
    let transformer = Transformer::new(&config.routes)?;
    let store = Arc::new(StateStore::new());
    let stats = Arc::new(IntakeStatsTracker::new());

    tracing::info!(
        broker = %format!("{}:{}", config.mqtt.host, config.mqtt.port),
        topics = ?config.mqtt.topics,
        routes = transformer.route_count(),
        "starting meterbridge"
    );

    // 1) Connect and subscribe. Failing here is fatal, there is nothing to serve without a broker.
    let subscriber = BrokerSubscriber::new(
        &config.mqtt.host,
        config.mqtt.port,
        &config.mqtt.client_id,
        Some(config.mqtt.client_options()?),
    )?
    .with_stats(stats.clone());
    let messages = subscriber.subscribe(config.mqtt.topics.clone()).await?;

    // 2) Start consuming
    let intake = intake::spawn(Intake::new(transformer, store.clone(), stats.clone()), messages);

    // 3) Start the query endpoint
    let http_server = http_server::spawn(
        config.listen_address,
        ApiState {
            source: store.clone(),
            stats,
            query_timeout: config.query_timeout,
        },
    )
    .await?;
    let api_address = http_server.local_addr();

    // 4) Optionally start the forwarder
    let forwarder = if config.forwarder.enabled {
        let client = EmoncmsClient::new(&config.forwarder)?;
        Some(forwarder::spawn(Forwarder::new(
            Box::new(client),
            store.clone(),
            config.forwarder.interval,
        )))
    } else {
        None
    };

    // 5) Wait for a shutdown signal or the end of the subscription, then shut down the above
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join_handle = tokio::spawn(async move {
        let (intake_shutdown_tx, mut intake_join) = intake.into_parts();
        let joined = tokio::select! {
            _ = shutdown_rx => {
                std::mem::drop(intake_shutdown_tx);
                (&mut intake_join).await
            }
            joined = &mut intake_join => joined,
        };
        let result = joined.unwrap_or_else(|e| Err(SubscriberError::TaskFailed(e.to_string())));

        if let Some(forwarder) = forwarder {
            forwarder.shutdown_and_wait().await;
        }
        http_server.shutdown_and_wait().await;
        result
    });

    Ok(SpawnHandle {
        api_address,
        shutdown_tx,
        join_handle,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    #[error("Invalid route: {0}")]
    Route(#[from] RouteError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error subscribing to broker: {0}")]
    Subscribe(#[from] SubscriberError),
    #[error("Error spawning query endpoint: {0}")]
    HttpServerSpawn(#[from] http_server::SpawnError),
    #[error("Error creating forwarder: {0}")]
    Forwarder(#[from] ForwarderError),
}

pub struct SpawnHandle {
    api_address: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<Result<(), SubscriberError>>,
}

impl SpawnHandle {
    /// Where the query endpoint ended up listening.
    pub fn api_address(&self) -> SocketAddr {
        self.api_address
    }
}

impl ShutdownHandle<Result<(), SubscriberError>> for SpawnHandle {
    fn into_parts(
        self,
    ) -> (
        oneshot::Sender<()>,
        JoinHandle<Result<(), SubscriberError>>,
    ) {
        (self.shutdown_tx, self.join_handle)
    }
}
