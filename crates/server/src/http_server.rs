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

use std::net::SocketAddr;

use meterbridge_query::{ApiState, get_router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::shutdown_handle::ShutdownHandle;

/// Serve the query endpoint on `listen_address` until the returned handle is shut down. Requests
/// already in progress are allowed to finish.
pub async fn spawn(
    listen_address: SocketAddr,
    state: ApiState,
) -> Result<HttpServerHandle, SpawnError> {
    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(SpawnError::Listen)?;
    let local_addr = listener.local_addr().map_err(SpawnError::Listen)?;

    tracing::info!("query endpoint listening on {local_addr}");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let router = get_router(state);
    let join_handle = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.await.ok();
            })
            .await;
        if let Err(error) = result {
            tracing::error!(%error, "query endpoint failed");
        }
        tracing::info!("query endpoint shut down");
    });

    Ok(HttpServerHandle {
        local_addr,
        shutdown_tx,
        join_handle,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    #[error("error listening on query endpoint address: {0}")]
    Listen(std::io::Error),
}

pub struct HttpServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<()>,
}

impl HttpServerHandle {
    /// The bound address, which differs from the configured one when port 0 was asked for.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl ShutdownHandle<()> for HttpServerHandle {
    fn into_parts(self) -> (oneshot::Sender<()>, JoinHandle<()>) {
        (self.shutdown_tx, self.join_handle)
    }
}
