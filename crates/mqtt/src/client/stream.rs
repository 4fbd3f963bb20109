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

// src/client/stream.rs
// The consumer side of a subscription.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::client::delivery::Delivery;
use crate::errors::SubscriberError;
use crate::stats::IntakeStatsTracker;

/// Deliveries from a live subscription, in arrival order.
///
/// The stream ends when the event loop stops, either because
/// [`shutdown_and_wait`](Self::shutdown_and_wait) was called or because the
/// broker refused our credentials on reconnect. In the latter case
/// `shutdown_and_wait` returns the error. Dropping the stream also stops the
/// event loop.
#[derive(Debug)]
pub struct MessageStream {
    deliveries: mpsc::Receiver<Delivery>,
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<Result<(), SubscriberError>>,
    stats: Arc<IntakeStatsTracker>,
}

impl MessageStream {
    pub(crate) fn new(
        deliveries: mpsc::Receiver<Delivery>,
        shutdown_tx: oneshot::Sender<()>,
        join_handle: JoinHandle<Result<(), SubscriberError>>,
        stats: Arc<IntakeStatsTracker>,
    ) -> Self {
        Self {
            deliveries,
            shutdown_tx,
            join_handle,
            stats,
        }
    }

    // next_delivery waits for the next delivery, returning None once
    // the event loop has stopped.
    pub async fn next_delivery(&mut self) -> Option<Delivery> {
        self.deliveries.recv().await
    }

    // shutdown_and_wait stops the event loop (disconnecting from the
    // broker if we are still connected) and returns how it ended.
    // Anything still queued is dropped unacknowledged, so the broker
    // will redeliver it, and no longer counts as pending.
    pub async fn shutdown_and_wait(self) -> Result<(), SubscriberError> {
        let Self {
            mut deliveries,
            shutdown_tx,
            join_handle,
            stats,
        } = self;
        std::mem::drop(shutdown_tx);
        deliveries.close();
        let result = join_handle
            .await
            .map_err(|e| SubscriberError::TaskFailed(e.to_string()));
        while let Ok(delivery) = deliveries.try_recv() {
            stats.decrement_pending(delivery.message().payload_size());
        }
        result?
    }
}

impl Stream for MessageStream {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.deliveries.poll_recv(cx)
    }
}
