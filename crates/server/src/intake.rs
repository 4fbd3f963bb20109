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

//! The intake loop: takes deliveries off the broker stream one at a time, turns them into records,
//! and stores them. Acknowledgement always comes last, so a message the process never finished with
//! stays with the broker and comes back after a restart.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use meterbridge_mqtt::{Delivery, IntakeStatsTracker, MessageStream, SubscriberError};
use meterbridge_store::{StateStore, UpsertOutcome};
use meterbridge_transform::{Transformer, ValidationError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::shutdown_handle::ShutdownHandle;

pub struct Intake {
    transformer: Transformer,
    store: Arc<StateStore>,
    stats: Arc<IntakeStatsTracker>,
}

/// What happened to a single delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    Stored(UpsertOutcome),
    Rejected(ValidationError),
}

impl Intake {
    pub fn new(
        transformer: Transformer,
        store: Arc<StateStore>,
        stats: Arc<IntakeStatsTracker>,
    ) -> Self {
        Self {
            transformer,
            store,
            stats,
        }
    }

    pub async fn process(&self, delivery: Delivery) -> IntakeOutcome {
        let message = delivery.message();
        let size = message.payload_size();

        let outcome = match self.transformer.transform(message) {
            Ok(record) => {
                let key = record.key.clone();
                let version = record.version;
                let upserted = self.store.upsert(record);
                match &upserted {
                    UpsertOutcome::Stale { current_version } => {
                        tracing::debug!(%key, version, current_version, "ignoring stale record");
                        self.stats.increment_stale();
                    }
                    _ => tracing::trace!(%key, version, "stored record"),
                }
                self.stats.decrement_pending_increment_accepted(size);
                IntakeOutcome::Stored(upserted)
            }
            Err(error) => {
                tracing::warn!(
                    topic = %message.topic,
                    duplicate = delivery.is_duplicate(),
                    %error,
                    "dropping message"
                );
                self.stats.decrement_pending_increment_rejected(size);
                if error.is_unrouted() {
                    self.stats.increment_unmatched_topics();
                }
                IntakeOutcome::Rejected(error)
            }
        };

        // Rejected messages are acked too: redelivering them would fail the same way.
        if let Err(error) = delivery.ack().await {
            tracing::error!(%error, "could not acknowledge message");
        }

        outcome
    }

    /// Process deliveries in order until the stream ends or shutdown is requested.
    pub async fn run<S>(&self, mut deliveries: S, mut shutdown_rx: oneshot::Receiver<()>)
    where
        S: Stream<Item = Delivery> + Unpin,
    {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::info!("intake shutting down");
                    break;
                }

                next = deliveries.next() => match next {
                    Some(delivery) => {
                        self.process(delivery).await;
                    }
                    None => {
                        tracing::info!("message stream ended");
                        break;
                    }
                }
            }
        }
    }
}

/// Run the intake loop over a live subscription in the background. The returned handle resolves
/// to how the subscription ended, which is an error if the broker refused us on reconnect.
pub fn spawn(intake: Intake, mut messages: MessageStream) -> IntakeHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join_handle = tokio::spawn(async move {
        intake.run(&mut messages, shutdown_rx).await;
        messages.shutdown_and_wait().await
    });

    IntakeHandle {
        shutdown_tx,
        join_handle,
    }
}

pub struct IntakeHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<Result<(), SubscriberError>>,
}

impl ShutdownHandle<Result<(), SubscriberError>> for IntakeHandle {
    fn into_parts(
        self,
    ) -> (
        oneshot::Sender<()>,
        JoinHandle<Result<(), SubscriberError>>,
    ) {
        (self.shutdown_tx, self.join_handle)
    }
}
