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

// src/client/delivery.rs
// A received message plus the means to acknowledge it.

use meterbridge_model::Message;
use rumqttc::{AsyncClient, Publish};

use crate::errors::SubscriberError;

// Delivery wraps a Message handed out by the subscriber. The broker
// keeps the message (and redelivers it after a reconnect) until
// ack() is called, so the consumer acks only once it has decided
// what to do with the message.
#[derive(Debug)]
pub struct Delivery {
    message: Message,
    ack: Option<AckHandle>,
}

#[derive(Debug)]
struct AckHandle {
    client: AsyncClient,
    publish: Publish,
}

impl Delivery {
    pub(crate) fn from_publish(client: AsyncClient, publish: Publish) -> Self {
        let message = Message::new(publish.topic.clone(), publish.payload.clone())
            .retained(publish.retain);
        Self {
            message,
            ack: Some(AckHandle { client, publish }),
        }
    }

    // unacked wraps a message that has nothing to acknowledge,
    // e.g. one built locally in tests.
    pub fn unacked(message: Message) -> Self {
        Self { message, ack: None }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn is_duplicate(&self) -> bool {
        self.ack.as_ref().is_some_and(|handle| handle.publish.dup)
    }

    // ack tells the broker we are done with this message. For QoS 0
    // deliveries there is nothing to send and this is a no-op.
    pub async fn ack(self) -> Result<(), SubscriberError> {
        if let Some(AckHandle { client, publish }) = self.ack {
            client.ack(&publish).await?;
        }
        Ok(())
    }
}
