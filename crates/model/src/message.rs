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

// src/message.rs
// The unit of delivery coming off the broker.

use bytes::Bytes;
use chrono::{DateTime, Utc};

// Message is an immutable (topic, payload, arrival time) triple.
// It is owned by the subscriber until it is handed to the
// transformer, and dropped once processing is done.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    // topic is the concrete topic the broker published on
    // (never a wildcard filter).
    pub topic: String,
    // payload is the raw bytes as published.
    pub payload: Bytes,
    // retained is true if the broker delivered this from its
    // retained store rather than as a live publish.
    pub retained: bool,
    // arrived_at is when the subscriber pulled the message
    // off the wire.
    pub arrived_at: DateTime<Utc>,
}

impl Message {
    // new creates a live (non-retained) message stamped with the
    // current time.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::with_arrival(topic, payload, Utc::now())
    }

    pub fn with_arrival(
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
        arrived_at: DateTime<Utc>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retained: false,
            arrived_at,
        }
    }

    pub fn retained(mut self, retained: bool) -> Self {
        self.retained = retained;
        self
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    // arrival_millis is the arrival time in milliseconds since the
    // Unix epoch, clamped at zero for clocks set before 1970.
    pub fn arrival_millis(&self) -> u64 {
        u64::try_from(self.arrived_at.timestamp_millis()).unwrap_or_default()
    }
}
