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

// src/lib.rs
// Broker subscriber for meterbridge: a single persistent MQTT
// connection handing out acknowledgeable deliveries through a
// bounded queue.

pub mod backoff;
pub mod client;
pub mod errors;
pub mod stats;

// Export some things for convenience.
pub use backoff::{BackoffConfig, ReconnectBackoff};
pub use client::{
    BrokerSubscriber, ClientCredentials, ClientOptions, ClientTlsConfig, ClientTlsIdentity,
    Delivery, MessageStream, TopicFilters,
};
pub use errors::SubscriberError;
pub use rumqttc::QoS;
pub use stats::{IntakeStats, IntakeStatsTracker};
