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

// src/client/mod.rs
// Client module exports.

mod core;
mod delivery;
mod options;
mod stream;
mod topic_filters;

pub use core::BrokerSubscriber;

pub use delivery::Delivery;
pub use options::{
    ClientCredentials, ClientOptions, ClientTlsConfig, ClientTlsIdentity,
    DEFAULT_CLIENT_QUEUE_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEP_ALIVE, DEFAULT_MAX_INFLIGHT,
    DEFAULT_REQUEST_CHANNEL_CAPACITY,
};
pub use stream::MessageStream;
pub use topic_filters::{TopicFilters, validate_topic_filter};
