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

// src/client/options.rs
// Configuration options for the broker subscriber.

use std::time::Duration;

use rumqttc::QoS;

use crate::backoff::BackoffConfig;

pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_CHANNEL_CAPACITY: usize = 10;
pub const DEFAULT_CLIENT_QUEUE_SIZE: usize = 1024;
pub const DEFAULT_MAX_INFLIGHT: u16 = 100;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ClientOptions are optional parameters that can be passed to
// the subscriber, all of which fall back to the DEFAULT_* consts.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    // keep_alive sets the keepalive to use for MQTT broker connections.
    pub keep_alive: Option<Duration>,
    // request_channel_capacity is the number of outgoing requests
    // (subscribes, acks) the async client buffers before callers wait.
    // Raised to at least client_queue_size + 2 so that acking every
    // queued delivery can't block while the event loop is itself
    // waiting on a full queue.
    pub request_channel_capacity: Option<usize>,
    // client_queue_size is the number of deliveries buffered between
    // the event loop and the consumer. When it is full, the event
    // loop stops reading from the socket until there is room.
    pub client_queue_size: Option<usize>,
    // max_inflight is the outgoing in-flight window passed to rumqttc.
    pub max_inflight: Option<u16>,
    // qos is the QoS to subscribe with. Defaults to AtLeastOnce.
    pub qos: Option<QoS>,
    // connect_timeout bounds the initial connection attempt.
    pub connect_timeout: Option<Duration>,
    // backoff controls reconnect pacing after the connection is lost.
    pub backoff: Option<BackoffConfig>,
    // credentials are optional username/password credentials
    // that can be provided to the MQTT server for authnz. This
    // can be used with or without a tls_config.
    pub credentials: Option<ClientCredentials>,
    // tls_config is an optional ClientTlsConfig to provide
    // for using TLS, and optionally, mTLS.
    pub tls_config: Option<ClientTlsConfig>,
}

impl ClientOptions {
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn with_request_channel_capacity(mut self, capacity: usize) -> Self {
        self.request_channel_capacity = Some(capacity);
        self
    }

    pub fn with_client_queue_size(mut self, size: usize) -> Self {
        self.client_queue_size = Some(size);
        self
    }

    pub fn with_max_inflight(mut self, max_inflight: u16) -> Self {
        self.max_inflight = Some(max_inflight);
        self
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(ClientCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_tls_config(mut self, tls_config: ClientTlsConfig) -> Self {
        self.tls_config = Some(tls_config);
        self
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE)
    }

    pub fn client_queue_size(&self) -> usize {
        self.client_queue_size.unwrap_or(DEFAULT_CLIENT_QUEUE_SIZE).max(1)
    }

    pub fn request_channel_capacity(&self) -> usize {
        self.request_channel_capacity
            .unwrap_or(DEFAULT_REQUEST_CHANNEL_CAPACITY)
            .max(self.client_queue_size() + 2)
    }

    pub fn max_inflight(&self) -> u16 {
        self.max_inflight.unwrap_or(DEFAULT_MAX_INFLIGHT).max(1)
    }

    pub fn qos(&self) -> QoS {
        self.qos.unwrap_or(QoS::AtLeastOnce)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn backoff(&self) -> BackoffConfig {
        self.backoff.clone().unwrap_or_default()
    }
}

// ClientCredentials are used for providing a username
// and password to the MQTT server.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    pub username: String,
    pub password: String,
}

// ClientTlsConfig is config for using TLS (and optionally
// mTLS) with the MQTT server.
#[derive(Clone, Debug)]
pub struct ClientTlsConfig {
    // ca_certificate is PEM bytes for a CA certificate (or
    // CA certificate bundle), usually loaded from a file.
    pub ca_certificate: Vec<u8>,
    // client_identity is an optional client certificate
    // and private key to do mTLS with the MQTT server.
    pub client_identity: Option<ClientTlsIdentity>,
}

// ClientTlsIdentity is the certificate and key presented
// for an mTLS handshake, both as PEM bytes.
#[derive(Clone, Debug)]
pub struct ClientTlsIdentity {
    pub certificate: Vec<u8>,
    pub private_key: Vec<u8>,
}
