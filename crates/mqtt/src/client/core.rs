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

// src/client/core.rs
// BrokerSubscriber owns the one MQTT connection of the process,
// and the event loop task that keeps it alive.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeFilter, TlsConfiguration, Transport,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::backoff::{BackoffConfig, ReconnectBackoff};
use crate::client::delivery::Delivery;
use crate::client::options::ClientOptions;
use crate::client::stream::MessageStream;
use crate::client::topic_filters::TopicFilters;
use crate::errors::SubscriberError;
use crate::stats::IntakeStatsTracker;

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// A not-yet-connected subscriber.
///
/// [`subscribe`](Self::subscribe) consumes the subscriber, so there is
/// exactly one broker connection and one subscription per subscriber.
pub struct BrokerSubscriber {
    broker: String,
    client: AsyncClient,
    eventloop: EventLoop,
    options: ClientOptions,
    stats: Arc<IntakeStatsTracker>,
}

impl BrokerSubscriber {
    // new builds the client and event loop without connecting. Options
    // left as None fall back to the DEFAULT_* consts.
    pub fn new(
        host: &str,
        port: u16,
        client_id: &str,
        options: Option<ClientOptions>,
    ) -> Result<Self, SubscriberError> {
        let options = options.unwrap_or_default();

        if client_id.trim().is_empty() || client_id.starts_with(' ') {
            return Err(SubscriberError::InvalidOptions(format!(
                "client id '{client_id}' must be non-empty and must not start with a space"
            )));
        }
        let keep_alive = options.keep_alive();
        if !keep_alive.is_zero() && keep_alive < Duration::from_secs(1) {
            return Err(SubscriberError::InvalidOptions(format!(
                "keep_alive must be zero or at least one second, got {keep_alive:?}"
            )));
        }

        let mut mqtt_options = MqttOptions::new(client_id, host, port);
        mqtt_options.set_keep_alive(keep_alive);
        // A persistent session plus manual acks is what lets the broker
        // hold on to anything we haven't acknowledged across reconnects.
        mqtt_options.set_clean_session(false);
        mqtt_options.set_manual_acks(true);
        mqtt_options.set_inflight(options.max_inflight());

        if let Some(credentials) = &options.credentials {
            mqtt_options.set_credentials(&credentials.username, &credentials.password);
        }
        if let Some(tls_config) = &options.tls_config {
            let client_auth = tls_config
                .client_identity
                .as_ref()
                .map(|identity| (identity.certificate.clone(), identity.private_key.clone()));
            mqtt_options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
                ca: tls_config.ca_certificate.clone(),
                alpn: None,
                client_auth,
            }));
        }

        let (client, eventloop) =
            AsyncClient::new(mqtt_options, options.request_channel_capacity());

        Ok(Self {
            broker: format!("{host}:{port}"),
            client,
            eventloop,
            options,
            stats: Arc::new(IntakeStatsTracker::new()),
        })
    }

    // with_stats shares an existing stats tracker with the event loop,
    // so the consumer side can update the same counters.
    pub fn with_stats(mut self, stats: Arc<IntakeStatsTracker>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> Arc<IntakeStatsTracker> {
        self.stats.clone()
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// Connects, subscribes to `topics` and starts the event loop.
    ///
    /// Fails if the filters are invalid, if the broker can't be reached within
    /// the connect timeout, or if it refuses our credentials. Once this returns,
    /// connection losses are handled by reconnecting with backoff and
    /// resubscribing, and are only visible through the stats.
    pub async fn subscribe(
        mut self,
        topics: impl Into<TopicFilters>,
    ) -> Result<MessageStream, SubscriberError> {
        let filters = topics.into().validate()?;
        let qos = self.options.qos();

        let connect_timeout = self.options.connect_timeout();
        let connected =
            tokio::time::timeout(connect_timeout, wait_for_connack(&mut self.eventloop)).await;
        match connected {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                return Err(SubscriberError::from_connection_error(&self.broker, error));
            }
            Err(_) => {
                return Err(SubscriberError::ConnectTimeout {
                    broker: self.broker,
                    timeout: connect_timeout,
                });
            }
        }
        info!(broker = %self.broker, "connected to broker");

        self.client
            .subscribe_many(subscribe_filters(&filters, qos))
            .await?;
        info!(broker = %self.broker, topics = ?filters, ?qos, "subscribed");

        let (deliveries_tx, deliveries_rx) = mpsc::channel(self.options.client_queue_size());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = EventLoopTask {
            broker: self.broker,
            client: self.client,
            eventloop: self.eventloop,
            filters,
            qos,
            backoff: self.options.backoff(),
            deliveries: deliveries_tx,
            stats: self.stats.clone(),
        };
        let join_handle = tokio::spawn(task.run(shutdown_rx));

        Ok(MessageStream::new(
            deliveries_rx,
            shutdown_tx,
            join_handle,
            self.stats,
        ))
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(_)) = eventloop.poll().await? {
            return Ok(());
        }
    }
}

fn subscribe_filters(filters: &[String], qos: QoS) -> Vec<SubscribeFilter> {
    filters
        .iter()
        .map(|filter| SubscribeFilter::new(filter.clone(), qos))
        .collect()
}

// EventLoopTask is everything the background task needs once the
// initial connection is up.
struct EventLoopTask {
    broker: String,
    client: AsyncClient,
    eventloop: EventLoop,
    filters: Vec<String>,
    qos: QoS,
    backoff: BackoffConfig,
    deliveries: mpsc::Sender<Delivery>,
    stats: Arc<IntakeStatsTracker>,
}

impl EventLoopTask {
    // run drives the event loop until shutdown, until the consumer goes
    // away, or until the broker refuses our credentials. Deliveries are
    // pushed with a waiting send, so a slow consumer stops us reading
    // from the socket rather than losing messages.
    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) -> Result<(), SubscriberError> {
        let Self {
            broker,
            client,
            mut eventloop,
            filters,
            qos,
            backoff,
            deliveries,
            stats,
        } = self;
        let mut backoff = ReconnectBackoff::new(backoff);
        backoff.connected();

        let result = loop {
            let event = tokio::select! {
                _ = &mut shutdown_rx => break Ok(()),
                event = eventloop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let payload_size = publish.payload.len();
                    debug!(
                        topic = %publish.topic,
                        payload_size,
                        pkid = publish.pkid,
                        "received publish"
                    );
                    stats.increment_pending(payload_size);

                    let delivery = Delivery::from_publish(client.clone(), publish);
                    let sent = tokio::select! {
                        _ = &mut shutdown_rx => {
                            stats.decrement_pending(payload_size);
                            break Ok(());
                        }
                        sent = deliveries.send(delivery) => sent,
                    };
                    if sent.is_err() {
                        stats.decrement_pending(payload_size);
                        debug!(broker = %broker, "delivery consumer went away, stopping event loop");
                        break Ok(());
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                    backoff.connected();
                    stats.increment_reconnects();
                    info!(
                        broker = %broker,
                        session_present = connack.session_present,
                        "reconnected to broker, resubscribing"
                    );
                    if let Err(error) =
                        client.try_subscribe_many(subscribe_filters(&filters, qos))
                    {
                        warn!(broker = %broker, %error, "failed to queue resubscribe");
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    stats.increment_event_loop_errors();
                    let error = SubscriberError::from_connection_error(&broker, error);
                    if error.is_authentication_error() {
                        error!(broker = %broker, %error, "broker refused credentials, giving up");
                        break Err(error);
                    }

                    let delay = backoff.next_delay();
                    warn!(
                        broker = %broker,
                        %error,
                        "connection to broker lost, reconnecting in {}ms",
                        delay.as_millis()
                    );
                    tokio::select! {
                        _ = &mut shutdown_rx => break Ok(()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        if result.is_ok() {
            disconnect(&broker, &client, &mut eventloop).await;
        }
        result
    }
}

// disconnect sends an MQTT DISCONNECT and polls until it has gone out,
// giving up after DISCONNECT_TIMEOUT.
async fn disconnect(broker: &str, client: &AsyncClient, eventloop: &mut EventLoop) {
    if let Err(error) = client.try_disconnect() {
        debug!(broker, %error, "could not queue disconnect");
        return;
    }
    let flushed = tokio::time::timeout(DISCONNECT_TIMEOUT, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    match flushed {
        Ok(()) => info!(broker, "disconnected from broker"),
        Err(_) => debug!(broker, "timed out sending disconnect"),
    }
}
