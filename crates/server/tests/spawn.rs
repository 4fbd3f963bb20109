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

// tests/spawn.rs
// Startup of the whole service.

use std::time::Duration;

use meterbridge::config::{Config, ConfigError, ForwarderConfig, MqttConfig};
use meterbridge::shutdown_handle::ShutdownHandle;
use meterbridge::{SpawnError, spawn};
use meterbridge_mqtt::SubscriberError;
use meterbridge_transform::{RouteConfig, RouteError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn read_packet(socket: &mut TcpStream) -> (u8, Vec<u8>) {
    let header = socket.read_u8().await.unwrap();
    let mut remaining = 0usize;
    let mut shift = 0;
    loop {
        let byte = socket.read_u8().await.unwrap();
        remaining |= usize::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; remaining];
    socket.read_exact(&mut body).await.unwrap();
    (header, body)
}

// accept_session plays a broker: it takes the next connection, reads
// its CONNECT and answers with a CONNACK carrying return_code.
async fn accept_session(listener: &TcpListener, return_code: u8) -> TcpStream {
    let (mut socket, _) = listener.accept().await.unwrap();
    let (header, _) = read_packet(&mut socket).await;
    assert_eq!(header >> 4, 1, "expected CONNECT");
    socket
        .write_all(&[0x20, 0x02, 0x00, return_code])
        .await
        .unwrap();
    socket
}

// grant_subscribe reads a single-filter SUBSCRIBE and grants it.
async fn grant_subscribe(socket: &mut TcpStream) {
    let (header, body) = read_packet(socket).await;
    assert_eq!(header, 0x82, "expected SUBSCRIBE");
    socket
        .write_all(&[0x90, 0x03, body[0], body[1], 0x01])
        .await
        .unwrap();
}

// closed_port finds a local port nothing is listening on.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_unreachable_broker_fails_startup() {
    let config = Config {
        listen_address: "127.0.0.1:0".parse().unwrap(),
        mqtt: MqttConfig {
            port: closed_port(),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        },
        ..Default::default()
    };

    let error = match spawn(config).await {
        Ok(_) => panic!("spawn should fail without a broker"),
        Err(error) => error,
    };
    assert!(matches!(&error, SpawnError::Subscribe(e) if e.is_connection_error()));
}

#[tokio::test]
async fn test_invalid_route_fails_startup() {
    let config = Config {
        routes: vec![RouteConfig::scalar("^meters/(unclosed$", "${1}")],
        ..Default::default()
    };

    let error = match spawn(config).await {
        Ok(_) => panic!("spawn should reject the route"),
        Err(error) => error,
    };
    assert!(matches!(
        error,
        SpawnError::Route(RouteError::InvalidPattern { .. })
    ));
}

#[tokio::test]
async fn test_invalid_qos_fails_startup() {
    let config = Config {
        mqtt: MqttConfig {
            qos: 7,
            ..Default::default()
        },
        ..Default::default()
    };

    let error = match spawn(config).await {
        Ok(_) => panic!("spawn should reject the qos"),
        Err(error) => error,
    };
    assert!(matches!(error, SpawnError::Config(_)));
}

#[tokio::test]
async fn test_zero_forwarder_interval_fails_startup() {
    let config = Config {
        forwarder: ForwarderConfig {
            enabled: true,
            interval: Duration::ZERO,
            ..Default::default()
        },
        ..Default::default()
    };

    let error = match spawn(config).await {
        Ok(_) => panic!("spawn should reject the interval"),
        Err(error) => error,
    };
    assert!(matches!(
        error,
        SpawnError::Config(ConfigError::ZeroInterval {
            field: "forwarder.interval"
        })
    ));
}

#[tokio::test]
async fn test_refused_reconnect_stops_the_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (revoke_tx, revoke_rx) = oneshot::channel::<()>();

    let broker = tokio::spawn(async move {
        let mut first = accept_session(&listener, 0).await;
        grant_subscribe(&mut first).await;
        revoke_rx.await.ok();
        drop(first);

        // 0x05: not authorized
        accept_session(&listener, 0x05).await
    });

    let config = Config {
        listen_address: "127.0.0.1:0".parse().unwrap(),
        mqtt: MqttConfig {
            port,
            topics: vec!["meadow/#".to_string()],
            username: Some("badger".to_string()),
            password: Some("revoked".to_string()),
            connect_timeout: WAIT,
            reconnect_interval_base: Duration::from_millis(10),
            reconnect_interval_max: Duration::from_millis(100),
            ..Default::default()
        },
        ..Default::default()
    };
    let handle = spawn(config).await.expect("spawn should succeed");
    let health_url = format!("http://{}/health", handle.api_address());
    let http = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();

    let response = http.get(&health_url).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    revoke_tx.send(()).unwrap();
    let (_shutdown_tx, join_handle) = handle.into_parts();
    let result = timeout(WAIT, join_handle)
        .await
        .expect("service should stop once the broker refuses us")
        .expect("task panicked");
    let error = result.unwrap_err();
    assert!(error.is_authentication_error(), "{error}");
    assert!(matches!(error, SubscriberError::Authentication { .. }));

    // The query endpoint goes down with the intake.
    assert!(http.get(&health_url).send().await.is_err());

    drop(broker.await.unwrap());
}
