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

// tests/forwarder.rs
// Posting latest values to an emoncms input API.

use std::sync::Arc;
use std::time::Duration;

use meterbridge::config::ForwarderConfig;
use meterbridge::forwarder::{
    EmoncmsClient, ForwardReport, Forwarder, ForwarderError, InputPoster, NodeValues,
    group_by_node,
};
use meterbridge::shutdown_handle::ShutdownHandle;
use meterbridge_model::DomainRecord;
use meterbridge_store::StateStore;
use mockito::Matcher;

fn forwarder_config(endpoint: String) -> ForwarderConfig {
    ForwarderConfig {
        enabled: true,
        endpoint,
        apikey: "0123456789abcdef".to_string(),
        interval: Duration::from_millis(50),
        request_timeout: Duration::from_secs(5),
    }
}

fn seeded_store() -> Arc<StateStore> {
    let store = Arc::new(StateStore::new());
    store.upsert(DomainRecord::new("power", 1234.5, 10).with_node("slimmelezer"));
    store.upsert(DomainRecord::new("energy_delivered", 5021, 10).with_node("slimmelezer"));
    store.upsert(DomainRecord::new("chargePower", 0, 11).with_node("evcc"));
    // No node, so never forwarded.
    store.upsert(DomainRecord::new("sensor-1", 42, 1));
    store
}

#[test]
fn test_group_by_node_skips_records_without_node() {
    let grouped = group_by_node(seeded_store().snapshot());

    assert_eq!(
        grouped.keys().collect::<Vec<_>>(),
        vec!["evcc", "slimmelezer"]
    );
    assert_eq!(
        serde_json::to_string(&grouped["slimmelezer"]).unwrap(),
        r#"{"energy_delivered":5021,"power":1234.5}"#
    );
    assert_eq!(
        serde_json::to_string(&grouped["evcc"]).unwrap(),
        r#"{"chargePower":0}"#
    );
}

#[tokio::test]
async fn test_forward_once_posts_one_form_per_node() {
    let mut server = mockito::Server::new_async().await;
    let slimmelezer = server
        .mock("POST", "/emoncms/input/post")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("node".into(), "slimmelezer".into()),
            Matcher::UrlEncoded("apikey".into(), "0123456789abcdef".into()),
            Matcher::UrlEncoded(
                "fulljson".into(),
                r#"{"energy_delivered":5021,"power":1234.5}"#.into(),
            ),
        ]))
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;
    let evcc = server
        .mock("POST", "/emoncms/input/post")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("node".into(), "evcc".into()),
            Matcher::UrlEncoded("fulljson".into(), r#"{"chargePower":0}"#.into()),
        ]))
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .expect(1)
        .create_async()
        .await;

    // A trailing slash on the endpoint must not double up in the URL.
    let config = forwarder_config(format!("{}/emoncms/", server.url()));
    let client = EmoncmsClient::new(&config).unwrap();
    let forwarder = Forwarder::new(Box::new(client), seeded_store(), config.interval);

    let report = forwarder.forward_once().await;
    assert_eq!(report, ForwardReport { posted: 2, failed: 0 });
    slimmelezer.assert_async().await;
    evcc.assert_async().await;
}

#[tokio::test]
async fn test_post_reports_http_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/input/post")
        .with_status(500)
        .with_body("database unavailable")
        .create_async()
        .await;

    let client = EmoncmsClient::new(&forwarder_config(server.url())).unwrap();
    let mut values = NodeValues::new();
    values.insert("power".to_string(), serde_json::json!(1234.5));

    let error = client
        .post_node("slimmelezer", &values)
        .await
        .expect_err("Expected ForwarderError to be returned");
    assert!(matches!(
        error,
        ForwarderError::Status { status: 500, ref body } if body == "database unavailable"
    ));
}

#[tokio::test]
async fn test_post_reports_rejected_apikey() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/input/post")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "Username or password empty"}"#)
        .create_async()
        .await;

    let client = EmoncmsClient::new(&forwarder_config(server.url())).unwrap();
    let error = client
        .post_node("evcc", &NodeValues::new())
        .await
        .expect_err("Expected ForwarderError to be returned");
    assert!(matches!(error, ForwarderError::Rejected(ref m) if m == "Username or password empty"));
}

#[tokio::test]
async fn test_failures_are_counted_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/input/post")
        .match_body(Matcher::UrlEncoded("node".into(), "evcc".into()))
        .with_status(503)
        .create_async()
        .await;
    server
        .mock("POST", "/input/post")
        .match_body(Matcher::UrlEncoded("node".into(), "slimmelezer".into()))
        .with_status(200)
        .create_async()
        .await;

    let config = forwarder_config(server.url());
    let forwarder = Forwarder::new(
        Box::new(EmoncmsClient::new(&config).unwrap()),
        seeded_store(),
        config.interval,
    );

    let report = forwarder.forward_once().await;
    assert_eq!(report, ForwardReport { posted: 1, failed: 1 });
}

#[tokio::test]
async fn test_spawned_forwarder_posts_until_shutdown() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/input/post")
        .with_status(200)
        .expect_at_least(2)
        .create_async()
        .await;

    let store = Arc::new(StateStore::new());
    store.upsert(DomainRecord::new("power", 1234.5, 10).with_node("slimmelezer"));
    let config = forwarder_config(server.url());
    let handle = meterbridge::forwarder::spawn(Forwarder::new(
        Box::new(EmoncmsClient::new(&config).unwrap()),
        store,
        config.interval,
    ));

    tokio::time::sleep(Duration::from_millis(300)).await;
    tokio::time::timeout(Duration::from_secs(5), handle.shutdown_and_wait())
        .await
        .expect("forwarder should stop on shutdown");
    mock.assert_async().await;
}
