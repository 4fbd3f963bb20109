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

// tests/transformer.rs
// Tests for turning broker messages into DomainRecords, covering the
// default JSON route, scalar routes and every rejection path.

use chrono::DateTime;
use meterbridge_model::{DomainRecord, Message, RecordValue};
use meterbridge_transform::{RouteConfig, RouteError, Transformer, ValidationError};

fn json_message(payload: &str) -> Message {
    Message::new("sensors/otter", payload.to_string())
}

#[test]
fn test_default_transformer_accepts_json_record() {
    let transformer = Transformer::default();
    let record = transformer
        .transform(&json_message(r#"{"key":"sensor-1","value":42,"version":1}"#))
        .expect("valid record should transform");

    assert_eq!(record, DomainRecord::new("sensor-1", 42, 1));
}

#[test]
fn test_empty_route_list_is_catch_all() {
    let transformer = Transformer::new(&[]).unwrap();
    assert_eq!(transformer.route_count(), 1);
    assert!(
        transformer
            .transform(&json_message(r#"{"key":"k","value":true,"version":9}"#))
            .is_ok()
    );
}

#[test]
fn test_json_record_ignores_unknown_fields() {
    let record = Transformer::default()
        .transform(&json_message(
            r#"{"key":"badger","value":"burrowing","version":3,"unit":"mood"}"#,
        ))
        .unwrap();
    assert_eq!(record.value, RecordValue::Text("burrowing".to_string()));
    assert_eq!(record.version, 3);
}

#[test]
fn test_json_record_keeps_node() {
    let record = Transformer::default()
        .transform(&json_message(
            r#"{"key":"power","value":1.5,"version":3,"node":"alfen"}"#,
        ))
        .unwrap();
    assert_eq!(record.node.as_deref(), Some("alfen"));
}

#[test]
fn test_missing_fields_are_rejected() {
    let transformer = Transformer::default();
    let cases = [
        (r#"{"value":42,"version":1}"#, "key"),
        (r#"{"key":"sensor-1","version":1}"#, "value"),
        (r#"{"key":"sensor-1","value":42}"#, "version"),
        (r#"{"key":null,"value":42,"version":1}"#, "key"),
    ];
    for (payload, field) in cases {
        assert_eq!(
            transformer.transform(&json_message(payload)),
            Err(ValidationError::MissingField(field)),
            "payload {payload}"
        );
    }
}

#[test]
fn test_invalid_fields_are_rejected() {
    let transformer = Transformer::default();
    let cases = [
        (r#"{"key":"","value":42,"version":1}"#, "key"),
        (r#"{"key":7,"value":42,"version":1}"#, "key"),
        (r#"{"key":"k","value":[1],"version":1}"#, "value"),
        (r#"{"key":"k","value":{"a":1},"version":1}"#, "value"),
        (r#"{"key":"k","value":1,"version":-1}"#, "version"),
        (r#"{"key":"k","value":1,"version":1.5}"#, "version"),
        (r#"{"key":"k","value":1,"version":"1"}"#, "version"),
        (r#"{"key":"k","value":1,"version":1,"node":3}"#, "node"),
    ];
    for (payload, expected) in cases {
        match transformer.transform(&json_message(payload)) {
            Err(ValidationError::InvalidField { field, .. }) => {
                assert_eq!(field, expected, "payload {payload}")
            }
            other => panic!("payload {payload}: expected InvalidField, got {other:?}"),
        }
    }
}

#[test]
fn test_malformed_payloads_are_rejected() {
    let transformer = Transformer::default();
    for payload in ["", "not json", "[1,2,3]", "42", r#"{"key":"k""#] {
        assert!(
            matches!(
                transformer.transform(&json_message(payload)),
                Err(ValidationError::MalformedPayload(_))
            ),
            "payload {payload:?}"
        );
    }

    let binary = Message::new("sensors/otter", vec![0xff, 0xfe, 0x00]);
    assert!(matches!(
        transformer.transform(&binary),
        Err(ValidationError::MalformedPayload(_))
    ));
}

#[test]
fn test_scalar_route_uses_topic_and_arrival_time() {
    let transformer = Transformer::new(&[RouteConfig::scalar(
        r"^slimmelezer/sensor/(?P<name>\S+)/state$",
        "${name}",
    )
    .with_node("slimmelezer")])
    .unwrap();

    let arrived_at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    let message = Message::with_arrival(
        "slimmelezer/sensor/power_consumed/state",
        "1234.5",
        arrived_at,
    );
    let record = transformer.transform(&message).unwrap();

    assert_eq!(record.key, "power_consumed");
    assert_eq!(record.value, RecordValue::Float(1234.5));
    assert_eq!(record.version, 1_700_000_000_000);
    assert_eq!(record.node.as_deref(), Some("slimmelezer"));
}

#[test]
fn test_scalar_route_with_topic_filter_wildcards() {
    let route = RouteConfig::scalar("evcc/loadpoints/+/+", "lp${1}_${2}").with_node("evcc");
    let transformer = Transformer::new(&[route]).unwrap();

    let record = transformer
        .transform(&Message::new("evcc/loadpoints/1/chargePower", " 11000 "))
        .unwrap();
    assert_eq!(record.key, "lp1_chargePower");
    assert_eq!(record.value, RecordValue::Integer(11000));
}

#[test]
fn test_scalar_route_rejects_empty_payload_and_key() {
    let transformer =
        Transformer::new(&[RouteConfig::scalar("meadow/+/level", "${1}")]).unwrap();

    assert!(matches!(
        transformer.transform(&Message::new("meadow/hedgehog/level", "   ")),
        Err(ValidationError::MalformedPayload(_))
    ));
    assert!(matches!(
        transformer.transform(&Message::new("meadow//level", "3")),
        Err(ValidationError::InvalidField { field: "key", .. })
    ));
}

#[test]
fn test_first_matching_route_wins() {
    let transformer = Transformer::new(&[
        RouteConfig::scalar("meadow/special", "special"),
        RouteConfig::json("meadow/#"),
    ])
    .unwrap();

    let record = transformer
        .transform(&Message::new("meadow/special", "5"))
        .unwrap();
    assert_eq!(record.key, "special");

    let record = transformer
        .transform(&Message::new(
            "meadow/other",
            r#"{"key":"other","value":5,"version":2}"#,
        ))
        .unwrap();
    assert_eq!(record.key, "other");
}

#[test]
fn test_unrouted_topic_is_rejected() {
    let transformer = Transformer::new(&[RouteConfig::json("meadow/#")]).unwrap();
    let error = transformer
        .transform(&Message::new(
            "forest/owl",
            r#"{"key":"owl","value":1,"version":1}"#,
        ))
        .unwrap_err();
    assert_eq!(error, ValidationError::UnroutedTopic("forest/owl".to_string()));
    assert!(error.is_unrouted());
}

#[test]
fn test_route_config_errors() {
    let missing_key = RouteConfig {
        key: None,
        ..RouteConfig::scalar("meadow/+", "${1}")
    };
    assert!(matches!(
        Transformer::new(&[missing_key]),
        Err(RouteError::MissingKeyTemplate { .. })
    ));

    assert!(matches!(
        Transformer::new(&[RouteConfig::json("^meadow/(unclosed$")]),
        Err(RouteError::InvalidPattern { .. })
    ));
}
