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

// tests/record.rs
// Tests for DomainRecord's JSON form and RecordValue conversions.

use meterbridge_model::{DomainRecord, Message, RecordValue};

#[test]
fn test_record_serializes_without_node() {
    let record = DomainRecord::new("sensor-1", 42, 1);
    let json = serde_json::to_string(&record).expect("record should serialize");
    assert_eq!(json, r#"{"key":"sensor-1","value":42,"version":1}"#);
}

#[test]
fn test_record_json_round_trips_exactly() {
    let input = r#"{"key":"sensor-1","value":42,"version":1}"#;
    let record: DomainRecord = serde_json::from_str(input).expect("record should parse");
    assert_eq!(record.value, RecordValue::Integer(42));
    assert_eq!(record.node, None);
    assert_eq!(serde_json::to_string(&record).unwrap(), input);
}

#[test]
fn test_record_serializes_node_when_set() {
    let record = DomainRecord::new("chargePower", 7.5, 3).with_node("alfen");
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["node"], "alfen");
    assert_eq!(json["value"], 7.5);
}

#[test]
fn test_supersedes_is_strict() {
    let older = DomainRecord::new("otter", 1, 1);
    let newer = DomainRecord::new("otter", 2, 2);
    let same = DomainRecord::new("otter", 3, 2);

    assert!(newer.supersedes(&older));
    assert!(!older.supersedes(&newer));
    assert!(!same.supersedes(&newer));
}

#[test]
fn test_value_from_json_scalars() {
    assert_eq!(
        RecordValue::from_json(&serde_json::json!(12)),
        Some(RecordValue::Integer(12))
    );
    assert_eq!(
        RecordValue::from_json(&serde_json::json!(-0.25)),
        Some(RecordValue::Float(-0.25))
    );
    assert_eq!(
        RecordValue::from_json(&serde_json::json!(true)),
        Some(RecordValue::Bool(true))
    );
    assert_eq!(
        RecordValue::from_json(&serde_json::json!("charging")),
        Some(RecordValue::Text("charging".to_string()))
    );
}

#[test]
fn test_value_from_json_rejects_non_scalars() {
    assert_eq!(RecordValue::from_json(&serde_json::Value::Null), None);
    assert_eq!(RecordValue::from_json(&serde_json::json!([1, 2])), None);
    assert_eq!(RecordValue::from_json(&serde_json::json!({"a": 1})), None);
}

#[test]
fn test_value_parse_text() {
    assert_eq!(RecordValue::parse_text("1234"), RecordValue::Integer(1234));
    assert_eq!(RecordValue::parse_text("1234.5"), RecordValue::Float(1234.5));
    assert_eq!(RecordValue::parse_text("false"), RecordValue::Bool(false));
    assert_eq!(
        RecordValue::parse_text("NaN"),
        RecordValue::Text("NaN".to_string())
    );
    assert_eq!(
        RecordValue::parse_text("idle"),
        RecordValue::Text("idle".to_string())
    );
}

#[test]
fn test_message_arrival_millis() {
    let arrived_at = chrono::DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
    let message = Message::with_arrival("slimmelezer/sensor/power/state", "12", arrived_at);
    assert_eq!(message.arrival_millis(), 1_700_000_000_123);
    assert_eq!(message.payload_size(), 2);
    assert!(!message.retained);
}
