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

// src/transformer.rs
// Message -> DomainRecord conversion.

use meterbridge_model::{DomainRecord, Message, RecordValue};
use serde_json::{Map, Value};

use crate::errors::{RouteError, ValidationError};
use crate::route::{PayloadFormat, RouteConfig, TopicRoute};

/// Decodes and validates messages using an ordered route table.
///
/// The first route whose pattern matches the message topic decides how the
/// payload is read. With no routes configured, every topic is read as a JSON
/// record. `transform` only reads the route table, so one `Transformer` can
/// be shared freely between tasks.
#[derive(Clone, Debug)]
pub struct Transformer {
    routes: Vec<TopicRoute>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self {
            routes: vec![TopicRoute::catch_all()],
        }
    }
}

impl Transformer {
    pub fn new(routes: &[RouteConfig]) -> Result<Self, RouteError> {
        if routes.is_empty() {
            return Ok(Self::default());
        }
        let routes = routes
            .iter()
            .map(TopicRoute::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn transform(&self, message: &Message) -> Result<DomainRecord, ValidationError> {
        for route in &self.routes {
            let Some(captures) = route.captures(&message.topic) else {
                continue;
            };
            let mut record = match route.format() {
                PayloadFormat::Json => decode_json_record(&message.payload)?,
                PayloadFormat::Scalar => {
                    let key = route.expand_key(&captures).unwrap_or_default();
                    if key.is_empty() {
                        return Err(ValidationError::invalid_field(
                            "key",
                            format!("topic '{}' produced an empty key", message.topic),
                        ));
                    }
                    DomainRecord {
                        key,
                        value: decode_scalar(&message.payload)?,
                        version: message.arrival_millis(),
                        node: None,
                    }
                }
            };
            if record.node.is_none() {
                record.node = route.expand_node(&captures);
            }
            return Ok(record);
        }

        Err(ValidationError::UnroutedTopic(message.topic.clone()))
    }
}

fn decode_json_record(payload: &[u8]) -> Result<DomainRecord, ValidationError> {
    let object = match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            return Err(ValidationError::MalformedPayload(
                "payload is not a JSON object".to_string(),
            ));
        }
        Err(e) => return Err(ValidationError::MalformedPayload(e.to_string())),
    };

    let key = match required(&object, "key")? {
        Value::String(key) if !key.is_empty() => key.clone(),
        Value::String(_) => {
            return Err(ValidationError::invalid_field("key", "must not be empty"));
        }
        _ => return Err(ValidationError::invalid_field("key", "must be a string")),
    };

    let value = RecordValue::from_json(required(&object, "value")?).ok_or_else(|| {
        ValidationError::invalid_field("value", "must be a number, boolean or string")
    })?;

    let version = required(&object, "version")?.as_u64().ok_or_else(|| {
        ValidationError::invalid_field("version", "must be a non-negative integer")
    })?;

    let node = match object.get("node") {
        None | Some(Value::Null) => None,
        Some(Value::String(node)) => Some(node.clone()),
        Some(_) => return Err(ValidationError::invalid_field("node", "must be a string")),
    };

    Ok(DomainRecord {
        key,
        value,
        version,
        node,
    })
}

fn required<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn decode_scalar(payload: &[u8]) -> Result<RecordValue, ValidationError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| ValidationError::MalformedPayload(format!("payload is not UTF-8: {e}")))?
        .trim();
    if text.is_empty() {
        return Err(ValidationError::MalformedPayload(
            "payload is empty".to_string(),
        ));
    }
    Ok(RecordValue::parse_text(text))
}
