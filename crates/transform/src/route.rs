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

// src/route.rs
// Topic routes decide how a message is decoded, based on the
// topic it arrived on.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::RouteError;

// PayloadFormat is how the bytes of a message are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    // Json payloads are objects carrying key, value and version
    // (and optionally node) themselves.
    #[default]
    Json,
    // Scalar payloads are a bare number, boolean or string. The
    // key and node come from the topic, and the version is the
    // arrival time in milliseconds.
    Scalar,
}

// RouteConfig is the configuration-file form of a route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    // pattern is either an MQTT topic filter (`+` and a trailing `#`
    // wildcards, each becoming a capture group), or a regex if it
    // contains regex metacharacters.
    pub pattern: String,
    #[serde(default)]
    pub format: PayloadFormat,
    // key is a capture template (`${1}`, `${name}`) producing the
    // record key. Required for scalar routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    // node is a capture template producing the record's node label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl RouteConfig {
    pub fn json(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            format: PayloadFormat::Json,
            key: None,
            node: None,
        }
    }

    pub fn scalar(pattern: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            format: PayloadFormat::Scalar,
            key: Some(key.into()),
            node: None,
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

// TopicRoute is a compiled RouteConfig.
#[derive(Clone, Debug)]
pub struct TopicRoute {
    regex: Regex,
    format: PayloadFormat,
    key_template: Option<String>,
    node_template: Option<String>,
}

impl TopicRoute {
    pub fn compile(config: &RouteConfig) -> Result<Self, RouteError> {
        if config.format == PayloadFormat::Scalar && config.key.is_none() {
            return Err(RouteError::MissingKeyTemplate {
                pattern: config.pattern.clone(),
            });
        }

        let regex_pattern = if is_regex_pattern(&config.pattern) {
            config.pattern.clone()
        } else {
            topic_filter_to_regex(&config.pattern)
        };

        let regex = Regex::new(&regex_pattern).map_err(|error| RouteError::InvalidPattern {
            pattern: config.pattern.clone(),
            error: Box::new(error),
        })?;

        debug!(
            pattern = %config.pattern,
            regex = %regex_pattern,
            format = ?config.format,
            "compiled topic route"
        );

        Ok(Self {
            regex,
            format: config.format,
            key_template: config.key.clone(),
            node_template: config.node.clone(),
        })
    }

    // catch_all accepts JSON records on every topic.
    pub fn catch_all() -> Self {
        Self {
            regex: Regex::new("").expect("BUG: empty regex is invalid"),
            format: PayloadFormat::Json,
            key_template: None,
            node_template: None,
        }
    }

    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    pub fn captures<'t>(&self, topic: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(topic)
    }

    // expand_key renders the key template against the topic captures.
    // Returns None if the route has no key template.
    pub fn expand_key(&self, captures: &Captures<'_>) -> Option<String> {
        self.key_template
            .as_deref()
            .map(|template| expand(captures, template))
    }

    pub fn expand_node(&self, captures: &Captures<'_>) -> Option<String> {
        self.node_template
            .as_deref()
            .map(|template| expand(captures, template))
            .filter(|node| !node.is_empty())
    }
}

fn expand(captures: &Captures<'_>, template: &str) -> String {
    let mut out = String::new();
    captures.expand(template, &mut out);
    out
}

// is_regex_pattern detects if a string contains regex metacharacters.
// `+` and `#` are left out since they are MQTT wildcards.
fn is_regex_pattern(s: &str) -> bool {
    s.contains([
        '^', '$', '*', '.', '?', '[', ']', '{', '}', '(', ')', '|', '\\',
    ])
}

// topic_filter_to_regex turns an MQTT topic filter into an anchored
// regex. `+` matches exactly one level and `#` (only valid as the last
// level) matches the parent level and everything below it. Each
// wildcard becomes a numbered capture group, in order.
fn topic_filter_to_regex(filter: &str) -> String {
    let levels: Vec<&str> = filter.split('/').collect();
    let mut regex = String::from("^");

    for (i, level) in levels.iter().enumerate() {
        let is_last = i + 1 == levels.len();
        match *level {
            "#" if is_last => {
                if i == 0 {
                    regex.push_str("(.*)");
                } else {
                    regex.push_str("(?:/(.*))?");
                }
                regex.push('$');
                return regex;
            }
            "+" => {
                if i > 0 {
                    regex.push('/');
                }
                regex.push_str("([^/]*)");
            }
            literal => {
                if i > 0 {
                    regex.push('/');
                }
                regex.push_str(&regex::escape(literal));
            }
        }
    }

    regex.push('$');
    regex
}
