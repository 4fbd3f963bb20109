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

// src/client/topic_filters.rs
// Topic filter input handling for BrokerSubscriber::subscribe.
//
// Lets callers pass one filter or many in whatever form they have
// them, and validates them before anything goes on the wire.

use crate::errors::SubscriberError;

// TopicFilters is one or more MQTT topic filters to subscribe to.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicFilters {
    Single(String),
    Multiple(Vec<String>),
}

impl TopicFilters {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(filter) => vec![filter],
            Self::Multiple(filters) => filters,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(filters) => filters.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Multiple(filters) => filters.is_empty(),
        }
    }

    // validate checks that there is at least one filter and that
    // every filter is well formed, returning the filters on success.
    pub fn validate(self) -> Result<Vec<String>, SubscriberError> {
        if self.is_empty() {
            return Err(SubscriberError::invalid_topic(
                "",
                "at least one topic filter is required",
            ));
        }
        let filters = self.into_vec();
        for filter in &filters {
            validate_topic_filter(filter)?;
        }
        Ok(filters)
    }
}

// validate_topic_filter checks MQTT topic filter syntax: non-empty,
// no NUL characters, `+` only as a whole level, and `#` only as the
// whole last level.
pub fn validate_topic_filter(filter: &str) -> Result<(), SubscriberError> {
    if filter.is_empty() {
        return Err(SubscriberError::invalid_topic(filter, "filter is empty"));
    }
    if filter.contains('\0') {
        return Err(SubscriberError::invalid_topic(
            filter,
            "filter contains a NUL character",
        ));
    }

    let levels: Vec<&str> = filter.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != "#" || i + 1 != levels.len()) {
            return Err(SubscriberError::invalid_topic(
                filter,
                "'#' must be the whole last level",
            ));
        }
        if level.contains('+') && *level != "+" {
            return Err(SubscriberError::invalid_topic(
                filter,
                "'+' must be a whole level",
            ));
        }
    }
    Ok(())
}

impl From<&str> for TopicFilters {
    fn from(filter: &str) -> Self {
        Self::Single(filter.to_string())
    }
}

impl From<String> for TopicFilters {
    fn from(filter: String) -> Self {
        Self::Single(filter)
    }
}

impl From<Vec<&str>> for TopicFilters {
    fn from(filters: Vec<&str>) -> Self {
        Self::Multiple(filters.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for TopicFilters {
    fn from(filters: Vec<String>) -> Self {
        Self::Multiple(filters)
    }
}

impl<const N: usize> From<[&str; N]> for TopicFilters {
    fn from(filters: [&str; N]) -> Self {
        Self::Multiple(filters.into_iter().map(String::from).collect())
    }
}

impl From<&[String]> for TopicFilters {
    fn from(filters: &[String]) -> Self {
        Self::Multiple(filters.to_vec())
    }
}

impl std::fmt::Display for TopicFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(filter) => write!(f, "'{filter}'"),
            Self::Multiple(filters) => {
                write!(
                    f,
                    "[{}]",
                    filters
                        .iter()
                        .map(|p| format!("'{p}'"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}
