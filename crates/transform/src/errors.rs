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

// src/errors.rs
// Error types for building routes and validating messages.

use thiserror::Error;

// ValidationError is returned when a message can't be turned into a
// DomainRecord. Every variant is permanent for the message that caused
// it: retrying the same bytes gives the same answer, so the caller logs
// and drops the message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("no route matches topic '{0}'")]
    UnroutedTopic(String),
}

impl ValidationError {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    // is_unrouted is true when the message was well-formed as far as
    // we know, but nothing was configured to handle its topic.
    pub fn is_unrouted(&self) -> bool {
        matches!(self, Self::UnroutedTopic(_))
    }
}

// RouteError is a configuration problem found while building the
// route table, before any message is processed.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("invalid topic pattern '{pattern}': {error}")]
    InvalidPattern {
        pattern: String,
        error: Box<regex::Error>,
    },

    #[error("route for '{pattern}' uses the scalar format but has no key template")]
    MissingKeyTemplate { pattern: String },
}
