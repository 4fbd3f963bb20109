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
// Error types for the broker subscriber.

use rumqttc::{ClientError, ConnectReturnCode, ConnectionError};
use thiserror::Error;

// SubscriberError covers everything that can go wrong between us
// and the broker. Connection problems are transient (the event loop
// retries them); authentication refusals are not.
#[derive(Error, Debug)]
pub enum SubscriberError {
    #[error("connection to {broker} failed: {error}")]
    ConnectionError {
        broker: String,
        #[source]
        error: ConnectionError,
    },

    #[error("timed out after {timeout:?} connecting to {broker}")]
    ConnectTimeout {
        broker: String,
        timeout: std::time::Duration,
    },

    #[error("broker at {broker} refused our credentials ({code:?})")]
    Authentication {
        broker: String,
        code: ConnectReturnCode,
    },

    #[error("client request failed: {0}")]
    ClientError(#[from] ClientError),

    #[error("invalid topic filter '{filter}': {reason}")]
    InvalidTopic { filter: String, reason: String },

    #[error("invalid client options: {0}")]
    InvalidOptions(String),

    #[error("subscriber event loop task failed: {0}")]
    TaskFailed(String),
}

impl SubscriberError {
    // from_connection_error sorts an event loop error into either
    // a retryable connection error, or a fatal authentication error
    // if the broker turned down our credentials.
    pub fn from_connection_error(broker: &str, error: ConnectionError) -> Self {
        match error {
            ConnectionError::ConnectionRefused(
                code @ (ConnectReturnCode::BadUserNamePassword | ConnectReturnCode::NotAuthorized),
            ) => Self::Authentication {
                broker: broker.to_string(),
                code,
            },
            error => Self::ConnectionError {
                broker: broker.to_string(),
                error,
            },
        }
    }

    pub fn invalid_topic(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTopic {
            filter: filter.into(),
            reason: reason.into(),
        }
    }

    // is_connection_error is true for errors that go away by
    // reconnecting.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError { .. } | Self::ConnectTimeout { .. } | Self::ClientError(_)
        )
    }

    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidTopic { .. } | Self::InvalidOptions(_))
    }
}
