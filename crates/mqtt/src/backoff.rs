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

// src/backoff.rs
// Reconnect pacing for the broker event loop.

use std::time::{Duration, Instant};

// BackoffConfig controls how quickly the event loop retries after
// losing the broker.
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    // base is the wait after the first failed reconnect. Each further
    // failure grows it (with random jitter) up to max.
    pub base: Duration,
    pub max: Duration,
    // successful_connection_minimum_duration is how long a connection
    // has to stay up before the backoff starts over from zero.
    pub successful_connection_minimum_duration: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
            successful_connection_minimum_duration: Duration::from_secs(30),
        }
    }
}

/// Tracks the delay between reconnect attempts.
///
/// When a connection that had been up for at least
/// `successful_connection_minimum_duration` drops, the first reconnect
/// happens immediately. If that fails, the next wait is `base`, and every
/// failure after that picks a random wait between the previous one and
/// three times it, capped at `max`.
#[derive(Debug)]
pub struct ReconnectBackoff {
    config: BackoffConfig,
    prev: Duration,
    connected_at: Option<Instant>,
}

impl ReconnectBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            prev: Duration::ZERO,
            connected_at: None,
        }
    }

    // connected records that a connection was just established.
    pub fn connected(&mut self) {
        self.connected_at = Some(Instant::now());
    }

    // next_delay is called whenever a connection attempt fails or an
    // established connection drops, and returns how long to wait
    // before trying again.
    pub fn next_delay(&mut self) -> Duration {
        if let Some(connected_at) = self.connected_at.take()
            && connected_at.elapsed() >= self.config.successful_connection_minimum_duration
        {
            self.prev = Duration::ZERO;
            return Duration::ZERO;
        }
        self.prev = next_retry_backoff(&self.config, self.prev);
        self.prev
    }
}

// MIN_RETRY_BACKOFF is the floor for the first wait, since a zero
// base would never grow.
pub const MIN_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Calculate the next exponential backoff duration for reconnecting to the broker
pub fn next_retry_backoff(config: &BackoffConfig, prev: Duration) -> Duration {
    let base = config.base.max(MIN_RETRY_BACKOFF);
    let max = config.max.max(base);
    let duration = if prev == Duration::ZERO {
        base
    } else if prev >= max {
        max
    } else {
        // Sleep a random interval between prev and prev * 3
        let upper = (prev.as_secs_f64() * 3.0).min(max.as_secs_f64());
        Duration::from_secs_f64(rand::random_range(prev.as_secs_f64()..upper))
    };
    tracing::debug!(
        "next_retry_backoff, increasing from {}ms to {}ms",
        prev.as_millis(),
        duration.as_millis()
    );
    duration
}
