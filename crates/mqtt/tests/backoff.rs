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

// tests/backoff.rs
// Tests for reconnect backoff pacing.

use std::time::Duration;

use meterbridge_mqtt::backoff::{MIN_RETRY_BACKOFF, next_retry_backoff};
use meterbridge_mqtt::{BackoffConfig, ReconnectBackoff};

fn config(minimum_connection: Duration) -> BackoffConfig {
    BackoffConfig {
        base: Duration::from_millis(100),
        max: Duration::from_secs(2),
        successful_connection_minimum_duration: minimum_connection,
    }
}

#[test]
fn test_first_retry_uses_base() {
    let config = config(Duration::from_secs(60));
    assert_eq!(
        next_retry_backoff(&config, Duration::ZERO),
        Duration::from_millis(100)
    );
}

#[test]
fn test_backoff_grows_and_is_capped() {
    let config = config(Duration::from_secs(60));
    let mut prev = Duration::ZERO;
    for _ in 0..50 {
        let next = next_retry_backoff(&config, prev);
        assert!(next >= prev, "{next:?} < {prev:?}");
        assert!(next <= config.max, "{next:?} > max");
        if prev > Duration::ZERO && prev < config.max {
            assert!(next <= prev * 3);
        }
        prev = next;
    }
}

#[test]
fn test_backoff_at_max_stays_at_max() {
    let config = config(Duration::from_secs(60));
    assert_eq!(next_retry_backoff(&config, config.max), config.max);
}

#[test]
fn test_short_lived_connection_keeps_growing() {
    let mut backoff = ReconnectBackoff::new(config(Duration::from_secs(60)));
    backoff.connected();
    let first = backoff.next_delay();
    assert_eq!(first, Duration::from_millis(100));

    // Connected again, but dropped well before the minimum duration.
    backoff.connected();
    let second = backoff.next_delay();
    assert!(second >= first);
}

#[test]
fn test_long_enough_connection_resets() {
    let mut backoff = ReconnectBackoff::new(config(Duration::ZERO));
    for _ in 0..5 {
        backoff.next_delay();
    }

    backoff.connected();
    // The first reconnect after a good connection is immediate...
    assert_eq!(backoff.next_delay(), Duration::ZERO);
    // ...and then we start over from base.
    assert_eq!(backoff.next_delay(), Duration::from_millis(100));
}

#[test]
fn test_zero_base_still_backs_off() {
    let mut backoff = ReconnectBackoff::new(BackoffConfig {
        base: Duration::ZERO,
        max: Duration::from_secs(60),
        successful_connection_minimum_duration: Duration::from_secs(60),
    });

    let delays: Vec<Duration> = (0..5).map(|_| backoff.next_delay()).collect();
    assert_eq!(delays[0], MIN_RETRY_BACKOFF);
    for pair in delays.windows(2) {
        assert!(pair[1] >= pair[0], "{delays:?}");
    }
    assert!(delays.iter().all(|delay| !delay.is_zero()), "{delays:?}");
}

#[test]
fn test_max_below_base_waits_base() {
    let config = BackoffConfig {
        base: Duration::from_secs(5),
        max: Duration::from_secs(1),
        successful_connection_minimum_duration: Duration::from_secs(60),
    };
    let first = next_retry_backoff(&config, Duration::ZERO);
    assert_eq!(first, Duration::from_secs(5));
    assert_eq!(next_retry_backoff(&config, first), Duration::from_secs(5));
}
