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

// src/stats/intake.rs
// Intake statistics, shared between the broker event loop (which
// counts what comes off the wire) and the pipeline consuming the
// message stream (which counts what happened to it).
//
// Lock-free atomic counters, so reading or updating them never
// stalls message processing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

// IntakeStats stores a snapshot of intake statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeStats {
    // total_received is the count of publishes taken off the
    // wire since startup/reset.
    pub total_received: usize,
    // total_bytes_received is the payload bytes of those.
    pub total_bytes_received: usize,
    // pending_messages is the count of deliveries handed to the
    // queue but not yet accepted or rejected.
    pub pending_messages: usize,
    // pending_bytes is the payload size of pending deliveries.
    pub pending_bytes: usize,
    // total_accepted is the count of messages that transformed into
    // a record and reached the store (including stale ones).
    pub total_accepted: usize,
    // total_stale is the count of accepted records the store
    // ignored because it already held the same or a newer version.
    pub total_stale: usize,
    // total_rejected is the count of messages that failed
    // validation and were dropped.
    pub total_rejected: usize,
    // total_unmatched_topics is the count of rejected messages
    // whose topic matched no route.
    pub total_unmatched_topics: usize,
    // total_event_loop_errors is the number of times the event
    // loop hit a connection error.
    pub total_event_loop_errors: usize,
    // total_reconnects is the number of times the connection was
    // re-established after being lost.
    pub total_reconnects: usize,
}

// IntakeStatsTracker enables thread-safe updates to intake
// statistics using atomic operations.
#[derive(Debug, Default)]
pub struct IntakeStatsTracker {
    received_count: Arc<AtomicUsize>,
    received_bytes: Arc<AtomicUsize>,
    pending_count: Arc<AtomicUsize>,
    pending_bytes: Arc<AtomicUsize>,
    accepted_count: Arc<AtomicUsize>,
    stale_count: Arc<AtomicUsize>,
    rejected_count: Arc<AtomicUsize>,
    unmatched_topics: Arc<AtomicUsize>,
    event_loop_errors: Arc<AtomicUsize>,
    reconnects: Arc<AtomicUsize>,
}

impl IntakeStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // increment_pending records a publish coming off the wire and
    // entering the delivery queue (e.g. increment_pending(256) for
    // a 256-byte payload).
    pub fn increment_pending(&self, bytes: usize) {
        self.received_count.fetch_add(1, Ordering::Relaxed);
        self.received_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.pending_count.fetch_add(1, Ordering::Relaxed);
        self.pending_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    // decrement_pending_increment_accepted moves a delivery from
    // pending to accepted once its record reached the store.
    pub fn decrement_pending_increment_accepted(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.accepted_count.fetch_add(1, Ordering::Relaxed);
    }

    // decrement_pending_increment_rejected moves a delivery from
    // pending to rejected after it failed validation.
    pub fn decrement_pending_increment_rejected(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    // decrement_pending drops a delivery from pending that will never
    // be processed, e.g. one still queued at shutdown. The broker
    // redelivers it, so it counts as neither accepted nor rejected.
    pub fn decrement_pending(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn increment_stale(&self) {
        self.stale_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unmatched_topics(&self) {
        self.unmatched_topics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_event_loop_errors(&self) {
        self.event_loop_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    // is_empty is true when nothing is waiting to be processed
    // (e.g. to check the queue drained before shutting down).
    pub fn is_empty(&self) -> bool {
        self.pending_count.load(Ordering::Relaxed) == 0
    }

    // reset_counters clears the running totals back to zero.
    // Pending counts are left alone as they reflect current state.
    pub fn reset_counters(&self) {
        self.received_count.store(0, Ordering::Relaxed);
        self.received_bytes.store(0, Ordering::Relaxed);
        self.accepted_count.store(0, Ordering::Relaxed);
        self.stale_count.store(0, Ordering::Relaxed);
        self.rejected_count.store(0, Ordering::Relaxed);
        self.unmatched_topics.store(0, Ordering::Relaxed);
        self.event_loop_errors.store(0, Ordering::Relaxed);
        self.reconnects.store(0, Ordering::Relaxed);
    }

    // to_stats creates an immutable snapshot of current statistics.
    pub fn to_stats(&self) -> IntakeStats {
        IntakeStats {
            total_received: self.received_count.load(Ordering::Relaxed),
            total_bytes_received: self.received_bytes.load(Ordering::Relaxed),
            pending_messages: self.pending_count.load(Ordering::Relaxed),
            pending_bytes: self.pending_bytes.load(Ordering::Relaxed),
            total_accepted: self.accepted_count.load(Ordering::Relaxed),
            total_stale: self.stale_count.load(Ordering::Relaxed),
            total_rejected: self.rejected_count.load(Ordering::Relaxed),
            total_unmatched_topics: self.unmatched_topics.load(Ordering::Relaxed),
            total_event_loop_errors: self.event_loop_errors.load(Ordering::Relaxed),
            total_reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}
