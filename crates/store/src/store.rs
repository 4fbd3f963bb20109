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

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use meterbridge_model::DomainRecord;
use serde::Serialize;

/// What an [`StateStore::upsert`] did with the record it was given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// The key was not present before.
    Inserted,
    /// The record replaced an older version.
    Replaced { previous_version: u64 },
    /// The stored record is as new or newer, so nothing changed.
    Stale { current_version: u64 },
}

impl UpsertOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Stale { .. })
    }
}

/// Latest record per key, last-write-wins by `version`.
///
/// Writes to the same key are serialized by the map's shard lock, so the
/// compare-and-replace in [`upsert`](Self::upsert) is atomic per key, while
/// writes to keys in other shards proceed in parallel. Since a record is only
/// ever replaced by a strictly newer version, readers never see a key go
/// backwards. Entries are never removed.
#[derive(Debug, Default)]
pub struct StateStore {
    records: DashMap<String, DomainRecord>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, record: DomainRecord) -> UpsertOutcome {
        match self.records.entry(record.key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(record);
                UpsertOutcome::Inserted
            }
            Entry::Occupied(mut entry) => {
                let current_version = entry.get().version;
                if record.supersedes(entry.get()) {
                    entry.insert(record);
                    UpsertOutcome::Replaced {
                        previous_version: current_version,
                    }
                } else {
                    UpsertOutcome::Stale { current_version }
                }
            }
        }
    }

    /// The current record for `key`, or `None` if nothing was ever stored
    /// under it.
    pub fn get(&self, key: &str) -> Option<DomainRecord> {
        self.records.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// A copy of every record, sorted by key. Each record is read
    /// atomically, but the snapshot as a whole is not a single point in time.
    pub fn snapshot(&self) -> Vec<DomainRecord> {
        let mut records: Vec<DomainRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }
}
