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

use async_trait::async_trait;
use meterbridge_model::DomainRecord;
use meterbridge_store::StateStore;

/// Read access to current records, as seen by the query endpoint.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn record(&self, key: &str) -> Option<DomainRecord>;

    async fn records(&self) -> Vec<DomainRecord>;

    fn record_count(&self) -> usize;
}

#[async_trait]
impl RecordSource for StateStore {
    async fn record(&self, key: &str) -> Option<DomainRecord> {
        self.get(key)
    }

    async fn records(&self) -> Vec<DomainRecord> {
        self.snapshot()
    }

    fn record_count(&self) -> usize {
        self.len()
    }
}
