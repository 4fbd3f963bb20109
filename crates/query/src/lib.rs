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

//! HTTP query endpoint for the meterbridge state store.
//!
//! Serves `GET /records/{key}` plus a few read-only companions. Handlers
//! only ever read, through [`RecordSource`], so the intake pipeline and the
//! endpoint share nothing but the store itself.

mod errors;
mod routes;
mod source;

pub use errors::ApiError;
pub use routes::{ApiState, RecordQuery, StatsResponse, get_router};
pub use source::RecordSource;
