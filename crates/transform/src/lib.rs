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

// src/lib.rs
// Turns raw broker messages into validated DomainRecords.

pub mod errors;
pub mod route;
pub mod transformer;

pub use errors::{RouteError, ValidationError};
pub use route::{PayloadFormat, RouteConfig, TopicRoute};
pub use transformer::Transformer;
