// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI subsystem: geometry statistics and colored reporting

pub mod reporter;
pub mod stats;

pub use reporter::Reporter;
pub use stats::GeometryStats;
