// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conversion boundary towards external mesh representations

pub mod external;

pub use external::{from_external, surface_area, to_external, validate_for_external, ExternalMesh};
