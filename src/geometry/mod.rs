// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - container, topology and the helpers operators share

pub mod bbox;
pub mod container;
pub mod groups;
pub mod handle;
pub mod mesh_utils;
pub mod primitives;
pub mod promotion;
pub mod topology;

pub use bbox::BoundingBox;
pub use container::GeometryContainer;
pub use handle::GeometryHandle;
pub use primitives::SourceShape;
pub use topology::{Topology, TopologyStats};
