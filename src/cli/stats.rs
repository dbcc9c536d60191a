// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Summary of a cooked container

use crate::attributes::ElementClass;
use crate::geometry::mesh_utils::EdgeMap;
use crate::geometry::{groups, BoundingBox, GeometryContainer, TopologyStats};
use crate::processing::surface_area;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryStats {
    pub points: usize,
    pub vertices: usize,
    pub primitives: usize,
    pub edges: usize,
    /// Every edge shared by exactly two faces.
    pub closed: bool,
    pub topology: TopologyStats,
    pub bounds: Option<BoundingBox>,
    /// Triangulated surface area; `None` without polygon faces.
    pub area: Option<f32>,
    /// Attribute names per class, groups excluded.
    pub attributes: BTreeMap<String, Vec<String>>,
    pub groups: BTreeMap<String, Vec<String>>,
}

impl GeometryStats {
    pub fn collect(geo: &GeometryContainer) -> Self {
        let edges = EdgeMap::build(geo.topology());
        let mut attributes = BTreeMap::new();
        let mut group_map = BTreeMap::new();
        for class in ElementClass::ALL {
            let names: Vec<String> = geo
                .attributes(class)
                .attribute_names()
                .into_iter()
                .filter(|name| !name.starts_with(groups::GROUP_PREFIX))
                .collect();
            if !names.is_empty() {
                attributes.insert(class.to_string(), names);
            }
            let class_groups = groups::group_names(geo, class);
            if !class_groups.is_empty() {
                group_map.insert(class.to_string(), class_groups);
            }
        }
        Self {
            points: geo.point_count(),
            vertices: geo.vertex_count(),
            primitives: geo.primitive_count(),
            edges: edges.len(),
            closed: geo.primitive_count() > 0 && edges.is_closed(),
            topology: geo.topology().stats(),
            bounds: geo.bounds(),
            area: surface_area(geo),
            attributes,
            groups: group_map,
        }
    }

    /// V - E + F
    pub fn euler_characteristic(&self) -> i64 {
        self.points as i64 - self.edges as i64 + self.primitives as i64
    }
}
