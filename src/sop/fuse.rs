// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Merge points closer than a distance threshold

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use ahash::AHashMap;
use log::debug;

pub const DEFAULT_THRESHOLD: f32 = 0.001;

/// Smallest hash cell, used when the threshold is zero.
const MIN_CELL: f32 = 1e-6;

#[derive(Debug, Default)]
pub struct FuseOp;

type Cell = [i64; 3];

fn cell_of(p: &Vec3f, size: f32) -> Cell {
    [
        (p.x / size).floor() as i64,
        (p.y / size).floor() as i64,
        (p.z / size).floor() as i64,
    ]
}

/// For every point, the point it fuses into. Points are visited in index
/// order and join the lowest-indexed earlier survivor within `threshold`;
/// survivors map to themselves. Points outside `movable` never move.
pub fn fuse_map(positions: &[Vec3f], threshold: f32, movable: &[bool]) -> Vec<usize> {
    let size = threshold.max(MIN_CELL);
    let mut grid: AHashMap<Cell, Vec<usize>> = AHashMap::new();
    let mut map = Vec::with_capacity(positions.len());
    for (i, p) in positions.iter().enumerate() {
        let [cx, cy, cz] = cell_of(p, size);
        if !movable.get(i).copied().unwrap_or(false) {
            // kept in place but still a fusing target
            grid.entry([cx, cy, cz]).or_default().push(i);
            map.push(i);
            continue;
        }
        let mut target = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(survivors) = grid.get(&[cx + dx, cy + dy, cz + dz]) else {
                        continue;
                    };
                    let hit = survivors
                        .iter()
                        .copied()
                        .find(|&s| (positions[s] - p).norm() <= threshold);
                    if let Some(s) = hit {
                        target = Some(target.map_or(s, |t: usize| t.min(s)));
                    }
                }
            }
        }
        match target {
            Some(s) => map.push(s),
            None => {
                grid.entry([cx, cy, cz]).or_default().push(i);
                map.push(i);
            }
        }
    }
    map
}

impl Operator for FuseOp {
    fn kind(&self) -> &'static str {
        "fuse"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::float("threshold", DEFAULT_THRESHOLD),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        let positions = require_positions(input)?;
        let threshold: f32 = ctx.get("threshold", DEFAULT_THRESHOLD);
        if threshold < 0.0 {
            return Err(OperatorError::invalid_parameter("threshold", "must not be negative"));
        }
        let movable = ctx.selection(input, ElementClass::Point)?;
        let map = fuse_map(positions, threshold, &movable);
        let fused: Vec<usize> = map
            .iter()
            .enumerate()
            .filter(|&(i, &target)| i != target)
            .map(|(i, _)| i)
            .collect();
        if fused.is_empty() {
            return Ok(input.clone());
        }

        // rewire vertices onto survivors, then drop the now unreferenced points
        let mut geo = input.clone();
        let vertex_points = geo.topology().vertex_points().to_vec();
        for (v, p) in vertex_points.into_iter().enumerate() {
            if let Some(&target) = map.get(p) {
                if target != p {
                    geo.topology_mut().set_vertex_point(v, target)?;
                }
            }
        }
        let result = geo.delete_points(&fused);
        debug!(
            "fuse: {} of {} points merged (threshold {threshold})",
            fused.len(),
            input.point_count()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::groups;
    use crate::geometry::mesh_utils::EdgeMap;
    use crate::geometry::primitives::grid;
    use crate::sop::node::SopNode;

    /// Two quads sharing an edge in space but not in topology.
    fn split_quads() -> GeometryContainer {
        let positions = [
            Vec3f::new(0.0, 0.0, 0.0),
            Vec3f::new(1.0, 0.0, 0.0),
            Vec3f::new(1.0, 1.0, 0.0),
            Vec3f::new(0.0, 1.0, 0.0),
            Vec3f::new(1.0, 0.0, 0.0),
            Vec3f::new(2.0, 0.0, 0.0),
            Vec3f::new(2.0, 1.0, 0.0),
            Vec3f::new(1.0005, 1.0, 0.0),
        ];
        GeometryContainer::from_polygons(&positions, &[vec![0, 1, 2, 3], vec![4, 5, 6, 7]]).unwrap()
    }

    fn fuse(geo: GeometryContainer, threshold: f32) -> GeometryContainer {
        let mut node = SopNode::new("fuse1", Box::new(FuseOp));
        node.set_input(0, geo);
        node.set_parameter("threshold", threshold);
        node.cook().unwrap().into_inner()
    }

    #[test]
    fn test_fuse_stitches_shared_edge() {
        let out = fuse(split_quads(), DEFAULT_THRESHOLD);
        assert_eq!(out.point_count(), 6);
        assert_eq!(out.primitive_count(), 2);
        assert!(out.validate());
        // the stitched edge now has two faces
        let edges = EdgeMap::build(out.topology());
        assert_eq!(edges.len(), 7);
        assert_eq!(edges.boundary_edges().count(), 6);
    }

    #[test]
    fn test_survivor_keeps_its_position() {
        let out = fuse(split_quads(), DEFAULT_THRESHOLD);
        let p = out.positions().unwrap();
        assert_eq!(p[2], Vec3f::new(1.0, 1.0, 0.0));
        assert_eq!(out.topology().primitive_points(1), vec![1, 4, 5, 2]);
    }

    #[test]
    fn test_threshold_too_small_is_identity() {
        let out = fuse(split_quads(), 1e-4);
        assert_eq!(out.point_count(), 7);
        let exact = fuse(split_quads(), 0.0);
        assert_eq!(exact.point_count(), 7);
    }

    #[test]
    fn test_separate_grid_points_untouched() {
        let out = fuse(grid(2.0, 2.0, 3, 3), 0.1);
        assert_eq!(out.point_count(), 9);
    }

    #[test]
    fn test_group_limits_fusing() {
        let mut geo = split_quads();
        groups::create_group(&mut geo, "seam", ElementClass::Point);
        groups::add_elements(&mut geo, "seam", ElementClass::Point, &[4]);
        let mut node = SopNode::new("fuse1", Box::new(FuseOp));
        node.set_input(0, geo);
        node.set_parameter("input_group", "seam");
        let out = node.cook().unwrap();
        assert_eq!(out.point_count(), 7);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut node = SopNode::new("fuse1", Box::new(FuseOp));
        node.set_input(0, split_quads());
        node.set_parameter("threshold", -1.0f32);
        assert!(node.cook().is_none());
    }

    #[test]
    fn test_fuse_map_prefers_lowest_survivor() {
        let positions = [Vec3f::zeros(), Vec3f::new(0.4, 0.0, 0.0), Vec3f::new(0.2, 0.0, 0.0)];
        let map = fuse_map(&positions, 0.3, &[true; 3]);
        assert_eq!(map, vec![0, 1, 0]);
    }
}
