// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Extrude polygons along their normals, per face or as connected regions

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::mesh_utils::{centroid, newell_normal, EdgeKey};
use crate::geometry::GeometryContainer;
use ahash::AHashMap;
use log::debug;

const MIN_INSET: f32 = 1e-4;

#[derive(Debug, Default)]
pub struct PolyExtrudeOp;

#[derive(Debug, Clone, Copy)]
struct Settings {
    distance: f32,
    inset: f32,
}

impl Settings {
    /// Top position for a corner: pulled toward `center` by the inset, then
    /// pushed along `normal`.
    fn top(&self, p: Vec3f, center: Vec3f, normal: Vec3f) -> Vec3f {
        p + (center - p) * self.inset + normal * self.distance
    }
}

/// Each face becomes its own closed prism: reversed bottom, walls, top.
fn extrude_individual(
    geo: &mut GeometryContainer,
    faces: &[usize],
    settings: Settings,
) -> Result<(), OperatorError> {
    for &face in faces {
        let ring = geo.topology().primitive_points(face);
        let positions = require_positions(geo)?;
        let normal = newell_normal(positions, &ring);
        let center = centroid(positions, &ring);
        let flat = Settings {
            distance: 0.0,
            ..settings
        };
        let base_pos: Vec<Vec3f> = ring.iter().map(|&p| flat.top(positions[p], center, normal)).collect();
        let top_pos: Vec<Vec3f> = ring
            .iter()
            .map(|&p| settings.top(positions[p], center, normal))
            .collect();

        let mut base = Vec::with_capacity(ring.len());
        let mut top = Vec::with_capacity(ring.len());
        for (k, &p) in ring.iter().enumerate() {
            let b = geo.add_point_blended(&[(p, 1.0)]);
            let t = geo.add_point_blended(&[(p, 1.0)]);
            if let Some(dst) = geo.positions_mut() {
                dst[b] = base_pos[k];
                dst[t] = top_pos[k];
            }
            base.push(b);
            top.push(t);
        }

        let bottom: Vec<usize> = base.iter().rev().copied().collect();
        geo.add_polygon_like(&bottom, face)?;
        let n = ring.len();
        for k in 0..n {
            let next = (k + 1) % n;
            geo.add_polygon_like(&[base[k], base[next], top[next], top[k]], face)?;
        }
        geo.add_polygon_like(&top, face)?;
    }
    Ok(())
}

/// Selected faces move together; only edges on the region border get walls.
fn extrude_region(
    geo: &mut GeometryContainer,
    faces: &[usize],
    settings: Settings,
) -> Result<(), OperatorError> {
    let positions = require_positions(geo)?.to_vec();
    let rings: Vec<Vec<usize>> = faces.iter().map(|&f| geo.topology().primitive_points(f)).collect();

    // per point: summed normal and centroid over the selected faces
    let mut accum: AHashMap<usize, (Vec3f, Vec3f, f32)> = AHashMap::new();
    let mut order = Vec::new();
    let mut edge_uses: AHashMap<EdgeKey, usize> = AHashMap::new();
    for ring in &rings {
        let normal = newell_normal(&positions, ring);
        let center = centroid(&positions, ring);
        for (k, &p) in ring.iter().enumerate() {
            let entry = accum.entry(p).or_insert_with(|| {
                order.push(p);
                (Vec3f::zeros(), Vec3f::zeros(), 0.0)
            });
            entry.0 += normal;
            entry.1 += center;
            entry.2 += 1.0;
            *edge_uses
                .entry(EdgeKey::new(p, ring[(k + 1) % ring.len()]))
                .or_insert(0) += 1;
        }
    }

    let mut lifted = AHashMap::with_capacity(order.len());
    for &p in &order {
        let (normal_sum, center_sum, count) = accum[&p];
        let normal = normal_sum.try_normalize(1e-12).unwrap_or_else(Vec3f::zeros);
        let position = settings.top(positions[p], center_sum / count, normal);
        let t = geo.add_point_blended(&[(p, 1.0)]);
        if let Some(dst) = geo.positions_mut() {
            dst[t] = position;
        }
        lifted.insert(p, t);
    }

    for (ring, &face) in rings.iter().zip(faces) {
        let n = ring.len();
        for k in 0..n {
            let (a, b) = (ring[k], ring[(k + 1) % n]);
            if edge_uses[&EdgeKey::new(a, b)] == 1 {
                geo.add_polygon_like(&[a, b, lifted[&b], lifted[&a]], face)?;
            }
        }
        let top: Vec<usize> = ring.iter().map(|p| lifted[p]).collect();
        geo.add_polygon_like(&top, face)?;
    }
    Ok(())
}

impl Operator for PolyExtrudeOp {
    fn kind(&self) -> &'static str {
        "polyextrude"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::float("distance", 1.0),
            ParameterDefinition::float("inset", 0.0),
            ParameterDefinition::bool("individual_faces", true),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        require_positions(input)?;
        let inset: f32 = ctx.get("inset", 0.0);
        let settings = Settings {
            distance: ctx.get("distance", 1.0),
            inset: if inset > MIN_INSET { inset.min(1.0) } else { 0.0 },
        };
        let individual = ctx.get("individual_faces", true);
        let selected = ctx.selection(input, ElementClass::Primitive)?;
        let faces: Vec<usize> = (0..input.primitive_count())
            .filter(|&f| selected[f] && input.topology().primitive_vertices(f).len() >= 3)
            .collect();
        if faces.is_empty() {
            return Ok(input.clone());
        }

        let mut geo = input.clone();
        if individual {
            extrude_individual(&mut geo, &faces, settings)?;
        } else {
            extrude_region(&mut geo, &faces, settings)?;
        }
        let result = geo.delete_primitives(&faces, true);
        debug!(
            "polyextrude: {} faces, {} points, {} primitives",
            faces.len(),
            result.point_count(),
            result.primitive_count()
        );
        Ok(result)
    }
}
