// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Seeded random points on polygon surfaces

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{standard, AttributeType, ElementClass, InterpolationMode, Vec3f};
use crate::error::OperatorError;
use crate::geometry::mesh_utils::{triangle_area, triangle_fan};
use crate::geometry::GeometryContainer;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Default)]
pub struct ScatterOp;

#[derive(Debug, Clone, Copy)]
struct Triangle {
    face: usize,
    corners: [Vec3f; 3],
}

impl Triangle {
    /// Uniform sample; (u, v) outside the unit triangle is reflected back.
    fn sample(&self, rng: &mut StdRng) -> Vec3f {
        let (mut u, mut v): (f32, f32) = (rng.gen(), rng.gen());
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        let w = 1.0 - u - v;
        self.corners[0] * w + self.corners[1] * u + self.corners[2] * v
    }
}

fn triangulate(geo: &GeometryContainer, positions: &[Vec3f]) -> Vec<Triangle> {
    let topo = geo.topology();
    let mut triangles = Vec::new();
    for face in 0..topo.primitive_count() {
        let points = topo.primitive_points(face);
        for [a, b, c] in triangle_fan(&points) {
            triangles.push(Triangle {
                face,
                corners: [positions[a], positions[b], positions[c]],
            });
        }
    }
    triangles
}

impl Operator for ScatterOp {
    fn kind(&self) -> &'static str {
        "scatter"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::int("point_count", 100),
            ParameterDefinition::int("seed", 42),
            ParameterDefinition::float("density", 1.0),
            ParameterDefinition::bool("use_face_area", true),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        let positions = require_positions(input)?;
        let point_count: usize = ctx.get("point_count", 100);
        let density: f32 = ctx.get("density", 1.0);
        let use_face_area = ctx.get("use_face_area", true);
        let mut rng = StdRng::seed_from_u64(ctx.get("seed", 42u64));

        let triangles = triangulate(input, positions);
        let mut cloud = GeometryContainer::new();
        cloud.ensure_positions();
        cloud.add_attribute(ElementClass::Point, standard::ID, AttributeType::Int, InterpolationMode::Discrete);
        cloud.add_attribute(
            ElementClass::Point,
            standard::SOURCE_FACE,
            AttributeType::Int,
            InterpolationMode::Discrete,
        );
        if triangles.is_empty() {
            return Ok(cloud);
        }

        let mut cumulative = Vec::with_capacity(triangles.len());
        let mut total = 0.0f32;
        for t in &triangles {
            total += triangle_area(&t.corners[0], &t.corners[1], &t.corners[2]);
            cumulative.push(total);
        }
        let by_area = use_face_area && total > 0.0;

        let count = ((point_count as f32 * density) as usize).max(1);
        let mut samples = Vec::with_capacity(count);
        let mut faces = Vec::with_capacity(count);
        for _ in 0..count {
            let index = if by_area {
                let target = rng.gen::<f32>() * total;
                cumulative
                    .partition_point(|&c| c < target)
                    .min(triangles.len() - 1)
            } else {
                rng.gen_range(0..triangles.len())
            };
            let triangle = &triangles[index];
            samples.push(triangle.sample(&mut rng));
            faces.push(triangle.face as i32);
        }

        cloud.set_point_count(count);
        if let Some(p) = cloud.positions_mut() {
            p.copy_from_slice(&samples);
        }
        if let Some(ids) = cloud.values_mut::<i32>(ElementClass::Point, standard::ID) {
            for (i, id) in ids.iter_mut().enumerate() {
                *id = i as i32;
            }
        }
        if let Some(dst) = cloud.values_mut::<i32>(ElementClass::Point, standard::SOURCE_FACE) {
            dst.copy_from_slice(&faces);
        }
        debug!(
            "scatter: {} points over {} triangles (area {total})",
            count,
            triangles.len()
        );
        Ok(cloud)
    }
}
