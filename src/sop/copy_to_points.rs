// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Instance a template onto every point of another geometry
//!
//! Port 0 carries the target points, port 1 the template. Each copy is
//! scaled by `uniform_scale` (times the point's `pscale` when enabled),
//! turned so the template's +Z follows the point normal `N` when enabled,
//! and moved onto the point.

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{standard, AttributeType, ElementClass, InterpolationMode, Mat3f, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use log::debug;

const MIN_NORMAL_LENGTH: f32 = 1e-6;

#[derive(Debug, Default)]
pub struct CopyToPointsOp;

/// Rotation taking +Z onto `normal`, with +X kept horizontal. Identity for
/// near-zero normals.
pub fn align_z(normal: &Vec3f) -> Mat3f {
    let Some(z) = normal.try_normalize(MIN_NORMAL_LENGTH) else {
        return Mat3f::identity();
    };
    let x = Vec3f::y()
        .cross(&z)
        .try_normalize(MIN_NORMAL_LENGTH)
        .or_else(|| Vec3f::x().cross(&z).try_normalize(MIN_NORMAL_LENGTH))
        .unwrap_or_else(Vec3f::x);
    let y = z.cross(&x);
    Mat3f::from_columns(&[x, y, z])
}

impl Operator for CopyToPointsOp {
    fn kind(&self) -> &'static str {
        "copy_to_points"
    }

    fn input_count(&self) -> usize {
        2
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::bool("use_point_normals", true),
            ParameterDefinition::bool("use_point_scale", true),
            ParameterDefinition::float("uniform_scale", 1.0),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let targets = ctx.require_input(0)?;
        let template = ctx.require_input(1)?;
        let points = require_positions(targets)?;
        require_positions(template)?;

        let uniform_scale: f32 = ctx.get("uniform_scale", 1.0);
        let normals = ctx
            .get("use_point_normals", true)
            .then(|| targets.values::<Vec3f>(ElementClass::Point, standard::NORMAL))
            .flatten();
        let scales = ctx
            .get("use_point_scale", true)
            .then(|| targets.values::<f32>(ElementClass::Point, standard::PSCALE))
            .flatten();

        let mut result = GeometryContainer::new();
        if points.is_empty() || template.point_count() == 0 {
            return Ok(result);
        }
        for (copy, &target) in points.iter().enumerate() {
            let rotation = normals.and_then(|n| n.get(copy)).map_or_else(Mat3f::identity, align_z);
            let scale = uniform_scale * scales.and_then(|s| s.get(copy)).copied().unwrap_or(1.0);

            let mut instance = template.clone();
            if let Some(positions) = instance.positions_mut() {
                for p in positions.iter_mut() {
                    *p = rotation * (*p * scale) + target;
                }
            }
            for class in [ElementClass::Point, ElementClass::Vertex] {
                if let Some(n) = instance.values_mut::<Vec3f>(class, standard::NORMAL) {
                    for v in n.iter_mut() {
                        *v = (rotation * *v).try_normalize(MIN_NORMAL_LENGTH).unwrap_or(*v);
                    }
                }
            }
            instance.add_attribute(
                ElementClass::Primitive,
                standard::INSTANCE_ID,
                AttributeType::Int,
                InterpolationMode::Discrete,
            );
            if let Some(ids) = instance.values_mut::<i32>(ElementClass::Primitive, standard::INSTANCE_ID) {
                ids.fill(copy as i32);
            }
            result.merge(&instance)?;
        }
        debug!(
            "copy_to_points: {} copies of {} points",
            points.len(),
            template.point_count()
        );
        Ok(result)
    }
}
