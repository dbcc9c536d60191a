// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Linear, radial and grid copies of the input

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{standard, AttributeType, ElementClass, InterpolationMode, Mat3f, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use log::debug;

#[derive(Debug, Default)]
pub struct ArrayOp;

/// Rigid placement of one copy.
#[derive(Debug, Clone, Copy)]
struct Placement {
    rotation: Mat3f,
    offset: Vec3f,
}

impl Placement {
    fn translation(offset: Vec3f) -> Self {
        Self {
            rotation: Mat3f::identity(),
            offset,
        }
    }

    /// Rotation about +Y by `degrees`, pushed out to `radius` around `center`.
    fn radial(degrees: f32, radius: f32, center: Vec3f) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        #[rustfmt::skip]
        let rotation = Mat3f::new(
            c, 0.0, s,
            0.0, 1.0, 0.0,
            -s, 0.0, c,
        );
        Self {
            rotation,
            offset: Vec3f::new(radius * s, 0.0, radius * c) + center,
        }
    }
}

fn placements(ctx: &CookContext) -> Result<Vec<Placement>, OperatorError> {
    let count = ctx.get::<usize>("count", 3).max(1);
    let placements = match ctx.get("array_type", 0) {
        0 => {
            let offset = ctx.get("offset", Vec3f::x());
            (0..count)
                .map(|i| Placement::translation(offset * i as f32))
                .collect()
        }
        1 => {
            let center = ctx.get("center", Vec3f::zeros());
            let radius: f32 = ctx.get("radial_radius", 2.0);
            let step: f32 = ctx.get("angle_step", 60.0);
            (0..count)
                .map(|i| Placement::radial(step * i as f32, radius, center))
                .collect()
        }
        2 => {
            let width = ctx.get::<usize>("grid_width", 3).max(1);
            let height = ctx.get::<usize>("grid_height", 3).max(1);
            let sx: f32 = ctx.get("grid_spacing_x", 1.0);
            let sy: f32 = ctx.get("grid_spacing_y", 1.0);
            (0..height)
                .flat_map(|row| {
                    (0..width).map(move |col| {
                        Placement::translation(Vec3f::new(col as f32 * sx, row as f32 * sy, 0.0))
                    })
                })
                .collect()
        }
        other => {
            return Err(OperatorError::invalid_parameter(
                "array_type",
                format!("unknown array type {other}"),
            ))
        }
    };
    Ok(placements)
}

impl Operator for ArrayOp {
    fn kind(&self) -> &'static str {
        "array"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::menu("array_type", 0, &["Linear", "Radial", "Grid"]),
            ParameterDefinition::int("count", 3),
            ParameterDefinition::vector3("offset", Vec3f::x()),
            ParameterDefinition::vector3("center", Vec3f::zeros()),
            ParameterDefinition::float("radial_radius", 2.0),
            ParameterDefinition::float("angle_step", 60.0),
            ParameterDefinition::int("grid_width", 3),
            ParameterDefinition::int("grid_height", 3),
            ParameterDefinition::float("grid_spacing_x", 1.0),
            ParameterDefinition::float("grid_spacing_y", 1.0),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        require_positions(input)?;
        if input.point_count() == 0 {
            return Err(OperatorError::InvalidGeometry("input geometry is empty".into()));
        }

        let placements = placements(ctx)?;
        let mut result = GeometryContainer::new();
        for (copy, placement) in placements.iter().enumerate() {
            let mut instance = input.clone();
            if let Some(positions) = instance.positions_mut() {
                for p in positions.iter_mut() {
                    *p = placement.rotation * *p + placement.offset;
                }
            }
            for class in [ElementClass::Point, ElementClass::Vertex] {
                if let Some(normals) = instance.values_mut::<Vec3f>(class, standard::NORMAL) {
                    for n in normals.iter_mut() {
                        *n = placement.rotation * *n;
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
            "array: {} copies, {} points, {} primitives",
            placements.len(),
            result.point_count(),
            result.primitive_count()
        );
        Ok(result)
    }
}
