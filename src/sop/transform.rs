// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Translate, rotate and scale points about a pivot

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{standard, ElementClass, Mat3f, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use nalgebra::Rotation3;

#[derive(Debug, Default)]
pub struct TransformOp;

/// Rotation applied X first, then Y, then Z. Angles in degrees.
pub fn rotation_xyz(degrees: &Vec3f) -> Rotation3<f32> {
    Rotation3::from_euler_angles(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    )
}

impl Operator for TransformOp {
    fn kind(&self) -> &'static str {
        "transform"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::vector3("translate", Vec3f::zeros()),
            ParameterDefinition::vector3("rotate", Vec3f::zeros()),
            ParameterDefinition::vector3("scale", Vec3f::repeat(1.0)),
            ParameterDefinition::vector3("pivot", Vec3f::zeros()),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        require_positions(input)?;
        let translate = ctx.get("translate", Vec3f::zeros());
        let rotate = ctx.get("rotate", Vec3f::zeros());
        let scale = ctx.get("scale", Vec3f::repeat(1.0));
        let pivot = ctx.get("pivot", Vec3f::zeros());
        let selected = ctx.selection(input, ElementClass::Point)?;

        let rotation = rotation_xyz(&rotate);
        let linear: Mat3f = rotation.matrix() * Mat3f::from_diagonal(&scale);
        // normals take the inverse transpose; a zero scale axis keeps rotation only
        let normal_matrix = if scale.iter().all(|s| s.abs() > f32::EPSILON) {
            rotation.matrix() * Mat3f::from_diagonal(&scale.map(|s| 1.0 / s))
        } else {
            *rotation.matrix()
        };

        let mut geo = input.clone();
        if let Some(positions) = geo.positions_mut() {
            for (p, _) in positions.iter_mut().zip(&selected).filter(|(_, s)| **s) {
                *p = linear * (*p - pivot) + pivot + translate;
            }
        }

        let transform_normal = |n: &mut Vec3f| {
            *n = (normal_matrix * *n).try_normalize(1e-12).unwrap_or(*n);
        };
        if let Some(normals) = geo.values_mut::<Vec3f>(ElementClass::Point, standard::NORMAL) {
            for (n, _) in normals.iter_mut().zip(&selected).filter(|(_, s)| **s) {
                transform_normal(n);
            }
        }
        let vertex_selected: Vec<bool> = geo
            .topology()
            .vertex_points()
            .iter()
            .map(|&p| selected.get(p).copied().unwrap_or(false))
            .collect();
        if let Some(normals) = geo.values_mut::<Vec3f>(ElementClass::Vertex, standard::NORMAL) {
            for (n, _) in normals.iter_mut().zip(&vertex_selected).filter(|(_, s)| **s) {
                transform_normal(n);
            }
        }
        Ok(geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::groups;
    use crate::geometry::primitives::{box_geometry, line};
    use crate::sop::node::SopNode;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_order() {
        // X then Y: +Y goes to +Z under 90 about X, then to +X under 90 about Y
        let r = rotation_xyz(&Vec3f::new(90.0, 90.0, 0.0));
        assert_relative_eq!(r * Vec3f::y(), Vec3f::x(), epsilon = 1e-5);
    }

    #[test]
    fn test_scale_about_pivot() {
        let mut node = SopNode::new("xform1", Box::new(TransformOp));
        node.set_input(0, line(Vec3f::zeros(), Vec3f::new(2.0, 0.0, 0.0), 3));
        node.set_parameter("scale", Vec3f::new(2.0, 1.0, 1.0));
        node.set_parameter("pivot", Vec3f::new(2.0, 0.0, 0.0));
        node.set_parameter("translate", Vec3f::new(0.0, 1.0, 0.0));
        let out = node.cook().unwrap();
        let p = out.positions().unwrap();
        assert_relative_eq!(p[0], Vec3f::new(-2.0, 1.0, 0.0));
        assert_relative_eq!(p[2], Vec3f::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_group_limits_points_and_normals() {
        let mut geo = box_geometry(Vec3f::repeat(2.0), true);
        geo.ensure_values::<Vec3f>(ElementClass::Point, "N")
            .unwrap()
            .fill(Vec3f::y());
        groups::create_group(&mut geo, "moved", ElementClass::Point);
        groups::add_to_group(&mut geo, "moved", ElementClass::Point, 0);
        let mut node = SopNode::new("xform1", Box::new(TransformOp));
        node.set_input(0, geo);
        node.set_parameter("input_group", "moved");
        node.set_parameter("rotate", Vec3f::new(0.0, 0.0, 90.0));
        let out = node.cook().unwrap();
        let n = out.values::<Vec3f>(ElementClass::Point, "N").unwrap();
        assert_relative_eq!(n[0], -Vec3f::x(), epsilon = 1e-5);
        assert_relative_eq!(n[1], Vec3f::y());
        assert_relative_eq!(out.positions().unwrap()[0], Vec3f::new(1.0, -1.0, -1.0), epsilon = 1e-5);
    }
}
