// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Reflect geometry across an axis plane or a custom plane

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{standard, ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use log::debug;

#[derive(Debug, Default)]
pub struct MirrorOp;

/// Plane through `origin` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Vec3f,
    pub normal: Vec3f,
}

impl Plane {
    pub fn reflect_point(&self, p: &Vec3f) -> Vec3f {
        p - self.normal * (2.0 * (p - self.origin).dot(&self.normal))
    }

    pub fn reflect_direction(&self, d: &Vec3f) -> Vec3f {
        d - self.normal * (2.0 * d.dot(&self.normal))
    }
}

fn plane(ctx: &CookContext) -> Result<Plane, OperatorError> {
    let normal = match ctx.get("plane", 2) {
        0 => Vec3f::z(),
        1 => Vec3f::y(),
        2 => Vec3f::x(),
        _ => ctx
            .get("custom_normal", Vec3f::y())
            .try_normalize(1e-12)
            .ok_or_else(|| OperatorError::invalid_parameter("custom_normal", "must not be zero"))?,
    };
    let origin = if ctx.get("plane", 2) == 3 {
        ctx.get("custom_point", Vec3f::zeros())
    } else {
        Vec3f::zeros()
    };
    Ok(Plane { origin, normal })
}

/// Reflected copy of `geo` with every primitive's winding flipped, so
/// faces keep pointing outward.
pub fn mirrored(geo: &GeometryContainer, plane: &Plane) -> GeometryContainer {
    let mut out = geo.clone();
    if let Some(positions) = out.positions_mut() {
        for p in positions.iter_mut() {
            *p = plane.reflect_point(p);
        }
    }
    for class in [ElementClass::Point, ElementClass::Vertex, ElementClass::Primitive] {
        if let Some(normals) = out.values_mut::<Vec3f>(class, standard::NORMAL) {
            for n in normals.iter_mut() {
                *n = plane.reflect_direction(n);
            }
        }
    }
    for prim in 0..out.primitive_count() {
        out.topology_mut().reverse_primitive(prim);
    }
    out
}

impl Operator for MirrorOp {
    fn kind(&self) -> &'static str {
        "mirror"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::menu("plane", 2, &["XY", "XZ", "YZ", "Custom"]),
            ParameterDefinition::vector3("custom_point", Vec3f::zeros()),
            ParameterDefinition::vector3("custom_normal", Vec3f::y()),
            ParameterDefinition::bool("keep_original", true),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        require_positions(input)?;
        let plane = plane(ctx)?;
        let reflected = mirrored(input, &plane);
        let result = if ctx.get("keep_original", true) {
            let mut both = input.clone();
            both.merge(&reflected)?;
            both
        } else {
            reflected
        };
        debug!(
            "mirror: across {:?} through {:?}, {} points",
            plane.normal.as_slice(),
            plane.origin.as_slice(),
            result.point_count()
        );
        Ok(result)
    }
}
