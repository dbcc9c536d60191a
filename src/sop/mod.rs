// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Surface operators
//!
//! Each operator is a stateless [`Operator`] wrapped by a [`SopNode`] that
//! holds its parameter values, inputs and cached output.

pub mod array;
pub mod bevel;
pub mod copy_to_points;
pub mod delete;
pub mod fuse;
pub mod group;
pub mod laplacian;
pub mod merge;
pub mod mirror;
pub mod node;
pub mod noise_displacement;
pub mod normal;
pub mod polyextrude;
pub mod resample;
pub mod scatter;
pub mod subdivide;
pub mod transform;
pub mod wrangle;

pub use node::{
    CookContext, ExecutionState, FromParameter, Operator, ParameterDefinition, ParameterKind,
    ParameterValue, SopNode, INPUT_GROUP, VARIADIC,
};

use crate::attributes::{standard, ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;

/// Every operator kind known to [`create_operator`].
pub const OPERATOR_KINDS: &[&str] = &[
    "array",
    "bevel",
    "copy_to_points",
    "delete",
    "fuse",
    "group",
    "laplacian",
    "merge",
    "mirror",
    "noise_displacement",
    "normal",
    "polyextrude",
    "resample",
    "scatter",
    "subdivide",
    "transform",
    "wrangle",
];

/// Operator registry keyed by kind name.
pub fn create_operator(kind: &str) -> Option<Box<dyn Operator>> {
    let op: Box<dyn Operator> = match kind {
        "array" => Box::new(array::ArrayOp),
        "bevel" => Box::new(bevel::BevelOp),
        "copy_to_points" => Box::new(copy_to_points::CopyToPointsOp),
        "delete" => Box::new(delete::DeleteOp),
        "fuse" => Box::new(fuse::FuseOp),
        "group" => Box::new(group::GroupOp),
        "laplacian" => Box::new(laplacian::LaplacianOp),
        "merge" => Box::new(merge::MergeOp),
        "mirror" => Box::new(mirror::MirrorOp),
        "noise_displacement" => Box::new(noise_displacement::NoiseDisplacementOp),
        "normal" => Box::new(normal::NormalOp),
        "polyextrude" => Box::new(polyextrude::PolyExtrudeOp),
        "resample" => Box::new(resample::ResampleOp),
        "scatter" => Box::new(scatter::ScatterOp),
        "subdivide" => Box::new(subdivide::SubdivideOp),
        "transform" => Box::new(transform::TransformOp),
        "wrangle" => Box::new(wrangle::WrangleOp),
        _ => return None,
    };
    Some(op)
}

/// Point/Primitive menus: index 0 is points, anything else primitives.
pub(crate) fn class_from_menu(index: i32) -> ElementClass {
    if index == 0 {
        ElementClass::Point
    } else {
        ElementClass::Primitive
    }
}

/// The point positions, or a missing-attribute error.
pub(crate) fn require_positions(geo: &GeometryContainer) -> Result<&[Vec3f], OperatorError> {
    geo.positions()
        .ok_or_else(|| OperatorError::missing_attribute(standard::POSITION, ElementClass::Point))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_kind() {
        for kind in OPERATOR_KINDS {
            let op = create_operator(kind).unwrap();
            assert_eq!(op.kind(), *kind);
        }
        assert!(create_operator("boolean").is_none());
    }

    #[test]
    fn test_parameter_names_are_unique() {
        for kind in OPERATOR_KINDS {
            let defs = create_operator(kind).unwrap().parameters();
            let mut names: Vec<_> = defs.iter().map(|d| d.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), defs.len(), "{kind}");
        }
    }

    #[test]
    fn test_menu_defaults_index_options() {
        for kind in OPERATOR_KINDS {
            for def in create_operator(kind).unwrap().parameters() {
                if let (false, ParameterValue::Int(i)) = (def.options.is_empty(), &def.default) {
                    assert!((*i as usize) < def.options.len(), "{kind}.{}", def.name);
                }
            }
        }
    }
}
