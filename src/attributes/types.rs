// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Element classes, attribute value types and interpolation modes

use nalgebra::{Matrix3, Matrix4, Quaternion, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Vec2f = Vector2<f32>;
pub type Vec3f = Vector3<f32>;
pub type Vec4f = Vector4<f32>;
pub type Mat3f = Matrix3<f32>;
pub type Mat4f = Matrix4<f32>;
pub type Quatf = Quaternion<f32>;

/// Which level of the geometry hierarchy an attribute belongs to.
///
/// The derived ordering (Point < Vertex < Primitive < Detail) is the
/// promotion order used by the promotion/demotion operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementClass {
    Point,
    Vertex,
    Primitive,
    Detail,
}

impl ElementClass {
    pub const ALL: [ElementClass; 4] = [
        ElementClass::Point,
        ElementClass::Vertex,
        ElementClass::Primitive,
        ElementClass::Detail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ElementClass::Point => "point",
            ElementClass::Vertex => "vertex",
            ElementClass::Primitive => "primitive",
            ElementClass::Detail => "detail",
        }
    }
}

impl fmt::Display for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value type stored by an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Matrix3,
    Matrix4,
    Quaternion,
    String,
}

impl AttributeType {
    pub const ALL: [AttributeType; 9] = [
        AttributeType::Float,
        AttributeType::Int,
        AttributeType::Vec2,
        AttributeType::Vec3,
        AttributeType::Vec4,
        AttributeType::Matrix3,
        AttributeType::Matrix4,
        AttributeType::Quaternion,
        AttributeType::String,
    ];

    /// Size of one element in bytes.
    pub fn size_of(&self) -> usize {
        match self {
            AttributeType::String => std::mem::size_of::<String>(),
            other => other.component_count() * 4,
        }
    }

    pub fn component_count(&self) -> usize {
        match self {
            AttributeType::Float | AttributeType::Int => 1,
            AttributeType::Vec2 => 2,
            AttributeType::Vec3 => 3,
            AttributeType::Vec4 | AttributeType::Quaternion => 4,
            AttributeType::Matrix3 => 9,
            AttributeType::Matrix4 => 16,
            AttributeType::String => 0,
        }
    }

    pub fn default_interpolation(&self) -> InterpolationMode {
        match self {
            AttributeType::Quaternion => InterpolationMode::QuaternionSlerp,
            AttributeType::Int | AttributeType::String => InterpolationMode::Discrete,
            _ => InterpolationMode::Linear,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, AttributeType::String)
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            AttributeType::Vec2 | AttributeType::Vec3 | AttributeType::Vec4
        )
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, AttributeType::Matrix3 | AttributeType::Matrix4)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::Float => "float",
            AttributeType::Int => "int",
            AttributeType::Vec2 => "vec2f",
            AttributeType::Vec3 => "vec3f",
            AttributeType::Vec4 => "vec4f",
            AttributeType::Matrix3 => "matrix3",
            AttributeType::Matrix4 => "matrix4",
            AttributeType::Quaternion => "quaternion",
            AttributeType::String => "string",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How values are blended when new elements are generated from old ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolationMode {
    Linear,
    Discrete,
    QuaternionSlerp,
    Smooth,
}

impl InterpolationMode {
    pub fn name(&self) -> &'static str {
        match self {
            InterpolationMode::Linear => "linear",
            InterpolationMode::Discrete => "discrete",
            InterpolationMode::QuaternionSlerp => "slerp",
            InterpolationMode::Smooth => "smooth",
        }
    }

    /// Resolve a generic "linear" request to the type's natural mode.
    pub fn resolve(self, attr_type: AttributeType) -> InterpolationMode {
        if self == InterpolationMode::Linear {
            attr_type.default_interpolation()
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_counts() {
        assert_eq!(AttributeType::Float.component_count(), 1);
        assert_eq!(AttributeType::Vec3.component_count(), 3);
        assert_eq!(AttributeType::Matrix3.component_count(), 9);
        assert_eq!(AttributeType::Matrix4.component_count(), 16);
        assert_eq!(AttributeType::Quaternion.component_count(), 4);
        assert_eq!(AttributeType::String.component_count(), 0);
        assert_eq!(AttributeType::Vec3.size_of(), 12);
        assert_eq!(AttributeType::Matrix4.size_of(), 64);
    }

    #[test]
    fn test_default_interpolation() {
        assert_eq!(
            AttributeType::Quaternion.default_interpolation(),
            InterpolationMode::QuaternionSlerp
        );
        assert_eq!(AttributeType::Int.default_interpolation(), InterpolationMode::Discrete);
        assert_eq!(AttributeType::String.default_interpolation(), InterpolationMode::Discrete);
        assert_eq!(AttributeType::Vec3.default_interpolation(), InterpolationMode::Linear);
        assert_eq!(
            InterpolationMode::Linear.resolve(AttributeType::Int),
            InterpolationMode::Discrete
        );
        assert_eq!(
            InterpolationMode::Smooth.resolve(AttributeType::Int),
            InterpolationMode::Smooth
        );
    }

    #[test]
    fn test_classification() {
        assert!(!AttributeType::String.is_numeric());
        assert!(AttributeType::Int.is_numeric());
        assert!(AttributeType::Vec2.is_vector());
        assert!(!AttributeType::Quaternion.is_vector());
        assert!(AttributeType::Matrix3.is_matrix());
        assert!(ElementClass::Point < ElementClass::Vertex);
        assert!(ElementClass::Vertex < ElementClass::Primitive);
    }
}
