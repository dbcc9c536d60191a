// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Typed, structure-of-arrays attribute system

pub mod descriptor;
pub mod set;
pub mod standard;
pub mod storage;
pub mod types;
pub mod value;

pub use descriptor::{AttributeDescriptor, AttributeDescriptorBuilder};
pub use set::AttributeSet;
pub use storage::AttributeStorage;
pub use types::{
    AttributeType, ElementClass, InterpolationMode, Mat3f, Mat4f, Quatf, Vec2f, Vec3f, Vec4f,
};
pub use value::{AttributeData, AttributeValue, Averageable};
