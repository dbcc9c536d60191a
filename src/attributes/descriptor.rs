// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Attribute schema: name, type, owner, interpolation and default value

use super::types::{AttributeType, ElementClass, InterpolationMode};
use super::value::AttributeValue;

/// Schema of one attribute.
///
/// Lookup equality (`==`) compares the name only; use [`equals`](Self::equals)
/// to compare every field.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    name: String,
    attr_type: AttributeType,
    owner: ElementClass,
    interpolation: InterpolationMode,
    version: u64,
    default_value: Option<Vec<u8>>,
}

impl AttributeDescriptor {
    pub fn new(
        name: impl Into<String>,
        attr_type: AttributeType,
        owner: ElementClass,
        interpolation: InterpolationMode,
    ) -> Self {
        Self {
            name: name.into(),
            attr_type,
            owner,
            interpolation: interpolation.resolve(attr_type),
            version: 0,
            default_value: None,
        }
    }

    pub fn builder(
        name: impl Into<String>,
        attr_type: AttributeType,
        owner: ElementClass,
    ) -> AttributeDescriptorBuilder {
        AttributeDescriptorBuilder {
            descriptor: Self::new(name, attr_type, owner, InterpolationMode::Linear),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    pub fn owner(&self) -> ElementClass {
        self.owner
    }

    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn increment_version(&mut self) {
        self.version += 1;
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    pub fn default_bytes(&self) -> Option<&[u8]> {
        self.default_value.as_deref()
    }

    /// Decode the stored default. `None` when unset or of another type.
    pub fn default_value<T: AttributeValue>(&self) -> Option<T> {
        if T::TYPE != self.attr_type {
            return None;
        }
        self.default_value.as_deref().and_then(T::from_bytes)
    }

    /// Store a default value. Returns false on a type mismatch.
    /// Strings have no default machinery and always return false.
    pub fn set_default_value<T: AttributeValue>(&mut self, value: &T) -> bool {
        if T::TYPE != self.attr_type || T::TYPE == AttributeType::String {
            return false;
        }
        self.default_value = Some(value.to_bytes());
        self.increment_version();
        true
    }

    pub(crate) fn with_owner(mut self, owner: ElementClass) -> Self {
        self.owner = owner;
        self
    }

    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Full structural comparison.
    pub fn equals(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attr_type == other.attr_type
            && self.owner == other.owner
            && self.interpolation == other.interpolation
            && self.version == other.version
            && self.default_value == other.default_value
    }
}

impl PartialEq for AttributeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AttributeDescriptor {}

pub struct AttributeDescriptorBuilder {
    descriptor: AttributeDescriptor,
}

impl AttributeDescriptorBuilder {
    pub fn interpolation(mut self, mode: InterpolationMode) -> Self {
        self.descriptor.interpolation = mode.resolve(self.descriptor.attr_type);
        self
    }

    pub fn default_value<T: AttributeValue>(mut self, value: T) -> Self {
        self.descriptor.set_default_value(&value);
        self
    }

    pub fn build(self) -> AttributeDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Vec3f;

    #[test]
    fn test_lookup_equality_is_name_only() {
        let a = AttributeDescriptor::new("P", AttributeType::Vec3, ElementClass::Point, InterpolationMode::Linear);
        let b = AttributeDescriptor::new("P", AttributeType::Float, ElementClass::Vertex, InterpolationMode::Linear);
        assert_eq!(a, b);
        assert!(!a.equals(&b));
        assert!(a.equals(&a.clone()));
    }

    #[test]
    fn test_linear_request_resolves_per_type() {
        let q = AttributeDescriptor::new("orient", AttributeType::Quaternion, ElementClass::Point, InterpolationMode::Linear);
        assert_eq!(q.interpolation(), InterpolationMode::QuaternionSlerp);
        let id = AttributeDescriptor::builder("id", AttributeType::Int, ElementClass::Point).build();
        assert_eq!(id.interpolation(), InterpolationMode::Discrete);
    }

    #[test]
    fn test_default_value_bumps_version() {
        let desc = AttributeDescriptor::builder("Cd", AttributeType::Vec3, ElementClass::Point)
            .default_value(Vec3f::new(1.0, 0.5, 0.0))
            .build();
        assert!(desc.has_default());
        assert_eq!(desc.version(), 1);
        assert_eq!(desc.default_value::<Vec3f>(), Some(Vec3f::new(1.0, 0.5, 0.0)));
        assert_eq!(desc.default_value::<f32>(), None);
    }

    #[test]
    fn test_string_has_no_default() {
        let mut desc = AttributeDescriptor::builder("name", AttributeType::String, ElementClass::Primitive).build();
        assert!(!desc.set_default_value(&"piece".to_string()));
        assert!(!desc.has_default());
    }
}
