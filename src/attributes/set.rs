// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! All attributes of one element class, kept at a common length

use super::descriptor::AttributeDescriptor;
use super::storage::AttributeStorage;
use super::types::{AttributeType, ElementClass, InterpolationMode};
use super::value::AttributeValue;
use crate::error::AttributeError;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct AttributeSet {
    class: ElementClass,
    count: usize,
    attributes: BTreeMap<String, AttributeStorage>,
}

impl AttributeSet {
    pub fn new(class: ElementClass) -> Self {
        Self {
            class,
            count: 0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn element_class(&self) -> ElementClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Adds a new attribute sized to the current element count.
    /// Returns false when the name is taken.
    pub fn add_attribute(
        &mut self,
        name: &str,
        attr_type: AttributeType,
        interpolation: InterpolationMode,
    ) -> bool {
        let descriptor = AttributeDescriptor::new(name, attr_type, self.class, interpolation);
        self.add_attribute_with(descriptor)
    }

    /// Adds an attribute from a prepared descriptor. Returns false when the
    /// name is taken or the descriptor belongs to another class.
    pub fn add_attribute_with(&mut self, descriptor: AttributeDescriptor) -> bool {
        if descriptor.owner() != self.class || self.attributes.contains_key(descriptor.name()) {
            return false;
        }
        if self.count == 0 {
            if let Some(existing) = self.attributes.values().next() {
                self.count = existing.len();
            }
        }
        let mut storage = AttributeStorage::new(descriptor);
        storage.resize(self.count);
        self.attributes.insert(storage.name().to_string(), storage);
        true
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        self.attributes.remove(name).is_some()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeStorage> {
        self.attributes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeStorage> {
        self.attributes.get_mut(name)
    }

    pub fn values<T: AttributeValue>(&self, name: &str) -> Option<&[T]> {
        self.attributes.get(name)?.values::<T>()
    }

    pub fn values_mut<T: AttributeValue>(&mut self, name: &str) -> Option<&mut [T]> {
        self.attributes.get_mut(name)?.values_mut::<T>()
    }

    pub fn descriptor(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name).map(AttributeStorage::descriptor)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeStorage)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut AttributeStorage)> {
        self.attributes.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Sets the element count and resizes every storage to match.
    pub fn resize(&mut self, count: usize) {
        self.count = count;
        for storage in self.attributes.values_mut() {
            storage.resize(count);
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        for storage in self.attributes.values_mut() {
            storage.reserve(additional);
        }
    }

    /// Drops every element, keeping the schema.
    pub fn clear(&mut self) {
        self.resize(0);
    }

    /// Copies attributes from `other`, skipping existing names unless
    /// `overwrite` is set. Adopts `other`'s element count when they differ.
    pub fn merge(&mut self, other: &AttributeSet, overwrite: bool) -> Result<(), AttributeError> {
        if other.class != self.class {
            return Err(AttributeError::ClassMismatch {
                expected: self.class,
                found: other.class,
            });
        }
        if other.count != self.count {
            self.resize(other.count);
        }
        for (name, storage) in &other.attributes {
            if overwrite || !self.attributes.contains_key(name) {
                self.attributes.insert(name.clone(), storage.clone());
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> bool {
        self.attributes.values().all(|s| s.len() == self.count)
    }

    /// New set holding the elements at `indices`, in order.
    pub fn gather(&self, indices: &[usize]) -> AttributeSet {
        let attributes = self
            .attributes
            .iter()
            .map(|(name, storage)| {
                let mut picked = AttributeStorage::new(storage.descriptor().clone());
                *picked.data_mut() = storage.data().gather(indices);
                (name.clone(), picked)
            })
            .collect();
        AttributeSet {
            class: self.class,
            count: indices.len(),
            attributes,
        }
    }

    /// Appends the elements of `other` after ours. Attributes missing on
    /// either side are added and padded with their defaults.
    pub fn append(&mut self, other: &AttributeSet) -> Result<(), AttributeError> {
        if other.class != self.class {
            return Err(AttributeError::ClassMismatch {
                expected: self.class,
                found: other.class,
            });
        }
        for (name, storage) in &other.attributes {
            if !self.attributes.contains_key(name) {
                let mut fresh = AttributeStorage::new(storage.descriptor().clone());
                fresh.resize(self.count);
                self.attributes.insert(name.clone(), fresh);
            }
        }
        let start = self.count;
        self.resize(start + other.count);
        for (name, storage) in &other.attributes {
            if let Some(dst) = self.attributes.get_mut(name) {
                if dst.attr_type() != storage.attr_type() {
                    return Err(AttributeError::TypeMismatch {
                        operation: "append",
                        expected: dst.attr_type(),
                        found: storage.attr_type(),
                    });
                }
                dst.data_mut().copy_range_from(start, storage.data())?;
            }
        }
        Ok(())
    }

    /// Appends a copy of element `src`; returns its index.
    pub fn duplicate_element(&mut self, src: usize) -> usize {
        for storage in self.attributes.values_mut() {
            storage.data_mut().push_copy(src);
        }
        self.count += 1;
        self.count - 1
    }

    /// Appends the weighted blend of existing elements; returns its index.
    pub fn push_blended(&mut self, sources: &[(usize, f32)]) -> usize {
        for storage in self.attributes.values_mut() {
            storage.data_mut().push_blended(sources);
        }
        self.count += 1;
        self.count - 1
    }

    /// Overwrites element `dst` with the blend of `sources`.
    pub fn set_blended(&mut self, dst: usize, sources: &[(usize, f32)]) {
        for storage in self.attributes.values_mut() {
            storage.data_mut().set_blended(dst, sources);
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.attributes.values().map(AttributeStorage::memory_usage).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Vec3f;

    fn point_set(count: usize) -> AttributeSet {
        let mut set = AttributeSet::new(ElementClass::Point);
        set.add_attribute("P", AttributeType::Vec3, InterpolationMode::Linear);
        set.resize(count);
        set
    }

    #[test]
    fn test_add_attribute_rejects_duplicates() {
        let mut set = point_set(4);
        assert!(!set.add_attribute("P", AttributeType::Float, InterpolationMode::Linear));
        assert!(set.add_attribute("pscale", AttributeType::Float, InterpolationMode::Linear));
        assert_eq!(set.get("pscale").map(AttributeStorage::len), Some(4));
        assert_eq!(set.attribute_names(), vec!["P".to_string(), "pscale".to_string()]);
    }

    #[test]
    fn test_resize_keeps_invariant() {
        let mut set = point_set(2);
        set.add_attribute("id", AttributeType::Int, InterpolationMode::Linear);
        set.resize(7);
        assert!(set.validate());
        assert!(set.iter().all(|(_, s)| s.len() == 7));
    }

    #[test]
    fn test_merge_class_mismatch() {
        let mut points = point_set(1);
        let prims = AttributeSet::new(ElementClass::Primitive);
        assert!(matches!(
            points.merge(&prims, false),
            Err(AttributeError::ClassMismatch { .. })
        ));
    }

    #[test]
    fn test_merge_respects_overwrite() {
        let mut a = point_set(2);
        let mut b = point_set(2);
        b.values_mut::<Vec3f>("P").unwrap()[0] = Vec3f::new(9.0, 9.0, 9.0);
        a.merge(&b, false).unwrap();
        assert_eq!(a.values::<Vec3f>("P").unwrap()[0], Vec3f::zeros());
        a.merge(&b, true).unwrap();
        assert_eq!(a.values::<Vec3f>("P").unwrap()[0], Vec3f::new(9.0, 9.0, 9.0));
    }

    #[test]
    fn test_append_unions_schema() {
        let mut a = point_set(2);
        let mut b = point_set(1);
        b.add_attribute("id", AttributeType::Int, InterpolationMode::Linear);
        b.values_mut::<i32>("id").unwrap()[0] = 4;
        a.append(&b).unwrap();
        assert_eq!(a.len(), 3);
        assert!(a.validate());
        assert_eq!(a.values::<i32>("id"), Some(&[0, 0, 4][..]));
    }

    #[test]
    fn test_gather_and_blend() {
        let mut set = point_set(3);
        {
            let p = set.values_mut::<Vec3f>("P").unwrap();
            p[1] = Vec3f::new(2.0, 0.0, 0.0);
            p[2] = Vec3f::new(4.0, 0.0, 0.0);
        }
        let idx = set.push_blended(&[(1, 0.5), (2, 0.5)]);
        assert_eq!(idx, 3);
        assert_eq!(set.values::<Vec3f>("P").unwrap()[3], Vec3f::new(3.0, 0.0, 0.0));
        let picked = set.gather(&[3, 0]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.values::<Vec3f>("P").unwrap()[0], Vec3f::new(3.0, 0.0, 0.0));
    }
}
