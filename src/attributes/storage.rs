// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! One attribute column: descriptor plus contiguous values

use super::descriptor::AttributeDescriptor;
use super::types::AttributeType;
use super::value::{AttributeData, AttributeValue};
use crate::error::AttributeError;

/// Attribute values for every element of one class.
#[derive(Debug, Clone)]
pub struct AttributeStorage {
    descriptor: AttributeDescriptor,
    data: AttributeData,
}

impl AttributeStorage {
    pub fn new(descriptor: AttributeDescriptor) -> Self {
        let data = AttributeData::empty(descriptor.attr_type());
        Self { descriptor, data }
    }

    pub fn descriptor(&self) -> &AttributeDescriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut AttributeDescriptor {
        &mut self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn attr_type(&self) -> AttributeType {
        self.descriptor.attr_type()
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut AttributeData {
        &mut self.data
    }

    pub(crate) fn replace_data(&mut self, data: AttributeData) -> Result<(), AttributeError> {
        if data.attr_type() != self.attr_type() {
            return Err(AttributeError::TypeMismatch {
                operation: "replace_data",
                expected: self.attr_type(),
                found: data.attr_type(),
            });
        }
        self.data = data;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow or shrink; new elements take the descriptor default, or zero.
    pub fn resize(&mut self, len: usize) {
        self.data.resize(len, self.descriptor.default_bytes());
    }

    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn copy_element(
        &mut self,
        from: usize,
        to: usize,
        source: &AttributeStorage,
    ) -> Result<(), AttributeError> {
        self.data.copy_from(from, to, &source.data)
    }

    pub fn swap_elements(&mut self, a: usize, b: usize) -> Result<(), AttributeError> {
        self.data.swap(a, b)
    }

    /// Typed view. `None` when `T` is not the stored type.
    pub fn values<T: AttributeValue>(&self) -> Option<&[T]> {
        T::as_column(&self.data)
    }

    pub fn values_mut<T: AttributeValue>(&mut self) -> Option<&mut [T]> {
        T::as_column_mut(&mut self.data).map(|v| v.as_mut_slice())
    }

    pub fn get<T: AttributeValue>(&self, index: usize) -> Option<&T> {
        self.values::<T>()?.get(index)
    }

    pub fn set<T: AttributeValue>(&mut self, index: usize, value: T) -> Result<(), AttributeError> {
        let expected = self.attr_type();
        let column = T::as_column_mut(&mut self.data).ok_or(AttributeError::TypeMismatch {
            operation: "set",
            expected,
            found: T::TYPE,
        })?;
        let len = column.len();
        let slot = column.get_mut(index).ok_or(AttributeError::IndexOutOfRange {
            operation: "set",
            index,
            len,
        })?;
        *slot = value;
        Ok(())
    }

    pub fn push<T: AttributeValue>(&mut self, value: T) -> Result<(), AttributeError> {
        let expected = self.attr_type();
        T::as_column_mut(&mut self.data)
            .ok_or(AttributeError::TypeMismatch {
                operation: "push",
                expected,
                found: T::TYPE,
            })?
            .push(value);
        Ok(())
    }

    pub fn memory_usage(&self) -> usize {
        self.data.memory_usage()
    }
}
