// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Typed attribute payloads and the enum that erases them
//!
//! `AttributeData` keeps one contiguous `Vec<T>` per attribute. Generic code
//! goes through the `AttributeValue` trait to get a typed slice back out;
//! everything else (resize, gather, blend) dispatches on the variant.

use super::types::{AttributeType, Mat3f, Mat4f, Quatf, Vec2f, Vec3f, Vec4f};
use crate::error::AttributeError;
use std::fmt::Debug;

/// A value type that can live in an attribute storage.
pub trait AttributeValue: Clone + Debug + PartialEq + Send + Sync + 'static {
    const TYPE: AttributeType;

    /// Value used for new elements when no default is set.
    fn zero() -> Self;

    /// Little-endian encoding used for descriptor default values.
    fn to_bytes(&self) -> Vec<u8>;

    fn from_bytes(bytes: &[u8]) -> Option<Self>;

    /// Weighted combination of `sources`. Weights need not sum to one.
    fn blend(sources: &[(&Self, f32)]) -> Self;

    fn as_column(data: &AttributeData) -> Option<&[Self]>;

    fn as_column_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>>;

    fn wrap(values: Vec<Self>) -> AttributeData;
}

/// Values with an arithmetic mean, used by promotion and demotion.
pub trait Averageable: AttributeValue {
    fn average(values: &[Self]) -> Option<Self>;
}

fn floats_to_bytes(components: &[f32]) -> Vec<u8> {
    components.iter().flat_map(|c| c.to_le_bytes()).collect()
}

fn floats_from_bytes<const N: usize>(bytes: &[u8]) -> Option<[f32; N]> {
    if bytes.len() != N * 4 {
        return None;
    }
    let mut out = [0.0f32; N];
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        out[i] = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Some(out)
}

fn heaviest<T: Clone>(sources: &[(&T, f32)], fallback: impl FnOnce() -> T) -> T {
    sources
        .iter()
        .fold(None::<(&T, f32)>, |best, &(value, weight)| match best {
            Some((_, w)) if w >= weight => best,
            _ => Some((value, weight)),
        })
        .map(|(value, _)| value.clone())
        .unwrap_or_else(fallback)
}

fn total_weight<T>(sources: &[(&T, f32)]) -> f32 {
    sources.iter().map(|(_, w)| *w).sum()
}

macro_rules! linear_value {
    ($ty:ty, $variant:ident, $zero:expr, $n:expr, $from:expr) => {
        impl AttributeValue for $ty {
            const TYPE: AttributeType = AttributeType::$variant;

            fn zero() -> Self {
                $zero
            }

            fn to_bytes(&self) -> Vec<u8> {
                floats_to_bytes(self.as_slice())
            }

            fn from_bytes(bytes: &[u8]) -> Option<Self> {
                floats_from_bytes::<$n>(bytes).map($from)
            }

            fn blend(sources: &[(&Self, f32)]) -> Self {
                let total = total_weight(sources);
                if sources.is_empty() || total.abs() < f32::EPSILON {
                    return Self::zero();
                }
                sources
                    .iter()
                    .fold(<$ty>::zeros(), |acc, (value, w)| acc + **value * (*w / total))
            }

            fn as_column(data: &AttributeData) -> Option<&[Self]> {
                match data {
                    AttributeData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn as_column_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>> {
                match data {
                    AttributeData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(values: Vec<Self>) -> AttributeData {
                AttributeData::$variant(values)
            }
        }
    };
}

linear_value!(Vec2f, Vec2, Vec2f::zeros(), 2, |c: [f32; 2]| Vec2f::new(c[0], c[1]));
linear_value!(Vec3f, Vec3, Vec3f::zeros(), 3, |c: [f32; 3]| Vec3f::new(c[0], c[1], c[2]));
linear_value!(Vec4f, Vec4, Vec4f::zeros(), 4, |c: [f32; 4]| Vec4f::new(
    c[0], c[1], c[2], c[3]
));
linear_value!(Mat3f, Matrix3, Mat3f::identity(), 9, |c: [f32; 9]| {
    Mat3f::from_column_slice(&c)
});
linear_value!(Mat4f, Matrix4, Mat4f::identity(), 16, |c: [f32; 16]| {
    Mat4f::from_column_slice(&c)
});

impl AttributeValue for f32 {
    const TYPE: AttributeType = AttributeType::Float;

    fn zero() -> Self {
        0.0
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        floats_from_bytes::<1>(bytes).map(|c| c[0])
    }

    fn blend(sources: &[(&Self, f32)]) -> Self {
        let total = total_weight(sources);
        if sources.is_empty() || total.abs() < f32::EPSILON {
            return 0.0;
        }
        sources.iter().map(|(v, w)| **v * w).sum::<f32>() / total
    }

    fn as_column(data: &AttributeData) -> Option<&[Self]> {
        match data {
            AttributeData::Float(v) => Some(v),
            _ => None,
        }
    }

    fn as_column_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>> {
        match data {
            AttributeData::Float(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> AttributeData {
        AttributeData::Float(values)
    }
}

impl AttributeValue for i32 {
    const TYPE: AttributeType = AttributeType::Int;

    fn zero() -> Self {
        0
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = bytes.try_into().ok()?;
        Some(i32::from_le_bytes(raw))
    }

    fn blend(sources: &[(&Self, f32)]) -> Self {
        heaviest(sources, || 0)
    }

    fn as_column(data: &AttributeData) -> Option<&[Self]> {
        match data {
            AttributeData::Int(v) => Some(v),
            _ => None,
        }
    }

    fn as_column_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>> {
        match data {
            AttributeData::Int(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> AttributeData {
        AttributeData::Int(values)
    }
}

impl AttributeValue for Quatf {
    const TYPE: AttributeType = AttributeType::Quaternion;

    fn zero() -> Self {
        Quatf::identity()
    }

    fn to_bytes(&self) -> Vec<u8> {
        floats_to_bytes(self.coords.as_slice())
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        floats_from_bytes::<4>(bytes).map(|c| Quatf::new(c[3], c[0], c[1], c[2]))
    }

    fn blend(sources: &[(&Self, f32)]) -> Self {
        let Some((first, _)) = sources.first() else {
            return Quatf::identity();
        };
        // keep every contribution in the hemisphere of the first one
        let mut acc = Vec4f::zeros();
        for (q, w) in sources {
            let sign = if q.coords.dot(&first.coords) < 0.0 { -1.0 } else { 1.0 };
            acc += q.coords * (w * sign);
        }
        let norm = acc.norm();
        if norm < f32::EPSILON {
            return **first;
        }
        Quatf::from_vector(acc / norm)
    }

    fn as_column(data: &AttributeData) -> Option<&[Self]> {
        match data {
            AttributeData::Quaternion(v) => Some(v),
            _ => None,
        }
    }

    fn as_column_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>> {
        match data {
            AttributeData::Quaternion(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> AttributeData {
        AttributeData::Quaternion(values)
    }
}

impl AttributeValue for String {
    const TYPE: AttributeType = AttributeType::String;

    fn zero() -> Self {
        String::new()
    }

    // strings carry no default value
    fn to_bytes(&self) -> Vec<u8> {
        Vec::new()
    }

    fn from_bytes(_bytes: &[u8]) -> Option<Self> {
        None
    }

    fn blend(sources: &[(&Self, f32)]) -> Self {
        heaviest(sources, String::new)
    }

    fn as_column(data: &AttributeData) -> Option<&[Self]> {
        match data {
            AttributeData::String(v) => Some(v),
            _ => None,
        }
    }

    fn as_column_mut(data: &mut AttributeData) -> Option<&mut Vec<Self>> {
        match data {
            AttributeData::String(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> AttributeData {
        AttributeData::String(values)
    }
}

impl Averageable for f32 {
    fn average(values: &[Self]) -> Option<Self> {
        (!values.is_empty()).then(|| values.iter().sum::<f32>() / values.len() as f32)
    }
}

impl Averageable for i32 {
    fn average(values: &[Self]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: i64 = values.iter().map(|&v| v as i64).sum();
        Some((sum as f64 / values.len() as f64).round() as i32)
    }
}

macro_rules! averageable_vector {
    ($ty:ty) => {
        impl Averageable for $ty {
            fn average(values: &[Self]) -> Option<Self> {
                if values.is_empty() {
                    return None;
                }
                let sum = values.iter().fold(<$ty>::zeros(), |acc, v| acc + v);
                Some(sum / values.len() as f32)
            }
        }
    };
}

averageable_vector!(Vec2f);
averageable_vector!(Vec3f);
averageable_vector!(Vec4f);

/// Type-erased column of attribute values.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Float(Vec<f32>),
    Int(Vec<i32>),
    Vec2(Vec<Vec2f>),
    Vec3(Vec<Vec3f>),
    Vec4(Vec<Vec4f>),
    Matrix3(Vec<Mat3f>),
    Matrix4(Vec<Mat4f>),
    Quaternion(Vec<Quatf>),
    String(Vec<String>),
}

macro_rules! dispatch {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            AttributeData::Float($v) => $body,
            AttributeData::Int($v) => $body,
            AttributeData::Vec2($v) => $body,
            AttributeData::Vec3($v) => $body,
            AttributeData::Vec4($v) => $body,
            AttributeData::Matrix3($v) => $body,
            AttributeData::Matrix4($v) => $body,
            AttributeData::Quaternion($v) => $body,
            AttributeData::String($v) => $body,
        }
    };
}

/// Pairs two columns of the same variant, or bails with a type mismatch.
macro_rules! dispatch_pair {
    ($op:expr, $dst:expr, $src:expr, ($d:ident, $s:ident) => $body:expr) => {
        match ($dst, $src) {
            (AttributeData::Float($d), AttributeData::Float($s)) => $body,
            (AttributeData::Int($d), AttributeData::Int($s)) => $body,
            (AttributeData::Vec2($d), AttributeData::Vec2($s)) => $body,
            (AttributeData::Vec3($d), AttributeData::Vec3($s)) => $body,
            (AttributeData::Vec4($d), AttributeData::Vec4($s)) => $body,
            (AttributeData::Matrix3($d), AttributeData::Matrix3($s)) => $body,
            (AttributeData::Matrix4($d), AttributeData::Matrix4($s)) => $body,
            (AttributeData::Quaternion($d), AttributeData::Quaternion($s)) => $body,
            (AttributeData::String($d), AttributeData::String($s)) => $body,
            (dst, src) => {
                return Err(AttributeError::TypeMismatch {
                    operation: $op,
                    expected: dst.attr_type(),
                    found: src.attr_type(),
                })
            }
        }
    };
}

fn resize_column<T: AttributeValue>(values: &mut Vec<T>, len: usize, default: Option<&[u8]>) {
    let fill = default.and_then(T::from_bytes).unwrap_or_else(T::zero);
    values.resize(len, fill);
}

fn blend_column<T: AttributeValue>(values: &mut Vec<T>, sources: &[(usize, f32)]) -> T {
    let refs: Vec<(&T, f32)> = sources
        .iter()
        .filter_map(|&(i, w)| values.get(i).map(|v| (v, w)))
        .collect();
    T::blend(&refs)
}

impl AttributeData {
    pub fn empty(attr_type: AttributeType) -> Self {
        match attr_type {
            AttributeType::Float => AttributeData::Float(Vec::new()),
            AttributeType::Int => AttributeData::Int(Vec::new()),
            AttributeType::Vec2 => AttributeData::Vec2(Vec::new()),
            AttributeType::Vec3 => AttributeData::Vec3(Vec::new()),
            AttributeType::Vec4 => AttributeData::Vec4(Vec::new()),
            AttributeType::Matrix3 => AttributeData::Matrix3(Vec::new()),
            AttributeType::Matrix4 => AttributeData::Matrix4(Vec::new()),
            AttributeType::Quaternion => AttributeData::Quaternion(Vec::new()),
            AttributeType::String => AttributeData::String(Vec::new()),
        }
    }

    pub fn attr_type(&self) -> AttributeType {
        match self {
            AttributeData::Float(_) => AttributeType::Float,
            AttributeData::Int(_) => AttributeType::Int,
            AttributeData::Vec2(_) => AttributeType::Vec2,
            AttributeData::Vec3(_) => AttributeType::Vec3,
            AttributeData::Vec4(_) => AttributeType::Vec4,
            AttributeData::Matrix3(_) => AttributeType::Matrix3,
            AttributeData::Matrix4(_) => AttributeType::Matrix4,
            AttributeData::Quaternion(_) => AttributeType::Quaternion,
            AttributeData::String(_) => AttributeType::String,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        dispatch!(self, v => v.capacity())
    }

    pub fn reserve(&mut self, additional: usize) {
        dispatch!(self, v => v.reserve(additional))
    }

    pub fn clear(&mut self) {
        dispatch!(self, v => v.clear())
    }

    /// Grow or shrink to `len`, filling new slots from `default` bytes.
    pub fn resize(&mut self, len: usize, default: Option<&[u8]>) {
        dispatch!(self, v => resize_column(v, len, default))
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), AttributeError> {
        let len = self.len();
        for index in [a, b] {
            if index >= len {
                return Err(AttributeError::IndexOutOfRange {
                    operation: "swap_elements",
                    index,
                    len,
                });
            }
        }
        dispatch!(self, v => v.swap(a, b));
        Ok(())
    }

    /// Copy `src[from]` into `self[to]`.
    pub fn copy_from(
        &mut self,
        from: usize,
        to: usize,
        src: &AttributeData,
    ) -> Result<(), AttributeError> {
        dispatch_pair!("copy_element", self, src, (dst, source) => {
            let value = source.get(from).cloned().ok_or(AttributeError::IndexOutOfRange {
                operation: "copy_element",
                index: from,
                len: source.len(),
            })?;
            let dst_len = dst.len();
            let slot = dst.get_mut(to).ok_or(AttributeError::IndexOutOfRange {
                operation: "copy_element",
                index: to,
                len: dst_len,
            })?;
            *slot = value;
            Ok(())
        })
    }

    /// New column holding `self[i]` for every `i` in `indices`, in order.
    pub fn gather(&self, indices: &[usize]) -> AttributeData {
        dispatch!(self, v => {
            let picked = indices.iter().filter_map(|&i| v.get(i).cloned()).collect::<Vec<_>>();
            AttributeValue::wrap(picked)
        })
    }

    /// Append a copy of element `index`. Out-of-range indices append the zero value.
    pub fn push_copy(&mut self, index: usize) {
        dispatch!(self, v => {
            let value = match v.get(index) {
                Some(value) => value.clone(),
                None => AttributeValue::zero(),
            };
            v.push(value);
        })
    }

    /// Append the weighted blend of existing elements.
    pub fn push_blended(&mut self, sources: &[(usize, f32)]) {
        dispatch!(self, v => {
            let value = blend_column(v, sources);
            v.push(value);
        })
    }

    /// Overwrite element `dst` with the weighted blend of existing elements.
    pub fn set_blended(&mut self, dst: usize, sources: &[(usize, f32)]) {
        dispatch!(self, v => {
            let value = blend_column(v, sources);
            if let Some(slot) = v.get_mut(dst) {
                *slot = value;
            }
        })
    }

    /// Copy all of `src` into `self` starting at `start`.
    pub fn copy_range_from(
        &mut self,
        start: usize,
        src: &AttributeData,
    ) -> Result<(), AttributeError> {
        dispatch_pair!("copy_range", self, src, (dst, source) => {
            let end = start + source.len();
            if end > dst.len() {
                return Err(AttributeError::IndexOutOfRange {
                    operation: "copy_range",
                    index: end,
                    len: dst.len(),
                });
            }
            dst[start..end].clone_from_slice(source);
            Ok(())
        })
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_usage(&self) -> usize {
        match self {
            AttributeData::String(v) => {
                v.capacity() * std::mem::size_of::<String>()
                    + v.iter().map(|s| s.capacity()).sum::<usize>()
            }
            other => other.capacity() * other.attr_type().size_of(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bytes_round_trip() {
        let v = Vec3f::new(1.0, -2.5, 3.25);
        assert_eq!(Vec3f::from_bytes(&v.to_bytes()), Some(v));
        assert_eq!(i32::from_bytes(&(-7i32).to_bytes()), Some(-7));
        assert_eq!(f32::from_bytes(&[0u8; 3]), None);
        assert_eq!(String::from_bytes(b"abc"), None);
    }

    #[test]
    fn test_resize_uses_default_bytes() {
        let mut data = AttributeData::empty(AttributeType::Float);
        let default = 2.5f32.to_bytes();
        data.resize(3, Some(&default));
        assert_eq!(f32::as_column(&data), Some(&[2.5, 2.5, 2.5][..]));
        data.resize(1, None);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_copy_from_type_mismatch() {
        let mut dst = AttributeData::Float(vec![0.0; 2]);
        let src = AttributeData::Int(vec![1, 2]);
        let err = dst.copy_from(0, 0, &src).unwrap_err();
        assert!(matches!(err, AttributeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_copy_from_out_of_range() {
        let mut dst = AttributeData::Float(vec![0.0; 2]);
        let src = AttributeData::Float(vec![1.0]);
        assert!(matches!(
            dst.copy_from(3, 0, &src),
            Err(AttributeError::IndexOutOfRange { index: 3, .. })
        ));
        assert!(matches!(
            dst.copy_from(0, 5, &src),
            Err(AttributeError::IndexOutOfRange { index: 5, .. })
        ));
        dst.copy_from(0, 1, &src).unwrap();
        assert_eq!(f32::as_column(&dst), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_blend_linear_and_discrete() {
        let mut data = AttributeData::Vec3(vec![Vec3f::new(0.0, 0.0, 0.0), Vec3f::new(2.0, 4.0, 6.0)]);
        data.push_blended(&[(0, 1.0), (1, 1.0)]);
        let values = Vec3f::as_column(&data).unwrap();
        assert_relative_eq!(values[2], Vec3f::new(1.0, 2.0, 3.0));

        let mut ints = AttributeData::Int(vec![3, 9]);
        ints.push_blended(&[(0, 0.25), (1, 0.75)]);
        assert_eq!(i32::as_column(&ints).unwrap()[2], 9);
    }

    #[test]
    fn test_int_mean_rounds() {
        assert_eq!(i32::average(&[1, 2]), Some(2));
        assert_eq!(i32::average(&[]), None);
        assert_eq!(f32::average(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn test_gather_keeps_order() {
        let data = AttributeData::Int(vec![10, 11, 12, 13]);
        let picked = data.gather(&[3, 1]);
        assert_eq!(i32::as_column(&picked), Some(&[13, 11][..]));
    }
}
