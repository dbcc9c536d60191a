// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding box utilities

use crate::attributes::Vec3f;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3f,
    pub max: Vec3f,
}

impl BoundingBox {
    pub fn new(min: Vec3f, max: Vec3f) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3f::repeat(f32::INFINITY),
            max: Vec3f::repeat(f32::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Vec3f]) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_to_include(&mut self, point: &Vec3f) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn contains(&self, point: &Vec3f) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    pub fn center(&self) -> Vec3f {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3f {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }

    /// Check if two bounding boxes are approximately equal within tolerance
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f32) -> bool {
        (self.min - other.min).amax() < tolerance && (self.max - other.max).amax() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let mut bbox = BoundingBox::empty();
        assert!(bbox.is_empty());
        bbox.expand_to_include(&Vec3f::new(1.0, 2.0, 3.0));
        bbox.expand_to_include(&Vec3f::new(-1.0, -2.0, -3.0));

        assert_eq!(bbox.min, Vec3f::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Vec3f::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.center(), Vec3f::zeros());
        assert!(bbox.contains(&Vec3f::new(0.5, -1.0, 2.9)));
        assert!(!bbox.contains(&Vec3f::new(0.5, -1.0, 3.1)));
    }
}
