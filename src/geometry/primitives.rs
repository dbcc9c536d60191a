// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator

use super::container::GeometryContainer;
use crate::attributes::Vec3f;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Source geometry for a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceShape {
    Box {
        #[serde(default = "default_box_size")]
        size: [f32; 3],
        #[serde(default = "default_true")]
        center: bool,
    },
    Grid {
        #[serde(default = "default_extent")]
        size_x: f32,
        #[serde(default = "default_extent")]
        size_z: f32,
        #[serde(default = "default_resolution")]
        rows: usize,
        #[serde(default = "default_resolution")]
        cols: usize,
    },
    Sphere {
        #[serde(default = "default_radius")]
        radius: f32,
        #[serde(default = "default_rings")]
        rings: usize,
        #[serde(default = "default_segments")]
        segments: usize,
    },
    Line {
        #[serde(default)]
        start: [f32; 3],
        #[serde(default = "default_line_end")]
        end: [f32; 3],
        #[serde(default = "default_resolution")]
        points: usize,
    },
}

fn default_box_size() -> [f32; 3] {
    [2.0, 2.0, 2.0]
}

fn default_true() -> bool {
    true
}

fn default_extent() -> f32 {
    10.0
}

fn default_resolution() -> usize {
    10
}

fn default_radius() -> f32 {
    1.0
}

fn default_rings() -> usize {
    12
}

fn default_segments() -> usize {
    24
}

fn default_line_end() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

impl SourceShape {
    /// Parses the CLI shorthand: `box`, `grid`, `sphere` or `line` with
    /// default sizes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "box" => Some(Self::Box {
                size: default_box_size(),
                center: true,
            }),
            "grid" => Some(Self::Grid {
                size_x: default_extent(),
                size_z: default_extent(),
                rows: default_resolution(),
                cols: default_resolution(),
            }),
            "sphere" => Some(Self::Sphere {
                radius: default_radius(),
                rings: default_rings(),
                segments: default_segments(),
            }),
            "line" => Some(Self::Line {
                start: [0.0; 3],
                end: default_line_end(),
                points: default_resolution(),
            }),
            _ => None,
        }
    }

    pub fn build(&self) -> GeometryContainer {
        match self {
            Self::Box { size, center } => box_geometry(Vec3f::from(*size), *center),
            Self::Grid {
                size_x,
                size_z,
                rows,
                cols,
            } => grid(*size_x, *size_z, *rows, *cols),
            Self::Sphere {
                radius,
                rings,
                segments,
            } => sphere(*radius, *rings, *segments),
            Self::Line { start, end, points } => {
                line(Vec3f::from(*start), Vec3f::from(*end), *points)
            }
        }
    }
}

fn assemble(positions: &[Vec3f], faces: &[Vec<usize>]) -> GeometryContainer {
    // generator faces only reference generated points
    GeometryContainer::from_polygons(positions, faces).unwrap_or_default()
}

/// Eight points, six outward-facing quads.
pub fn box_geometry(size: Vec3f, center: bool) -> GeometryContainer {
    let (lo, hi) = if center {
        (-size * 0.5, size * 0.5)
    } else {
        (Vec3f::zeros(), size)
    };
    let positions = [
        Vec3f::new(lo.x, lo.y, lo.z),
        Vec3f::new(hi.x, lo.y, lo.z),
        Vec3f::new(hi.x, hi.y, lo.z),
        Vec3f::new(lo.x, hi.y, lo.z),
        Vec3f::new(lo.x, lo.y, hi.z),
        Vec3f::new(lo.x, hi.y, hi.z),
        Vec3f::new(hi.x, hi.y, hi.z),
        Vec3f::new(hi.x, lo.y, hi.z),
    ];
    let faces = [
        vec![0, 3, 2, 1],
        vec![4, 7, 6, 5],
        vec![0, 4, 5, 3],
        vec![1, 2, 6, 7],
        vec![0, 1, 7, 4],
        vec![3, 5, 6, 2],
    ];
    assemble(&positions, &faces)
}

/// Grid in the XZ plane facing +Y, `rows` by `cols` points.
pub fn grid(size_x: f32, size_z: f32, rows: usize, cols: usize) -> GeometryContainer {
    let rows = rows.max(2);
    let cols = cols.max(2);
    let dx = size_x / (cols - 1) as f32;
    let dz = size_z / (rows - 1) as f32;
    let mut positions = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            positions.push(Vec3f::new(
                -size_x * 0.5 + c as f32 * dx,
                0.0,
                -size_z * 0.5 + r as f32 * dz,
            ));
        }
    }
    let mut faces = Vec::with_capacity((rows - 1) * (cols - 1));
    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            let p = |r: usize, c: usize| r * cols + c;
            faces.push(vec![p(r, c), p(r + 1, c), p(r + 1, c + 1), p(r, c + 1)]);
        }
    }
    assemble(&positions, &faces)
}

/// UV sphere: triangle caps at the poles, quads elsewhere.
pub fn sphere(radius: f32, rings: usize, segments: usize) -> GeometryContainer {
    let rings = rings.max(2);
    let segments = segments.max(3);
    let mut positions = vec![Vec3f::new(0.0, radius, 0.0)];
    for i in 1..rings {
        let theta = PI * i as f32 / rings as f32;
        let (y, r) = (radius * theta.cos(), radius * theta.sin());
        for j in 0..segments {
            let phi = 2.0 * PI * j as f32 / segments as f32;
            positions.push(Vec3f::new(r * phi.cos(), y, r * phi.sin()));
        }
    }
    let bottom = positions.len();
    positions.push(Vec3f::new(0.0, -radius, 0.0));

    let ring = |i: usize, j: usize| 1 + (i - 1) * segments + j % segments;
    let mut faces = Vec::new();
    for j in 0..segments {
        faces.push(vec![0, ring(1, j + 1), ring(1, j)]);
    }
    for i in 1..rings - 1 {
        for j in 0..segments {
            faces.push(vec![ring(i, j), ring(i, j + 1), ring(i + 1, j + 1), ring(i + 1, j)]);
        }
    }
    for j in 0..segments {
        faces.push(vec![bottom, ring(rings - 1, j), ring(rings - 1, j + 1)]);
    }
    assemble(&positions, &faces)
}

/// Open polyline of `points` evenly spaced points.
pub fn line(start: Vec3f, end: Vec3f, points: usize) -> GeometryContainer {
    let points = points.max(2);
    let positions: Vec<Vec3f> = (0..points)
        .map(|i| start.lerp(&end, i as f32 / (points - 1) as f32))
        .collect();
    assemble(&positions, &[(0..points).collect()])
}
