// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Rebuild curves with evenly spaced points

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use log::debug;

const MIN_SEGMENT: f32 = 1e-4;

#[derive(Debug, Default)]
pub struct ResampleOp;

/// Cumulative arc length at each point of a polyline, starting at zero.
fn arc_lengths(positions: &[Vec3f], points: &[usize]) -> Vec<f32> {
    let mut lengths = Vec::with_capacity(points.len());
    let mut total = 0.0;
    lengths.push(total);
    for pair in points.windows(2) {
        total += (positions[pair[1]] - positions[pair[0]]).norm();
        lengths.push(total);
    }
    lengths
}

/// Segment index and parameter for a distance along the curve.
fn locate(lengths: &[f32], distance: f32) -> (usize, f32) {
    let last = lengths.len().saturating_sub(2);
    let segment = lengths
        .windows(2)
        .position(|w| distance >= w[0] && distance <= w[1])
        .unwrap_or(last);
    let span = lengths[segment + 1] - lengths[segment];
    let t = if span > MIN_SEGMENT {
        ((distance - lengths[segment]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (segment, t)
}

impl Operator for ResampleOp {
    fn kind(&self) -> &'static str {
        "resample"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::menu("mode", 0, &["By Count", "By Length"]),
            ParameterDefinition::int("point_count", 10),
            ParameterDefinition::float("segment_length", 0.1),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        let positions = require_positions(input)?;
        if input.primitive_count() == 0 {
            return Err(OperatorError::InvalidGeometry(
                "input geometry has no primitives to resample".into(),
            ));
        }
        let by_length = ctx.get("mode", 0) == 1;
        let point_count = ctx.get::<usize>("point_count", 10).max(2);
        let segment_length: f32 = ctx.get("segment_length", 0.1);

        let topo = input.topology();
        let mut points = input.point_attributes().clone();
        let mut samples = Vec::new();
        let mut curves = Vec::new();
        let mut kept_prims = Vec::new();

        for prim in 0..topo.primitive_count() {
            let curve = topo.primitive_points(prim);
            if curve.len() < 2 {
                continue;
            }
            let lengths = arc_lengths(positions, &curve);
            let total = lengths[lengths.len() - 1];
            let count = if !by_length {
                point_count
            } else if segment_length > MIN_SEGMENT {
                ((total / segment_length) as usize + 1).max(2)
            } else {
                2
            };

            let start = samples.len();
            for i in 0..count {
                let distance = total * i as f32 / (count - 1) as f32;
                let (segment, t) = locate(&lengths, distance);
                let a = curve[segment];
                let b = curve[(segment + 1).min(curve.len() - 1)];
                samples.push(points.push_blended(&[(a, 1.0 - t), (b, t)]));
            }
            curves.push((start..samples.len()).collect::<Vec<_>>());
            kept_prims.push(prim);
        }

        let mut geo = GeometryContainer::new();
        geo.set_point_count(samples.len());
        for curve in &curves {
            geo.add_polygon(curve)?;
        }
        *geo.attributes_mut(ElementClass::Point) = points.gather(&samples);
        *geo.attributes_mut(ElementClass::Primitive) = input.primitive_attributes().gather(&kept_prims);
        *geo.attributes_mut(ElementClass::Detail) = input.detail_attributes().clone();
        debug!(
            "resample: {} curves, {} points",
            curves.len(),
            geo.point_count()
        );
        Ok(geo)
    }
}
