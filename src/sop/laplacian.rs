// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Laplacian smoothing over the point neighbour graph

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::mesh_utils::point_neighbours;
use crate::geometry::GeometryContainer;
use log::{debug, warn};
use rayon::prelude::*;

#[derive(Debug, Default)]
pub struct LaplacianOp;

/// Largest shrink factor Taubin smoothing accepts.
pub const TAUBIN_MAX_LAMBDA: f32 = 1.0;

/// Inflation factor paired with a shrink of `lambda` (Taubin's pass band
/// of 0.1). `lambda` is clamped into (0, 1] so the denominator stays below
/// -0.9.
pub fn taubin_mu(lambda: f32) -> f32 {
    let lambda = lambda.clamp(f32::EPSILON, TAUBIN_MAX_LAMBDA);
    1.0 / (0.1 - 1.0 / lambda)
}

/// One umbrella step: each movable point moves `factor` of the way to its
/// neighbours' mean. Reads `src`, writes `dst`.
fn smooth_step(
    src: &[Vec3f],
    dst: &mut [Vec3f],
    neighbours: &[Vec<usize>],
    movable: &[bool],
    factor: f32,
) {
    dst.par_iter_mut().enumerate().for_each(|(i, out)| {
        let ring = &neighbours[i];
        if !movable[i] || ring.is_empty() {
            *out = src[i];
            return;
        }
        let mean = ring.iter().fold(Vec3f::zeros(), |acc, &n| acc + src[n]) / ring.len() as f32;
        *out = src[i] + (mean - src[i]) * factor;
    });
}

impl Operator for LaplacianOp {
    fn kind(&self) -> &'static str {
        "laplacian"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::int("iterations", 5),
            ParameterDefinition::float("lambda", 0.5),
            ParameterDefinition::menu("method", 0, &["Uniform", "Cotangent", "Taubin"]),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        let mut front = require_positions(input)?.to_vec();
        let iterations: usize = ctx.get("iterations", 5);
        let mut lambda: f32 = ctx.get("lambda", 0.5);
        let method: i32 = ctx.get("method", 0);
        if method == 1 {
            warn!("laplacian: cotangent weights are not implemented, using uniform");
        }
        let taubin = method == 2 && lambda > 0.0;
        if taubin && lambda > TAUBIN_MAX_LAMBDA {
            warn!("laplacian: taubin lambda {lambda} clamped to {TAUBIN_MAX_LAMBDA}");
            lambda = TAUBIN_MAX_LAMBDA;
        }
        let mu = if taubin { taubin_mu(lambda) } else { 0.0 };

        let movable = ctx.selection(input, ElementClass::Point)?;
        let neighbours = point_neighbours(input.topology());
        let mut back = front.clone();
        for _ in 0..iterations {
            smooth_step(&front, &mut back, &neighbours, &movable, lambda);
            std::mem::swap(&mut front, &mut back);
            if taubin {
                smooth_step(&front, &mut back, &neighbours, &movable, mu);
                std::mem::swap(&mut front, &mut back);
            }
        }
        debug!(
            "laplacian: {} iterations over {} points (lambda {lambda}, mu {mu})",
            iterations,
            front.len()
        );

        let mut geo = input.clone();
        if let Some(positions) = geo.positions_mut() {
            positions.copy_from_slice(&front);
        }
        Ok(geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::groups;
    use crate::geometry::primitives::{box_geometry, line};
    use crate::sop::node::SopNode;
    use approx::assert_relative_eq;

    fn volume_proxy(geo: &GeometryContainer) -> f32 {
        let p = geo.positions().unwrap();
        p.iter().map(|v| v.norm()).sum::<f32>() / p.len() as f32
    }

    #[test]
    fn test_mu_is_negative_and_larger() {
        let mu = taubin_mu(0.5);
        assert!(mu < -0.5);
        assert_relative_eq!(mu, 1.0 / (0.1 - 2.0));
    }

    #[test]
    fn test_taubin_large_lambda_stays_finite() {
        assert!(taubin_mu(10.0).is_finite());
        assert_relative_eq!(taubin_mu(10.0), taubin_mu(1.0));

        let mut node = SopNode::new("smooth1", Box::new(LaplacianOp));
        node.set_input(0, box_geometry(Vec3f::repeat(2.0), true));
        node.set_parameter("method", 2);
        node.set_parameter("lambda", 10.0);
        let out = node.cook().unwrap();
        assert!(out.positions().unwrap().iter().all(|p| p.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_uniform_shrinks_box() {
        let cube = box_geometry(Vec3f::repeat(2.0), true);
        let before = volume_proxy(&cube);
        let mut node = SopNode::new("smooth1", Box::new(LaplacianOp));
        node.set_input(0, cube);
        let out = node.cook().unwrap();
        assert!(volume_proxy(&out) < before);
    }

    #[test]
    fn test_taubin_shrinks_less_than_uniform() {
        let cook = |method: i32| {
            let mut node = SopNode::new("smooth1", Box::new(LaplacianOp));
            node.set_input(0, box_geometry(Vec3f::repeat(2.0), true));
            node.set_parameter("method", method);
            node.set_parameter("iterations", 3);
            volume_proxy(&node.cook().unwrap())
        };
        assert!(cook(2) > cook(0));
    }

    #[test]
    fn test_endpoints_move_toward_neighbour() {
        // polyline ends have a single neighbour
        let mut geo = line(Vec3f::zeros(), Vec3f::new(4.0, 0.0, 0.0), 5);
        geo.positions_mut().unwrap()[2].y = 1.0;
        groups::create_group(&mut geo, "middle", ElementClass::Point);
        groups::add_to_group(&mut geo, "middle", ElementClass::Point, 2);
        let mut node = SopNode::new("smooth1", Box::new(LaplacianOp));
        node.set_input(0, geo);
        node.set_parameter("input_group", "middle");
        node.set_parameter("iterations", 1);
        let out = node.cook().unwrap();
        let p = out.positions().unwrap();
        assert_relative_eq!(p[2].y, 0.5);
        assert_relative_eq!(p[1].y, 0.0);
    }
}
