// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Displace points by seeded fractal value noise

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{standard, ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use log::{debug, warn};

pub const MAX_OCTAVES: usize = 8;

/// Points closer to the origin than this push along +Z in radial mode.
const RADIAL_MIN_LENGTH: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Away from the origin.
    Radial,
    /// Along the point normal `N`.
    Normal,
}

#[derive(Debug, Default)]
pub struct NoiseDisplacementOp;

/// Octave settings for [`fractal_noise`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fractal {
    pub octaves: usize,
    pub lacunarity: f32,
    pub persistence: f32,
    pub seed: u32,
}

fn hash3(x: i32, y: i32, z: i32, seed: u32) -> f32 {
    let mut h = x as u32;
    h ^= (y as u32).wrapping_mul(374_761_393);
    h = h.rotate_left(13);
    h ^= (z as u32).wrapping_mul(668_265_263);
    h = h.rotate_left(17);
    h ^= seed.wrapping_mul(2_246_822_519);
    h = h.wrapping_mul(3_266_489_917);
    h = (h ^ (h >> 16)).wrapping_mul(2_246_822_519);
    h as f32 / u32::MAX as f32
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Trilinear value noise with smoothstep fade, in [-1, 1].
pub fn value_noise(p: Vec3f, seed: u32) -> f32 {
    let base = p.map(f32::floor);
    let frac = p - base;
    let f = frac.map(|t| t * t * (3.0 - 2.0 * t));
    let (x0, y0, z0) = (base.x as i32, base.y as i32, base.z as i32);
    let (x1, y1, z1) = (x0.wrapping_add(1), y0.wrapping_add(1), z0.wrapping_add(1));

    let x00 = lerp(hash3(x0, y0, z0, seed), hash3(x1, y0, z0, seed), f.x);
    let x10 = lerp(hash3(x0, y1, z0, seed), hash3(x1, y1, z0, seed), f.x);
    let x01 = lerp(hash3(x0, y0, z1, seed), hash3(x1, y0, z1, seed), f.x);
    let x11 = lerp(hash3(x0, y1, z1, seed), hash3(x1, y1, z1, seed), f.x);
    let y0 = lerp(x00, x10, f.y);
    let y1 = lerp(x01, x11, f.y);
    lerp(y0, y1, f.z) * 2.0 - 1.0
}

/// Octave sum normalised by the total octave weight, so it stays in [-1, 1].
pub fn fractal_noise(p: Vec3f, fractal: &Fractal) -> f32 {
    let mut total = 0.0;
    let mut weight = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    for _ in 0..fractal.octaves {
        total += value_noise(p * frequency, fractal.seed) * amplitude;
        weight += amplitude;
        amplitude *= fractal.persistence;
        frequency *= fractal.lacunarity;
    }
    if weight > 0.0 {
        total / weight
    } else {
        0.0
    }
}

fn radial(p: &Vec3f) -> Vec3f {
    if p.norm() > RADIAL_MIN_LENGTH {
        p.normalize()
    } else {
        Vec3f::z()
    }
}

impl Operator for NoiseDisplacementOp {
    fn kind(&self) -> &'static str {
        "noise_displacement"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::float("amplitude", 0.1),
            ParameterDefinition::float("frequency", 1.0),
            ParameterDefinition::int("octaves", 4),
            ParameterDefinition::float("lacunarity", 2.0),
            ParameterDefinition::float("persistence", 0.5),
            ParameterDefinition::int("seed", 42),
            ParameterDefinition::menu("direction", 0, &["Radial", "Normal"]),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        require_positions(input)?;
        let amplitude: f32 = ctx.get("amplitude", 0.1);
        let frequency: f32 = ctx.get("frequency", 1.0);
        let fractal = Fractal {
            octaves: ctx.get::<usize>("octaves", 4).clamp(1, MAX_OCTAVES),
            lacunarity: ctx.get("lacunarity", 2.0),
            persistence: ctx.get("persistence", 0.5),
            seed: ctx.get::<u64>("seed", 42) as u32,
        };
        let mut direction = match ctx.get("direction", 0) {
            1 => Direction::Normal,
            _ => Direction::Radial,
        };
        let normals = input
            .values::<Vec3f>(ElementClass::Point, standard::NORMAL)
            .map(<[Vec3f]>::to_vec);
        if direction == Direction::Normal && normals.is_none() {
            warn!("noise_displacement: no point normals, displacing radially");
            direction = Direction::Radial;
        }
        let movable = ctx.selection(input, ElementClass::Point)?;

        let mut geo = input.clone();
        let mut moved = 0;
        if let Some(positions) = geo.positions_mut() {
            for (i, p) in positions.iter_mut().enumerate() {
                if !movable[i] {
                    continue;
                }
                let along = match (direction, &normals) {
                    (Direction::Normal, Some(n)) => n[i].try_normalize(1e-12).unwrap_or_else(|| radial(p)),
                    _ => radial(p),
                };
                let n = fractal_noise(*p * frequency, &fractal);
                *p += along * (n * amplitude);
                moved += 1;
            }
        }
        debug!(
            "noise_displacement: {moved} points, {} octave(s), seed {}",
            fractal.octaves, fractal.seed
        );
        Ok(geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::groups;
    use crate::geometry::primitives::{grid, sphere};
    use crate::sop::node::SopNode;
    use approx::assert_relative_eq;

    fn fractal(seed: u32) -> Fractal {
        Fractal {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            seed,
        }
    }

    fn cook(geo: GeometryContainer, params: &[(&str, crate::sop::ParameterValue)]) -> GeometryContainer {
        let mut node = SopNode::new("noise1", Box::new(NoiseDisplacementOp));
        node.set_input(0, geo);
        for (name, value) in params {
            node.set_parameter(name, value.clone());
        }
        node.cook().unwrap().into_inner()
    }

    #[test]
    fn test_noise_is_bounded_and_deterministic() {
        for i in 0..200 {
            let p = Vec3f::new(i as f32 * 0.37, i as f32 * -0.11, 3.5 - i as f32 * 0.05);
            let n = fractal_noise(p, &fractal(7));
            assert!((-1.0..=1.0).contains(&n), "{n}");
            assert_eq!(n, fractal_noise(p, &fractal(7)));
        }
    }

    #[test]
    fn test_noise_is_continuous_across_cells() {
        let below = value_noise(Vec3f::new(0.9999, 0.5, 0.5), 3);
        let above = value_noise(Vec3f::new(1.0001, 0.5, 0.5), 3);
        assert_relative_eq!(below, above, epsilon = 1e-3);
    }

    #[test]
    fn test_seed_changes_pattern() {
        let p = Vec3f::new(0.3, 0.6, 0.2);
        assert_ne!(fractal_noise(p, &fractal(1)), fractal_noise(p, &fractal(2)));
    }

    #[test]
    fn test_sphere_displaced_radially() {
        let ball = sphere(1.0, 8, 8);
        let out = cook(ball.clone(), &[("amplitude", 0.2f32.into())]);
        let before = ball.positions().unwrap();
        let after = out.positions().unwrap();
        let mut changed = 0;
        for (a, b) in before.iter().zip(after) {
            // radial: direction unchanged, length within the amplitude
            assert_relative_eq!(a.normalize().dot(&b.normalize()), 1.0, epsilon = 1e-4);
            assert!((b.norm() - 1.0).abs() <= 0.2 + 1e-5);
            if (a - b).norm() > 1e-6 {
                changed += 1;
            }
        }
        assert!(changed > before.len() / 2);
        assert_eq!(out.primitive_count(), ball.primitive_count());
    }

    #[test]
    fn test_normal_direction_moves_grid_vertically() {
        let mut flat = grid(4.0, 4.0, 5, 5);
        flat.ensure_values::<Vec3f>(ElementClass::Point, "N").unwrap().fill(Vec3f::y());
        let out = cook(flat.clone(), &[("direction", 1.into()), ("amplitude", 1.0f32.into())]);
        for (a, b) in flat.positions().unwrap().iter().zip(out.positions().unwrap()) {
            assert_eq!((a.x, a.z), (b.x, b.z));
        }
    }

    #[test]
    fn test_group_limits_displacement() {
        let mut ball = sphere(1.0, 8, 8);
        groups::create_group(&mut ball, "pole", ElementClass::Point);
        groups::add_elements(&mut ball, "pole", ElementClass::Point, &[0]);
        let out = cook(
            ball.clone(),
            &[("input_group", "pole".into()), ("amplitude", 0.5f32.into())],
        );
        let before = ball.positions().unwrap();
        let after = out.positions().unwrap();
        assert!(before[1..].iter().zip(&after[1..]).all(|(a, b)| a == b));
    }

    #[test]
    fn test_zero_amplitude_is_identity() {
        let ball = sphere(1.0, 6, 6);
        let out = cook(ball.clone(), &[("amplitude", 0.0f32.into())]);
        assert_eq!(out.positions(), ball.positions());
    }
}
