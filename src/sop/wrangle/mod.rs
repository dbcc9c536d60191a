// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-element expression evaluation
//!
//! Programs are written in a small expression language (see
//! `wrangle.pest`), e.g. `@P.y = @P.y + sin(@ptnum * 0.1)`. In point mode
//! every selected point gets its own scope with `ptnum`, `P`, `N` and `Cd`
//! bound as scalars (`Px`, `Ny`, `Cr`, ...); assigned values are written
//! back afterwards.

pub mod expr;

pub use expr::{Program, Scope};

use super::node::{CookContext, Operator, ParameterDefinition};
use crate::attributes::{standard, AttributeType, ElementClass, InterpolationMode, Vec3f};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use log::{debug, warn};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOver {
    Points,
    Primitives,
    Vertices,
    Detail,
}

impl RunOver {
    fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Primitives,
            2 => Self::Vertices,
            3 => Self::Detail,
            _ => Self::Points,
        }
    }
}

/// Scalar bindings for a 3-vector attribute.
const BINDINGS: [(&str, [&str; 3]); 3] = [
    (standard::POSITION, ["Px", "Py", "Pz"]),
    (standard::NORMAL, ["Nx", "Ny", "Nz"]),
    (standard::COLOR, ["Cr", "Cg", "Cb"]),
];

#[derive(Debug, Default)]
pub struct WrangleOp;

fn bind(scope: &mut Scope, names: &[&str; 3], value: Vec3f) {
    for (name, c) in names.iter().zip(value.iter()) {
        scope.set(name, f64::from(*c));
    }
}

fn read(scope: &Scope, names: &[&str; 3]) -> Vec3f {
    Vec3f::new(
        scope.get(names[0]) as f32,
        scope.get(names[1]) as f32,
        scope.get(names[2]) as f32,
    )
}

/// Scope shared by every element: counts, free parameters and channels.
fn base_scope(ctx: &CookContext, geo: &GeometryContainer, program: &Program) -> Scope {
    let mut scope = Scope::new(ctx.get("seed", 0u64));
    scope.set("numpt", geo.point_count() as f64);
    scope.set("numprim", geo.primitive_count() as f64);
    scope.set("numvtx", geo.vertex_count() as f64);
    for name in ["ptnum", "primnum", "vtxnum"] {
        scope.set(name, 0.0);
    }
    for name in ["param1", "param2", "param3", "param4"] {
        scope.set(name, f64::from(ctx.get::<f32>(name, 0.0)));
    }
    for channel in program.channels() {
        scope.set_channel(&channel, f64::from(ctx.get::<f32>(&channel, 0.0)));
    }
    scope
}

/// Evaluates the program once per selected point and writes `P`, `N`
/// and `Cd` back. `N` and `Cd` are created when missing and some point
/// assigns a non-zero value.
fn run_points(
    geo: &mut GeometryContainer,
    program: &Program,
    base: &Scope,
    selected: &[bool],
) -> usize {
    let points: Vec<usize> = (0..geo.point_count()).filter(|&i| selected[i]).collect();
    let sources: Vec<Option<Vec<Vec3f>>> = BINDINGS
        .iter()
        .map(|(attr, _)| geo.values::<Vec3f>(ElementClass::Point, attr).map(<[Vec3f]>::to_vec))
        .collect();

    let results: Vec<[Vec3f; 3]> = points
        .par_iter()
        .map(|&i| {
            let mut scope = base.clone();
            scope.set("ptnum", i as f64);
            for ((_, names), source) in BINDINGS.iter().zip(&sources) {
                let value = source.as_ref().map_or_else(Vec3f::zeros, |v| v[i]);
                bind(&mut scope, names, value);
            }
            program.run(&mut scope);
            [
                read(&scope, &BINDINGS[0].1),
                read(&scope, &BINDINGS[1].1),
                read(&scope, &BINDINGS[2].1),
            ]
        })
        .collect();

    for (slot, (attr, _)) in BINDINGS.iter().enumerate() {
        let touched = results.iter().any(|r| r[slot] != Vec3f::zeros());
        if !geo.has_attribute(ElementClass::Point, attr) {
            if !touched {
                continue;
            }
            geo.add_attribute(ElementClass::Point, attr, AttributeType::Vec3, InterpolationMode::Linear);
        }
        if let Some(dst) = geo.values_mut::<Vec3f>(ElementClass::Point, attr) {
            for (&i, r) in points.iter().zip(&results) {
                dst[i] = r[slot];
            }
        }
    }
    points.len()
}

impl Operator for WrangleOp {
    fn kind(&self) -> &'static str {
        "wrangle"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::menu("run_over", 0, &["Points", "Primitives", "Vertices", "Detail"]),
            ParameterDefinition::code("expression", "@P.y = @P.y + 0.5;"),
            ParameterDefinition::float("param1", 0.0),
            ParameterDefinition::float("param2", 0.0),
            ParameterDefinition::float("param3", 0.0),
            ParameterDefinition::float("param4", 0.0),
            ParameterDefinition::int("seed", 0),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        let source: String = ctx.get("expression", "@P.y = @P.y + 0.5;".to_string());
        let program = match Program::compile(&source) {
            Ok(program) => program,
            Err(err) => {
                warn!("wrangle: {err}; passing input through");
                return Ok(input.clone());
            }
        };
        if program.is_empty() {
            return Ok(input.clone());
        }

        let mut geo = input.clone();
        let base = base_scope(ctx, &geo, &program);
        match RunOver::from_index(ctx.get("run_over", 0)) {
            RunOver::Points => {
                let selected = ctx.selection(&geo, ElementClass::Point)?;
                let count = run_points(&mut geo, &program, &base, &selected);
                debug!("wrangle: evaluated {count} points");
            }
            RunOver::Detail => {
                let mut scope = base;
                let value = program.run(&mut scope);
                debug!("wrangle: detail result {value}");
            }
            mode @ (RunOver::Primitives | RunOver::Vertices) => {
                warn!("wrangle: run over {mode:?} is not implemented, passing input through");
            }
        }
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

    fn wrangle(geo: GeometryContainer, code: &str) -> SopNode {
        let mut node = SopNode::new("wrangle1", Box::new(WrangleOp));
        node.set_input(0, geo);
        node.set_parameter("expression", code);
        node
    }

    #[test]
    fn test_group_scoped_offset() {
        let mut geo = sphere(1.0, 8, 8);
        groups::create_group(&mut geo, "top_half", ElementClass::Point);
        let top: Vec<usize> = geo
            .positions()
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.y > 0.0)
            .map(|(i, _)| i)
            .collect();
        groups::add_elements(&mut geo, "top_half", ElementClass::Point, &top);
        let before = geo.positions().unwrap().to_vec();

        let mut node = wrangle(geo, "Py = Py + 0.5");
        node.set_parameter("input_group", "top_half");
        let out = node.cook().unwrap();
        for (i, (a, b)) in before.iter().zip(out.positions().unwrap()).enumerate() {
            let expected = if top.contains(&i) { a.y + 0.5 } else { a.y };
            assert_relative_eq!(b.y, expected, epsilon = 1e-5);
            assert_relative_eq!(b.x, a.x, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_attribute_syntax_and_ptnum() {
        let mut node = wrangle(grid(2.0, 2.0, 2, 2), "@P.y = @ptnum * 0.5 + param1");
        node.set_parameter("param1", 1.0f32);
        let out = node.cook().unwrap();
        let p = out.positions().unwrap();
        assert_relative_eq!(p[0].y, 1.0);
        assert_relative_eq!(p[3].y, 2.5);
    }

    #[test]
    fn test_color_created_lazily() {
        let geo = grid(2.0, 2.0, 2, 2);
        let out = wrangle(geo.clone(), "Py = Py").cook().unwrap();
        assert!(!out.has_attribute(ElementClass::Point, "Cd"));
        assert!(!out.has_attribute(ElementClass::Point, "N"));

        let out = wrangle(geo, "@Cd.r = ptnum / numpt; Cg = 1").cook().unwrap();
        let cd = out.values::<Vec3f>(ElementClass::Point, "Cd").unwrap();
        assert_relative_eq!(cd[2], Vec3f::new(0.5, 1.0, 0.0));
    }

    #[test]
    fn test_channels_read_parameters() {
        let mut node = wrangle(grid(2.0, 2.0, 2, 2), "Py = ch(\"lift\")");
        node.set_parameter("lift", 3.0f32);
        let out = node.cook().unwrap();
        assert!(out.positions().unwrap().iter().all(|p| p.y == 3.0));
    }

    #[test]
    fn test_rand_depends_on_seed() {
        let run = |seed: i32| {
            let mut node = wrangle(grid(2.0, 2.0, 3, 3), "Py = rand(ptnum)");
            node.set_parameter("seed", seed);
            node.cook().unwrap().positions().unwrap().to_vec()
        };
        assert_eq!(run(1), run(1));
        assert_ne!(run(1), run(2));
    }

    #[test]
    fn test_compile_error_passes_input_through() {
        let geo = grid(2.0, 2.0, 2, 2);
        let mut node = wrangle(geo.clone(), "Py = = 1");
        let out = node.cook().unwrap();
        assert_eq!(out.positions(), geo.positions());
        assert!(node.error().is_none());
    }

    #[test]
    fn test_unimplemented_modes_pass_through() {
        let geo = grid(2.0, 2.0, 2, 2);
        for mode in [1, 2, 3] {
            let mut node = wrangle(geo.clone(), "Py = 7");
            node.set_parameter("run_over", mode);
            let out = node.cook().unwrap();
            assert_eq!(out.positions(), geo.positions());
        }
    }
}
