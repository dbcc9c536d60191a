// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Vertex, primitive and point normals with cusp-angle hard edges

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{standard, AttributeType, ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::mesh_utils::point_primitives;
use crate::geometry::GeometryContainer;
use log::{debug, warn};

const DEGENERATE_AREA: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weighting {
    Equal,
    Area,
    Angle,
}

#[derive(Debug, Default)]
pub struct NormalOp;

/// Per-primitive normal from the first three corners plus its area.
/// Open or degenerate primitives face +Y.
#[derive(Debug, Clone, Copy)]
struct FaceNormal {
    normal: Vec3f,
    area: f32,
}

fn face_normals(geo: &GeometryContainer, positions: &[Vec3f], reverse: bool) -> Vec<FaceNormal> {
    let topo = geo.topology();
    (0..topo.primitive_count())
        .map(|prim| {
            let points = topo.primitive_points(prim);
            if points.len() < 3 {
                return FaceNormal {
                    normal: Vec3f::y(),
                    area: 0.0,
                };
            }
            let p0 = positions[points[0]];
            let cross = (positions[points[1]] - p0).cross(&(positions[points[2]] - p0));
            let area = cross.norm() * 0.5;
            let mut normal = if area > DEGENERATE_AREA {
                cross.normalize()
            } else {
                Vec3f::y()
            };
            if reverse {
                normal = -normal;
            }
            FaceNormal { normal, area }
        })
        .collect()
}

fn blend(faces: &[FaceNormal], incident: &[usize], weighting: Weighting, normalize: bool) -> Vec3f {
    let mut sum = Vec3f::zeros();
    let mut total = 0.0;
    for &prim in incident {
        let w = match weighting {
            Weighting::Area => faces[prim].area,
            Weighting::Equal | Weighting::Angle => 1.0,
        };
        sum += faces[prim].normal * w;
        total += w;
    }
    if normalize {
        sum.try_normalize(DEGENERATE_AREA).unwrap_or_else(Vec3f::y)
    } else if total > 0.0 {
        sum / total
    } else {
        Vec3f::y()
    }
}

/// Writes `N` on `class`, creating it when absent. An existing `N` of
/// another type is an error rather than being overwritten.
fn write_normals(geo: &mut GeometryContainer, class: ElementClass, normals: &[Vec3f]) -> Result<(), OperatorError> {
    if let Some(found) = geo.attributes(class).get(standard::NORMAL).map(|s| s.attr_type()) {
        if found != AttributeType::Vec3 {
            return Err(OperatorError::WrongAttributeType {
                name: standard::NORMAL.to_string(),
                expected: AttributeType::Vec3,
                found,
            });
        }
    }
    let dst = geo
        .ensure_values::<Vec3f>(class, standard::NORMAL)
        .ok_or_else(|| OperatorError::missing_attribute(standard::NORMAL, class))?;
    dst.copy_from_slice(normals);
    Ok(())
}

/// True when some pair of incident faces bends by more than the cusp angle.
fn is_hard(faces: &[FaceNormal], incident: &[usize], cusp_cos: f32) -> bool {
    incident.iter().enumerate().any(|(i, &a)| {
        incident[i + 1..]
            .iter()
            .any(|&b| faces[a].normal.dot(&faces[b].normal) < cusp_cos)
    })
}

impl Operator for NormalOp {
    fn kind(&self) -> &'static str {
        "normal"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::menu("normal_type", 0, &["Vertex", "Face", "Point"]),
            ParameterDefinition::menu("weighting", 0, &["Equal", "By Area", "By Angle"]),
            ParameterDefinition::float("cusp_angle", 60.0),
            ParameterDefinition::bool("reverse", false),
            ParameterDefinition::bool("normalize", true),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        let positions = require_positions(input)?;
        let weighting = match ctx.get("weighting", 0) {
            1 => Weighting::Area,
            2 => {
                warn!("normal: angle weighting is not implemented, using equal weights");
                Weighting::Angle
            }
            _ => Weighting::Equal,
        };
        let cusp_angle: f32 = ctx.get("cusp_angle", 60.0);
        let reverse = ctx.get("reverse", false);
        let normalize = ctx.get("normalize", true);

        let faces = face_normals(input, positions, reverse);
        let incident = point_primitives(input.topology());
        let mut geo = input.clone();

        match ctx.get("normal_type", 0) {
            1 => {
                let normals: Vec<Vec3f> = faces.iter().map(|f| f.normal).collect();
                write_normals(&mut geo, ElementClass::Primitive, &normals)?;
                debug!("normal: {} primitive normals", normals.len());
            }
            2 => {
                let normals: Vec<Vec3f> = incident
                    .iter()
                    .map(|prims| blend(&faces, prims, weighting, normalize))
                    .collect();
                write_normals(&mut geo, ElementClass::Point, &normals)?;
                debug!("normal: {} point normals", normals.len());
            }
            _ => {
                let cusp_cos = cusp_angle.to_radians().cos();
                let split = cusp_angle < 180.0;
                let per_point: Vec<Vec3f> = incident
                    .iter()
                    .map(|prims| match prims.first() {
                        None => Vec3f::y(),
                        // no vertex split: the hard corner keeps its first face normal
                        Some(&first) if split && is_hard(&faces, prims, cusp_cos) => {
                            faces[first].normal
                        }
                        Some(_) => blend(&faces, prims, weighting, normalize),
                    })
                    .collect();
                let normals: Vec<Vec3f> = geo
                    .topology()
                    .vertex_points()
                    .iter()
                    .map(|&p| per_point[p])
                    .collect();
                write_normals(&mut geo, ElementClass::Vertex, &normals)?;
                debug!("normal: {} vertex normals", normals.len());
            }
        }
        Ok(geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::{box_geometry, grid, sphere};
    use crate::sop::node::SopNode;
    use approx::assert_relative_eq;

    fn cook(geo: GeometryContainer, params: &[(&str, i32)]) -> GeometryContainer {
        let mut node = SopNode::new("normal1", Box::new(NormalOp));
        node.set_input(0, geo);
        for (name, value) in params {
            node.set_parameter(name, *value);
        }
        node.cook().unwrap().into_inner()
    }

    #[test]
    fn test_face_normals_of_grid_point_up() {
        let out = cook(grid(2.0, 2.0, 3, 3), &[("normal_type", 1)]);
        let n = out.values::<Vec3f>(ElementClass::Primitive, "N").unwrap();
        assert_eq!(n.len(), 4);
        for v in n {
            assert_relative_eq!(*v, Vec3f::y(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_reverse_flips() {
        let out = cook(grid(2.0, 2.0, 3, 3), &[("normal_type", 1), ("reverse", 1)]);
        let n = out.values::<Vec3f>(ElementClass::Primitive, "N").unwrap();
        assert_relative_eq!(n[0], -Vec3f::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_box_corners_are_hard() {
        let out = cook(box_geometry(Vec3f::repeat(2.0), true), &[]);
        let n = out.values::<Vec3f>(ElementClass::Vertex, "N").unwrap();
        assert_eq!(n.len(), 24);
        for v in n {
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-5);
            // a single face normal is axis-aligned
            assert_relative_eq!(v.abs().max(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_smooth_sphere_normals_are_unit_and_outward() {
        let out = cook(sphere(1.0, 12, 16), &[("cusp_angle", 180)]);
        let n = out.values::<Vec3f>(ElementClass::Vertex, "N").unwrap();
        let p = out.positions().unwrap();
        for (v, &pt) in n.iter().zip(out.topology().vertex_points()) {
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-5);
            assert!(v.dot(&p[pt]) > 0.9);
        }
    }

    #[test]
    fn test_existing_non_vector_normal_is_an_error() {
        let mut geo = grid(2.0, 2.0, 3, 3);
        geo.add_attribute(
            ElementClass::Primitive,
            "N",
            AttributeType::Float,
            crate::attributes::InterpolationMode::Linear,
        );
        let mut node = SopNode::new("normal1", Box::new(NormalOp));
        node.set_input(0, geo);
        node.set_parameter("normal_type", 1);
        assert!(node.cook().is_none());
        assert_eq!(
            node.error(),
            Some("attribute 'N' has type float, expected vec3f")
        );
    }

    #[test]
    fn test_point_normals_unnormalized_average() {
        let out = cook(
            box_geometry(Vec3f::repeat(2.0), true),
            &[("normal_type", 2), ("normalize", 0)],
        );
        let n = out.values::<Vec3f>(ElementClass::Point, "N").unwrap();
        // three orthogonal unit normals averaged
        assert_relative_eq!(n[0].norm(), (1.0f32 / 3.0).sqrt(), epsilon = 1e-5);
    }
}
