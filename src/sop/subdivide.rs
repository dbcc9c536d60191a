// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Midpoint and Catmull-Clark subdivision

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::ElementClass;
use crate::error::OperatorError;
use crate::geometry::mesh_utils::{recompute_vertex_normals, EdgeMap};
use crate::geometry::GeometryContainer;
use log::debug;

pub const MAX_LEVELS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubdivisionMethod {
    Simple,
    CatmullClark,
}

#[derive(Debug, Default)]
pub struct SubdivideOp;

/// Blend recipe for one output element: (source index, weight).
type Recipe = Vec<(usize, f32)>;

/// One subdivision step over the primitives flagged in `selected`. The
/// rest are carried through, and points they touch stay where they are.
pub fn subdivide_once(
    geo: &GeometryContainer,
    selected: &[bool],
    method: SubdivisionMethod,
) -> Result<GeometryContainer, OperatorError> {
    let topo = geo.topology();
    let point_count = geo.point_count();
    let is_split = |prim: usize| {
        selected.get(prim).copied().unwrap_or(false) && topo.primitive_vertices(prim).len() >= 3
    };
    let faces: Vec<usize> = (0..topo.primitive_count()).filter(|&p| is_split(p)).collect();
    let edges = EdgeMap::build_for(topo, faces.iter().copied());

    // face points; Simple splits triangles without a centre
    let mut face_slot = vec![usize::MAX; topo.primitive_count()];
    let mut face_recipes: Vec<Recipe> = Vec::new();
    for &f in &faces {
        let ring = topo.primitive_points(f);
        if method == SubdivisionMethod::Simple && ring.len() == 3 {
            continue;
        }
        let w = 1.0 / ring.len() as f32;
        face_slot[f] = point_count + face_recipes.len();
        face_recipes.push(ring.iter().map(|&p| (p, w)).collect());
    }
    let edge_base = point_count + face_recipes.len();

    let mut points = geo.point_attributes().clone();
    let face_points: Vec<usize> = face_recipes.iter().map(|r| points.push_blended(r)).collect();
    let mut edge_points = Vec::with_capacity(edges.len());
    for edge in edges.edges() {
        let (a, b) = (edge.key.a, edge.key.b);
        let recipe: Recipe = match (method, edge.faces.as_slice()) {
            (SubdivisionMethod::CatmullClark, &[f0, f1]) => vec![
                (a, 0.25),
                (b, 0.25),
                (face_slot[f0], 0.25),
                (face_slot[f1], 0.25),
            ],
            _ => vec![(a, 0.5), (b, 0.5)],
        };
        edge_points.push(points.push_blended(&recipe));
    }

    let mut order: Vec<usize> = (0..point_count).collect();
    if method == SubdivisionMethod::CatmullClark {
        let mut pinned = vec![false; point_count];
        for prim in (0..topo.primitive_count()).filter(|&p| !is_split(p)) {
            for p in topo.primitive_points(prim) {
                pinned[p] = true;
            }
        }
        let mut point_faces = vec![Vec::new(); point_count];
        for &f in &faces {
            for p in topo.primitive_points(f) {
                point_faces[p].push(face_slot[f]);
            }
        }
        let mut point_edges: Vec<Vec<usize>> = vec![Vec::new(); point_count];
        for (i, edge) in edges.edges().iter().enumerate() {
            point_edges[edge.key.a].push(i);
            point_edges[edge.key.b].push(i);
        }
        for p in 0..point_count {
            if pinned[p] || point_faces[p].is_empty() {
                continue;
            }
            if let Some(recipe) = smooth_recipe(p, &point_faces[p], &point_edges[p], &edges, edge_base) {
                order[p] = points.push_blended(&recipe);
            }
        }
    }
    order.extend(face_points);
    order.extend(edge_points);

    // new primitives with their source primitive and vertex recipes
    let mut vertices = geo.vertex_attributes().clone();
    let mut polygons: Vec<Vec<usize>> = Vec::new();
    let mut prim_sources = Vec::new();
    let mut vertex_order = Vec::new();
    let edge_point = |a: usize, b: usize| edges.position(a, b).map(|e| edge_base + e);
    for prim in 0..topo.primitive_count() {
        let verts = topo.primitive_vertices(prim);
        if !is_split(prim) {
            polygons.push(topo.primitive_points(prim));
            prim_sources.push(prim);
            vertex_order.extend_from_slice(verts);
            continue;
        }
        let ring = topo.primitive_points(prim);
        let n = ring.len();
        let mids: Vec<usize> = (0..n)
            .map(|i| edge_point(ring[i], ring[(i + 1) % n]).unwrap_or(ring[i]))
            .collect();
        let mut mid_vertex = Vec::with_capacity(n);
        for i in 0..n {
            mid_vertex.push(vertices.push_blended(&[(verts[i], 0.5), (verts[(i + 1) % n], 0.5)]));
        }

        if face_slot[prim] == usize::MAX {
            // triangle: three corners plus the middle
            for i in 0..3 {
                let prev = (i + 2) % 3;
                polygons.push(vec![ring[i], mids[i], mids[prev]]);
                vertex_order.extend([verts[i], mid_vertex[i], mid_vertex[prev]]);
                prim_sources.push(prim);
            }
            polygons.push(mids.clone());
            vertex_order.extend(mid_vertex.iter().copied());
            prim_sources.push(prim);
            continue;
        }

        let centre = face_slot[prim];
        let w = 1.0 / n as f32;
        let recipe: Recipe = verts.iter().map(|&v| (v, w)).collect();
        let centre_vertex = vertices.push_blended(&recipe);
        for i in 0..n {
            let prev = (i + n - 1) % n;
            polygons.push(vec![ring[i], mids[i], centre, mids[prev]]);
            vertex_order.extend([verts[i], mid_vertex[i], centre_vertex, mid_vertex[prev]]);
            prim_sources.push(prim);
        }
    }

    let mut out = GeometryContainer::new();
    out.set_point_count(order.len());
    for polygon in &polygons {
        out.add_polygon(polygon)?;
    }
    *out.attributes_mut(ElementClass::Point) = points.gather(&order);
    *out.attributes_mut(ElementClass::Vertex) = vertices.gather(&vertex_order);
    *out.attributes_mut(ElementClass::Primitive) = geo.primitive_attributes().gather(&prim_sources);
    *out.attributes_mut(ElementClass::Detail) = geo.detail_attributes().clone();
    Ok(out)
}

/// Catmull-Clark weights for an original point. `face_points` and the
/// edge indices refer to already-pushed points.
fn smooth_recipe(
    p: usize,
    face_points: &[usize],
    point_edges: &[usize],
    edges: &EdgeMap,
    edge_base: usize,
) -> Option<Recipe> {
    let all = edges.edges();
    let boundary: Vec<usize> = point_edges
        .iter()
        .filter(|&&e| all[e].faces.len() != 2)
        .map(|&e| {
            let key = all[e].key;
            if key.a == p {
                key.b
            } else {
                key.a
            }
        })
        .collect();
    if !boundary.is_empty() {
        // crease rule along the border; corners of a single face stay put
        return match boundary.as_slice() {
            &[q0, q1] if face_points.len() > 1 => Some(vec![(q0, 0.125), (p, 0.75), (q1, 0.125)]),
            _ => None,
        };
    }

    let n = face_points.len();
    let m = point_edges.len();
    if n < 3 || m == 0 {
        return None;
    }
    let (wf, we, wp) = if n == 3 {
        (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    } else {
        let nf = n as f32;
        (1.0 / nf, 2.0 / nf, (nf - 3.0) / nf)
    };
    let mut recipe: Recipe = face_points.iter().map(|&f| (f, wf / n as f32)).collect();
    recipe.extend(point_edges.iter().map(|&e| (edge_base + e, we / m as f32)));
    recipe.push((p, wp));
    Some(recipe)
}

impl Operator for SubdivideOp {
    fn kind(&self) -> &'static str {
        "subdivide"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::menu("method", 1, &["Simple", "Catmull-Clark"]),
            ParameterDefinition::int("levels", 1),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        require_positions(input)?;
        let method = if ctx.get("method", 1) == 0 {
            SubdivisionMethod::Simple
        } else {
            SubdivisionMethod::CatmullClark
        };
        let levels = ctx.get::<usize>("levels", 1).clamp(1, MAX_LEVELS);

        let mut selected = ctx.selection(input, ElementClass::Primitive)?;
        let mut geo = input.clone();
        for _ in 0..levels {
            let before = geo.primitive_count();
            let next = subdivide_once(&geo, &selected, method)?;
            // children inherit selection; carried primitives keep theirs in order
            let mut carried = Vec::with_capacity(next.primitive_count());
            let mut k = 0;
            for prim in 0..before {
                let n = geo.topology().primitive_vertices(prim).len();
                let children = if selected[prim] && n >= 3 {
                    if method == SubdivisionMethod::Simple && n == 3 {
                        4
                    } else {
                        n
                    }
                } else {
                    1
                };
                carried.extend(std::iter::repeat(selected[prim]).take(children));
                k += children;
            }
            debug_assert_eq!(k, next.primitive_count());
            selected = carried;
            geo = next;
        }
        recompute_vertex_normals(&mut geo);
        debug!(
            "subdivide: {:?} x{} -> {} points, {} primitives",
            method,
            levels,
            geo.point_count(),
            geo.primitive_count()
        );
        Ok(geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Vec3f;
    use crate::geometry::groups;
    use crate::geometry::mesh_utils::EdgeMap;
    use crate::geometry::primitives::{box_geometry, grid, sphere};
    use crate::sop::node::SopNode;
    use approx::assert_relative_eq;

    fn cook(geo: GeometryContainer, method: i32, levels: i32) -> GeometryContainer {
        let mut node = SopNode::new("subdivide1", Box::new(SubdivideOp));
        node.set_input(0, geo);
        node.set_parameter("method", method);
        node.set_parameter("levels", levels);
        node.cook().unwrap().into_inner()
    }

    #[test]
    fn test_catmull_clark_counts_on_cube() {
        let out = cook(box_geometry(Vec3f::repeat(2.0), true), 1, 1);
        assert_eq!(out.point_count(), 8 + 6 + 12);
        assert_eq!(out.primitive_count(), 24);
        assert!(out.validate());
        assert!(EdgeMap::build(out.topology()).is_closed());

        let twice = cook(box_geometry(Vec3f::repeat(2.0), true), 1, 2);
        // P + F + E of the 26-point, 24-face, 48-edge level
        assert_eq!(twice.point_count(), 26 + 24 + 48);
        assert_eq!(twice.primitive_count(), 96);
    }

    #[test]
    fn test_catmull_clark_shrinks_cube_corner() {
        let out = cook(box_geometry(Vec3f::repeat(2.0), true), 1, 1);
        let corner = out.positions().unwrap()[0];
        // n = 3 rule: (F + E + P) / 3
        let f = Vec3f::repeat(-1.0 / 3.0);
        let e = Vec3f::repeat(-0.5);
        let expected = (f + e + Vec3f::repeat(-1.0)) / 3.0;
        assert_relative_eq!(corner, expected, epsilon = 1e-5);
        assert!(out.has_attribute(ElementClass::Vertex, "N"));
    }

    #[test]
    fn test_grid_boundary_stays_planar() {
        let out = cook(grid(2.0, 2.0, 3, 3), 1, 1);
        assert_eq!(out.primitive_count(), 16);
        for p in out.positions().unwrap() {
            assert_relative_eq!(p.y, 0.0);
        }
        // corner points do not move
        assert_relative_eq!(out.positions().unwrap()[0], Vec3f::new(-1.0, 0.0, -1.0));
    }

    #[test]
    fn test_simple_splits_triangles_into_four() {
        let tri = GeometryContainer::from_polygons(
            &[Vec3f::zeros(), Vec3f::x(), Vec3f::z()],
            &[vec![0, 2, 1]],
        )
        .unwrap();
        let out = cook(tri, 0, 2);
        assert_eq!(out.primitive_count(), 16);
        assert_eq!(out.point_count(), 15);
        let sphere_out = cook(sphere(1.0, 4, 4), 0, 1);
        // 8 cap triangles into 4 each, 8 quads into 4 each
        assert_eq!(sphere_out.primitive_count(), 8 * 4 + 8 * 4);
    }

    #[test]
    fn test_group_limits_subdivision() {
        let mut cube = box_geometry(Vec3f::repeat(2.0), true);
        groups::create_group(&mut cube, "lid", ElementClass::Primitive);
        groups::add_to_group(&mut cube, "lid", ElementClass::Primitive, 5);
        let mut node = SopNode::new("subdivide1", Box::new(SubdivideOp));
        node.set_input(0, cube);
        node.set_parameter("input_group", "lid");
        node.set_parameter("levels", 2);
        let out = node.cook().unwrap();
        assert_eq!(out.primitive_count(), 5 + 16);
        assert_eq!(groups::group_size(&out, "lid", ElementClass::Primitive), 16);
        // lid corners are shared with untouched sides and stay fixed
        assert_relative_eq!(out.positions().unwrap()[3], Vec3f::new(-1.0, 1.0, -1.0));
    }

    #[test]
    fn test_levels_are_clamped() {
        let mut node = SopNode::new("subdivide1", Box::new(SubdivideOp));
        node.set_input(0, grid(1.0, 1.0, 2, 2));
        node.set_parameter("levels", 0);
        assert_eq!(node.cook().unwrap().primitive_count(), 4);
    }
}
