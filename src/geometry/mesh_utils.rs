// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Edge maps, polygon normals and adjacency helpers shared by the operators

use super::container::GeometryContainer;
use super::topology::Topology;
use crate::attributes::{standard, ElementClass, Vec3f};
use ahash::AHashMap;

/// Undirected edge between two points, smaller index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub a: usize,
    pub b: usize,
}

impl EdgeKey {
    pub fn new(p0: usize, p1: usize) -> Self {
        // Always store edges with smaller index first for consistent hashing
        if p0 < p1 {
            Self { a: p0, b: p1 }
        } else {
            Self { a: p1, b: p0 }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EdgeRecord {
    pub key: EdgeKey,
    /// Incident primitives in discovery order.
    pub faces: Vec<usize>,
}

/// Edge → incident primitives, iterated in first-seen order so results do
/// not depend on hash order.
#[derive(Debug, Clone, Default)]
pub struct EdgeMap {
    edges: Vec<EdgeRecord>,
    index: AHashMap<EdgeKey, usize>,
}

impl EdgeMap {
    /// Walks consecutive point pairs of every closed primitive (3+ vertices).
    pub fn build(topology: &Topology) -> Self {
        Self::build_for(topology, 0..topology.primitive_count())
    }

    /// Like [`build`](Self::build) over the given primitives only.
    pub fn build_for(topology: &Topology, prims: impl IntoIterator<Item = usize>) -> Self {
        let mut map = Self::default();
        for prim in prims {
            let points = topology.primitive_points(prim);
            if points.len() < 3 {
                continue;
            }
            for i in 0..points.len() {
                let (p0, p1) = (points[i], points[(i + 1) % points.len()]);
                if p0 != p1 {
                    map.insert(EdgeKey::new(p0, p1), prim);
                }
            }
        }
        map
    }

    fn insert(&mut self, key: EdgeKey, face: usize) {
        let slot = *self.index.entry(key).or_insert_with(|| {
            self.edges.push(EdgeRecord {
                key,
                faces: Vec::new(),
            });
            self.edges.len() - 1
        });
        let faces = &mut self.edges[slot].faces;
        if !faces.contains(&face) {
            faces.push(face);
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    pub fn get(&self, p0: usize, p1: usize) -> Option<&EdgeRecord> {
        self.index
            .get(&EdgeKey::new(p0, p1))
            .map(|&i| &self.edges[i])
    }

    pub fn faces(&self, p0: usize, p1: usize) -> &[usize] {
        self.get(p0, p1).map_or(&[], |e| e.faces.as_slice())
    }

    pub fn position(&self, p0: usize, p1: usize) -> Option<usize> {
        self.index.get(&EdgeKey::new(p0, p1)).copied()
    }

    /// True when every edge has exactly two incident primitives.
    pub fn is_closed(&self) -> bool {
        self.edges.iter().all(|e| e.faces.len() == 2)
    }

    pub fn is_manifold(&self) -> bool {
        self.edges.iter().all(|e| e.faces.len() <= 2)
    }

    pub fn boundary_edges(&self) -> impl Iterator<Item = &EdgeRecord> {
        self.edges.iter().filter(|e| e.faces.len() == 1)
    }
}

/// Newell's method; robust for non-planar polygons. Zero when degenerate.
pub fn newell_normal(positions: &[Vec3f], points: &[usize]) -> Vec3f {
    let mut n = Vec3f::zeros();
    for i in 0..points.len() {
        let c = positions[points[i]];
        let d = positions[points[(i + 1) % points.len()]];
        n.x += (c.y - d.y) * (c.z + d.z);
        n.y += (c.z - d.z) * (c.x + d.x);
        n.z += (c.x - d.x) * (c.y + d.y);
    }
    n.try_normalize(1e-12).unwrap_or_else(Vec3f::zeros)
}

pub fn centroid(positions: &[Vec3f], points: &[usize]) -> Vec3f {
    if points.is_empty() {
        return Vec3f::zeros();
    }
    points.iter().fold(Vec3f::zeros(), |acc, &p| acc + positions[p]) / points.len() as f32
}

/// Fan triangulation from the first corner.
pub fn triangle_fan(points: &[usize]) -> impl Iterator<Item = [usize; 3]> + '_ {
    (1..points.len().saturating_sub(1)).map(move |i| [points[0], points[i], points[i + 1]])
}

pub fn triangle_area(a: &Vec3f, b: &Vec3f, c: &Vec3f) -> f32 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Unsigned angle between two unit normals, in degrees.
pub fn angle_between_deg(n0: &Vec3f, n1: &Vec3f) -> f32 {
    n0.dot(n1).clamp(-1.0, 1.0).acos().to_degrees()
}

pub fn primitive_normals(geo: &GeometryContainer) -> Vec<Vec3f> {
    let Some(positions) = geo.positions() else {
        return vec![Vec3f::zeros(); geo.primitive_count()];
    };
    (0..geo.primitive_count())
        .map(|p| newell_normal(positions, &geo.topology().primitive_points(p)))
        .collect()
}

pub fn primitive_centroids(geo: &GeometryContainer) -> Vec<Vec3f> {
    let Some(positions) = geo.positions() else {
        return vec![Vec3f::zeros(); geo.primitive_count()];
    };
    (0..geo.primitive_count())
        .map(|p| centroid(positions, &geo.topology().primitive_points(p)))
        .collect()
}

/// Distinct primitives touching each point, ascending.
pub fn point_primitives(topology: &Topology) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new(); topology.point_count()];
    for (prim, verts) in topology.primitives().iter().enumerate() {
        for &v in verts {
            if let Some(list) = out.get_mut(topology.vertex_point(v)) {
                if list.last() != Some(&prim) {
                    list.push(prim);
                }
            }
        }
    }
    out
}

/// Points sharing an edge with each point. Open primitives (fewer than 3
/// vertices) contribute consecutive pairs only.
pub fn point_neighbours(topology: &Topology) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); topology.point_count()];
    let mut link = |a: usize, b: usize| {
        if a == b {
            return;
        }
        if let Some(list) = out.get_mut(a) {
            if !list.contains(&b) {
                list.push(b);
            }
        }
        if let Some(list) = out.get_mut(b) {
            if !list.contains(&a) {
                list.push(a);
            }
        }
    };
    for prim in 0..topology.primitive_count() {
        let points = topology.primitive_points(prim);
        let n = points.len();
        let pairs = if n >= 3 { n } else { n.saturating_sub(1) };
        for i in 0..pairs {
            link(points[i], points[(i + 1) % n]);
        }
    }
    out
}

/// Writes Newell normals into the primitive `N` attribute.
pub fn recompute_primitive_normals(geo: &mut GeometryContainer) {
    let normals = primitive_normals(geo);
    if let Some(dst) = geo.ensure_values::<Vec3f>(ElementClass::Primitive, standard::NORMAL) {
        dst.copy_from_slice(&normals);
    }
}

/// Faceted normals: each vertex takes its primitive's normal.
pub fn recompute_vertex_normals(geo: &mut GeometryContainer) {
    let normals = primitive_normals(geo);
    let owners = geo.topology().vertex_primitives();
    let Some(dst) = geo.ensure_values::<Vec3f>(ElementClass::Vertex, standard::NORMAL) else {
        return;
    };
    for (slot, owner) in dst.iter_mut().zip(owners) {
        *slot = normals.get(owner).copied().unwrap_or_else(Vec3f::zeros);
    }
}
