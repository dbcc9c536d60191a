// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Plain indexed-mesh form of a container
//!
//! [`ExternalMesh`] keeps one vertex per point and polygonal faces, which is
//! what mesh-processing libraries consume. Vertex and primitive attributes
//! other than `P` and `N` do not cross this boundary.

use crate::attributes::{standard, AttributeType, ElementClass, InterpolationMode, Vec3f};
use crate::error::OperatorError;
use crate::geometry::mesh_utils::{newell_normal, triangle_fan};
use crate::geometry::GeometryContainer;
use ahash::AHashSet;
use log::{debug, warn};
use nalgebra::Point3;
use parry3d::shape::TriMesh;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalMesh {
    pub positions: Vec<Vec3f>,
    pub faces: Vec<Vec<usize>>,
    /// Per-vertex normals, parallel to `positions`.
    pub normals: Vec<Vec3f>,
}

impl ExternalMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_triangulated(&self) -> bool {
        self.faces.iter().all(|f| f.len() == 3)
    }

    /// Fan-triangulated index list.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        self.faces
            .iter()
            .flat_map(|f| triangle_fan(f).collect::<Vec<_>>())
            .map(|[a, b, c]| [a as u32, b as u32, c as u32])
            .collect()
    }

    /// Collision-ready triangle mesh; `None` without any triangle.
    pub fn to_trimesh(&self) -> Option<TriMesh> {
        let indices = self.triangles();
        if indices.is_empty() {
            return None;
        }
        let vertices: Vec<Point3<f32>> = self.positions.iter().map(|p| Point3::from(*p)).collect();
        Some(TriMesh::new(vertices, indices))
    }
}

/// Total area of the fan-triangulated surface, through the collision
/// mesh. `None` when the container has no convertible face.
pub fn surface_area(geo: &GeometryContainer) -> Option<f32> {
    let mesh = to_external(geo).ok()?;
    let trimesh = mesh.to_trimesh()?;
    Some(trimesh.triangles().map(|t| t.area()).sum())
}

/// Preconditions shared by every external algorithm.
pub fn validate_for_external(geo: &GeometryContainer) -> Result<(), String> {
    if geo.point_count() < 3 {
        return Err("Geometry must have at least 3 points".into());
    }
    if geo.primitive_count() < 1 {
        return Err("Geometry must have at least 1 primitive".into());
    }
    if geo.positions().is_none() {
        return Err("Geometry must have position attribute 'P'".into());
    }
    Ok(())
}

/// Area-weighted point normals from Newell face normals.
fn point_normals(positions: &[Vec3f], faces: &[Vec<usize>]) -> Vec<Vec3f> {
    let mut normals = vec![Vec3f::zeros(); positions.len()];
    for face in faces {
        let n = newell_normal(positions, face);
        for &p in face {
            normals[p] += n;
        }
    }
    for n in &mut normals {
        *n = n.try_normalize(1e-12).unwrap_or_else(Vec3f::zeros);
    }
    normals
}

/// Points map 1:1 onto mesh vertices. Faces repeating a point are skipped;
/// normals come from point `N` when present and are computed otherwise.
pub fn to_external(geo: &GeometryContainer) -> Result<ExternalMesh, OperatorError> {
    validate_for_external(geo).map_err(OperatorError::External)?;
    let positions = geo
        .positions()
        .ok_or_else(|| OperatorError::missing_attribute(standard::POSITION, ElementClass::Point))?
        .to_vec();
    let topo = geo.topology();
    let mut faces = Vec::with_capacity(topo.primitive_count());
    let mut skipped = 0;
    for prim in 0..topo.primitive_count() {
        let face = topo.primitive_points(prim);
        let unique: AHashSet<usize> = face.iter().copied().collect();
        if face.len() < 3 || unique.len() != face.len() {
            skipped += 1;
            continue;
        }
        faces.push(face);
    }
    if faces.is_empty() {
        return Err(OperatorError::External("no valid faces after conversion".into()));
    }
    let normals = match geo.values::<Vec3f>(ElementClass::Point, standard::NORMAL) {
        Some(n) => n.to_vec(),
        None => point_normals(&positions, &faces),
    };
    debug!(
        "to_external: {} vertices, {} faces, {} skipped",
        positions.len(),
        faces.len(),
        skipped
    );
    Ok(ExternalMesh {
        positions,
        faces,
        normals,
    })
}

/// Rebuilds a container with one vertex per face corner. With
/// `preserve_attributes`, the mesh normals become point `N`.
pub fn from_external(mesh: &ExternalMesh, preserve_attributes: bool) -> GeometryContainer {
    let mut geo = GeometryContainer::new();
    geo.ensure_positions();
    geo.set_point_count(mesh.vertex_count());
    if let Some(dst) = geo.positions_mut() {
        dst.copy_from_slice(&mesh.positions);
    }
    for face in &mesh.faces {
        if let Err(err) = geo.add_polygon(face) {
            warn!("from_external: skipping face: {err}");
        }
    }
    if preserve_attributes && mesh.normals.len() == mesh.vertex_count() {
        geo.add_attribute(
            ElementClass::Point,
            standard::NORMAL,
            AttributeType::Vec3,
            InterpolationMode::Linear,
        );
        if let Some(dst) = geo.values_mut::<Vec3f>(ElementClass::Point, standard::NORMAL) {
            dst.copy_from_slice(&mesh.normals);
        }
    }
    geo
}
