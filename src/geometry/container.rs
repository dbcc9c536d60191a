// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry container: one attribute set per element class plus topology

use super::bbox::BoundingBox;
use super::groups;
use super::topology::{Topology, UNASSIGNED};
use crate::attributes::{
    standard, AttributeSet, AttributeType, AttributeValue, ElementClass, InterpolationMode, Vec3f,
};
use crate::error::{GeometryError, TopologyError};
use ahash::AHashSet;

#[derive(Debug, Clone)]
pub struct GeometryContainer {
    topology: Topology,
    points: AttributeSet,
    vertices: AttributeSet,
    primitives: AttributeSet,
    detail: AttributeSet,
}

impl Default for GeometryContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryContainer {
    pub fn new() -> Self {
        let mut detail = AttributeSet::new(ElementClass::Detail);
        detail.resize(1);
        Self {
            topology: Topology::new(),
            points: AttributeSet::new(ElementClass::Point),
            vertices: AttributeSet::new(ElementClass::Vertex),
            primitives: AttributeSet::new(ElementClass::Primitive),
            detail,
        }
    }

    /// Builds polygons over `positions`; each face lists point indices.
    pub fn from_polygons(positions: &[Vec3f], faces: &[Vec<usize>]) -> Result<Self, TopologyError> {
        let mut geo = Self::new();
        geo.ensure_positions();
        geo.set_point_count(positions.len());
        if let Some(p) = geo.positions_mut() {
            p.copy_from_slice(positions);
        }
        for face in faces {
            geo.add_polygon(face)?;
        }
        Ok(geo)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn point_count(&self) -> usize {
        self.topology.point_count()
    }

    pub fn vertex_count(&self) -> usize {
        self.topology.vertex_count()
    }

    pub fn primitive_count(&self) -> usize {
        self.topology.primitive_count()
    }

    pub fn element_count(&self, class: ElementClass) -> usize {
        match class {
            ElementClass::Point => self.point_count(),
            ElementClass::Vertex => self.vertex_count(),
            ElementClass::Primitive => self.primitive_count(),
            ElementClass::Detail => 1,
        }
    }

    pub fn attributes(&self, class: ElementClass) -> &AttributeSet {
        match class {
            ElementClass::Point => &self.points,
            ElementClass::Vertex => &self.vertices,
            ElementClass::Primitive => &self.primitives,
            ElementClass::Detail => &self.detail,
        }
    }

    pub fn attributes_mut(&mut self, class: ElementClass) -> &mut AttributeSet {
        match class {
            ElementClass::Point => &mut self.points,
            ElementClass::Vertex => &mut self.vertices,
            ElementClass::Primitive => &mut self.primitives,
            ElementClass::Detail => &mut self.detail,
        }
    }

    pub fn point_attributes(&self) -> &AttributeSet {
        &self.points
    }

    pub fn vertex_attributes(&self) -> &AttributeSet {
        &self.vertices
    }

    pub fn primitive_attributes(&self) -> &AttributeSet {
        &self.primitives
    }

    pub fn detail_attributes(&self) -> &AttributeSet {
        &self.detail
    }

    pub fn set_point_count(&mut self, count: usize) {
        self.topology.set_point_count(count);
        self.points.resize(count);
    }

    pub fn set_vertex_count(&mut self, count: usize) {
        self.topology.set_vertex_count(count);
        self.vertices.resize(count);
    }

    pub fn set_primitive_count(&mut self, count: usize) {
        self.topology.set_primitive_count(count);
        self.primitives.resize(count);
    }

    pub fn add_attribute(
        &mut self,
        class: ElementClass,
        name: &str,
        attr_type: AttributeType,
        interpolation: InterpolationMode,
    ) -> bool {
        let count = self.element_count(class);
        let set = self.attributes_mut(class);
        if set.is_empty() && count > 0 {
            set.resize(count);
        }
        set.add_attribute(name, attr_type, interpolation)
    }

    pub fn has_attribute(&self, class: ElementClass, name: &str) -> bool {
        self.attributes(class).has_attribute(name)
    }

    pub fn remove_attribute(&mut self, class: ElementClass, name: &str) -> bool {
        self.attributes_mut(class).remove_attribute(name)
    }

    pub fn values<T: AttributeValue>(&self, class: ElementClass, name: &str) -> Option<&[T]> {
        self.attributes(class).values::<T>(name)
    }

    pub fn values_mut<T: AttributeValue>(
        &mut self,
        class: ElementClass,
        name: &str,
    ) -> Option<&mut [T]> {
        self.attributes_mut(class).values_mut::<T>(name)
    }

    /// Returns the typed column, adding it first when missing. `None` when a
    /// column of that name exists with another type.
    pub fn ensure_values<T: AttributeValue>(
        &mut self,
        class: ElementClass,
        name: &str,
    ) -> Option<&mut [T]> {
        if !self.has_attribute(class, name) {
            self.add_attribute(class, name, T::TYPE, InterpolationMode::Linear);
        }
        self.values_mut::<T>(class, name)
    }

    pub fn ensure_positions(&mut self) {
        if !self.has_attribute(ElementClass::Point, standard::POSITION) {
            self.add_attribute(
                ElementClass::Point,
                standard::POSITION,
                AttributeType::Vec3,
                InterpolationMode::Linear,
            );
        }
    }

    pub fn positions(&self) -> Option<&[Vec3f]> {
        self.points.values::<Vec3f>(standard::POSITION)
    }

    pub fn positions_mut(&mut self) -> Option<&mut [Vec3f]> {
        self.points.values_mut::<Vec3f>(standard::POSITION)
    }

    /// Appends a point at `position`; returns its index.
    pub fn add_point(&mut self, position: Vec3f) -> usize {
        self.ensure_positions();
        let index = self.point_count();
        self.set_point_count(index + 1);
        if let Some(p) = self.positions_mut() {
            p[index] = position;
        }
        index
    }

    /// Appends a vertex referencing `point`; returns its index.
    pub fn add_vertex(&mut self, point: usize) -> Result<usize, TopologyError> {
        let index = self.vertex_count();
        self.set_vertex_count(index + 1);
        self.topology.set_vertex_point(index, point)?;
        Ok(index)
    }

    /// Appends a primitive over existing vertices; returns its index.
    pub fn add_primitive(&mut self, vertices: Vec<usize>) -> Result<usize, TopologyError> {
        let index = self.topology.add_primitive(vertices)?;
        self.primitives.resize(self.topology.primitive_count());
        Ok(index)
    }

    /// Creates one fresh vertex per point and a primitive over them.
    pub fn add_polygon(&mut self, points: &[usize]) -> Result<usize, TopologyError> {
        if let Some(&bad) = points.iter().find(|&&p| p >= self.point_count()) {
            return Err(TopologyError::PointOutOfRange {
                index: bad,
                count: self.point_count(),
            });
        }
        let base = self.vertex_count();
        self.set_vertex_count(base + points.len());
        for (i, &p) in points.iter().enumerate() {
            self.topology.set_vertex_point(base + i, p)?;
        }
        self.add_primitive((base..base + points.len()).collect())
    }

    /// Appends a point whose attributes, `P` included, are the weighted
    /// blend of existing points.
    pub fn add_point_blended(&mut self, sources: &[(usize, f32)]) -> usize {
        let index = self.point_count();
        self.set_point_count(index + 1);
        self.points.set_blended(index, sources);
        index
    }

    /// [`add_polygon`](Self::add_polygon) that also copies the primitive
    /// attributes of `source`.
    pub fn add_polygon_like(&mut self, points: &[usize], source: usize) -> Result<usize, TopologyError> {
        let index = self.add_polygon(points)?;
        if source < index {
            self.primitives.set_blended(index, &[(source, 1.0)]);
        }
        Ok(index)
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        let positions = self.positions()?;
        if positions.is_empty() {
            return None;
        }
        Some(BoundingBox::from_points(positions))
    }

    /// Checks topology indices and that every attribute set matches its
    /// element count.
    pub fn validate(&self) -> bool {
        self.topology.validate().is_ok()
            && self.points.len() == self.point_count()
            && self.vertices.len() == self.vertex_count()
            && self.primitives.len() == self.primitive_count()
            && self.points.validate()
            && self.vertices.validate()
            && self.primitives.validate()
    }

    pub fn clear(&mut self) {
        self.topology.clear();
        self.points.clear();
        self.vertices.clear();
        self.primitives.clear();
    }

    pub fn memory_usage(&self) -> usize {
        self.points.memory_usage()
            + self.vertices.memory_usage()
            + self.primitives.memory_usage()
            + self.detail.memory_usage()
    }

    /// Appends `other`'s elements after ours, unioning attribute schemas.
    /// Detail attributes already present here win.
    pub fn merge(&mut self, other: &GeometryContainer) -> Result<(), GeometryError> {
        self.points.append(&other.points)?;
        self.vertices.append(&other.vertices)?;
        self.primitives.append(&other.primitives)?;
        self.detail.merge(&other.detail, false)?;
        self.detail.resize(1);
        self.topology.extend_from(&other.topology);
        Ok(())
    }

    /// Keeps `points` (old indices, in order) and the primitives in `prims`.
    /// Every kept primitive must reference kept points only. Vertices are
    /// renumbered in primitive order; all attributes follow.
    fn compact(&self, points: &[usize], prims: &[usize]) -> GeometryContainer {
        let mut remap = vec![UNASSIGNED; self.point_count()];
        for (new, &old) in points.iter().enumerate() {
            if let Some(slot) = remap.get_mut(old) {
                *slot = new;
            }
        }

        let mut kept_vertices = Vec::with_capacity(self.vertex_count());
        let mut vertex_points = Vec::with_capacity(self.vertex_count());
        let mut primitives = Vec::with_capacity(prims.len());
        for &prim in prims {
            let start = kept_vertices.len();
            for &v in self.topology.primitive_vertices(prim) {
                // vertices without a kept point are dropped
                let Some(&point) = remap.get(self.topology.vertex_point(v)) else {
                    continue;
                };
                if point == UNASSIGNED {
                    continue;
                }
                kept_vertices.push(v);
                vertex_points.push(point);
            }
            primitives.push((start..kept_vertices.len()).collect());
        }

        let mut out = GeometryContainer {
            topology: Topology::new(),
            points: self.points.gather(points),
            vertices: self.vertices.gather(&kept_vertices),
            primitives: self.primitives.gather(prims),
            detail: self.detail.clone(),
        };
        out.topology.rebuild(points.len(), vertex_points, primitives);
        out
    }

    /// Removes the given primitives. With `cleanup`, points left without
    /// any vertex are removed too.
    pub fn delete_primitives(&self, delete: &[usize], cleanup: bool) -> GeometryContainer {
        let delete: AHashSet<usize> = delete.iter().copied().collect();
        let prims: Vec<usize> = (0..self.primitive_count())
            .filter(|p| !delete.contains(p))
            .collect();
        let points: Vec<usize> = (0..self.point_count()).collect();
        let out = self.compact(&points, &prims);
        if cleanup {
            out.remove_orphaned_points()
        } else {
            out
        }
    }

    /// Removes the given points and every primitive referencing one of them.
    pub fn delete_points(&self, delete: &[usize]) -> GeometryContainer {
        let delete: AHashSet<usize> = delete.iter().copied().collect();
        let points: Vec<usize> = (0..self.point_count())
            .filter(|p| !delete.contains(p))
            .collect();
        let prims: Vec<usize> = (0..self.primitive_count())
            .filter(|&prim| {
                self.topology
                    .primitive_vertices(prim)
                    .iter()
                    .all(|&v| !delete.contains(&self.topology.vertex_point(v)))
            })
            .collect();
        self.compact(&points, &prims)
    }

    /// Drops points no primitive references.
    pub fn remove_orphaned_points(&self) -> GeometryContainer {
        let mut used = vec![false; self.point_count()];
        for verts in self.topology.primitives() {
            for &v in verts {
                if let Some(flag) = used.get_mut(self.topology.vertex_point(v)) {
                    *flag = true;
                }
            }
        }
        if used.iter().all(|&u| u) {
            return self.clone();
        }
        let points: Vec<usize> = (0..self.point_count()).filter(|&p| used[p]).collect();
        let prims: Vec<usize> = (0..self.primitive_count()).collect();
        self.compact(&points, &prims)
    }

    /// Deletes the members of a point or primitive group.
    pub fn delete_elements(
        &self,
        group: &str,
        class: ElementClass,
        delete_orphaned: bool,
    ) -> Result<GeometryContainer, GeometryError> {
        if !groups::has_group(self, group, class) {
            return Err(GeometryError::MissingGroup(group.to_string()));
        }
        let members = groups::group_elements(self, group, class);
        if members.is_empty() {
            return Ok(self.clone());
        }
        match class {
            ElementClass::Point => Ok(self.delete_points(&members)),
            ElementClass::Primitive => Ok(self.delete_primitives(&members, delete_orphaned)),
            other => Err(GeometryError::UnsupportedClass(other)),
        }
    }
}
