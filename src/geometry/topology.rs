// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Point / vertex / primitive indexing

use crate::error::TopologyError;
use serde::Serialize;

/// Marks a vertex whose point has not been assigned yet.
pub const UNASSIGNED: usize = usize::MAX;

/// Vertex→point indirection plus ordered primitive vertex lists.
///
/// A vertex is one corner slot of exactly one primitive; a point is a
/// shared position referenced by any number of vertices. Primitive vertex
/// order defines winding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    point_count: usize,
    vertex_points: Vec<usize>,
    primitives: Vec<Vec<usize>>,
}

/// Shape summary of the primitive table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TopologyStats {
    pub min_vertices: usize,
    pub max_vertices: usize,
    pub avg_vertices: f32,
    pub open_primitives: usize,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_points.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn set_point_count(&mut self, count: usize) {
        self.point_count = count;
    }

    /// New vertices start unassigned.
    pub fn set_vertex_count(&mut self, count: usize) {
        self.vertex_points.resize(count, UNASSIGNED);
    }

    /// Truncates the primitive table; growing adds empty primitives.
    pub fn set_primitive_count(&mut self, count: usize) {
        self.primitives.resize(count, Vec::new());
    }

    /// Point of a vertex; `UNASSIGNED` for unassigned or unknown vertices.
    pub fn vertex_point(&self, vertex: usize) -> usize {
        self.vertex_points.get(vertex).copied().unwrap_or(UNASSIGNED)
    }

    pub fn try_vertex_point(&self, vertex: usize) -> Option<usize> {
        self.vertex_points
            .get(vertex)
            .copied()
            .filter(|&p| p != UNASSIGNED)
    }

    pub fn set_vertex_point(&mut self, vertex: usize, point: usize) -> Result<(), TopologyError> {
        let count = self.vertex_points.len();
        if point >= self.point_count {
            return Err(TopologyError::PointOutOfRange {
                index: point,
                count: self.point_count,
            });
        }
        let slot = self
            .vertex_points
            .get_mut(vertex)
            .ok_or(TopologyError::VertexOutOfRange { index: vertex, count })?;
        *slot = point;
        Ok(())
    }

    /// Appends a primitive over existing vertex slots; returns its index.
    pub fn add_primitive(&mut self, vertices: Vec<usize>) -> Result<usize, TopologyError> {
        let count = self.vertex_points.len();
        if let Some(&bad) = vertices.iter().find(|&&v| v >= count) {
            return Err(TopologyError::VertexOutOfRange { index: bad, count });
        }
        self.primitives.push(vertices);
        Ok(self.primitives.len() - 1)
    }

    /// Ordered vertex list of a primitive; empty for out-of-range indices.
    pub fn primitive_vertices(&self, primitive: usize) -> &[usize] {
        self.primitives.get(primitive).map_or(&[], Vec::as_slice)
    }

    /// Flips a primitive's winding. False for unknown primitives.
    pub fn reverse_primitive(&mut self, primitive: usize) -> bool {
        match self.primitives.get_mut(primitive) {
            Some(verts) => {
                verts.reverse();
                true
            }
            None => false,
        }
    }

    pub fn primitives(&self) -> &[Vec<usize>] {
        &self.primitives
    }

    pub fn vertex_points(&self) -> &[usize] {
        &self.vertex_points
    }

    /// Points of a primitive in winding order. Unassigned vertices are
    /// skipped.
    pub fn primitive_points(&self, primitive: usize) -> Vec<usize> {
        self.primitive_vertices(primitive)
            .iter()
            .filter_map(|&v| self.try_vertex_point(v))
            .collect()
    }

    /// Replaces the whole table at once. Used by compaction passes.
    pub(crate) fn rebuild(
        &mut self,
        point_count: usize,
        vertex_points: Vec<usize>,
        primitives: Vec<Vec<usize>>,
    ) {
        self.point_count = point_count;
        self.vertex_points = vertex_points;
        self.primitives = primitives;
    }

    /// Appends `other`'s tables, offsetting its indices past ours.
    pub(crate) fn extend_from(&mut self, other: &Topology) {
        let point_base = self.point_count;
        let vertex_base = self.vertex_points.len();
        self.point_count += other.point_count;
        self.vertex_points.extend(other.vertex_points.iter().map(|&p| {
            if p == UNASSIGNED {
                UNASSIGNED
            } else {
                p + point_base
            }
        }));
        self.primitives.extend(
            other
                .primitives
                .iter()
                .map(|verts| verts.iter().map(|&v| v + vertex_base).collect()),
        );
    }

    /// For each point, the vertices referencing it.
    pub fn point_vertices(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.point_count];
        for (v, &p) in self.vertex_points.iter().enumerate() {
            if let Some(list) = out.get_mut(p) {
                list.push(v);
            }
        }
        out
    }

    /// For each vertex, its owning primitive (`UNASSIGNED` when orphaned).
    pub fn vertex_primitives(&self) -> Vec<usize> {
        let mut out = vec![UNASSIGNED; self.vertex_points.len()];
        for (prim, verts) in self.primitives.iter().enumerate() {
            for &v in verts {
                if let Some(slot) = out.get_mut(v) {
                    *slot = prim;
                }
            }
        }
        out
    }

    /// Checks every index invariant.
    pub fn validate(&self) -> Result<(), TopologyError> {
        for (index, &p) in self.vertex_points.iter().enumerate() {
            if p != UNASSIGNED && p >= self.point_count {
                return Err(TopologyError::PointOutOfRange {
                    index: p,
                    count: self.point_count,
                });
            }
            if p == UNASSIGNED {
                return Err(TopologyError::VertexOutOfRange {
                    index,
                    count: self.vertex_points.len(),
                });
            }
        }
        for verts in &self.primitives {
            if let Some(&v) = verts.iter().find(|&&v| v >= self.vertex_points.len()) {
                return Err(TopologyError::VertexOutOfRange {
                    index: v,
                    count: self.vertex_points.len(),
                });
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.point_count = 0;
        self.vertex_points.clear();
        self.primitives.clear();
    }

    pub fn stats(&self) -> TopologyStats {
        if self.primitives.is_empty() {
            return TopologyStats::default();
        }
        let arities = self.primitives.iter().map(Vec::len);
        let total: usize = arities.clone().sum();
        TopologyStats {
            min_vertices: arities.clone().min().unwrap_or(0),
            max_vertices: arities.clone().max().unwrap_or(0),
            avg_vertices: total as f32 / self.primitives.len() as f32,
            open_primitives: arities.filter(|&n| n < 3).count(),
        }
    }
}
