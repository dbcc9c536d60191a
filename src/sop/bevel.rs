// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Edge strips and rounded corner patches for sharp polygon edges
//!
//! The operator classifies manifold edges whose dihedral angle reaches
//! `angle_limit` as sharp, then runs one or both passes:
//!
//! * the edge pass pulls every face corner touching a sharp edge inward,
//!   giving each `(point, face)` pair its own corner point, and bridges
//!   the two faces of each sharp edge with a strip of `segments` quads;
//! * the vertex pass builds a ring patch around each sharp corner, in one
//!   of three [`CornerStyle`]s.
//!
//! In [`BevelType::EdgeVertex`] the vertex pass stitches onto the strip
//! ends recorded by the edge pass and caps each corner, so a closed input
//! stays closed.

use super::node::{CookContext, Operator, ParameterDefinition};
use super::require_positions;
use crate::attributes::{ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::mesh_utils::{
    angle_between_deg, centroid, newell_normal, point_primitives, recompute_primitive_normals,
    EdgeMap,
};
use crate::geometry::GeometryContainer;
use ahash::{AHashMap, AHashSet};
use log::{debug, warn};

pub const MAX_SEGMENTS: usize = 16;

/// Slack kept below half an edge length when clamping widths.
const EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BevelType {
    Vertex,
    Edge,
    Face,
    EdgeVertex,
}

impl BevelType {
    fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Edge,
            2 => Self::Face,
            3 => Self::EdgeVertex,
            _ => Self::Vertex,
        }
    }
}

/// Topology of the patch built around a beveled corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerStyle {
    /// Original point kept as apex, triangle fan to the first ring.
    ApexFan,
    /// Ring-to-ring quads only.
    RingStart,
    /// Each wedge between incident faces split into `segments` sub-angles.
    Grid,
}

impl CornerStyle {
    fn from_index(index: i32) -> Self {
        match index {
            1 => Self::RingStart,
            2 => Self::Grid,
            _ => Self::ApexFan,
        }
    }
}

#[derive(Debug, Default)]
pub struct BevelOp;

#[derive(Debug, Clone, Copy)]
struct Settings {
    width: f32,
    segments: usize,
    gamma: f32,
    style: CornerStyle,
}

impl Settings {
    /// Profile-shaped parameter for slice or ring `step` of `segments`.
    fn shaped(&self, step: usize) -> f32 {
        (step as f32 / self.segments as f32).powf(self.gamma)
    }
}

/// Input-side data shared by both passes.
struct Analysis {
    positions: Vec<Vec3f>,
    rings: Vec<Vec<usize>>,
    normals: Vec<Vec3f>,
    centroids: Vec<Vec3f>,
    edges: EdgeMap,
    /// Parallel to `edges.edges()`.
    sharp: Vec<bool>,
}

impl Analysis {
    fn new(
        geo: &GeometryContainer,
        angle_limit: f32,
        contributing: &[bool],
    ) -> Result<Self, OperatorError> {
        let positions = require_positions(geo)?.to_vec();
        let topo = geo.topology();
        let rings: Vec<Vec<usize>> = (0..topo.primitive_count())
            .map(|prim| topo.primitive_points(prim))
            .collect();
        let normals = rings
            .iter()
            .map(|ring| {
                newell_normal(&positions, ring)
                    .try_normalize(1e-12)
                    .unwrap_or_else(Vec3f::zeros)
            })
            .collect::<Vec<_>>();
        let centroids = rings
            .iter()
            .map(|ring| centroid(&positions, ring))
            .collect();
        let edges = EdgeMap::build(topo);
        let sharp = edges
            .edges()
            .iter()
            .map(|edge| match edge.faces.as_slice() {
                &[f0, f1] => {
                    (contributing[f0] || contributing[f1])
                        && angle_between_deg(&normals[f0], &normals[f1]) >= angle_limit
                }
                _ => false,
            })
            .collect();
        Ok(Self {
            positions,
            rings,
            normals,
            centroids,
            edges,
            sharp,
        })
    }

    fn is_sharp(&self, p0: usize, p1: usize) -> bool {
        self.edges
            .position(p0, p1)
            .map_or(false, |i| self.sharp[i])
    }

    fn sharp_edges(&self) -> impl Iterator<Item = (usize, usize, usize, usize)> + '_ {
        self.edges
            .edges()
            .iter()
            .zip(&self.sharp)
            .filter(|(_, sharp)| **sharp)
            .map(|(edge, _)| (edge.key.a, edge.key.b, edge.faces[0], edge.faces[1]))
    }

    fn has_sharp_edges(&self) -> bool {
        self.sharp.iter().any(|&s| s)
    }

    /// Points and faces as `a → b` runs in `f0`'s winding.
    fn oriented(&self, a: usize, b: usize, f0: usize) -> (usize, usize) {
        let ring = &self.rings[f0];
        let n = ring.len();
        let forward = (0..n).any(|k| ring[k] == a && ring[(k + 1) % n] == b);
        if forward {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Shortest edge leaving `point` within the given faces.
    fn shortest_incident_edge(&self, point: usize, faces: &[usize]) -> Option<f32> {
        let origin = self.positions[point];
        faces
            .iter()
            .flat_map(|&f| {
                let ring = &self.rings[f];
                let n = ring.len();
                ring.iter()
                    .position(|&p| p == point)
                    .map(move |k| [ring[(k + n - 1) % n], ring[(k + 1) % n]])
                    .into_iter()
                    .flatten()
            })
            .map(|q| (self.positions[q] - origin).norm())
            .reduce(f32::min)
    }
}

/// Strip end at one point, keyed `(point, from face, to face)`.
#[derive(Debug, Clone)]
struct StripEnd {
    /// Slice points from the `from` corner to the `to` corner.
    points: Vec<usize>,
    /// Whether the strip quads run `points[k] → points[k + 1]`.
    along: bool,
}

/// Output of the edge pass.
#[derive(Default)]
struct EdgePass {
    /// `(original point, face)` → corner point.
    corners: AHashMap<(usize, usize), usize>,
    ends: AHashMap<(usize, usize, usize), StripEnd>,
}

fn set_position(geo: &mut GeometryContainer, point: usize, position: Vec3f) {
    if let Some(dst) = geo.positions_mut() {
        dst[point] = position;
    }
}

/// Quadratic Bezier from `a0` to `a1` around the control `k`.
fn bezier(a0: Vec3f, k: Vec3f, a1: Vec3f, t: f32) -> Vec3f {
    let s = 1.0 - t;
    a0 * (s * s) + k * (2.0 * s * t) + a1 * (t * t)
}

fn edge_pass(
    geo: &mut GeometryContainer,
    analysis: &Analysis,
    settings: Settings,
    clamp_overlap: bool,
) -> Result<EdgePass, OperatorError> {
    let positions = &analysis.positions;
    // a corner slides along one edge per sharp neighbour; with clamping it
    // stops short of that edge's midpoint
    let slide = |p: usize, q: usize| {
        let along = positions[q] - positions[p];
        let width = if clamp_overlap {
            settings.width.min(along.norm() * 0.5 - EPSILON).max(0.0)
        } else {
            settings.width
        };
        along.try_normalize(1e-12).unwrap_or_else(Vec3f::zeros) * width
    };
    let mut pass = EdgePass::default();

    // corners: pushed away from each sharp edge meeting at the corner
    for (face, ring) in analysis.rings.iter().enumerate() {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let vertices = geo.topology().primitive_vertices(face).to_vec();
        for k in 0..n {
            let (prev, p, next) = (ring[(k + n - 1) % n], ring[k], ring[(k + 1) % n]);
            let sharp_in = analysis.is_sharp(prev, p);
            let sharp_out = analysis.is_sharp(p, next);
            if !sharp_in && !sharp_out {
                continue;
            }
            let mut offset = Vec3f::zeros();
            if sharp_out {
                offset += slide(p, prev);
            }
            if sharp_in {
                offset += slide(p, next);
            }
            let corner = geo.add_point_blended(&[(p, 1.0)]);
            set_position(geo, corner, positions[p] + offset);
            geo.topology_mut().set_vertex_point(vertices[k], corner)?;
            pass.corners.insert((p, face), corner);
        }
    }

    // strips: slice 0 sits in f0, the last slice in f1
    let segments = settings.segments;
    let sharp: Vec<_> = analysis.sharp_edges().collect();
    for (p0, p1, f0, f1) in sharp {
        let (a, b) = analysis.oriented(p0, p1, f0);
        let axis = (positions[b] - positions[a])
            .try_normalize(1e-12)
            .unwrap_or_else(Vec3f::zeros);
        let mut slices = [Vec::with_capacity(segments + 1), Vec::with_capacity(segments + 1)];
        for (slice, p) in slices.iter_mut().zip([a, b]) {
            let (Some(&first), Some(&last)) = (pass.corners.get(&(p, f0)), pass.corners.get(&(p, f1)))
            else {
                continue;
            };
            let current = geo.positions().map(|pos| (pos[first], pos[last]));
            let Some((a0, a1)) = current else {
                continue;
            };
            let mid = (a0 + a1) * 0.5;
            let control = positions[p] + axis * (mid - positions[p]).dot(&axis);
            slice.push(first);
            for s in 1..segments {
                let t = settings.shaped(s);
                let point = geo.add_point_blended(&[(first, 1.0 - t), (last, t)]);
                set_position(geo, point, bezier(a0, control, a1, t));
                slice.push(point);
            }
            slice.push(last);
        }
        let [sa, sb] = slices;
        if sa.len() != segments + 1 || sb.len() != segments + 1 {
            continue;
        }
        for s in 0..segments {
            geo.add_polygon_like(&[sb[s], sa[s], sa[s + 1], sb[s + 1]], f0)?;
        }

        let reversed = |points: &[usize]| points.iter().rev().copied().collect::<Vec<_>>();
        pass.ends.insert((a, f1, f0), StripEnd { points: reversed(&sa), along: false });
        pass.ends.insert((a, f0, f1), StripEnd { points: sa, along: true });
        pass.ends.insert((b, f1, f0), StripEnd { points: reversed(&sb), along: true });
        pass.ends.insert((b, f0, f1), StripEnd { points: sb, along: false });
    }
    Ok(pass)
}

/// Incident faces of `point` ordered by angle around their mean normal,
/// plus that normal.
fn angular_order(analysis: &Analysis, faces: &[usize]) -> Option<(Vec<usize>, Vec3f)> {
    let up = faces
        .iter()
        .map(|&f| analysis.normals[f])
        .sum::<Vec3f>()
        .try_normalize(1e-8)?;
    let helper = if up.x.abs() < 0.9 { Vec3f::x() } else { Vec3f::y() };
    let tangent = up.cross(&helper).normalize();
    let bitangent = up.cross(&tangent);
    let mut keyed: Vec<(f32, usize)> = faces
        .iter()
        .map(|&f| {
            let n = analysis.normals[f];
            let projected = n - up * n.dot(&up);
            (projected.dot(&bitangent).atan2(projected.dot(&tangent)), f)
        })
        .collect();
    keyed.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
    Some((keyed.into_iter().map(|(_, f)| f).collect(), up))
}

/// Rings `1..=segments` of corner points around `point`, innermost first,
/// plus the face each ring slot was derived from.
struct Patch {
    rings: Vec<Vec<usize>>,
    sources: Vec<usize>,
    reverse: bool,
}

impl Patch {
    fn emit(&self, geo: &mut GeometryContainer, apex: Option<usize>, cap: bool) -> Result<(), OperatorError> {
        let add = |geo: &mut GeometryContainer, mut points: Vec<usize>, source: usize| {
            if self.reverse {
                points.reverse();
            }
            geo.add_polygon_like(&points, source).map(|_| ())
        };
        let count = self.sources.len();
        if let (Some(apex), Some(first)) = (apex, self.rings.first()) {
            for j in 0..count {
                add(geo, vec![apex, first[j], first[(j + 1) % count]], self.sources[j])?;
            }
        }
        for pair in self.rings.windows(2) {
            let (inner, outer) = (&pair[0], &pair[1]);
            for j in 0..count {
                let next = (j + 1) % count;
                add(geo, vec![inner[j], outer[j], outer[next], inner[next]], self.sources[j])?;
            }
        }
        if let (true, Some(first)) = (cap, self.rings.first()) {
            add(geo, first.clone(), self.sources[0])?;
        }
        Ok(())
    }
}

/// Unit directions from `point` toward each face centroid, with `sub`
/// interpolated directions per wedge.
fn wedge_directions(analysis: &Analysis, point: usize, order: &[usize], sub: usize) -> Vec<(Vec3f, usize)> {
    let origin = analysis.positions[point];
    let direction = |f: usize| {
        (analysis.centroids[f] - origin)
            .try_normalize(1e-12)
            .unwrap_or_else(Vec3f::zeros)
    };
    let mut out = Vec::with_capacity(order.len() * sub);
    for (i, &f) in order.iter().enumerate() {
        let (d0, d1) = (direction(f), direction(order[(i + 1) % order.len()]));
        for k in 0..sub {
            let t = k as f32 / sub as f32;
            let d = (d0 * (1.0 - t) + d1 * t).try_normalize(1e-12).unwrap_or(d0);
            out.push((d, f));
        }
    }
    out
}

fn vertex_pass(
    geo: &mut GeometryContainer,
    analysis: &Analysis,
    settings: Settings,
    incident: &[Vec<usize>],
    edge: Option<&EdgePass>,
) -> Result<usize, OperatorError> {
    let candidates: Vec<usize> = match edge {
        Some(pass) => pass
            .corners
            .keys()
            .map(|&(p, _)| p)
            .collect::<AHashSet<_>>()
            .into_iter()
            .collect(),
        None => analysis
            .sharp_edges()
            .flat_map(|(a, b, _, _)| [a, b])
            .collect::<AHashSet<_>>()
            .into_iter()
            .collect(),
    };
    let mut candidates = candidates;
    candidates.sort_unstable();

    let mut patched = 0;
    for point in candidates {
        let faces = &incident[point];
        if faces.len() < 3 {
            debug!("bevel: point {point} has {} incident face(s), no corner patch", faces.len());
            continue;
        }
        let Some((order, _up)) = angular_order(analysis, faces) else {
            debug!("bevel: point {point} has no stable face order, no corner patch");
            continue;
        };
        let local_width = analysis
            .shortest_incident_edge(point, faces)
            .map_or(settings.width, |e| settings.width.min(e * 0.5 - EPSILON))
            .max(0.0);
        let origin = analysis.positions[point];

        let patch = match edge {
            None => {
                let sub = if settings.style == CornerStyle::Grid {
                    settings.segments
                } else {
                    1
                };
                let directions = wedge_directions(analysis, point, &order, sub);
                let rings = (1..=settings.segments)
                    .map(|r| {
                        let radius = local_width * settings.shaped(r);
                        directions
                            .iter()
                            .map(|(d, _)| {
                                let q = geo.add_point_blended(&[(point, 1.0)]);
                                set_position(geo, q, origin + d * radius);
                                q
                            })
                            .collect()
                    })
                    .collect();
                Patch {
                    rings,
                    sources: directions.iter().map(|&(_, f)| f).collect(),
                    reverse: false,
                }
            }
            Some(pass) => {
                // outer ring follows the strip ends around the corner
                let mut outer = Vec::new();
                let mut sources = Vec::new();
                let mut reverse = None;
                let directions = wedge_directions(analysis, point, &order, 1);
                for (i, &f) in order.iter().enumerate() {
                    let next = order[(i + 1) % order.len()];
                    if let Some(end) = pass.ends.get(&(point, f, next)) {
                        reverse.get_or_insert(end.along);
                        let run = &end.points[..end.points.len() - 1];
                        outer.extend_from_slice(run);
                        sources.extend(std::iter::repeat(f).take(run.len()));
                    } else if let Some(&corner) = pass.corners.get(&(point, f)) {
                        outer.push(corner);
                        sources.push(f);
                    } else {
                        let q = geo.add_point_blended(&[(point, 1.0)]);
                        set_position(geo, q, origin + directions[i].0 * local_width);
                        outer.push(q);
                        sources.push(f);
                    }
                }
                let outer_positions: Vec<Vec3f> = match geo.positions() {
                    Some(p) => outer.iter().map(|&q| p[q]).collect(),
                    None => continue,
                };
                let mut rings: Vec<Vec<usize>> = (1..settings.segments)
                    .map(|r| {
                        let t = settings.shaped(r);
                        outer
                            .iter()
                            .zip(&outer_positions)
                            .map(|(&q, &target)| {
                                let inner = geo.add_point_blended(&[(point, 1.0 - t), (q, t)]);
                                set_position(geo, inner, origin + (target - origin) * t);
                                inner
                            })
                            .collect()
                    })
                    .collect();
                rings.push(outer);
                Patch {
                    rings,
                    sources,
                    reverse: reverse.unwrap_or(false),
                }
            }
        };

        let apex = (edge.is_none() && settings.style == CornerStyle::ApexFan).then_some(point);
        patch.emit(geo, apex, edge.is_some())?;
        patched += 1;
    }
    Ok(patched)
}

/// Drops replaced originals that no primitive references any more.
fn remove_replaced(geo: GeometryContainer, replaced: &AHashSet<usize>) -> GeometryContainer {
    if replaced.is_empty() {
        return geo;
    }
    let topo = geo.topology();
    let used: AHashSet<usize> = topo
        .primitives()
        .iter()
        .flatten()
        .map(|&v| topo.vertex_point(v))
        .collect();
    let mut stale: Vec<usize> = replaced.iter().copied().filter(|p| !used.contains(p)).collect();
    if stale.is_empty() {
        return geo;
    }
    stale.sort_unstable();
    geo.delete_points(&stale)
}

impl Operator for BevelOp {
    fn kind(&self) -> &'static str {
        "bevel"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::float("width", 0.1),
            ParameterDefinition::int("segments", 1),
            ParameterDefinition::float("profile", 0.5),
            ParameterDefinition::menu("bevel_type", 0, &["Vertex", "Edge", "Face", "EdgeVertex"]),
            ParameterDefinition::menu("corner_style", 0, &["ApexFan", "RingStart", "Grid"]),
            ParameterDefinition::bool("clamp_overlap", true),
            ParameterDefinition::float("angle_limit", 30.0),
            ParameterDefinition::input_group(),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        require_positions(input)?;
        let width: f32 = ctx.get("width", 0.1);
        let bevel_type = BevelType::from_index(ctx.get("bevel_type", 0));
        if width <= 0.0 {
            return Ok(input.clone());
        }
        if bevel_type == BevelType::Face {
            warn!("bevel: face mode is not implemented, passing input through");
            return Ok(input.clone());
        }

        let contributing = ctx.selection(input, ElementClass::Primitive)?;
        let analysis = Analysis::new(input, ctx.get("angle_limit", 30.0), &contributing)?;
        if !analysis.has_sharp_edges() {
            debug!("bevel: no sharp edges");
            return Ok(input.clone());
        }

        let mut style = CornerStyle::from_index(ctx.get("corner_style", 0));
        if bevel_type == BevelType::EdgeVertex && style == CornerStyle::ApexFan {
            style = CornerStyle::RingStart;
        }
        let settings = Settings {
            width,
            segments: ctx.get::<usize>("segments", 1).clamp(1, MAX_SEGMENTS),
            gamma: (ctx.get::<f32>("profile", 0.5) + 0.5).clamp(0.5, 1.5),
            style,
        };
        let incident = point_primitives(input.topology());

        let mut geo = input.clone();
        let mut replaced = AHashSet::new();
        let mut patches = 0;
        match bevel_type {
            BevelType::Edge => {
                let pass = edge_pass(&mut geo, &analysis, settings, ctx.get("clamp_overlap", true))?;
                replaced.extend(pass.corners.keys().map(|&(p, _)| p));
            }
            BevelType::EdgeVertex => {
                let pass = edge_pass(&mut geo, &analysis, settings, ctx.get("clamp_overlap", true))?;
                replaced.extend(pass.corners.keys().map(|&(p, _)| p));
                patches = vertex_pass(&mut geo, &analysis, settings, &incident, Some(&pass))?;
            }
            BevelType::Vertex => {
                patches = vertex_pass(&mut geo, &analysis, settings, &incident, None)?;
            }
            BevelType::Face => {}
        }

        let mut result = remove_replaced(geo, &replaced);
        recompute_primitive_normals(&mut result);
        debug!(
            "bevel: {:?}/{:?}, {} sharp edges, {} corner patches, {} points, {} primitives",
            bevel_type,
            settings.style,
            analysis.sharp.iter().filter(|&&s| s).count(),
            patches,
            result.point_count(),
            result.primitive_count()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::groups;
    use crate::geometry::primitives::{box_geometry, grid};
    use crate::sop::node::SopNode;
    use approx::assert_relative_eq;

    fn cube() -> GeometryContainer {
        box_geometry(Vec3f::repeat(2.0), true)
    }

    fn bevel(geo: GeometryContainer, mode: BevelType, style: CornerStyle, segments: i32) -> GeometryContainer {
        let mut node = SopNode::new("bevel1", Box::new(BevelOp));
        node.set_input(0, geo);
        node.set_parameter("bevel_type", mode as i32);
        node.set_parameter("corner_style", style as i32);
        node.set_parameter("segments", segments);
        node.cook().unwrap().into_inner()
    }

    #[test]
    fn test_edge_single_segment_counts() {
        let out = bevel(cube(), BevelType::Edge, CornerStyle::ApexFan, 1);
        assert_eq!(out.point_count(), 24);
        assert_eq!(out.primitive_count(), 18);
        assert!(out.validate());
    }

    #[test]
    fn test_edge_three_segment_counts() {
        let out = bevel(cube(), BevelType::Edge, CornerStyle::ApexFan, 3);
        assert_eq!(out.point_count(), 72);
        assert_eq!(out.primitive_count(), 42);
    }

    #[test]
    fn test_edge_corners_stay_on_their_faces() {
        let out = bevel(cube(), BevelType::Edge, CornerStyle::ApexFan, 1);
        for p in out.positions().unwrap() {
            // two coordinates pulled in by the width, one still on a face plane
            let on_plane = p.iter().filter(|c| (c.abs() - 1.0).abs() < 1e-5).count();
            let inset = p.iter().filter(|c| (c.abs() - 0.9).abs() < 1e-5).count();
            assert_eq!((on_plane, inset), (1, 2), "{p:?}");
        }
    }

    #[test]
    fn test_vertex_corner_styles() {
        let apex = bevel(cube(), BevelType::Vertex, CornerStyle::ApexFan, 3);
        assert_eq!((apex.point_count(), apex.primitive_count()), (80, 78));
        let ring = bevel(cube(), BevelType::Vertex, CornerStyle::RingStart, 3);
        assert_eq!((ring.point_count(), ring.primitive_count()), (80, 54));
        let grid = bevel(cube(), BevelType::Vertex, CornerStyle::Grid, 3);
        assert_eq!((grid.point_count(), grid.primitive_count()), (224, 150));
    }

    #[test]
    fn test_vertex_rings_respect_width() {
        let out = bevel(cube(), BevelType::Vertex, CornerStyle::RingStart, 2);
        let positions = out.positions().unwrap();
        for p in &positions[8..] {
            let corner = p.map(|c| c.signum());
            let distance = (p - corner).norm();
            assert!(distance > 0.0 && distance <= 0.1 + 1e-5, "{distance}");
        }
    }

    #[test]
    fn test_edge_vertex_single_segment_is_closed() {
        let out = bevel(cube(), BevelType::EdgeVertex, CornerStyle::RingStart, 1);
        assert_eq!(out.point_count(), 24);
        // 6 faces, 12 strips, 8 corner caps
        assert_eq!(out.primitive_count(), 26);
        assert!(EdgeMap::build(out.topology()).is_closed());
    }

    #[test]
    fn test_edge_vertex_three_segments_is_closed() {
        let out = bevel(cube(), BevelType::EdgeVertex, CornerStyle::RingStart, 3);
        assert!(out.point_count() > 72);
        assert!(out.primitive_count() > 42);
        let edges = EdgeMap::build(out.topology());
        assert!(edges.is_closed());
        // closed genus-0 surface
        let euler = out.point_count() as i64 - edges.len() as i64 + out.primitive_count() as i64;
        assert_eq!(euler, 2);
    }

    #[test]
    fn test_apex_fan_upgraded_in_combined_mode() {
        let fan = bevel(cube(), BevelType::EdgeVertex, CornerStyle::ApexFan, 2);
        let ring = bevel(cube(), BevelType::EdgeVertex, CornerStyle::RingStart, 2);
        assert_eq!(fan.point_count(), ring.point_count());
        assert_eq!(fan.primitive_count(), ring.primitive_count());
    }

    #[test]
    fn test_angle_limit_filters_edges() {
        let mut node = SopNode::new("bevel1", Box::new(BevelOp));
        node.set_input(0, cube());
        node.set_parameter("segments", 2);
        node.set_parameter("angle_limit", 100.0f32);
        let out = node.cook().unwrap();
        assert_eq!(out.point_count(), 8);
        assert_eq!(out.primitive_count(), 6);
    }

    #[test]
    fn test_zero_width_is_identity() {
        for mode in [BevelType::Vertex, BevelType::Edge, BevelType::EdgeVertex] {
            let mut node = SopNode::new("bevel1", Box::new(BevelOp));
            node.set_input(0, cube());
            node.set_parameter("width", 0.0f32);
            node.set_parameter("bevel_type", mode as i32);
            node.set_parameter("segments", 4);
            let out = node.cook().unwrap();
            assert_eq!((out.point_count(), out.primitive_count()), (8, 6));
        }
    }

    #[test]
    fn test_default_type_is_vertex() {
        let mut node = SopNode::new("bevel1", Box::new(BevelOp));
        node.set_input(0, cube());
        node.set_parameter("segments", 3);
        let out = node.cook().unwrap();
        let vertex = bevel(cube(), BevelType::Vertex, CornerStyle::ApexFan, 3);
        assert_eq!((out.point_count(), out.primitive_count()), (80, 78));
        assert_eq!(out.positions(), vertex.positions());
    }

    #[test]
    fn test_face_mode_passes_through() {
        let out = bevel(cube(), BevelType::Face, CornerStyle::ApexFan, 2);
        assert_eq!((out.point_count(), out.primitive_count()), (8, 6));
    }

    #[test]
    fn test_clamp_overlap_limits_width() {
        let run = |clamp: bool| {
            let mut node = SopNode::new("bevel1", Box::new(BevelOp));
            node.set_input(0, cube());
            node.set_parameter("width", 1.2f32);
            node.set_parameter("bevel_type", BevelType::Edge as i32);
            node.set_parameter("clamp_overlap", clamp);
            node.cook().unwrap().into_inner()
        };
        // deepest inset coordinate: 1 - width
        let deepest = |geo: &GeometryContainer| {
            geo.positions()
                .unwrap()
                .iter()
                .flat_map(|p| p.iter().map(|c| c.abs()))
                .filter(|c| *c < 0.99)
                .fold(1.0f32, f32::min)
        };
        let clamped = run(true);
        assert_eq!(clamped.point_count(), 24);
        assert!(deepest(&clamped) < 1e-3);
        let free = run(false);
        assert_relative_eq!(deepest(&free), 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_clamp_overlap_is_per_edge() {
        // thin slab: the 0.2 edges must not shrink the bevel on the 2.0 edges
        let mut node = SopNode::new("bevel1", Box::new(BevelOp));
        node.set_input(0, box_geometry(Vec3f::new(2.0, 2.0, 0.2), true));
        node.set_parameter("width", 0.5f32);
        node.set_parameter("bevel_type", BevelType::Edge as i32);
        let out = node.cook().unwrap();
        let positions = out.positions().unwrap();
        assert!(positions.iter().all(|p| p.z.abs() <= 0.1 + 1e-6 && p.z.abs() > 0.0));
        assert!(positions.iter().any(|p| (p.x.abs() - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_low_valence_points_get_no_patch() {
        // an L of two quads: the shared edge is sharp but every point
        // touches at most two faces
        let positions = [
            Vec3f::new(0.0, 0.0, 0.0),
            Vec3f::new(1.0, 0.0, 0.0),
            Vec3f::new(0.0, 1.0, 0.0),
            Vec3f::new(1.0, 1.0, 0.0),
            Vec3f::new(0.0, 0.0, 1.0),
            Vec3f::new(1.0, 0.0, 1.0),
        ];
        let geo = GeometryContainer::from_polygons(&positions, &[vec![0, 1, 3, 2], vec![0, 4, 5, 1]]).unwrap();
        let out = bevel(geo, BevelType::Vertex, CornerStyle::ApexFan, 2);
        assert_eq!((out.point_count(), out.primitive_count()), (6, 2));
    }

    #[test]
    fn test_group_limits_sharp_edges() {
        let mut geo = cube();
        groups::create_group(&mut geo, "lid", ElementClass::Primitive);
        groups::add_to_group(&mut geo, "lid", ElementClass::Primitive, 5);
        let mut node = SopNode::new("bevel1", Box::new(BevelOp));
        node.set_input(0, geo);
        node.set_parameter("input_group", "lid");
        node.set_parameter("bevel_type", BevelType::Edge as i32);
        let out = node.cook().unwrap();
        // 4 top points replaced by 12 corners, one strip per lid edge
        assert_eq!(out.point_count(), 16);
        assert_eq!(out.primitive_count(), 10);
        let top = out.positions().unwrap().iter().filter(|p| p.y > 0.95).count();
        assert_eq!(top, 4);
    }

    #[test]
    fn test_open_grid_has_no_sharp_edges() {
        let flat = grid(2.0, 2.0, 3, 3);
        let out = bevel(flat.clone(), BevelType::Edge, CornerStyle::ApexFan, 2);
        assert_eq!(out.point_count(), flat.point_count());
    }

    #[test]
    fn test_normals_recomputed() {
        let out = bevel(cube(), BevelType::Edge, CornerStyle::ApexFan, 1);
        let normals = out.values::<Vec3f>(ElementClass::Primitive, "N").unwrap();
        assert_eq!(normals.len(), out.primitive_count());
        // strip quads lean 45 degrees between their faces
        let strip = normals[6];
        assert_relative_eq!(strip.norm(), 1.0, epsilon = 1e-5);
        assert_eq!(strip.iter().filter(|c| c.abs() > 0.5).count(), 2);
    }
}
