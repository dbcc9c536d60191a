// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Attribute promotion and demotion between element classes
//!
//! Promotion replicates a value onto every element that references it;
//! demotion averages the values of every contributing element. All six
//! directions share one transfer routine driven by per-destination index
//! lists. Float, Int and Vec2/3/4 attributes are supported; anything else,
//! or a missing source, makes the call a no-op returning false.

use super::container::GeometryContainer;
use super::topology::UNASSIGNED;
use crate::attributes::{AttributeType, Averageable, ElementClass, Vec2f, Vec3f, Vec4f};

fn transfer_typed<T: Averageable>(
    geo: &mut GeometryContainer,
    from: ElementClass,
    to: ElementClass,
    source: &str,
    output: &str,
    sources: &[Vec<usize>],
) -> bool {
    let Some(src) = geo.values::<T>(from, source) else {
        return false;
    };
    let results: Vec<Option<T>> = sources
        .iter()
        .map(|indices| {
            let picked: Vec<T> = indices.iter().filter_map(|&i| src.get(i).cloned()).collect();
            T::average(&picked)
        })
        .collect();

    let interpolation = geo
        .attributes(from)
        .descriptor(source)
        .map(|d| d.interpolation());
    if !geo.has_attribute(to, output) {
        if let Some(mode) = interpolation {
            geo.add_attribute(to, output, T::TYPE, mode);
        }
    }
    let Some(dst) = geo.values_mut::<T>(to, output) else {
        return false;
    };
    for (slot, value) in dst.iter_mut().zip(results) {
        if let Some(value) = value {
            *slot = value;
        }
    }
    true
}

fn transfer(
    geo: &mut GeometryContainer,
    from: ElementClass,
    to: ElementClass,
    source: &str,
    output: &str,
    sources: &[Vec<usize>],
) -> bool {
    let Some(attr_type) = geo.attributes(from).get(source).map(|s| s.attr_type()) else {
        return false;
    };
    match attr_type {
        AttributeType::Float => transfer_typed::<f32>(geo, from, to, source, output, sources),
        AttributeType::Int => transfer_typed::<i32>(geo, from, to, source, output, sources),
        AttributeType::Vec2 => transfer_typed::<Vec2f>(geo, from, to, source, output, sources),
        AttributeType::Vec3 => transfer_typed::<Vec3f>(geo, from, to, source, output, sources),
        AttributeType::Vec4 => transfer_typed::<Vec4f>(geo, from, to, source, output, sources),
        _ => false,
    }
}

fn dedup_sorted(mut v: Vec<usize>) -> Vec<usize> {
    v.sort_unstable();
    v.dedup();
    v
}

pub fn promote_point_to_vertex(geo: &mut GeometryContainer, source: &str, output: &str) -> bool {
    let topo = geo.topology();
    let sources: Vec<Vec<usize>> = (0..topo.vertex_count())
        .map(|v| topo.try_vertex_point(v).into_iter().collect())
        .collect();
    transfer(geo, ElementClass::Point, ElementClass::Vertex, source, output, &sources)
}

pub fn demote_vertex_to_point(geo: &mut GeometryContainer, source: &str, output: &str) -> bool {
    let sources = geo.topology().point_vertices();
    transfer(geo, ElementClass::Vertex, ElementClass::Point, source, output, &sources)
}

pub fn promote_point_to_primitive(geo: &mut GeometryContainer, source: &str, output: &str) -> bool {
    let topo = geo.topology();
    let sources: Vec<Vec<usize>> = (0..topo.primitive_count())
        .map(|p| dedup_sorted(topo.primitive_points(p)))
        .collect();
    transfer(geo, ElementClass::Point, ElementClass::Primitive, source, output, &sources)
}

pub fn demote_primitive_to_point(geo: &mut GeometryContainer, source: &str, output: &str) -> bool {
    let topo = geo.topology();
    let owners = topo.vertex_primitives();
    let sources: Vec<Vec<usize>> = topo
        .point_vertices()
        .into_iter()
        .map(|verts| {
            dedup_sorted(
                verts
                    .into_iter()
                    .map(|v| owners[v])
                    .filter(|&p| p != UNASSIGNED)
                    .collect(),
            )
        })
        .collect();
    transfer(geo, ElementClass::Primitive, ElementClass::Point, source, output, &sources)
}

pub fn promote_vertex_to_primitive(geo: &mut GeometryContainer, source: &str, output: &str) -> bool {
    let sources: Vec<Vec<usize>> = geo.topology().primitives().to_vec();
    transfer(geo, ElementClass::Vertex, ElementClass::Primitive, source, output, &sources)
}

pub fn demote_primitive_to_vertex(geo: &mut GeometryContainer, source: &str, output: &str) -> bool {
    let sources: Vec<Vec<usize>> = geo
        .topology()
        .vertex_primitives()
        .into_iter()
        .map(|p| if p == UNASSIGNED { Vec::new() } else { vec![p] })
        .collect();
    transfer(geo, ElementClass::Primitive, ElementClass::Vertex, source, output, &sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn strip() -> GeometryContainer {
        let positions: Vec<Vec3f> = (0..6)
            .map(|i| Vec3f::new((i % 3) as f32, (i / 3) as f32, 0.0))
            .collect();
        GeometryContainer::from_polygons(&positions, &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]]).unwrap()
    }

    #[test]
    fn test_point_to_vertex_replicates() {
        let mut geo = strip();
        assert!(promote_point_to_vertex(&mut geo, "P", "P"));
        let verts = geo.values::<Vec3f>(ElementClass::Vertex, "P").unwrap();
        assert_eq!(verts.len(), 8);
        assert_eq!(verts[2], Vec3f::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_vertex_to_point_averages() {
        let mut geo = strip();
        geo.ensure_values::<f32>(ElementClass::Vertex, "w")
            .unwrap()
            .copy_from_slice(&[1.0, 2.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0]);
        assert!(demote_vertex_to_point(&mut geo, "w", "w"));
        let w = geo.values::<f32>(ElementClass::Point, "w").unwrap();
        // point 1 is referenced by vertex 1 (2.0) and vertex 4 (4.0)
        assert_relative_eq!(w[1], 3.0);
        assert_relative_eq!(w[0], 1.0);
    }

    #[test]
    fn test_primitive_round_trip() {
        let mut geo = strip();
        geo.ensure_values::<i32>(ElementClass::Primitive, "id")
            .unwrap()
            .copy_from_slice(&[2, 6]);
        assert!(demote_primitive_to_vertex(&mut geo, "id", "id"));
        assert_eq!(
            geo.values::<i32>(ElementClass::Vertex, "id"),
            Some(&[2, 2, 2, 2, 6, 6, 6, 6][..])
        );
        assert!(promote_vertex_to_primitive(&mut geo, "id", "id_back"));
        assert_eq!(geo.values::<i32>(ElementClass::Primitive, "id_back"), Some(&[2, 6][..]));
        assert!(demote_primitive_to_point(&mut geo, "id", "id"));
        // shared points see both primitives
        assert_eq!(geo.values::<i32>(ElementClass::Point, "id").unwrap()[1], 4);
    }

    #[test]
    fn test_point_to_primitive_is_centroid() {
        let mut geo = strip();
        assert!(promote_point_to_primitive(&mut geo, "P", "center"));
        let c = geo.values::<Vec3f>(ElementClass::Primitive, "center").unwrap();
        assert_relative_eq!(c[0], Vec3f::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_missing_or_unsupported_source_is_noop() {
        let mut geo = strip();
        assert!(!promote_point_to_vertex(&mut geo, "nope", "nope"));
        geo.add_attribute(
            ElementClass::Point,
            "name",
            AttributeType::String,
            crate::attributes::InterpolationMode::Discrete,
        );
        assert!(!promote_point_to_vertex(&mut geo, "name", "name"));
        assert!(!geo.has_attribute(ElementClass::Vertex, "name"));
    }
}
