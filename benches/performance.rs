// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use procgeo::geometry::primitives::{box_geometry, grid, sphere};
use procgeo::geometry::promotion;
use procgeo::sop::{create_operator, SopNode};
use procgeo::{GeometryContainer, Vec3f};

fn cook(kind: &str, input: &GeometryContainer, params: &[(&str, procgeo::ParameterValue)]) -> usize {
    let Some(op) = create_operator(kind) else {
        return 0;
    };
    let mut node = SopNode::new(kind, op);
    node.set_input(0, input.clone());
    for (name, value) in params {
        node.set_parameter(name, value.clone());
    }
    node.cook().map_or(0, |out| out.point_count())
}

fn bench_bevel(c: &mut Criterion) {
    let mut group = c.benchmark_group("bevel");
    let cube = box_geometry(Vec3f::repeat(2.0), true);

    for segments in [1, 3, 8] {
        group.bench_with_input(BenchmarkId::new("edge", segments), &segments, |b, &s| {
            b.iter(|| {
                cook(
                    "bevel",
                    black_box(&cube),
                    &[("segments", s.into()), ("bevel_type", 1.into())],
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("edge_vertex", segments), &segments, |b, &s| {
            b.iter(|| {
                cook(
                    "bevel",
                    black_box(&cube),
                    &[("segments", s.into()), ("bevel_type", 3.into())],
                )
            })
        });
    }

    group.finish();
}

fn bench_subdivide(c: &mut Criterion) {
    let mut group = c.benchmark_group("subdivide");
    let cube = box_geometry(Vec3f::repeat(2.0), true);

    for levels in [1, 2, 3, 4] {
        group.bench_with_input(BenchmarkId::new("catmull_clark", levels), &levels, |b, &l| {
            b.iter(|| cook("subdivide", black_box(&cube), &[("levels", l.into())]))
        });
    }

    group.finish();
}

fn bench_normals(c: &mut Criterion) {
    let mut group = c.benchmark_group("normals");
    let ball = sphere(1.0, 64, 64);

    for (label, mode) in [("vertex", 0), ("face", 1), ("point", 2)] {
        group.bench_function(label, |b| {
            b.iter(|| cook("normal", black_box(&ball), &[("normal_type", mode.into())]))
        });
    }

    group.finish();
}

fn bench_promotion(c: &mut Criterion) {
    let mut group = c.benchmark_group("promotion");
    let mut ball = sphere(1.0, 64, 64);
    promotion::promote_point_to_vertex(&mut ball, "P", "rest");

    group.bench_function("point_to_primitive", |b| {
        b.iter(|| {
            let mut geo = ball.clone();
            promotion::promote_point_to_primitive(black_box(&mut geo), "P", "center")
        })
    });
    group.bench_function("vertex_to_point", |b| {
        b.iter(|| {
            let mut geo = ball.clone();
            promotion::demote_vertex_to_point(black_box(&mut geo), "rest", "avg")
        })
    });

    group.finish();
}

fn bench_scatter(c: &mut Criterion) {
    let mut group = c.benchmark_group("scatter");
    let plane = grid(10.0, 10.0, 32, 32);

    for count in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("grid", count), &count, |b, &n| {
            b.iter(|| cook("scatter", black_box(&plane), &[("point_count", n.into())]))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bevel,
    bench_subdivide,
    bench_normals,
    bench_promotion,
    bench_scatter
);
criterion_main!(benches);
