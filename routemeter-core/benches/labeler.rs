//! Label derivation benchmarks
//!
//! Run with: cargo bench -p routemeter-core --bench labeler

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use routemeter_core::{route_template_label, truncate_path, PathDepth};

fn bench_truncate_path(c: &mut Criterion) {
    let path = "/api/v1/rooms/550e8400-e29b-41d4-a716-446655440000/members/42/messages";
    let mut group = c.benchmark_group("truncate_path");

    for components in [0_i64, 1, 3, 8] {
        let depth = PathDepth::from_components(components);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, depth| {
            b.iter(|| black_box(truncate_path(black_box(path), *depth)));
        });
    }
    group.finish();
}

fn bench_route_template_label(c: &mut Criterion) {
    c.bench_function("route_template_label", |b| {
        b.iter(|| black_box(route_template_label(black_box(Some("/rooms/")), black_box(Some("/{room_id}/chat")))));
    });
}

criterion_group!(benches, bench_truncate_path, bench_route_template_label);
criterion_main!(benches);
