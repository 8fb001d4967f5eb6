//! Benchmarks for buffered bindings and presentation-model fan-out.
//!
//! Run with: `cargo bench --package ftui-binding --bench buffered_bench`
//!
//! # Performance Baselines
//!
//! These benchmarks establish baselines for:
//! - Edit/commit and edit/flush cycles on one buffer
//! - Delegate notification fan-out to many buffers
//! - Model-wide commit and validate over many fields

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ftui_binding::validation;
use ftui_binding::{BufferedBinding, PresentationModel, ValidatingAdapter, ValueBinding};
use std::hint::black_box;

// ============================================================================
// Single Buffer
// ============================================================================

fn bench_single_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer");

    let delegate = ValueBinding::new(0u64);
    let buffer = BufferedBinding::new(delegate.clone());
    let mut next = 0u64;
    group.bench_function("set_commit", |b| {
        b.iter(|| {
            next += 1;
            buffer.set(black_box(next));
            buffer.commit()
        });
    });

    let delegate = ValueBinding::new(0u64);
    let buffer = BufferedBinding::new(delegate.clone());
    let mut next = 0u64;
    group.bench_function("set_flush", |b| {
        b.iter(|| {
            next += 1;
            buffer.set(black_box(next));
            buffer.flush();
        });
    });

    group.finish();
}

// ============================================================================
// Delegate Fan-out
// ============================================================================

fn bench_delegate_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("delegate_fanout");

    for buffers in [1usize, 16, 256] {
        let delegate = ValueBinding::new(0u64);
        let views: Vec<_> = (0..buffers)
            .map(|_| BufferedBinding::new(delegate.clone()))
            .collect();
        group.throughput(Throughput::Elements(buffers as u64));

        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::new("set_flush_all", buffers), &views, |b, views| {
            b.iter(|| {
                next += 1;
                delegate.set(black_box(next));
                for view in views {
                    view.flush();
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Presentation Model
// ============================================================================

fn form(fields: usize) -> (PresentationModel, Vec<BufferedBinding<String>>) {
    let mut model = PresentationModel::new();
    let mut buffers = Vec::with_capacity(fields);
    for i in 0..fields {
        let buffer = BufferedBinding::new(ValueBinding::new(format!("field-{i}")));
        model.add(buffer.clone()).add_adapter(ValidatingAdapter::new(
            format!("f{i}"),
            buffer.clone(),
            validation::And::new()
                .with(validation::not_blank())
                .with(validation::max_chars(32)),
        ));
        buffers.push(buffer);
    }
    (model, buffers)
}

fn bench_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("model");

    for fields in [8usize, 64, 512] {
        let (model, buffers) = form(fields);
        group.throughput(Throughput::Elements(fields as u64));

        group.bench_with_input(BenchmarkId::new("validate", fields), &model, |b, model| {
            b.iter(|| black_box(model.validate()));
        });

        let mut round = 0u64;
        group.bench_with_input(
            BenchmarkId::new("edit_commit", fields),
            &(model, buffers),
            |b, (model, buffers)| {
                b.iter(|| {
                    round += 1;
                    for buffer in buffers {
                        buffer.set(format!("edit-{round}"));
                    }
                    black_box(model.commit_data())
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_single_buffer, bench_delegate_fanout, bench_model);

criterion_main!(benches);
