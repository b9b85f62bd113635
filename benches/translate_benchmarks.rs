//! Throughput benchmarks for the translator.
//!
//! Measures the two pipeline halves separately and end to end:
//! - parse: source text to command sequences
//! - generate: command sequences to assembly on a sink
//! - translate: both, from text to assembly

use std::fmt::Write as _;
use std::hint::black_box;
use std::io;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use hackvm::{parse, translate_source, translate_units};

/// Build a synthetic unit exercising every command category.
fn synthetic_unit(prefix: &str, functions: usize, blocks_per_function: usize) -> String {
    let mut source = String::new();
    for f in 0..functions {
        writeln!(source, "function {prefix}.f{f} 2").unwrap();
        for b in 0..blocks_per_function {
            source.push_str(
                "push constant 7\n\
                 push constant 8\n\
                 add\n\
                 pop local 0\n\
                 push local 0\n\
                 push argument 1\n\
                 lt\n\
                 pop temp 3\n\
                 push static 2\n\
                 pop static 4\n",
            );
            writeln!(source, "label L{b}\npush temp 3\nif-goto L{b}").unwrap();
        }
        writeln!(source, "push constant 0\ncall {prefix}.f{} 0\nreturn", (f + 1) % functions)
            .unwrap();
    }
    source
}

fn parse_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let small = synthetic_unit("Bench", 2, 2);
    group.throughput(Throughput::Bytes(small.len() as u64));
    group.bench_function("small_unit", |b| {
        b.iter(|| parse(black_box(&small)).unwrap().len());
    });

    let large = synthetic_unit("Bench", 20, 25);
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("large_unit", |b| {
        b.iter(|| parse(black_box(&large)).unwrap().len());
    });

    group.finish();
}

fn generate_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    let small = synthetic_unit("Bench", 2, 2);
    let small_commands = parse(&small).unwrap();
    group.throughput(Throughput::Bytes(small.len() as u64));
    group.bench_function("small_unit", |b| {
        b.iter(|| {
            translate_units(
                black_box(&[("bench", small_commands.as_slice())]),
                "Bench.f0",
                io::sink(),
            )
            .unwrap()
        });
    });

    let large = synthetic_unit("Bench", 20, 25);
    let large_commands = parse(&large).unwrap();
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("large_unit", |b| {
        b.iter(|| {
            translate_units(
                black_box(&[("bench", large_commands.as_slice())]),
                "Bench.f0",
                io::sink(),
            )
            .unwrap()
        });
    });

    group.finish();
}

fn end_to_end_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");

    let alpha = synthetic_unit("Alpha", 10, 10);
    let beta = synthetic_unit("Beta", 8, 12);
    group.throughput(Throughput::Bytes((alpha.len() + beta.len()) as u64));
    group.bench_function("two_units", |b| {
        b.iter(|| {
            let sink = translate_source(
                black_box(&[("alpha", alpha.as_str()), ("beta", beta.as_str())]),
                "Alpha.f0",
                Vec::with_capacity(256 * 1024),
            )
            .unwrap();
            sink.len()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    parse_benchmarks,
    generate_benchmarks,
    end_to_end_benchmarks
);
criterion_main!(benches);
