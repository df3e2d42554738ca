#[macro_use]
extern crate criterion;
extern crate mandelbrot_queues;
extern crate num;

use criterion::{black_box, Criterion};
use mandelbrot_queues::{evaluate, render, RenderConfig};
use num::Complex;

fn escape_benchmark(c: &mut Criterion) {
    c.bench_function("evaluate bounded point", |b| {
        b.iter(|| evaluate(black_box(Complex::new(-0.1, 0.1)), black_box(1_000)))
    });
    c.bench_function("evaluate escaping point", |b| {
        b.iter(|| evaluate(black_box(Complex::new(0.3, 0.0)), black_box(1_000)))
    });
}

fn render_benchmark(c: &mut Criterion) {
    for workers in &[1, 2, 4] {
        let config = RenderConfig::new(64, 64, 200).with_workers(*workers);
        c.bench_function(&format!("render 64x64 with {} workers", workers), move |b| {
            b.iter(|| render(&config).unwrap())
        });
    }
}

criterion_group!(benches, escape_benchmark, render_benchmark);
criterion_main!(benches);
