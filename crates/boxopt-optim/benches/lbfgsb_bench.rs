//! Benchmarks for the L-BFGS-B solver
//!
//! Run with: cargo bench

use boxopt_core::{bounds::Bounds, cost_function::CostFunction, error::Result};
use boxopt_optim::{generalized_cauchy_point, LBFGSBConfig, LimitedMemory, LBFGSB};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::DVector;

/// Extended Rosenbrock function on consecutive coordinate pairs.
#[derive(Debug)]
struct ExtendedRosenbrock;

impl CostFunction<f64> for ExtendedRosenbrock {
    fn cost(&self, x: &DVector<f64>) -> Result<f64> {
        Ok((0..x.len() / 2)
            .map(|k| {
                let (a, b) = (x[2 * k], x[2 * k + 1]);
                (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)
            })
            .sum())
    }

    fn gradient(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        let mut g = DVector::zeros(x.len());
        for k in 0..x.len() / 2 {
            let (a, b) = (x[2 * k], x[2 * k + 1]);
            let inner = b - a * a;
            g[2 * k] = -2.0 * (1.0 - a) - 400.0 * a * inner;
            g[2 * k + 1] = 200.0 * inner;
        }
        Ok(g)
    }
}

fn start(n: usize) -> DVector<f64> {
    DVector::from_fn(n, |i, _| if i % 2 == 0 { -1.2 } else { 1.0 })
}

fn benchmark_bounded_rosenbrock(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_rosenbrock");

    for &n in &[10, 100, 1000] {
        let bounds = Bounds::new(DVector::from_element(n, -2.0), DVector::from_element(n, 0.8)).unwrap();

        for &m in &[5, 10] {
            let config = LBFGSBConfig::new().with_memory_size(m).with_max_iterations(200);
            group.bench_with_input(BenchmarkId::new(format!("m={m}"), n), &n, |b, &n| {
                b.iter(|| {
                    let mut solver = LBFGSB::from_bounds(bounds.clone(), config.clone()).unwrap();
                    let mut x = start(n);
                    solver.solve(black_box(&mut x), black_box(&ExtendedRosenbrock))
                });
            });
        }
    }

    group.finish();
}

fn benchmark_cauchy_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("cauchy_point");

    for &n in &[100, 1000, 10_000] {
        let bounds = Bounds::new(DVector::from_element(n, -1.0), DVector::from_element(n, 1.0)).unwrap();
        let x = DVector::from_fn(n, |i, _| ((i % 11) as f64 - 5.0) / 10.0);
        let g = DVector::from_fn(n, |i, _| ((i % 7) as f64 - 3.0) * 0.7);

        let mut memory = LimitedMemory::new(n, 5);
        for k in 0..5 {
            let s = DVector::from_fn(n, |i, _| (((i + k) % 5) as f64 + 1.0) * 1e-2);
            let y = &s * (2.0 + k as f64);
            memory.update(s, y);
        }

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| generalized_cauchy_point(black_box(&x), black_box(&g), &bounds, memory.representation()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_bounded_rosenbrock, benchmark_cauchy_point);
criterion_main!(benches);
