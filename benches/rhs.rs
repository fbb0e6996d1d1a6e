//! Right-hand-side and integration benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cycle_simulator::config::{InitialFollicle, InitialState, ParameterSet, SimulationConfig};
use cycle_simulator::endocrine::{CycleOdeSystem, EvaluationMode};
use cycle_simulator::state::{default_hormone_state, FollicleRegistry};
use cycle_simulator::CycleSimulation;

fn cohort(n: usize) -> Vec<f64> {
    (0..n).map(|i| 2.0 + 0.5 * i as f64).collect()
}

fn bench_rhs_evaluation(c: &mut Criterion) {
    let params = ParameterSet::default();
    let sizes = cohort(20);
    let mut registry = FollicleRegistry::new(&params, -14.0);
    for &s in &sizes {
        registry.activate(0.0, s, 0.55);
    }
    let mut y = sizes.clone();
    y.extend_from_slice(&default_hormone_state());
    let mut dy = vec![0.0; y.len()];
    let system = CycleOdeSystem::new(&params, &registry, EvaluationMode::Normal);

    c.bench_function("rhs_20_follicles", |b| {
        b.iter(|| system.evaluate(black_box(3.0), black_box(&y), &mut dy))
    });
}

fn bench_ten_day_integration(c: &mut Criterion) {
    let follicles = cohort(6)
        .into_iter()
        .map(|size_mm| InitialFollicle {
            size_mm,
            fsh_sensitivity: 0.55,
        })
        .collect();
    let config = SimulationConfig {
        horizon_days: 10.0,
        initial: InitialState::with_follicles(follicles),
        ..Default::default()
    };

    let mut group = c.benchmark_group("integration");
    group.sample_size(10);
    group.bench_function("ten_days", |b| {
        b.iter(|| {
            let mut sim = CycleSimulation::new(ParameterSet::default(), config.clone())
                .expect("valid config");
            sim.run().expect("run completes");
            black_box(sim.step_count())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_rhs_evaluation, bench_ten_day_integration);
criterion_main!(benches);
