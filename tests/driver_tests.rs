//! Integration tests for the integrator driver
//!
//! Tests verify that:
//! - The state vector and the ActiveIndexSet always agree in length
//! - A recruited follicle extends the state by one slot at the tail
//! - Non-finite derivatives abort the run with time and follicle id
//! - Runs are reproducible for a fixed seed
//! - The default parameters produce repeated ovulations

use cycle_simulator::config::{InitialFollicle, InitialState, ParameterSet, SimulationConfig};
use cycle_simulator::error::SimulationError;
use cycle_simulator::solver::{simulate, CycleSimulation, StepOutcome};
use cycle_simulator::state::{Destiny, FollicleId, FIXED_STATE_SIZE};
use cycle_simulator::EvaluationMode;

fn follicles(sizes: &[f64]) -> Vec<InitialFollicle> {
    sizes
        .iter()
        .map(|&size_mm| InitialFollicle {
            size_mm,
            fsh_sensitivity: 0.55,
        })
        .collect()
}

fn closed_config(sizes: &[f64], horizon: f64) -> SimulationConfig {
    SimulationConfig {
        horizon_days: horizon,
        enable_recruitment: false,
        initial: InitialState::with_follicles(follicles(sizes)),
        ..Default::default()
    }
}

#[test]
fn test_recruitment_extends_state_by_one() {
    let mut sim = CycleSimulation::new(ParameterSet::default(), closed_config(&[5.0, 5.0], 10.0)).unwrap();

    sim.step().unwrap();
    let len_k = sim.state().len();
    let active_k = sim.active().len();

    sim.schedule_recruitment(2.0, 0.55);
    sim.step().unwrap();

    assert_eq!(sim.state().len(), (len_k - FIXED_STATE_SIZE + 1) + FIXED_STATE_SIZE);
    assert_eq!(sim.active().len(), active_k + 1);
    let newest = sim.active().last().unwrap();
    assert_eq!(newest, FollicleId(2));
    assert_eq!(sim.registry().get(newest).unwrap().activation_time, sim.time());

    let last = sim.trajectory().last().unwrap();
    assert_eq!(last.active.last(), Some(&newest));
    assert_eq!(last.size_of(newest), Some(2.0));
}

#[test]
fn test_nan_sensitivity_aborts_with_follicle_and_time() {
    let mut config = closed_config(&[4.0, 6.0, 8.0], 10.0);
    config.start_day = 3.0;
    config.initial.follicles[1].fsh_sensitivity = f64::NAN;

    let mut sim = CycleSimulation::new(ParameterSet::default(), config).unwrap();
    let err = sim.step().unwrap_err();
    match &err {
        SimulationError::NonFiniteDerivative { time, .. } => assert_eq!(*time, 3.0),
        other => panic!("expected NonFiniteDerivative, got {:?}", other),
    }
    assert_eq!(err.follicle(), Some(FollicleId(1)));
    // Nothing advanced
    assert_eq!(sim.time(), 3.0);
    assert_eq!(sim.trajectory().len(), 1);
}

#[test]
fn test_simulate_propagates_failure() {
    let mut config = closed_config(&[4.0], 5.0);
    config.initial.follicles[0].fsh_sensitivity = f64::NAN;
    let err = simulate(ParameterSet::default(), config).unwrap_err();
    assert_eq!(err.follicle(), Some(FollicleId(0)));
}

#[test]
fn test_samples_keep_dimension_invariant() {
    let config = SimulationConfig {
        horizon_days: 20.0,
        seed: 3,
        ..Default::default()
    };
    let trajectory = simulate(ParameterSet::default(), config).unwrap();

    assert!(trajectory.len() > 1);
    for sample in &trajectory.samples {
        assert_eq!(
            sample.state.len(),
            sample.active.len() + FIXED_STATE_SIZE,
            "t={}: {} slots for {} follicles",
            sample.time,
            sample.state.len(),
            sample.active.len()
        );
        assert!(sample.state.iter().all(|v| v.is_finite()));
        assert!(sample.e2_pg_per_mL.is_finite() && sample.p4_ng_per_mL.is_finite());
    }
    assert_eq!(trajectory.last().unwrap().time, 20.0);

    // Ids in a window are unique and never come back once retired
    for sample in &trajectory.samples {
        let mut ids = sample.active.clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), sample.active.len());
    }
    for record in &trajectory.follicles {
        if let Some(retired) = record.retired_at {
            assert!(trajectory
                .samples
                .iter()
                .filter(|s| s.time > retired)
                .all(|s| !s.active.contains(&record.id)));
        }
    }
}

#[test]
fn test_same_seed_same_trajectory() {
    let config = SimulationConfig {
        horizon_days: 8.0,
        seed: 99,
        ..Default::default()
    };
    let a = simulate(ParameterSet::default(), config.clone()).unwrap();
    let b = simulate(ParameterSet::default(), config).unwrap();
    assert_eq!(a.samples, b.samples);
    assert_eq!(a.summary(), b.summary());
}

/// LH surges must find a follicle large enough to ovulate
#[test]
fn test_default_run_ovulates_repeatedly() {
    let config = SimulationConfig {
        horizon_days: 120.0,
        ..Default::default()
    };
    let summary = simulate(ParameterSet::default(), config).unwrap().summary();
    assert!(
        summary.ovulation_times.len() >= 2,
        "expected repeated ovulations, got {:?}",
        summary.ovulation_times
    );
    assert!(summary.cycle_lengths.iter().all(|&c| c > 0.0));
}

#[test]
fn test_calibration_run_keeps_destinies() {
    let mut config = closed_config(&[2.0, 4.0, 6.0], 5.0);
    config.mode = EvaluationMode::Calibration;
    let mut sim = CycleSimulation::new(ParameterSet::default(), config).unwrap();
    while let StepOutcome::Advanced { resized, .. } = sim.step().unwrap() {
        assert!(!resized);
    }
    assert_eq!(sim.active().len(), 3);
    assert!(sim.registry().records().all(|r| r.destiny == Destiny::Growing));
}
