//! Integration tests for the endocrine right-hand side
//!
//! Tests verify that:
//! - An empty follicle population yields the baseline E2/P4 levels
//! - Hormone evaluation is a pure function (bit-identical repeats)
//! - The secretion contribution grows strictly with follicle size
//! - Calibration mode ignores lifecycle tags entirely
//! - Declining, atretic and ovulated follicles do not secrete

use cycle_simulator::config::{idx, ParameterSet};
use cycle_simulator::endocrine::{CycleOdeSystem, EvaluationMode, HormoneRhs};
use cycle_simulator::state::{default_hormone_state, FollicleRegistry};

fn parameter_variants() -> Vec<ParameterSet> {
    let base = ParameterSet::default();
    vec![
        base.clone(),
        base.with(idx::E2_BASELINE, 45.0).unwrap(),
        base.with(idx::P4_BASELINE, 2.0)
            .unwrap()
            .with(idx::E2_FOLLICULAR_OFFSET, 12.0)
            .unwrap(),
        base.with(idx::E2_LUTEAL_AMPLITUDE, 0.0).unwrap(),
        base.with(idx::SECRETION_HALF_SIZE, 4.0).unwrap(),
    ]
}

/// Zero-follicle boundary: only the follicle-independent terms remain
#[test]
fn test_empty_population_returns_baseline() {
    for params in parameter_variants() {
        let rhs = HormoneRhs::from_params(&params);
        for (t, tovu) in [(0.0, -14.0), (10.0, 2.0), (9.0, 2.0), (60.0, 0.0)] {
            let levels = rhs.compute(t, &[], tovu);
            let baseline = rhs.baseline(t, tovu);
            assert_eq!(levels, baseline, "t={} tovu={}", t, tovu);

            let bump = rhs.luteal_bump(t, tovu);
            let e2 = params[idx::E2_BASELINE]
                + params[idx::E2_FOLLICULAR_OFFSET]
                + params[idx::E2_LUTEAL_AMPLITUDE] * bump;
            let p4 = params[idx::P4_BASELINE] + params[idx::P4_LUTEAL_AMPLITUDE] * bump;
            assert!((levels.e2_pg_per_mL - e2).abs() < 1e-12);
            assert!((levels.p4_ng_per_mL - p4).abs() < 1e-12);
        }
    }
}

#[test]
fn test_compute_is_bit_identical() {
    let rhs = HormoneRhs::from_params(&ParameterSet::default());
    let sizes = [2.1, 4.7, 9.3, 13.8, 17.2];
    let a = rhs.compute(11.25, &sizes, 3.0);
    let b = rhs.compute(11.25, &sizes, 3.0);
    assert_eq!(a.e2_pg_per_mL.to_bits(), b.e2_pg_per_mL.to_bits());
    assert_eq!(a.p4_ng_per_mL.to_bits(), b.p4_ng_per_mL.to_bits());
}

#[test]
fn test_secretion_contribution_monotone_in_size() {
    let rhs = HormoneRhs::from_params(&ParameterSet::default());
    let sizes: Vec<f64> = (1..=40).map(|i| i as f64 * 0.25).collect();
    for pair in sizes.windows(2) {
        assert!(
            rhs.hill_fraction(pair[1]) > rhs.hill_fraction(pair[0]),
            "Hill fraction should increase from {} to {} mm",
            pair[0],
            pair[1]
        );
        assert!(rhs.contribution(pair[1]) > rhs.contribution(pair[0]));
    }
}

#[test]
fn test_calibration_mode_insensitive_to_destiny() {
    let params = ParameterSet::default();
    let sizes = [2.5, 6.0, 11.0, 15.5];

    let mut plain = FollicleRegistry::new(&params, -14.0);
    let mut tagged = FollicleRegistry::new(&params, -14.0);
    for &s in &sizes {
        plain.activate(0.0, s, 0.55);
        tagged.activate(0.0, s, 0.55);
    }
    let ids = tagged.active().as_slice().to_vec();
    tagged.get_mut(ids[0]).unwrap().self_destruct();
    tagged.get_mut(ids[1]).unwrap().mark_for_decline(1.0);
    tagged.get_mut(ids[2]).unwrap().make_dominant();
    tagged.get_mut(ids[3]).unwrap().ovulate();

    let mut y = sizes.to_vec();
    y.extend_from_slice(&default_hormone_state());
    let mut a = vec![0.0; y.len()];
    let mut b = vec![0.0; y.len()];

    CycleOdeSystem::new(&params, &plain, EvaluationMode::Calibration)
        .evaluate(6.0, &y, &mut a)
        .unwrap();
    CycleOdeSystem::new(&params, &tagged, EvaluationMode::Calibration)
        .evaluate(6.0, &y, &mut b)
        .unwrap();
    assert_eq!(a, b, "calibration derivatives must not depend on destiny");

    // The same tags do change the normal-mode derivatives
    let mut c = vec![0.0; y.len()];
    CycleOdeSystem::new(&params, &tagged, EvaluationMode::Normal)
        .evaluate(6.0, &y, &mut c)
        .unwrap();
    assert_ne!(a[..sizes.len()], c[..sizes.len()]);
}

/// A 15 mm follicle marked for decline leaves E2 at baseline
#[test]
fn test_declining_follicle_stops_secreting() {
    let params = ParameterSet::default();
    let tovu = -1000.0;
    let mut registry = FollicleRegistry::new(&params, tovu);
    let id = registry.activate(0.0, 15.0, 0.55);

    let mut y = vec![15.0];
    y.extend_from_slice(&default_hormone_state());
    let growing = CycleOdeSystem::new(&params, &registry, EvaluationMode::Normal)
        .snapshot(5.0, &y)
        .unwrap();

    registry.get_mut(id).unwrap().mark_for_decline(4.0);
    let declining = CycleOdeSystem::new(&params, &registry, EvaluationMode::Normal)
        .snapshot(5.0, &y)
        .unwrap();

    let baseline = HormoneRhs::from_params(&params).baseline(5.0, tovu);
    assert!(growing.e2_pg_per_mL > baseline.e2_pg_per_mL + 50.0);
    assert_eq!(declining, baseline, "declining follicle should not secrete");
}

#[test]
fn test_terminal_follicles_stop_secreting() {
    let params = ParameterSet::default();
    let mut registry = FollicleRegistry::new(&params, -14.0);
    registry.activate(0.0, 16.0, 0.55);
    let id = registry.activate(0.0, 18.0, 0.55);

    let mut y = vec![16.0, 18.0];
    y.extend_from_slice(&default_hormone_state());
    let before = CycleOdeSystem::new(&params, &registry, EvaluationMode::Normal)
        .snapshot(5.0, &y)
        .unwrap();
    registry.get_mut(id).unwrap().ovulate();
    let after = CycleOdeSystem::new(&params, &registry, EvaluationMode::Normal)
        .snapshot(5.0, &y)
        .unwrap();

    let rhs = HormoneRhs::from_params(&params);
    assert!(after.e2_pg_per_mL < before.e2_pg_per_mL);
    assert_eq!(after, rhs.compute(5.0, &[16.0, 0.0], -14.0));
}
