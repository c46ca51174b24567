//! Properties of the per-interval resolvers: loss curves and fast-start
//! profiles.

use nemde_algo::resolve::fast_start::{advance, bounds};
use nemde_algo::resolve::LossCurve;
use nemde_core::{FastStartMode, FastStartProfile, LossModel, LossSegment};

fn two_segment(first: f64, second: f64) -> LossModel {
    LossModel {
        loss_share: 0.5,
        loss_lower_limit: 100.0,
        segments: vec![
            LossSegment {
                limit: 0.0,
                factor: first,
            },
            LossSegment {
                limit: 100.0,
                factor: second,
            },
        ],
    }
}

fn starting_unit() -> FastStartProfile {
    FastStartProfile {
        t1: 2.0,
        t2: 6.0,
        t3: 10.0,
        t4: 20.0,
        min_loading_mw: 30.0,
        current_mode: FastStartMode::Synchronising,
        current_mode_time: 0.0,
    }
}

#[test]
fn loss_follows_the_segment_factors() {
    let curve = LossCurve::from_model("N-V", &two_segment(0.5, 0.3)).unwrap();
    assert!((curve.loss_at(50.0) - 15.0).abs() < 1e-9);
    assert!(curve.loss_at(0.0).abs() < 1e-12);
    assert!((curve.loss_at(-40.0) + 20.0).abs() < 1e-9);
    assert!(!curve.is_convex());
    assert_eq!(curve.segment_for(50.0), 1);
    assert_eq!(curve.segment_for(-50.0), 0);
}

#[test]
fn symmetric_curve_is_convex() {
    let curve = LossCurve::from_model("N-V", &two_segment(-0.02, 0.02)).unwrap();
    assert!(curve.is_convex());
    assert!((curve.loss_at(-60.0) - curve.loss_at(60.0)).abs() < 1e-12);
    assert_eq!(curve.min_flow(), -100.0);
    assert_eq!(curve.max_flow(), 100.0);
}

#[test]
fn decreasing_segment_limits_are_rejected() {
    let mut model = two_segment(0.1, 0.2);
    model.segments[1].limit = -10.0;
    assert!(LossCurve::from_model("N-V", &model).is_err());
}

#[test]
fn profile_modes_never_regress_with_elapsed_time() {
    let profile = starting_unit();
    let mut last = 0;
    for step in 0..=80 {
        let minutes = step as f64 * 0.5;
        let mode = advance(&profile, minutes).mode.number();
        assert!(mode >= last, "mode {mode} after {minutes} min");
        last = mode;
    }
    assert_eq!(last, 4);
}

#[test]
fn trajectory_cap_rises_to_minimum_loading() {
    let profile = starting_unit();
    let mut last_cap = 0.0;
    for step in 0..=16 {
        let minutes = 2.0 + step as f64 * 0.5;
        let state = advance(&profile, minutes);
        let limits = bounds(&profile, &state);
        match state.mode {
            FastStartMode::Trajectory => {
                let cap = limits.max.unwrap();
                assert!(cap >= last_cap);
                assert!(cap <= profile.min_loading_mw);
                last_cap = cap;
            }
            FastStartMode::MinimumLoading => {
                assert_eq!(limits.min, Some(profile.min_loading_mw));
            }
            other => panic!("unexpected mode {other:?} at {minutes} min"),
        }
    }
}
