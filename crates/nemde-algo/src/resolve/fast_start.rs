//! Fast-start inflexibility profiles.
//!
//! A committed fast-start unit walks modes 1 → 2 → 3 → 4 with fixed durations
//! `t1..t3` (minutes). The dispatch interval advances the profile; the mode it
//! lands in decides the energy bounds the unit is held to.

use nemde_core::{FastStartMode, FastStartProfile, Trader};

use crate::error::ResolveError;

/// Mode and minutes-in-mode at the end of the interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastStartState {
    pub mode: FastStartMode,
    pub time_in_mode: f64,
}

/// Energy target limits imposed by the profile. `None` leaves the offer's
/// own limit in force.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfileBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

pub fn check_profile(trader: &str, profile: &FastStartProfile) -> Result<(), ResolveError> {
    let values = [
        ("t1", profile.t1),
        ("t2", profile.t2),
        ("t3", profile.t3),
        ("t4", profile.t4),
        ("min_loading_mw", profile.min_loading_mw),
        ("current_mode_time", profile.current_mode_time),
    ];
    for (field, value) in values {
        if !value.is_finite() || value < 0.0 {
            return Err(ResolveError::FastStart {
                trader: trader.to_string(),
                message: format!("{field} must be a non-negative number, got {value}"),
            });
        }
    }
    Ok(())
}

/// Advance `profile` by `minutes`. An uncommitted unit stays uncommitted;
/// mode 4 absorbs.
pub fn advance(profile: &FastStartProfile, minutes: f64) -> FastStartState {
    let mut mode = profile.current_mode;
    let mut time = profile.current_mode_time;
    let mut remaining = minutes;

    if mode == FastStartMode::Uncommitted {
        return FastStartState {
            mode,
            time_in_mode: time,
        };
    }

    while let Some(duration) = profile.duration(mode) {
        let left_in_mode = (duration - time).max(0.0);
        if remaining < left_in_mode {
            break;
        }
        remaining -= left_in_mode;
        mode = mode.next();
        time = 0.0;
    }
    FastStartState {
        mode,
        time_in_mode: time + remaining,
    }
}

/// Energy bounds for a unit in `state`.
///
/// Mode 2 follows a linear trajectory from zero to minimum loading over `t2`;
/// the trajectory value caps the target.
pub fn bounds(profile: &FastStartProfile, state: &FastStartState) -> ProfileBounds {
    match state.mode {
        FastStartMode::Uncommitted | FastStartMode::Synchronising => ProfileBounds {
            min: None,
            max: Some(0.0),
        },
        FastStartMode::Trajectory => ProfileBounds {
            min: Some(0.0),
            max: Some(trajectory(profile, state.time_in_mode)),
        },
        FastStartMode::MinimumLoading => ProfileBounds {
            min: Some(profile.min_loading_mw),
            max: None,
        },
        FastStartMode::Normal => ProfileBounds::default(),
    }
}

fn trajectory(profile: &FastStartProfile, minutes: f64) -> f64 {
    if profile.t2 <= 0.0 {
        profile.min_loading_mw
    } else {
        profile.min_loading_mw * (minutes / profile.t2).min(1.0)
    }
}

/// Highest energy target a starting unit can reach by the end of the
/// interval, or `None` when its offered ramp rate applies unchanged.
///
/// Only units that start the interval in mode 1 or 2 get an override: the
/// rest of the start-up sequence is run forward and the offered ramp rate
/// (MW/h) applies once minimum loading is reached.
pub fn ramp_up_capability(
    profile: &FastStartProfile,
    ramp_up_rate: f64,
    interval_minutes: f64,
) -> Option<f64> {
    let per_minute = ramp_up_rate / 60.0;
    match profile.current_mode {
        FastStartMode::Synchronising => {
            let t1_left = (profile.t1 - profile.current_mode_time).max(0.0);
            let t2_time = profile.t2.min(interval_minutes - t1_left).max(0.0);
            let loading_time = (interval_minutes - t1_left - t2_time).max(0.0);
            let t2_reach = if profile.t2 <= 0.0 {
                if interval_minutes >= t1_left {
                    profile.min_loading_mw
                } else {
                    0.0
                }
            } else {
                profile.min_loading_mw / profile.t2 * t2_time
            };
            Some(t2_reach + per_minute * loading_time)
        }
        FastStartMode::Trajectory => {
            let t2_left = (profile.t2 - profile.current_mode_time).max(0.0);
            let t2_time = t2_left.min(interval_minutes);
            let reach = trajectory(profile, profile.current_mode_time + t2_time);
            Some(reach + per_minute * (interval_minutes - t2_time))
        }
        _ => None,
    }
}

/// Profile of a trader committed during the dispatch-only solve: it starts
/// the interval synchronising.
pub fn committed(profile: &FastStartProfile) -> FastStartProfile {
    FastStartProfile {
        current_mode: FastStartMode::Synchronising,
        current_mode_time: 0.0,
        ..*profile
    }
}

/// Everything the builder needs to apply a trader's profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFastStart {
    pub state: FastStartState,
    pub bounds: ProfileBounds,
    pub ramp_up_capability: Option<f64>,
}

pub fn resolve_fast_start(
    trader: &Trader,
    profile: &FastStartProfile,
    interval_minutes: f64,
) -> Result<ResolvedFastStart, ResolveError> {
    check_profile(trader.id.as_str(), profile)?;
    let state = advance(profile, interval_minutes);
    let ramp_up_capability = trader
        .energy_ramp_up_rate()
        .and_then(|rate| ramp_up_capability(profile, rate, interval_minutes));
    Ok(ResolvedFastStart {
        state,
        bounds: bounds(profile, &state),
        ramp_up_capability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(mode: FastStartMode, time: f64) -> FastStartProfile {
        FastStartProfile {
            t1: 3.0,
            t2: 4.0,
            t3: 10.0,
            t4: 20.0,
            min_loading_mw: 40.0,
            current_mode: mode,
            current_mode_time: time,
        }
    }

    #[test]
    fn uncommitted_unit_stays_put() {
        let state = advance(&profile(FastStartMode::Uncommitted, 7.0), 5.0);
        assert_eq!(state.mode, FastStartMode::Uncommitted);
        assert_eq!(state.time_in_mode, 7.0);
        let b = bounds(&profile(FastStartMode::Uncommitted, 0.0), &state);
        assert_eq!(b.max, Some(0.0));
    }

    #[test]
    fn advance_crosses_mode_boundaries() {
        // 3 minutes of mode 1, then 2 of the 4 trajectory minutes
        let state = advance(&profile(FastStartMode::Synchronising, 0.0), 5.0);
        assert_eq!(state.mode, FastStartMode::Trajectory);
        assert!((state.time_in_mode - 2.0).abs() < 1e-12);
        let b = bounds(&profile(FastStartMode::Synchronising, 0.0), &state);
        assert_eq!(b.min, Some(0.0));
        assert!((b.max.unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn completing_a_mode_exactly_moves_on() {
        let state = advance(&profile(FastStartMode::Trajectory, 1.0), 3.0);
        assert_eq!(state.mode, FastStartMode::MinimumLoading);
        assert_eq!(state.time_in_mode, 0.0);
    }

    #[test]
    fn normal_mode_absorbs() {
        let state = advance(&profile(FastStartMode::MinimumLoading, 8.0), 5.0);
        assert_eq!(state.mode, FastStartMode::Normal);
        assert!((state.time_in_mode - 3.0).abs() < 1e-12);
        let state = advance(&profile(FastStartMode::Normal, 30.0), 5.0);
        assert_eq!(state.time_in_mode, 35.0);
        assert_eq!(bounds(&profile(FastStartMode::Normal, 0.0), &state), ProfileBounds::default());
    }

    #[test]
    fn advance_never_goes_backwards() {
        let modes = [
            FastStartMode::Synchronising,
            FastStartMode::Trajectory,
            FastStartMode::MinimumLoading,
            FastStartMode::Normal,
        ];
        for mode in modes {
            for time in [0.0, 1.0, 2.5, 9.0] {
                let p = profile(mode, time);
                let state = advance(&p, 5.0);
                assert!(state.mode >= mode);
                assert!(state.time_in_mode >= 0.0);
            }
        }
    }

    #[test]
    fn minimum_loading_sets_a_floor() {
        let p = profile(FastStartMode::MinimumLoading, 0.0);
        let b = bounds(&p, &advance(&p, 5.0));
        assert_eq!(b.min, Some(40.0));
        assert_eq!(b.max, None);
    }

    #[test]
    fn zero_length_trajectory_jumps_to_min_loading() {
        let mut p = profile(FastStartMode::Trajectory, 0.0);
        p.t2 = 0.0;
        assert_eq!(trajectory(&p, 0.0), 40.0);
    }

    #[test]
    fn ramp_capability_from_synchronising() {
        // 3 min sync, 2 min of trajectory at 10 MW/min
        let p = profile(FastStartMode::Synchronising, 0.0);
        assert!((ramp_up_capability(&p, 600.0, 5.0).unwrap() - 20.0).abs() < 1e-9);
        // 1 min sync left, 4 min trajectory, 0 at minimum loading
        let p = profile(FastStartMode::Synchronising, 2.0);
        assert!((ramp_up_capability(&p, 600.0, 5.0).unwrap() - 40.0).abs() < 1e-9);
        // Already past the sync stage: one minute of ramping at 10 MW/min
        let p = profile(FastStartMode::Synchronising, 3.0);
        assert!((ramp_up_capability(&p, 600.0, 5.0).unwrap() - 50.0).abs() < 1e-9);
        assert!(ramp_up_capability(&profile(FastStartMode::Normal, 0.0), 600.0, 5.0).is_none());
    }

    #[test]
    fn ramp_capability_from_trajectory() {
        // 2 min left on trajectory reaching 40, then 3 min at 1 MW/min
        let p = profile(FastStartMode::Trajectory, 2.0);
        assert!((ramp_up_capability(&p, 60.0, 5.0).unwrap() - 43.0).abs() < 1e-9);
    }

    #[test]
    fn telemetered_ramp_rate_tightens_capability() {
        let mut trader = crate::test_fixtures::fast_start_unit().traders[1].clone();
        trader.offers[0].ramp_up_rate = Some(600.0);
        let p = profile(FastStartMode::Synchronising, 3.0);
        let resolved = resolve_fast_start(&trader, &p, 5.0).unwrap();
        assert!((resolved.ramp_up_capability.unwrap() - 50.0).abs() < 1e-9);

        // 1 min past minimum loading at 2 MW/min
        trader.initial.scada_ramp_up_rate = Some(120.0);
        let resolved = resolve_fast_start(&trader, &p, 5.0).unwrap();
        assert!((resolved.ramp_up_capability.unwrap() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn negative_durations_are_rejected() {
        let mut p = profile(FastStartMode::Synchronising, 0.0);
        p.t3 = -1.0;
        let err = check_profile("GT1", &p).unwrap_err();
        assert!(err.to_string().contains("t3"));
    }
}
