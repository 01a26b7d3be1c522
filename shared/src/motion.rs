//! Undamped small-angle pendulum model and its screen projection.
//!
//! The angle is derived analytically from elapsed time rather than integrated,
//! so any caller holding a record and a clock reading gets the same answer.

use std::f64::consts::TAU;

use crate::config::LayoutConfig;
use crate::error::{check_length, ParamError};
use crate::pendulum::Pendulum;
use crate::vec2::Vec2;

/// Gravitational acceleration (m/s^2)
pub const GRAVITY: f64 = 9.81;

/// Rest angle of a stopped pendulum: straight down.
pub const REST_ANGLE: f64 = 0.0;

/// Angular frequency (rad/s) of a pendulum with the given arm length.
pub fn angular_frequency(length: f64) -> Result<f64, ParamError> {
    Ok((GRAVITY / check_length(length)?).sqrt())
}

/// Oscillation period (s): `2 * pi * sqrt(length / g)`.
pub fn period(length: f64) -> Result<f64, ParamError> {
    Ok(TAU / angular_frequency(length)?)
}

/// Angle (radians) after `elapsed_ms` for a pendulum released at `theta0`.
///
/// Amplitude never decays. Negative elapsed time is accepted; cosine is even.
pub fn current_angle(length: f64, theta0: f64, elapsed_ms: f64) -> Result<f64, ParamError> {
    let omega = angular_frequency(length)?;
    let t = elapsed_ms / 1000.0;
    Ok(theta0 * (omega * t).cos())
}

/// Angle the pendulum shows at `now_ms`, honouring its `moving` flag.
pub fn effective_angle(pendulum: &Pendulum, now_ms: i64) -> Result<f64, ParamError> {
    if !pendulum.moving {
        return Ok(REST_ANGLE);
    }
    let elapsed_ms = now_ms.saturating_sub(pendulum.triggered_at) as f64;
    current_angle(pendulum.length, pendulum.theta0, elapsed_ms)
}

/// Bob position of the pendulum at `index` in the caller's enumeration order.
pub fn bob_position(
    pendulum: &Pendulum,
    index: usize,
    layout: &LayoutConfig,
    now_ms: i64,
) -> Result<Vec2, ParamError> {
    let length_px = check_length(pendulum.length)? * layout.scale;
    let angle = effective_angle(pendulum, now_ms)?;
    Ok(layout.anchor(index).polar_offset(length_px, angle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_4, PI};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "Expected {} to be close to {}",
            actual,
            expected
        );
    }

    fn pendulum(theta0: f64, length: f64, triggered_at: i64, moving: bool) -> Pendulum {
        Pendulum {
            id: "test".to_string(),
            theta0,
            mass: 1.0,
            length,
            triggered_at,
            moving,
        }
    }

    #[test]
    fn angle_at_zero_is_initial_angle() {
        assert_eq!(current_angle(2.0, FRAC_PI_4, 0.0).unwrap(), FRAC_PI_4);
        assert_close(current_angle(2.0, FRAC_PI_4, 0.0).unwrap(), 0.785398);
    }

    #[test]
    fn angle_after_one_second_is_negative_for_one_meter() {
        // omega = sqrt(9.81) ~ 3.13, cos(3.13) ~ -0.9999
        let angle = current_angle(1.0, 0.2, 1000.0).unwrap();
        assert!(angle < 0.0);
        assert_close(angle, 0.2 * (GRAVITY.sqrt()).cos());
    }

    #[test]
    fn quarter_period_is_vertical() {
        let quarter_ms = period(2.0).unwrap() * 1000.0 / 4.0;
        assert_close(current_angle(2.0, FRAC_PI_4, quarter_ms).unwrap(), 0.0);
    }

    #[test]
    fn half_period_mirrors_release_angle() {
        let half_ms = period(1.5).unwrap() * 1000.0 / 2.0;
        assert_close(current_angle(1.5, 0.3, half_ms).unwrap(), -0.3);
    }

    #[test]
    fn period_matches_formula() {
        assert_close(period(2.0).unwrap(), 2.0 * PI * (2.0 / GRAVITY).sqrt());
    }

    #[test]
    fn negative_elapsed_is_symmetric() {
        let forward = current_angle(2.0, 0.5, 700.0).unwrap();
        let backward = current_angle(2.0, 0.5, -700.0).unwrap();
        assert_close(forward, backward);
    }

    #[test]
    fn non_positive_length_is_rejected() {
        assert_eq!(
            current_angle(0.0, 0.5, 10.0),
            Err(ParamError::InvalidLength(0.0))
        );
        assert_eq!(
            current_angle(-1.0, 0.5, 10.0),
            Err(ParamError::InvalidLength(-1.0))
        );
    }

    #[test]
    fn stopped_pendulum_is_at_rest() {
        let p = pendulum(1.0, 2.0, 0, false);
        assert_eq!(effective_angle(&p, 123_456).unwrap(), REST_ANGLE);
    }

    #[test]
    fn moving_pendulum_uses_elapsed_since_trigger() {
        let p = pendulum(FRAC_PI_4, 2.0, 1_000, true);
        let expected = current_angle(2.0, FRAC_PI_4, 2_000.0).unwrap();
        assert_eq!(effective_angle(&p, 3_000).unwrap(), expected);
    }

    #[test]
    fn stopped_bob_hangs_straight_down() {
        // 1.5 m at 100 px/m below an anchor at (100, 40)
        let p = pendulum(1.0, 1.5, 123_456, false);
        let layout = LayoutConfig {
            scale: 100.0,
            ..Default::default()
        };
        let pos = bob_position(&p, 0, &layout, 200_000).unwrap();
        assert_close(pos.x, 100.0);
        assert_close(pos.y, 190.0);
    }

    #[test]
    fn moving_bob_leaves_vertical() {
        let p = pendulum(FRAC_PI_4, 2.0, 1_000, true);
        let layout = LayoutConfig::default();
        let pos = bob_position(&p, 2, &layout, 3_000).unwrap();
        let angle = effective_angle(&p, 3_000).unwrap();
        assert_close(pos.x, 340.0 + 20.0 * angle.sin());
        assert_close(pos.y, 40.0 + 20.0 * angle.cos());
        assert!(pos.x != 340.0);
    }

    #[test]
    fn index_shifts_anchor_by_spacing() {
        let p = pendulum(0.0, 1.0, 99_999, false);
        let layout = LayoutConfig {
            scale: 100.0,
            ..Default::default()
        };
        assert_close(bob_position(&p, 0, &layout, 0).unwrap().x, 100.0);
        assert_close(bob_position(&p, 1, &layout, 0).unwrap().x, 220.0);
    }

    #[test]
    fn stopped_bob_with_bad_length_still_fails() {
        let p = pendulum(0.0, -1.0, 0, false);
        assert!(bob_position(&p, 0, &LayoutConfig::default(), 0).is_err());
    }
}
