//! Borba - combat and progression simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (meters, player, enemies, waves, per-tick resolution)
//! - `tuning`: Data-driven game balance
//! - `persistence`: Versioned save/load of a session
//! - `headless`: Stand-in presentation layer for running sessions without a renderer

pub mod headless;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (one tick per rendered frame at 60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Default map dimensions
    pub const MAP_WIDTH: f32 = 2048.0;
    pub const MAP_HEIGHT: f32 = 2048.0;

    /// Distance a spell projectile travels before it is removed
    pub const SPELL_RANGE: f32 = 1000.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_wraps() {
        use std::f32::consts::PI;
        use std::f32::consts::TAU;
        assert!((normalize_angle(2.5 * PI) - PI / 2.0).abs() < 1e-5);
        assert!((normalize_angle(-1.5 * PI) - PI / 2.0).abs() < 1e-5);
        assert!((normalize_angle(-2.75 * PI) - (-0.75 * PI)).abs() < 1e-5);
        assert_eq!(normalize_angle(0.5), 0.5);

        // Away from the ±π seam the result is in range and a whole number of turns off
        for angle in [-20.0f32, -7.0, -1.0, 4.0, 9.5, 31.0] {
            let wrapped = normalize_angle(angle);
            assert!((-PI..PI).contains(&wrapped), "{angle} -> {wrapped}");
            let turns = (angle - wrapped) / TAU;
            assert!((turns - turns.round()).abs() < 1e-4, "{angle} -> {wrapped}");
        }
    }

    #[test]
    fn test_polar_roundtrip() {
        let p = polar_to_cartesian(10.0, 0.75);
        let (r, theta) = cartesian_to_polar(p);
        assert!((r - 10.0).abs() < 1e-4);
        assert!((theta - 0.75).abs() < 1e-4);
    }
}
