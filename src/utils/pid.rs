//! Vector PID controller used by the steering helpers.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl PidGains {
    pub const fn new(p: f32, i: f32, d: f32) -> Self {
        Self { p, i, d }
    }
}

/// Closed-loop controller over `Vec3` errors.
///
/// `update` is a pure function of `(error, dt)` apart from the integral and
/// last-error accumulators. The output is never clamped; callers limit the
/// applied magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    pub gains: PidGains,
    integral: Vec3,
    last_error: Vec3,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: Vec3::ZERO,
            last_error: Vec3::ZERO,
        }
    }

    /// Feeds one error sample taken `dt` seconds after the previous one and
    /// returns the correction.
    pub fn update(&mut self, error: Vec3, dt: f32) -> Vec3 {
        self.integral += error * dt;
        let derivative = (error - self.last_error) / dt;
        self.last_error = error;

        self.gains.p * error + self.gains.i * self.integral + self.gains.d * derivative
    }

    /// Clears the integral and last-error state.
    pub fn reset(&mut self) {
        self.integral = Vec3::ZERO;
        self.last_error = Vec3::ZERO;
    }

    pub fn integral(&self) -> Vec3 {
        self.integral
    }
}
