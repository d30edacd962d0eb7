//! Attitude control: turns a desired heading into a body-space torque
//! command, plus the throttle profiles shared by the approach orders.

use bevy::prelude::*;

use crate::components::DockingStyle;
use crate::resources::AutopilotConfig;
use crate::utils::pid::PidController;

/// The two loops that drive a craft's attitude.
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringPids {
    /// Acts on the heading error (forward crossed with desired direction).
    pub heading: PidController,
    /// Acts on the negated body angular velocity.
    pub damping: PidController,
}

impl SteeringPids {
    pub fn from_config(config: &AutopilotConfig) -> Self {
        Self {
            heading: PidController::new(config.heading_gains),
            damping: PidController::new(config.damping_gains),
        }
    }

    pub fn reset(&mut self) {
        self.heading.reset();
        self.damping.reset();
    }
}

/// Result of one steering step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringCommand {
    /// Body-space torque request. Magnitudes above 1.0 saturate later.
    pub torque: Vec3,
    /// Angle in degrees between current forward and the target direction.
    pub angle: f32,
}

/// Computes the torque that turns a craft at `position` with `rotation`
/// and world `angular_velocity` to face `target`.
pub fn steer_towards(
    pids: &mut SteeringPids,
    position: Vec3,
    rotation: Quat,
    angular_velocity: Vec3,
    target: Vec3,
    dt: f32,
) -> SteeringCommand {
    let inverse = rotation.inverse();
    let damping = pids.damping.update(inverse * -angular_velocity, dt);

    let Some(desired) = (target - position).try_normalize() else {
        return SteeringCommand {
            torque: damping,
            angle: 0.0,
        };
    };

    let forward = rotation * Vec3::NEG_Z;
    let mut error = forward.cross(desired);
    // Behind us the cross product shrinks towards zero; turn at full rate.
    if forward.dot(desired) < 0.0 {
        error = error.try_normalize().unwrap_or(rotation * Vec3::Y);
    }

    let correction = pids.heading.update(inverse * error, dt);
    SteeringCommand {
        torque: damping + correction,
        angle: forward.angle_between(desired).to_degrees(),
    }
}

/// Throttle for a docking approach `distance` away from the next waypoint.
///
/// Above 1.0 the craft is in supercruise.
pub fn approach_throttle(distance: f32, style: DockingStyle, config: &AutopilotConfig) -> f32 {
    if distance > config.supercruise_range {
        return config.supercruise_throttle;
    }
    let full = style.full_throttle_range();
    if distance >= full {
        1.0
    } else {
        (distance / full).max(config.throttle_floor)
    }
}

/// Throttle that eases off inside `slowing_radius` of the target.
pub fn arrive_throttle(distance: f32, slowing_radius: f32, max: f32, floor: f32) -> f32 {
    if slowing_radius <= 0.0 {
        return max;
    }
    (max * distance / slowing_radius).clamp(floor.min(max), max)
}
