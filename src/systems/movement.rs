//! Flight integration: thrust, drag and torque applied to each craft.

use bevy::prelude::*;

use crate::components::{Kinematics, OrderController, PilotMode, Ship, ShipClass};
use crate::resources::AutopilotConfig;

/// Flight model constants.
///
/// Linear drag is `max_thrust / max_speed`, so terminal speed at throttle
/// `t` is roughly `max_speed * t`.
pub mod flight_config {
    /// Fraction of angular velocity shed per second.
    pub const ANGULAR_DRAG: f32 = 2.0;
    /// Upper bound on angular speed (radians/second).
    pub const MAX_ANGULAR_SPEED: f32 = 2.5;
}

/// Applies one step of throttle and torque to a craft.
pub fn integrate_flight(
    transform: &mut Transform,
    kinematics: &mut Kinematics,
    class: &ShipClass,
    throttle: f32,
    torque: Vec3,
    dt: f32,
) {
    // Angular: body-space torque command, saturated at unit magnitude.
    let torque = transform.rotation * (torque.clamp_length_max(1.0) * class.max_torque);
    kinematics.angular += torque * dt;
    kinematics.angular *= (1.0 - flight_config::ANGULAR_DRAG * dt).max(0.0);
    kinematics.angular = kinematics
        .angular
        .clamp_length_max(flight_config::MAX_ANGULAR_SPEED);
    transform.rotation = (Quat::from_scaled_axis(kinematics.angular * dt) * transform.rotation).normalize();

    // Linear: thrust along the new forward axis against speed-proportional drag.
    let forward = transform.rotation * Vec3::NEG_Z;
    let drag = if class.max_speed > 0.0 {
        class.max_thrust / class.max_speed
    } else {
        0.0
    };
    kinematics.linear += forward * class.max_thrust * throttle.max(0.0) * dt;
    kinematics.linear -= kinematics.linear * (drag * dt).min(1.0);
    transform.translation += kinematics.linear * dt;
}

/// System that moves autopilot craft according to their controllers.
///
/// Docked craft are held still. Craft in an undock maneuver are pushed
/// straight out along the exit direction. Manual craft are left to whatever
/// drives the player's input.
pub fn flight_integration_system(
    config: Res<AutopilotConfig>,
    mut query: Query<(&mut Transform, &mut Kinematics, &ShipClass, &OrderController), With<Ship>>,
) {
    let dt = config.dt();
    for (mut transform, mut kinematics, class, controller) in &mut query {
        if controller.docked_at().is_some() {
            *kinematics = Kinematics::default();
            continue;
        }
        if let Some(maneuver) = controller.maneuver() {
            kinematics.linear = maneuver.exit_direction * class.max_speed * controller.throttle;
            kinematics.angular = Vec3::ZERO;
            transform.translation += kinematics.linear * dt;
            continue;
        }
        if controller.mode == PilotMode::Manual {
            continue;
        }
        integrate_flight(
            &mut transform,
            &mut kinematics,
            class,
            controller.throttle,
            controller.torque,
            dt,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_thrust_moves_forward_to_terminal_speed() {
        let class = ShipClass::small();
        let mut transform = Transform::default();
        let mut kinematics = Kinematics::default();
        for _ in 0..3600 {
            integrate_flight(&mut transform, &mut kinematics, &class, 1.0, Vec3::ZERO, DT);
        }
        assert!(transform.translation.z < 0.0);
        assert!((kinematics.linear.length() - class.max_speed).abs() < 2.0);
    }

    #[test]
    fn test_supercruise_is_faster() {
        let class = ShipClass::small();
        let mut transform = Transform::default();
        let mut kinematics = Kinematics::default();
        for _ in 0..3600 {
            integrate_flight(&mut transform, &mut kinematics, &class, 2.0, Vec3::ZERO, DT);
        }
        assert!(kinematics.linear.length() > class.max_speed * 1.9);
    }

    #[test]
    fn test_torque_is_saturated() {
        let class = ShipClass::small();
        let mut a = (Transform::default(), Kinematics::default());
        let mut b = (Transform::default(), Kinematics::default());
        integrate_flight(&mut a.0, &mut a.1, &class, 0.0, Vec3::Y, DT);
        integrate_flight(&mut b.0, &mut b.1, &class, 0.0, Vec3::Y * 50.0, DT);
        assert!((a.1.angular - b.1.angular).length() < 1e-6);
        assert!(a.1.angular.y > 0.0);
    }

    #[test]
    fn test_rotation_stays_normalized() {
        let class = ShipClass::small();
        let mut transform = Transform::default();
        let mut kinematics = Kinematics::default();
        for _ in 0..600 {
            integrate_flight(&mut transform, &mut kinematics, &class, 0.5, Vec3::new(0.3, 1.0, 0.2), DT);
        }
        assert!((transform.rotation.length() - 1.0).abs() < 1e-4);
    }
}
