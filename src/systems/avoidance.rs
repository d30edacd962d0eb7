//! Forward probes that steer craft around static obstacles.
//!
//! Four rays are cast along the craft's forward axis, offset to the edges of
//! its hull (up, down, left, right). The nearest hit on a static obstacle
//! (mineable field or station) places a temporary avoidance point beside
//! that obstacle, on the side away from the probe that touched it.

use bevy::math::bounding::{Aabb3d, RayCast3d};
use bevy::prelude::*;

use crate::components::OrderController;
use crate::systems::sector::{CraftState, ObstacleShape, Sector};

/// Hull edge a probe is cast from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSide {
    Up,
    Down,
    Left,
    Right,
}

impl ProbeSide {
    pub const ALL: [ProbeSide; 4] = [ProbeSide::Up, ProbeSide::Down, ProbeSide::Left, ProbeSide::Right];

    /// World-space offset from the craft's center to this hull edge.
    fn offset(&self, craft: &CraftState) -> Vec3 {
        let half = craft.class.half_extents;
        match self {
            ProbeSide::Up => craft.up() * half.y,
            ProbeSide::Down => -craft.up() * half.y,
            ProbeSide::Left => -craft.right() * half.x,
            ProbeSide::Right => craft.right() * half.x,
        }
    }

    /// Unit direction pointing away from this side of the craft.
    fn away(&self, craft: &CraftState) -> Vec3 {
        match self {
            ProbeSide::Up => -craft.up(),
            ProbeSide::Down => craft.up(),
            ProbeSide::Left => craft.right(),
            ProbeSide::Right => -craft.right(),
        }
    }
}

/// The nearest probe contact.
#[derive(Debug, Clone, Copy)]
pub struct ProbeHit {
    pub side: ProbeSide,
    pub distance: f32,
    pub obstacle: ObstacleShape,
}

/// Casts the four probes. Returns the nearest hit on a static obstacle.
pub fn cast_probes(craft: &CraftState, obstacles: &[ObstacleShape], length: f32) -> Option<ProbeHit> {
    let direction = Dir3::new(craft.forward()).ok()?;
    let mut nearest: Option<ProbeHit> = None;

    for side in ProbeSide::ALL {
        let origin = craft.position + side.offset(craft);
        let ray = RayCast3d::from_ray(Ray3d { origin, direction }, length);

        for obstacle in obstacles.iter().filter(|o| o.category.is_static()) {
            let aabb = Aabb3d::new(obstacle.center, obstacle.half_extents);
            let Some(distance) = ray.aabb_intersection_at(&aabb) else {
                continue;
            };
            if nearest.map_or(true, |n| distance < n.distance) {
                nearest = Some(ProbeHit {
                    side,
                    distance,
                    obstacle: *obstacle,
                });
            }
        }
    }

    nearest
}

/// Point beside the hit obstacle, clear of it by the craft's hull radius.
pub fn avoidance_point(craft: &CraftState, hit: &ProbeHit) -> Vec3 {
    let clearance = hit.obstacle.half_extents.length() + craft.class.hull_radius();
    hit.obstacle.center + hit.side.away(craft) * clearance
}

/// Runs the probes for a craft under thrust and diverts it on a hit.
pub fn probe_for_obstacles(controller: &mut OrderController, craft: &CraftState, sector: &Sector) {
    if controller.throttle <= sector.config.throttle_deadband {
        return;
    }
    let Some(hit) = cast_probes(craft, sector.obstacles, sector.config.probe_length) else {
        return;
    };
    let point = avoidance_point(craft, &hit);
    if !controller.is_avoiding() {
        debug!(
            "{:?} avoiding {:?} ({:?} probe, {:.0} ahead)",
            craft.entity, hit.obstacle.entity, hit.side, hit.distance
        );
    }
    controller.begin_avoidance(point);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ObstacleCategory, ShipClass};
    use crate::systems::sector::fixtures::craft_at;

    fn obstacle(id: u32, center: Vec3, half: Vec3, category: ObstacleCategory) -> ObstacleShape {
        ObstacleShape {
            entity: Entity::from_raw(id),
            center,
            half_extents: half,
            category,
        }
    }

    #[test]
    fn test_dynamic_obstacles_are_ignored() {
        let craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        let obstacles = [
            obstacle(2, Vec3::NEG_Z * 100.0, Vec3::splat(20.0), ObstacleCategory::Craft),
            obstacle(3, Vec3::NEG_Z * 150.0, Vec3::splat(20.0), ObstacleCategory::Projectile),
        ];
        assert!(cast_probes(&craft, &obstacles, 400.0).is_none());
    }

    #[test]
    fn test_nearest_static_hit_wins() {
        let craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        let obstacles = [
            obstacle(2, Vec3::NEG_Z * 300.0, Vec3::splat(50.0), ObstacleCategory::Station),
            obstacle(3, Vec3::NEG_Z * 120.0, Vec3::splat(20.0), ObstacleCategory::MineableField),
        ];
        let hit = cast_probes(&craft, &obstacles, 400.0).unwrap();
        assert_eq!(hit.obstacle.entity, Entity::from_raw(3));
        assert!((hit.distance - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_out_of_range_is_missed() {
        let craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        let obstacles = [obstacle(2, Vec3::NEG_Z * 600.0, Vec3::splat(50.0), ObstacleCategory::Station)];
        assert!(cast_probes(&craft, &obstacles, 400.0).is_none());
    }

    #[test]
    fn test_point_is_placed_away_from_hit_side() {
        let craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        // Off to the right: only the right probe (x = +6) clips it.
        let field = obstacle(2, Vec3::new(30.0, 0.0, -200.0), Vec3::new(25.0, 25.0, 25.0), ObstacleCategory::MineableField);
        let hit = cast_probes(&craft, &[field], 400.0).unwrap();
        assert_eq!(hit.side, ProbeSide::Right);

        let point = avoidance_point(&craft, &hit);
        let clearance = field.half_extents.length() + craft.class.hull_radius();
        assert!((point - (field.center + Vec3::NEG_X * clearance)).length() < 1e-3);
    }
}
