use bevy::prelude::*;

/// What kind of body an obstacle is. Only static categories deflect the
/// forward collision probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum ObstacleCategory {
    /// Asteroid or other mineable field.
    MineableField,
    Station,
    /// Another craft. Moving, so never avoided by the probe.
    Craft,
    /// Short-lived projectile or debris.
    Projectile,
}

impl ObstacleCategory {
    pub fn is_static(&self) -> bool {
        matches!(self, ObstacleCategory::MineableField | ObstacleCategory::Station)
    }
}

/// Axis-aligned bounds an entity presents to the collision probe, centred on
/// its `Transform` translation.
#[derive(Component, Debug, Clone, Copy)]
pub struct Obstacle {
    pub category: ObstacleCategory,
    pub half_extents: Vec3,
}

impl Obstacle {
    pub fn new(category: ObstacleCategory, half_extents: Vec3) -> Self {
        Self {
            category,
            half_extents,
        }
    }
}
