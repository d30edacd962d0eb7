use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Marker component that identifies an entity as a craft.
/// Every mobile vessel carries it, whether flown by the player or the autopilot.
#[derive(Component, Debug, Default)]
pub struct Ship;

/// Marker component that identifies the primary player-controlled craft.
#[derive(Component, Debug, Default)]
pub struct Player;

/// Faction identifier for craft and stations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Reflect, Serialize, Deserialize)]
pub enum FactionId {
    #[default]
    Independent,
    Union,
    Syndicate,
    Pirates,
}

/// Component that assigns a faction to an entity.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
pub struct Faction(pub FactionId);

/// Hull size class. Small craft use the station's dock lane; large craft moor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Reflect)]
pub enum ShipSize {
    #[default]
    Small,
    Large,
}

/// How a craft finishes a docking approach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect)]
pub enum DockingStyle {
    /// Flies into an internal hangar through the dock lane.
    #[default]
    Hangar,
    /// Holds station at an external mooring point.
    Mooring,
}

impl DockingStyle {
    /// Distance from a docking waypoint beyond which the approach runs at
    /// full throttle.
    pub fn full_throttle_range(&self) -> f32 {
        match self {
            DockingStyle::Hangar => 100.0,
            DockingStyle::Mooring => 250.0,
        }
    }
}

/// Physical characteristics of a craft.
#[derive(Component, Debug, Clone, Reflect)]
pub struct ShipClass {
    pub size: ShipSize,
    pub docking_style: DockingStyle,
    /// Half-extents of the hull's bounding box in body space.
    pub half_extents: Vec3,
    /// Forward acceleration at throttle 1.0.
    pub max_thrust: f32,
    /// Angular acceleration at a unit torque command.
    pub max_torque: f32,
    /// Top speed at throttle 1.0. Supercruise scales it with throttle.
    pub max_speed: f32,
}

impl ShipClass {
    /// A nimble trader or fighter.
    pub fn small() -> Self {
        Self {
            size: ShipSize::Small,
            docking_style: DockingStyle::Hangar,
            half_extents: Vec3::new(6.0, 3.0, 10.0),
            max_thrust: 60.0,
            max_torque: 4.0,
            max_speed: 120.0,
        }
    }

    /// A freighter or capital hull.
    pub fn large() -> Self {
        Self {
            size: ShipSize::Large,
            docking_style: DockingStyle::Mooring,
            half_extents: Vec3::new(30.0, 15.0, 80.0),
            max_thrust: 20.0,
            max_torque: 1.0,
            max_speed: 70.0,
        }
    }

    /// Radius of the sphere enclosing the hull.
    pub fn hull_radius(&self) -> f32 {
        self.half_extents.length()
    }
}

impl Default for ShipClass {
    fn default() -> Self {
        Self::small()
    }
}

/// Linear and angular velocity of a craft, both in world space.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Kinematics {
    pub linear: Vec3,
    pub angular: Vec3,
}
