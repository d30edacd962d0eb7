//! The world view handed to every controller tick.
//!
//! Systems snapshot what orders may read (other craft, stations, obstacles)
//! and lend out the few things orders may change (station docking
//! coordinators, the RNG). Orders never reach into the ECS directly, which
//! keeps them testable with plain data.

use bevy::prelude::*;
use rand::RngCore;
use std::collections::BTreeMap;

use crate::components::{
    DockingCoordinator, Faction, FactionId, Kinematics, Obstacle, ObstacleCategory, PriceList,
    ShipClass, Station, StationName,
};
use crate::resources::{AutopilotConfig, FactionRegistry};

/// The craft a controller is flying, as seen at the start of its tick.
#[derive(Debug, Clone)]
pub struct CraftState {
    pub entity: Entity,
    pub position: Vec3,
    pub rotation: Quat,
    pub kinematics: Kinematics,
    pub faction: FactionId,
    pub class: ShipClass,
}

impl CraftState {
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}

/// Another craft visible to the scanner.
#[derive(Debug, Clone)]
pub struct Contact {
    pub entity: Entity,
    pub position: Vec3,
    pub rotation: Quat,
    pub faction: FactionId,
    pub docked: bool,
}

/// A station the trade logic knows about.
#[derive(Debug, Clone)]
pub struct StationInfo {
    pub entity: Entity,
    pub name: String,
    pub position: Vec3,
    pub faction: FactionId,
    pub prices: PriceList,
}

/// World-space bounds of one obstacle.
#[derive(Debug, Clone, Copy)]
pub struct ObstacleShape {
    pub entity: Entity,
    pub center: Vec3,
    pub half_extents: Vec3,
    pub category: ObstacleCategory,
}

/// Lookup of station docking coordinators by station entity.
pub trait DockDirectory {
    fn coordinator(&self, station: Entity) -> Option<&DockingCoordinator>;
    fn coordinator_mut(&mut self, station: Entity) -> Option<&mut DockingCoordinator>;
}

impl DockDirectory for BTreeMap<Entity, DockingCoordinator> {
    fn coordinator(&self, station: Entity) -> Option<&DockingCoordinator> {
        self.get(&station)
    }

    fn coordinator_mut(&mut self, station: Entity) -> Option<&mut DockingCoordinator> {
        self.get_mut(&station)
    }
}

impl<'w, 's, 'd> DockDirectory for Query<'w, 's, &'d mut DockingCoordinator, With<Station>> {
    fn coordinator(&self, station: Entity) -> Option<&DockingCoordinator> {
        self.get(station).ok()
    }

    fn coordinator_mut(&mut self, station: Entity) -> Option<&mut DockingCoordinator> {
        self.get_mut(station).ok().map(Mut::into_inner)
    }
}

/// Station data read by trade logic.
pub type StationQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static Transform,
        &'static Faction,
        &'static PriceList,
        Option<&'static StationName>,
    ),
    With<Station>,
>;

/// Snapshots every station, in ascending entity order.
pub fn collect_stations(query: &StationQuery) -> Vec<StationInfo> {
    let mut stations: Vec<StationInfo> = query
        .iter()
        .map(|(entity, transform, faction, prices, name)| StationInfo {
            entity,
            name: name.map_or_else(|| format!("{:?}", entity), |n| n.0.clone()),
            position: transform.translation,
            faction: faction.0,
            prices: prices.clone(),
        })
        .collect();
    stations.sort_by_key(|s| s.entity);
    stations
}

/// Snapshots every obstacle, in ascending entity order.
pub fn collect_obstacles<'a>(
    obstacles: impl Iterator<Item = (Entity, &'a Transform, &'a Obstacle)>,
) -> Vec<ObstacleShape> {
    let mut shapes: Vec<ObstacleShape> = obstacles
        .map(|(entity, transform, obstacle)| ObstacleShape {
            entity,
            center: transform.translation,
            half_extents: obstacle.half_extents,
            category: obstacle.category,
        })
        .collect();
    shapes.sort_by_key(|o| o.entity);
    shapes
}

/// Everything an order may consult or touch outside its own controller.
pub struct Sector<'a> {
    pub tick: u64,
    /// Seconds per tick.
    pub dt: f32,
    pub config: &'a AutopilotConfig,
    pub factions: &'a FactionRegistry,
    pub contacts: &'a [Contact],
    pub stations: &'a [StationInfo],
    pub obstacles: &'a [ObstacleShape],
    pub docks: &'a mut dyn DockDirectory,
    pub rng: &'a mut dyn RngCore,
}

impl Sector<'_> {
    pub fn contact(&self, entity: Entity) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.entity == entity)
    }

    pub fn station(&self, entity: Entity) -> Option<&StationInfo> {
        self.stations.iter().find(|s| s.entity == entity)
    }

    /// Position of a craft or station, if it still exists.
    pub fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.contact(entity)
            .map(|c| c.position)
            .or_else(|| self.station(entity).map(|s| s.position))
    }

    /// Undocked craft hostile to `faction` within `range` of `origin`,
    /// nearest first.
    pub fn nearest_hostiles(&self, origin: Vec3, range: f32, faction: FactionId) -> Vec<&Contact> {
        let mut hostiles: Vec<(f32, &Contact)> = self
            .contacts
            .iter()
            .filter(|c| !c.docked && self.factions.is_hostile(faction, c.faction))
            .map(|c| (c.position.distance(origin), c))
            .filter(|(d, _)| *d <= range)
            .collect();
        hostiles.sort_by(|a, b| a.0.total_cmp(&b.0));
        hostiles.into_iter().map(|(_, c)| c).collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::components::DockLayout;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Owned sector data for unit tests.
    pub struct SectorFixture {
        pub tick: u64,
        pub config: AutopilotConfig,
        pub factions: FactionRegistry,
        pub contacts: Vec<Contact>,
        pub stations: Vec<StationInfo>,
        pub obstacles: Vec<ObstacleShape>,
        pub docks: BTreeMap<Entity, DockingCoordinator>,
        pub rng: StdRng,
    }

    impl SectorFixture {
        pub fn new() -> Self {
            Self {
                tick: 0,
                config: AutopilotConfig::default(),
                factions: FactionRegistry::new(),
                contacts: Vec::new(),
                stations: Vec::new(),
                obstacles: Vec::new(),
                docks: BTreeMap::new(),
                rng: StdRng::seed_from_u64(7),
            }
        }

        pub fn sector(&mut self) -> Sector<'_> {
            Sector {
                tick: self.tick,
                dt: self.config.dt(),
                config: &self.config,
                factions: &self.factions,
                contacts: &self.contacts,
                stations: &self.stations,
                obstacles: &self.obstacles,
                docks: &mut self.docks,
                rng: &mut self.rng,
            }
        }

        /// Adds a station with the standard layout.
        pub fn add_station(
            &mut self,
            id: u32,
            position: Vec3,
            faction: FactionId,
            prices: PriceList,
            moorings: usize,
        ) -> Entity {
            let entity = Entity::from_raw(id);
            let layout = DockLayout::standard(position, 200.0, moorings);
            self.docks
                .insert(entity, DockingCoordinator::new(faction, layout, &self.config));
            self.stations.push(StationInfo {
                entity,
                name: format!("Station {}", id),
                position,
                faction,
                prices,
            });
            entity
        }

        pub fn dock(&self, station: Entity) -> &DockingCoordinator {
            &self.docks[&station]
        }

        pub fn dock_mut(&mut self, station: Entity) -> &mut DockingCoordinator {
            self.docks.get_mut(&station).unwrap()
        }

        /// Runs every station's per-tick advance and moves the clock on.
        pub fn advance_docks(&mut self) {
            for dock in self.docks.values_mut() {
                dock.advance();
            }
            self.tick += 1;
        }
    }

    pub fn craft_at(id: u32, position: Vec3, class: ShipClass) -> CraftState {
        CraftState {
            entity: Entity::from_raw(id),
            position,
            rotation: Quat::IDENTITY,
            kinematics: Kinematics::default(),
            faction: FactionId::Union,
            class,
        }
    }

    /// Returns `craft` rotated to face `target`.
    pub fn facing(mut craft: CraftState, target: Vec3) -> CraftState {
        craft.rotation = Transform::from_translation(craft.position)
            .looking_at(target, Vec3::Y)
            .rotation;
        craft
    }
}
