//! Station side of the docking protocol, run once per tick before any
//! controller: approach timeouts, physical contact and automatic undocking.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::components::{
    AbortReason, Cargo, Credits, DockingCoordinator, DockingError, Faction, Order, OrderController,
    Ship, Station, Undock,
};
use crate::events::{NoticeWriters, ShipDockedEvent, ShipUndockedEvent};
use crate::resources::{AutopilotConfig, FactionRegistry};
use crate::systems::economy::dockable_stations;
use crate::systems::sector::{collect_stations, StationQuery};

/// Something a station decided this tick that the craft must act on.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StationEvent {
    Expired { craft: Entity, station: Entity },
    Docked { craft: Entity, station: Entity },
    Undocked { craft: Entity, station: Entity, undock: Undock },
}

/// System that advances every station's docking coordinator.
///
/// Stations are processed in ascending entity order. Station decisions are
/// collected first and applied to the craft afterwards, so a craft's order
/// can release claims at any station while it is being finished.
pub fn station_docking_system(
    config: Res<AutopilotConfig>,
    factions: Res<FactionRegistry>,
    stations: StationQuery,
    mut docks: Query<&mut DockingCoordinator, With<Station>>,
    mut ships: Query<
        (
            Entity,
            &mut Transform,
            &mut OrderController,
            &Faction,
            Option<&mut Cargo>,
            Option<&mut Credits>,
        ),
        (With<Ship>, Without<Station>),
    >,
    mut docked_events: EventWriter<ShipDockedEvent>,
    mut undocked_events: EventWriter<ShipUndockedEvent>,
    mut notices: NoticeWriters,
) {
    let known = collect_stations(&stations);
    let positions: HashMap<Entity, Vec3> = ships
        .iter()
        .map(|(entity, transform, ..)| (entity, transform.translation))
        .collect();
    let clearing_ticks = config.ticks(config.undock_maneuver_secs);

    let mut decided = Vec::new();
    for station in known.iter().map(|s| s.entity) {
        let Ok(mut dock) = docks.get_mut(station) else {
            continue;
        };
        let tick = dock.advance();
        if let Some(craft) = tick.expired {
            decided.push(StationEvent::Expired { craft, station });
        }
        for craft in tick.undock_due {
            if let Some(undock) = dock.undock_ship(craft, clearing_ticks) {
                decided.push(StationEvent::Undocked { craft, station, undock });
            }
        }
        for craft in dock.inbound() {
            let Some(position) = positions.get(&craft) else {
                continue;
            };
            if dock.try_contact(craft, *position, config.contact_radius) {
                decided.push(StationEvent::Docked { craft, station });
            }
        }
    }

    for event in decided {
        match event {
            StationEvent::Expired { craft, station } => {
                let Ok((_, _, mut controller, ..)) = ships.get_mut(craft) else {
                    continue;
                };
                if controller.order().and_then(Order::docking_target) == Some(station) {
                    controller.abort_order(craft, AbortReason::Docking(DockingError::DockingExpired), &mut docks);
                    notices.dispatch(craft, controller.drain_notices());
                }
            }
            StationEvent::Docked { craft, station } => {
                let Ok((_, _, mut controller, faction, cargo, credits)) = ships.get_mut(craft) else {
                    continue;
                };
                info!("{:?} docked at {:?}", craft, station);
                controller.on_docked(station);
                docked_events.send(ShipDockedEvent { craft, station });

                let for_this_station = controller.order().and_then(Order::docking_target) == Some(station);
                let trading = matches!(controller.order(), Some(Order::Trade(_)));
                if for_this_station && trading {
                    if let (Some(mut cargo), Some(mut credits)) = (cargo, credits) {
                        let reachable = dockable_stations(&known, faction.0, &factions);
                        controller.perform_transaction(station, &mut cargo, &mut credits, &reachable);
                    } else {
                        warn!("{:?} is trading without a hold or wallet", craft);
                    }
                    if let Ok(mut dock) = docks.get_mut(station) {
                        dock.schedule_undock(craft, config.ticks(config.auto_undock_delay_secs));
                    }
                } else if for_this_station {
                    controller.finish_order(craft, &mut docks);
                }
                notices.dispatch(craft, controller.drain_notices());
            }
            StationEvent::Undocked { craft, station, undock } => {
                let Ok((_, mut transform, mut controller, ..)) = ships.get_mut(craft) else {
                    continue;
                };
                release_craft(&mut transform, &mut controller, undock, &config);
                info!("{:?} undocked from {:?}", craft, station);
                undocked_events.send(ShipUndockedEvent { craft, station });
            }
        }
    }
}

/// Places an undocking craft at the exit and starts its maneuver.
pub(crate) fn release_craft(
    transform: &mut Transform,
    controller: &mut OrderController,
    undock: Undock,
    config: &AutopilotConfig,
) {
    transform.translation = undock.exit_point;
    transform.look_to(undock.exit_direction, Vec3::Y);
    controller.begin_undock(
        undock,
        config.ticks(config.undock_maneuver_secs),
        config.undock_throttle,
    );
}
