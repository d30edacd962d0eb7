//! Applies pilot commands to craft controllers before the autopilot ticks.

use bevy::prelude::*;

use crate::components::{DockingCoordinator, OrderController, Player, Ship, Station};
use crate::events::{AutopilotCommand, NoticeWriters, PilotCommand, ShipUndockedEvent};
use crate::resources::AutopilotConfig;
use crate::systems::docking::release_craft;

/// System that turns [`AutopilotCommand`] events into orders.
///
/// A docked craft given a new flight order is undocked first; the order
/// starts once its exit maneuver is over.
pub fn process_autopilot_commands(
    config: Res<AutopilotConfig>,
    mut commands: EventReader<AutopilotCommand>,
    player: Query<Entity, With<Player>>,
    mut docks: Query<&mut DockingCoordinator, With<Station>>,
    mut ships: Query<(&mut Transform, &mut OrderController), With<Ship>>,
    mut undocked_events: EventWriter<ShipUndockedEvent>,
    mut notices: NoticeWriters,
) {
    for AutopilotCommand { craft, command } in commands.read() {
        let craft = *craft;
        let Ok((mut transform, mut controller)) = ships.get_mut(craft) else {
            warn!("Autopilot command for unknown craft {:?}", craft);
            continue;
        };

        let wants_flight = !matches!(command, PilotCommand::Cancel);
        if let Some(station) = controller.docked_at().filter(|_| wants_flight) {
            let clearing = config.ticks(config.undock_maneuver_secs);
            let undock = docks
                .get_mut(station)
                .ok()
                .and_then(|mut dock| dock.undock_ship(craft, clearing));
            match undock {
                Some(undock) => {
                    release_craft(&mut transform, &mut controller, undock, &config);
                    info!("{:?} undocked from {:?}", craft, station);
                    undocked_events.send(ShipUndockedEvent { craft, station });
                }
                None => {
                    warn!("{:?} could not undock from {:?}", craft, station);
                    continue;
                }
            }
        }

        let anchor = transform.translation;
        match command {
            PilotCommand::MoveTo(target) => controller.move_to(craft, *target, &mut docks),
            PilotCommand::PatrolPath(points) => controller.patrol_path(craft, points.clone(), &mut docks),
            PilotCommand::Idle => controller.idle(craft, anchor, &mut docks),
            PilotCommand::FollowMe => {
                let Ok(leader) = player.get_single() else {
                    warn!("FollowMe with no player craft");
                    continue;
                };
                if leader == craft {
                    continue;
                }
                controller.follow(craft, leader, &mut docks);
            }
            PilotCommand::Follow(target) => controller.follow(craft, *target, &mut docks),
            PilotCommand::DockAt(station) => controller.dock_at(craft, *station, &mut docks),
            PilotCommand::MoveWaypoints(points) => {
                controller.move_waypoints(craft, points.clone(), &mut docks)
            }
            PilotCommand::Attack(target) => controller.attack(craft, *target, &mut docks),
            PilotCommand::AttackAll => controller.attack_all(craft, &mut docks),
            PilotCommand::AutoTrade => controller.auto_trade(craft, &mut docks),
            PilotCommand::Undock => {}
            PilotCommand::Cancel => controller.finish_order(craft, &mut docks),
        }
        notices.dispatch(craft, controller.drain_notices());
    }
}
