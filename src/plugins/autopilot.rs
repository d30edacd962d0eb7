use bevy::prelude::*;

use crate::events::{
    AutopilotCommand, OrderAbortedEvent, OrderFinishedEvent, ShipDockedEvent, ShipUndockedEvent,
    TradeCompletedEvent,
};
use crate::resources::{AutopilotConfig, FactionRegistry, SectorRng, SimClock};
use crate::systems::{
    flight_integration_system, order_controller_system, process_autopilot_commands,
    station_docking_system, world_tick_system,
};

/// System set containing the whole fixed-rate autopilot step.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutopilotSystems;

/// Plugin that runs station docking and every craft's autopilot at a fixed
/// tick rate.
///
/// Resources already present when the plugin is added (a loaded
/// [`AutopilotConfig`], a custom [`FactionRegistry`]) are kept.
pub struct AutopilotPlugin;

impl Plugin for AutopilotPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AutopilotConfig>();
        let config = app.world().resource::<AutopilotConfig>().clone();

        if !app.world().contains_resource::<FactionRegistry>() {
            app.insert_resource(FactionRegistry::new());
        }
        if !app.world().contains_resource::<SectorRng>() {
            app.insert_resource(SectorRng::seeded(config.seed));
        }

        app.init_resource::<SimClock>()
            .insert_resource(Time::<Fixed>::from_hz(f64::from(config.tick_rate.max(1))))
            .add_event::<AutopilotCommand>()
            .add_event::<OrderFinishedEvent>()
            .add_event::<OrderAbortedEvent>()
            .add_event::<ShipDockedEvent>()
            .add_event::<ShipUndockedEvent>()
            .add_event::<TradeCompletedEvent>()
            .add_systems(
                FixedUpdate,
                (
                    process_autopilot_commands,
                    station_docking_system,
                    order_controller_system,
                    flight_integration_system,
                    world_tick_system,
                )
                    .chain()
                    .in_set(AutopilotSystems),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        AbortReason, Cargo, Credits, DockingError, FactionId, Order, OrderController, PilotMode,
        PriceList, ShipClass, TradePhase, Ware,
    };
    use crate::events::PilotCommand;
    use crate::plugins::sector::{ship_bundle, station_bundle, STATION_RADIUS};

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(AutopilotPlugin);
        app
    }

    fn step(app: &mut App) {
        app.world_mut().run_schedule(FixedUpdate);
    }

    fn config(app: &App) -> AutopilotConfig {
        app.world().resource::<AutopilotConfig>().clone()
    }

    fn spawn_station(app: &mut App, position: Vec3, faction: FactionId, prices: PriceList) -> Entity {
        let config = config(app);
        app.world_mut()
            .spawn(station_bundle(&config, "Test", position, faction, prices, 2))
            .id()
    }

    fn spawn_ship(app: &mut App, position: Vec3, credits: i64) -> Entity {
        let config = config(app);
        app.world_mut()
            .spawn(ship_bundle(&config, position, FactionId::Union, ShipClass::small(), 100, credits))
            .id()
    }

    fn command(app: &mut App, craft: Entity, command: PilotCommand) {
        app.world_mut().send_event(AutopilotCommand { craft, command });
    }

    fn controller(app: &App, craft: Entity) -> &OrderController {
        app.world().entity(craft).get::<OrderController>().unwrap()
    }

    fn event_count<E: Event>(app: &App) -> usize {
        app.world().resource::<Events<E>>().iter_current_update_events().count()
    }

    /// Ticks until `craft` is docked, holding it at `mouth` so contact
    /// happens as soon as the station clears it in.
    fn dock_by_contact(app: &mut App, craft: Entity, mouth: Vec3) {
        for _ in 0..30 {
            app.world_mut().entity_mut(craft).get_mut::<Transform>().unwrap().translation = mouth;
            step(app);
            if controller(app, craft).docked_at().is_some() {
                return;
            }
        }
        panic!("craft never docked");
    }

    #[test]
    fn test_plugin_inserts_resources() {
        let app = test_app();
        assert!(app.world().contains_resource::<AutopilotConfig>());
        assert!(app.world().contains_resource::<FactionRegistry>());
        assert!(app.world().contains_resource::<SectorRng>());
        let registry = app.world().resource::<FactionRegistry>();
        assert!(registry.is_hostile(FactionId::Pirates, FactionId::Union));
    }

    #[test]
    fn test_plugin_keeps_loaded_config() {
        let mut app = App::new();
        app.insert_resource(AutopilotConfig {
            tick_rate: 30,
            ..Default::default()
        });
        app.add_plugins(MinimalPlugins).add_plugins(AutopilotPlugin);
        assert_eq!(app.world().resource::<AutopilotConfig>().tick_rate, 30);
    }

    #[test]
    fn test_command_issues_order_and_clock_advances() {
        let mut app = test_app();
        let station = spawn_station(&mut app, Vec3::ZERO, FactionId::Union, PriceList::new());
        let craft = spawn_ship(&mut app, Vec3::new(0.0, 0.0, 1500.0), 0);

        command(&mut app, craft, PilotCommand::DockAt(station));
        step(&mut app);

        let ctl = controller(&app, craft);
        assert_eq!(ctl.mode, PilotMode::Autopilot);
        assert!(matches!(ctl.order(), Some(Order::Dock(_))));
        assert_eq!(app.world().resource::<SimClock>().tick, 1);
    }

    #[test]
    fn test_dock_order_finishes_on_contact() {
        let mut app = test_app();
        let station = spawn_station(&mut app, Vec3::ZERO, FactionId::Union, PriceList::new());
        let craft = spawn_ship(&mut app, Vec3::new(0.0, 0.0, 1500.0), 0);

        command(&mut app, craft, PilotCommand::DockAt(station));
        dock_by_contact(&mut app, craft, Vec3::Z * STATION_RADIUS);

        let ctl = controller(&app, craft);
        assert_eq!(ctl.docked_at(), Some(station));
        assert!(ctl.order().is_none());
        assert_eq!(event_count::<ShipDockedEvent>(&app), 1);
        assert_eq!(event_count::<OrderFinishedEvent>(&app), 1);
    }

    #[test]
    fn test_trade_buys_then_undocks_towards_buyer() {
        let mut app = test_app();
        let seller = spawn_station(
            &mut app,
            Vec3::ZERO,
            FactionId::Union,
            PriceList::new().with(Ware::Ore, 50),
        );
        let buyer = spawn_station(
            &mut app,
            Vec3::new(5000.0, 0.0, 0.0),
            FactionId::Independent,
            PriceList::new().with(Ware::Ore, 110),
        );
        let craft = spawn_ship(&mut app, Vec3::new(0.0, 0.0, 1500.0), 1_000);

        command(&mut app, craft, PilotCommand::AutoTrade);
        dock_by_contact(&mut app, craft, Vec3::Z * STATION_RADIUS);

        {
            let world = app.world();
            let entity = world.entity(craft);
            assert_eq!(entity.get::<Cargo>().unwrap().get(Ware::Ore), 20);
            assert_eq!(entity.get::<Credits>().unwrap().0, 0);
        }
        assert_eq!(event_count::<TradeCompletedEvent>(&app), 1);
        assert_eq!(controller(&app, craft).docked_at(), Some(seller));

        let delay = config(&app).ticks(config(&app).auto_undock_delay_secs);
        for _ in 0..delay + 2 {
            step(&mut app);
        }

        let ctl = controller(&app, craft);
        assert!(ctl.docked_at().is_none());
        assert!(ctl.maneuver().is_some());
        assert_eq!(event_count::<ShipUndockedEvent>(&app), 1);
        let Some(Order::Trade(trade)) = ctl.order() else {
            panic!("trade order should survive the transaction");
        };
        assert_eq!(trade.phase, TradePhase::SellCargo);
        assert_eq!(trade.destination.as_ref().map(|d| d.station), Some(buyer));
    }

    #[test]
    fn test_trade_ignores_hostile_stations() {
        let mut app = test_app();
        spawn_station(
            &mut app,
            Vec3::new(-5000.0, 0.0, 0.0),
            FactionId::Pirates,
            PriceList::new().with(Ware::Ore, 41),
        );
        let fence = spawn_station(
            &mut app,
            Vec3::new(0.0, 0.0, -5000.0),
            FactionId::Pirates,
            PriceList::new().with(Ware::Ore, 119),
        );
        let seller = spawn_station(
            &mut app,
            Vec3::ZERO,
            FactionId::Union,
            PriceList::new().with(Ware::Ore, 50),
        );
        let buyer = spawn_station(
            &mut app,
            Vec3::new(5000.0, 0.0, 0.0),
            FactionId::Independent,
            PriceList::new().with(Ware::Ore, 110),
        );
        let craft = spawn_ship(&mut app, Vec3::new(0.0, 0.0, 1500.0), 1_000);

        command(&mut app, craft, PilotCommand::AutoTrade);
        step(&mut app);
        assert_eq!(controller(&app, craft).order().and_then(Order::docking_target), Some(seller));

        dock_by_contact(&mut app, craft, Vec3::Z * STATION_RADIUS);
        assert_eq!(controller(&app, craft).docked_at(), Some(seller));
        let Some(Order::Trade(trade)) = controller(&app, craft).order() else {
            panic!("trade order should survive the purchase");
        };
        assert_eq!(trade.phase, TradePhase::SellCargo);
        let destination = trade.destination.as_ref().map(|d| d.station);
        assert_eq!(destination, Some(buyer));
        assert_ne!(destination, Some(fence));
        assert_eq!(event_count::<OrderAbortedEvent>(&app), 0);
    }

    #[test]
    fn test_stalled_approach_expires() {
        let mut app = test_app();
        let station = spawn_station(&mut app, Vec3::ZERO, FactionId::Union, PriceList::new());
        let craft = spawn_ship(&mut app, Vec3::new(0.0, 0.0, 1500.0), 0);
        // Dead engines: the craft is cleared in but never arrives.
        app.world_mut().entity_mut(craft).get_mut::<ShipClass>().unwrap().max_thrust = 0.0;

        command(&mut app, craft, PilotCommand::DockAt(station));
        let timeout = config(&app).ticks(config(&app).dock_approach_timeout_secs);
        for _ in 0..timeout + 5 {
            step(&mut app);
        }

        assert!(controller(&app, craft).order().is_none());
        let aborted: Vec<_> = app
            .world()
            .resource::<Events<OrderAbortedEvent>>()
            .iter_current_update_events()
            .map(|e| e.reason)
            .collect();
        assert_eq!(aborted, vec![AbortReason::Docking(DockingError::DockingExpired)]);
    }

    #[test]
    fn test_cancel_while_docked_stays_docked() {
        let mut app = test_app();
        let station = spawn_station(&mut app, Vec3::ZERO, FactionId::Union, PriceList::new());
        let craft = spawn_ship(&mut app, Vec3::new(0.0, 0.0, 1500.0), 0);
        command(&mut app, craft, PilotCommand::DockAt(station));
        dock_by_contact(&mut app, craft, Vec3::Z * STATION_RADIUS);

        command(&mut app, craft, PilotCommand::Cancel);
        step(&mut app);
        assert_eq!(controller(&app, craft).docked_at(), Some(station));

        command(&mut app, craft, PilotCommand::Idle);
        step(&mut app);
        let ctl = controller(&app, craft);
        assert!(ctl.docked_at().is_none());
        assert!(matches!(ctl.order(), Some(Order::Idle(_))));
        assert_eq!(event_count::<ShipUndockedEvent>(&app), 1);
    }
}
