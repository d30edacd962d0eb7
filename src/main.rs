use bevy::app::{AppExit, ScheduleRunnerPlugin};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::collections::BTreeMap;
use std::time::Duration;

use starlane::components::{Credits, Order, OrderController, Ship};
use starlane::events::{OrderAbortedEvent, OrderFinishedEvent, ShipDockedEvent, TradeCompletedEvent};
use starlane::plugins::autopilot::AutopilotPlugin;
use starlane::plugins::sector::DemoSectorPlugin;
use starlane::resources::{AutopilotConfig, CliArgs, SimClock};

/// Ticks simulated when `--ticks` is not given (one minute at 60 Hz).
const DEFAULT_TICKS: u64 = 3600;

/// Number of fixed ticks to simulate before exiting.
#[derive(Resource)]
struct TickBudget(u64);

fn main() {
    let cli = CliArgs::parse();
    let mut config = AutopilotConfig::load(cli.config.as_deref());
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let budget = cli.ticks.unwrap_or(DEFAULT_TICKS);
    // One fixed tick per frame, as fast as the host allows.
    let step = Duration::from_secs_f64(1.0 / f64::from(config.tick_rate.max(1)));

    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)))
        .add_plugins(LogPlugin::default())
        .insert_resource(TimeUpdateStrategy::ManualDuration(step))
        .insert_resource(TickBudget(budget))
        .insert_resource(config)
        .add_plugins(AutopilotPlugin)
        .add_plugins(DemoSectorPlugin)
        .add_systems(Update, (log_autopilot_events, exit_after_budget).chain())
        .run();
}

fn log_autopilot_events(
    mut finished: EventReader<OrderFinishedEvent>,
    mut aborted: EventReader<OrderAbortedEvent>,
    mut docked: EventReader<ShipDockedEvent>,
    mut traded: EventReader<TradeCompletedEvent>,
) {
    for event in aborted.read() {
        warn!("{:?}: {} aborted ({})", event.craft, event.order, event.reason);
    }
    for event in finished.read() {
        info!("{:?}: {} finished", event.craft, event.order);
    }
    for event in docked.read() {
        debug!("{:?} docked at {:?}", event.craft, event.station);
    }
    for event in traded.read() {
        let receipt = &event.receipt;
        info!(
            "{:?} traded {} {:?} at {:?} ({:+} credits)",
            event.craft, receipt.quantity, receipt.ware, receipt.station, receipt.credits_delta
        );
    }
}

fn exit_after_budget(
    clock: Res<SimClock>,
    budget: Res<TickBudget>,
    config: Res<AutopilotConfig>,
    ships: Query<(&OrderController, Option<&Credits>), With<Ship>>,
    mut exit: EventWriter<AppExit>,
) {
    if clock.tick < budget.0 {
        return;
    }

    let mut orders: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut docked = 0;
    let mut inbound = 0;
    let mut wealth = 0;
    for (controller, credits) in &ships {
        let name = controller.order().map_or("None", |order| order.name());
        *orders.entry(name).or_default() += 1;
        if controller.docked_at().is_some() {
            docked += 1;
        } else if controller.order().is_some_and(Order::is_docking) {
            inbound += 1;
        }
        wealth += credits.map_or(0, |c| c.0);
    }
    info!(
        "Simulated {} ticks ({:.1}s): {} craft docked, {} inbound, {} credits in circulation",
        clock.tick,
        clock.elapsed_secs(config.tick_rate),
        docked,
        inbound,
        wealth
    );
    for (name, count) in orders {
        info!("  {}: {}", name, count);
    }
    exit.send(AppExit::Success);
}
